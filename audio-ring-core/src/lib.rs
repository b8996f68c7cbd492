//! # audio-ring-core
//!
//! Platform-agnostic core of the mirrored ring buffer used to stream sample
//! data between a realtime producer (typically an audio processing callback)
//! and a realtime or UI-thread consumer, without locks and without split
//! copies at the wrap boundary.
//!
//! The backing storage is expected to be *mirrored*: mapped twice,
//! back-to-back, in virtual address space, so that any span starting inside
//! the buffer and no longer than the buffer is one contiguous memory region.
//! Platform backends (POSIX mmap, Windows placeholder mapping) implement the
//! `MirrorRegion` trait and plug into the generic `RingBuffer`.
//!
//! ## Architecture
//!
//! ```text
//! audio-ring-core (this crate)
//! ├── traits/   ← RingElement, MirrorRegion
//! ├── models/   ← RingError
//! └── ring/     ← RingBuffer, Producer, Consumer, data-available listeners
//! ```

pub mod models;
pub mod ring;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::error::RingError;
pub use ring::buffer::RingBuffer;
pub use ring::consumer::Consumer;
pub use ring::notify::{DataListener, SubscriptionId};
pub use ring::producer::Producer;
pub use traits::element::RingElement;
pub use traits::mirror_region::MirrorRegion;
