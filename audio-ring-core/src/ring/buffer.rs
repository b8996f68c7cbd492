use std::sync::Arc;

use crate::models::error::RingError;
use crate::ring::consumer::Consumer;
use crate::ring::notify::{DataListener, SubscriptionId};
use crate::ring::producer::Producer;
use crate::ring::shared::RingShared;
use crate::traits::element::RingElement;
use crate::traits::mirror_region::MirrorRegion;

/// Fixed-capacity ring buffer over mirrored storage.
///
/// The backing region is mapped twice, back-to-back, so every read and write
/// is one contiguous copy regardless of where it sits relative to the wrap
/// seam. Capacity is fixed at construction (a whole number of OS pages,
/// decided by the region provider) and the storage is never reallocated,
/// resized, or shared with another ring.
///
/// A `RingBuffer` is a construction handle. [`split`](Self::split) it into a
/// [`Producer`] and a [`Consumer`] to move data between exactly one writer
/// thread and exactly one reader thread; the mapping is released when the
/// last of the two handles drops.
///
/// ```ignore
/// let ring = audio_ring_mirror::ring_buffer::<f32>(2048)?;
/// let (mut producer, mut consumer) = ring.split();
///
/// producer.write(&block);        // realtime callback
/// consumer.read(&mut out);       // UI or worker thread
/// ```
pub struct RingBuffer<T: RingElement> {
    shared: Arc<RingShared<T>>,
}

impl<T: RingElement> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}

impl<T: RingElement> RingBuffer<T> {
    /// Build a ring over an already-mirrored region.
    ///
    /// The element capacity becomes `region.len_bytes() / size_of::<T>()`.
    /// Fails if the region is empty or its length does not divide evenly
    /// into elements; the region is released in that case.
    pub fn with_region(region: Box<dyn MirrorRegion>) -> Result<Self, RingError> {
        let shared = RingShared::new(region)?;
        log::debug!(
            "mirrored ring ready: {} elements of {} bytes",
            shared.capacity,
            std::mem::size_of::<T>()
        );
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Split into the single-producer and single-consumer handles.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let producer = Producer {
            shared: Arc::clone(&self.shared),
        };
        let consumer = Consumer {
            shared: self.shared,
        };
        (producer, consumer)
    }

    /// Immutable element capacity.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Elements currently readable.
    pub fn used(&self) -> usize {
        self.shared.used()
    }

    /// Elements currently writable without overwriting unread data.
    pub fn free(&self) -> usize {
        self.shared.free()
    }

    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }

    /// Register a data-available listener before splitting.
    pub fn subscribe(&self, listener: DataListener) -> SubscriptionId {
        self.shared.subscribe(listener)
    }

    /// Remove a listener. Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.unsubscribe(id)
    }
}
