use std::mem::size_of;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::models::error::RingError;
use crate::ring::notify::{DataListener, ListenerRegistry, SubscriptionId};
use crate::traits::element::RingElement;
use crate::traits::mirror_region::MirrorRegion;

/// State shared by both sides of a split ring.
///
/// Ownership discipline: `write_pos` is written only by the producer;
/// `read_pos` only by the consumer, except for the producer's forced advance
/// when a write laps unread data. `used` is the readable element count,
/// updated by both sides; it is what disambiguates "empty" from "full" when
/// the two positions coincide.
pub(crate) struct RingShared<T: RingElement> {
    /// Base of the first mirrored mapping, viewed as elements.
    data: NonNull<T>,
    /// Immutable element capacity (one mapping's worth).
    pub(crate) capacity: usize,
    /// Next slot the producer fills. Always in `[0, capacity)`.
    pub(crate) write_pos: AtomicUsize,
    /// Next slot the consumer drains. Always in `[0, capacity)`.
    pub(crate) read_pos: AtomicUsize,
    /// Readable elements, `0..=capacity`. Published with release ordering
    /// after the data copy so a consumer never observes a count covering
    /// bytes that are not yet visible.
    pub(crate) used: AtomicUsize,
    listeners: Mutex<ListenerRegistry>,
    /// Opaque lifetime handle for the OS mapping objects. Held only so the
    /// storage outlives every handle; released once, when the last
    /// producer/consumer drops.
    _region: Box<dyn MirrorRegion>,
}

// SAFETY: the raw base pointer targets the mirrored mapping, which the
// region contract keeps valid and exclusively ours for the lifetime of
// `RingShared`. Elements are plain data (`RingElement`), positions and the
// count are atomics, and the listener registry is behind a mutex.
unsafe impl<T: RingElement> Send for RingShared<T> {}
unsafe impl<T: RingElement> Sync for RingShared<T> {}

impl<T: RingElement> RingShared<T> {
    pub(crate) fn new(region: Box<dyn MirrorRegion>) -> Result<Self, RingError> {
        if size_of::<T>() == 0 {
            return Err(RingError::Region("element type has zero size".into()));
        }
        let bytes = region.len_bytes();
        if bytes == 0 {
            return Err(RingError::Region("region has zero length".into()));
        }
        if bytes % size_of::<T>() != 0 {
            return Err(RingError::Region(format!(
                "region length {} is not a multiple of the {}-byte element size",
                bytes,
                size_of::<T>()
            )));
        }

        Ok(Self {
            data: region.base().cast::<T>(),
            capacity: bytes / size_of::<T>(),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            used: AtomicUsize::new(0),
            listeners: Mutex::new(ListenerRegistry::new()),
            _region: region,
        })
    }

    /// Pointer to the element slot at `pos`.
    ///
    /// Thanks to the mirror, the returned pointer is valid for up to
    /// `capacity` contiguous elements for any `pos < capacity`.
    pub(crate) fn slot(&self, pos: usize) -> *mut T {
        debug_assert!(pos < self.capacity);
        // SAFETY: pos < capacity and the region spans 2 * capacity elements.
        unsafe { self.data.as_ptr().add(pos) }
    }

    pub(crate) fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub(crate) fn free(&self) -> usize {
        self.capacity - self.used()
    }

    pub(crate) fn subscribe(&self, listener: DataListener) -> SubscriptionId {
        self.listeners.lock().subscribe(listener)
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.lock().unsubscribe(id)
    }

    /// Deliver data-available notifications, without ever blocking.
    ///
    /// `try_lock` keeps the producer hot path realtime-safe: while another
    /// thread mutates the subscription set, this round of delivery is
    /// skipped rather than waited for.
    pub(crate) fn notify_data_available(&self) {
        if let Some(mut registry) = self.listeners.try_lock() {
            if registry.is_empty() {
                return;
            }
            let used = self.used();
            registry.notify(used);
        }
    }
}
