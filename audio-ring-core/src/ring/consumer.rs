use std::ptr;
use std::slice;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::ring::notify::{DataListener, SubscriptionId};
use crate::ring::shared::RingShared;
use crate::traits::element::RingElement;

/// Read-side handle of a split ring.
///
/// Exactly one thread may own the consumer at a time (it is `Send` but not
/// `Clone`). Every call is bounded and non-blocking. Be aware that under
/// sustained overflow the producer force-advances this side's cursor, so
/// read results become approximate until the backlog drains.
pub struct Consumer<T: RingElement> {
    pub(crate) shared: Arc<RingShared<T>>,
}

impl<T: RingElement> Consumer<T> {
    /// Copy elements out of the ring.
    ///
    /// Reads `min(dst.len(), used())` elements in one contiguous copy and
    /// advances the read cursor past them. Returns the number of elements
    /// read — possibly zero, never blocks.
    pub fn read(&mut self, dst: &mut [T]) -> usize {
        let shared = &*self.shared;
        let count = dst.len().min(shared.used());
        if count == 0 {
            return 0;
        }

        let read_pos = shared.read_pos.load(Ordering::Relaxed);
        // SAFETY: read_pos < capacity and count <= capacity, so the mirror
        // guarantees a contiguous in-bounds source.
        unsafe {
            ptr::copy_nonoverlapping(shared.slot(read_pos), dst.as_mut_ptr(), count);
        }
        shared
            .read_pos
            .store((read_pos + count) % shared.capacity, Ordering::Release);
        shared.used.fetch_sub(count, Ordering::Release);
        count
    }

    /// Zero-copy variant of [`read`](Self::read): borrow the next `len`
    /// elements in place.
    ///
    /// Returns `None` when fewer than `len` elements are readable; no state
    /// changes in that case. Otherwise the read is committed immediately —
    /// cursor and count advance as if `read` had copied `len` elements — and
    /// the returned slice is the borrowed view of that already-consumed
    /// span. The lease ends at the next call on this handle. Treat the data
    /// as gone afterwards: the producer is free to overwrite a consumed
    /// span, so a lease held across producer activity may observe the
    /// overwrite.
    pub fn peek(&mut self, len: usize) -> Option<&[T]> {
        let shared = &*self.shared;
        if len > shared.used() {
            return None;
        }

        let read_pos = shared.read_pos.load(Ordering::Relaxed);
        let start = shared.slot(read_pos);

        shared
            .read_pos
            .store((read_pos + len) % shared.capacity, Ordering::Release);
        shared.used.fetch_sub(len, Ordering::Release);

        // SAFETY: start is valid for len <= capacity contiguous elements via
        // the mirror; the borrow of self pins the lease until the next
        // mutating call on this side.
        Some(unsafe { slice::from_raw_parts(start, len) })
    }

    /// Register a listener invoked after every write that makes data
    /// available. Runs on the producer's thread; delivery order across
    /// listeners is unspecified.
    pub fn subscribe(&self, listener: DataListener) -> SubscriptionId {
        self.shared.subscribe(listener)
    }

    /// Remove a listener. Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.unsubscribe(id)
    }

    /// Elements currently readable.
    pub fn used(&self) -> usize {
        self.shared.used()
    }

    /// Elements currently writable without overwriting unread data.
    pub fn free(&self) -> usize {
        self.shared.free()
    }

    /// Immutable element capacity of the ring.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }
}
