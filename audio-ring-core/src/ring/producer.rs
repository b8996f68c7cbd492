use std::ptr;
use std::slice;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::ring::shared::RingShared;
use crate::traits::element::RingElement;

/// Write-side handle of a split ring.
///
/// Exactly one thread may own the producer at a time (it is `Send` but not
/// `Clone`), which is what makes the lock-free accounting sound. Every call
/// is bounded and non-blocking: no allocation, no syscalls, no locks, so it
/// is safe inside a hard-realtime audio callback.
pub struct Producer<T: RingElement> {
    pub(crate) shared: Arc<RingShared<T>>,
}

impl<T: RingElement> Producer<T> {
    /// Copy elements into the ring.
    ///
    /// Writes `min(src.len(), capacity)` elements in one contiguous copy —
    /// the mirrored mapping makes the destination contiguous even when it
    /// crosses the wrap seam. If the write overruns unread data, the oldest
    /// elements are overwritten: the consumer's cursor is advanced past them
    /// and `used()` saturates at `capacity` (lapping). Data-available
    /// listeners fire when at least one element was written.
    ///
    /// Returns the number of elements written; may be less than requested,
    /// never blocks.
    pub fn write(&mut self, src: &[T]) -> usize {
        let shared = &*self.shared;
        let count = src.len().min(shared.capacity);
        if count == 0 {
            return 0;
        }

        let write_pos = shared.write_pos.load(Ordering::Relaxed);
        let free = shared.free();

        // SAFETY: write_pos < capacity and count <= capacity, so the mirror
        // guarantees a contiguous in-bounds destination; the producer is the
        // only writer of this span.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), shared.slot(write_pos), count);
        }
        shared
            .write_pos
            .store((write_pos + count) % shared.capacity, Ordering::Release);
        self.commit(count, free);

        shared.notify_data_available();
        count
    }

    /// Zero-copy variant of [`write`](Self::write): lease a writable slice
    /// directly inside the ring.
    ///
    /// Returns `None` only when `len` exceeds the total capacity; no state
    /// changes in that case. Otherwise the write-side bookkeeping (position
    /// advance, lapping, saturation) is committed immediately, exactly as if
    /// `len` elements had been written — fill the slice before the consumer
    /// gets a chance to read it. The lease ends at the next call on this
    /// handle. No listeners fire; the lease carries no data yet.
    pub fn poke(&mut self, len: usize) -> Option<&mut [T]> {
        let shared = &*self.shared;
        if len > shared.capacity {
            return None;
        }

        let write_pos = shared.write_pos.load(Ordering::Relaxed);
        let free = shared.free();
        let start = shared.slot(write_pos);

        shared
            .write_pos
            .store((write_pos + len) % shared.capacity, Ordering::Release);
        self.commit(len, free);

        // SAFETY: start is valid for len <= capacity contiguous elements via
        // the mirror; the borrow of self pins the lease until the next
        // mutating call on this side.
        Some(unsafe { slice::from_raw_parts_mut(start, len) })
    }

    /// Publish a completed write of `count` elements, given the free space
    /// observed before it.
    fn commit(&self, count: usize, free: usize) {
        let shared = &*self.shared;
        if count > free {
            // Lapped: the unread region was partially overwritten. Advance
            // the consumer's cursor to the oldest surviving element and
            // saturate the count. The consumer does not participate in this
            // move; its view stays approximate until the overflow drains.
            let lost = count - free;
            let read_pos = shared.read_pos.load(Ordering::Relaxed);
            shared
                .read_pos
                .store((read_pos + lost) % shared.capacity, Ordering::Release);
            shared.used.store(shared.capacity, Ordering::Release);
        } else {
            shared.used.fetch_add(count, Ordering::Release);
        }
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
