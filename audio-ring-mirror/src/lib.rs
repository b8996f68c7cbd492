//! # audio-ring-mirror
//!
//! Platform backends for the mirrored ring buffer: page-size-aware sizing
//! and the double-mapping of one anonymous backing object into two adjacent
//! virtual address ranges, so that ring reads and writes never branch on the
//! wrap boundary.
//!
//! Provides:
//! - `MirrorMapping` — one mirrored region per OS family (POSIX `mmap`,
//!   Windows placeholder mapping), behind the `MirrorRegion` trait
//! - `ring_buffer` / `ring` — convenience constructors that allocate a
//!   mapping and wire it into `audio_ring_core`
//!
//! ## Platform Requirements
//! - Linux/Android: `memfd_create` (kernel 3.17+)
//! - Other Unixes (macOS, BSDs): POSIX `shm_open`
//! - Windows: `VirtualAlloc2` / `MapViewOfFile3` (Windows 10 1803+); no
//!   legacy fallback
//!
//! ## Usage
//! ```ignore
//! let (mut producer, mut consumer) = audio_ring_mirror::ring::<f32>(48_000)?;
//!
//! // realtime callback thread
//! producer.write(&block);
//!
//! // consumer thread
//! let mut out = vec![0.0f32; 512];
//! let got = consumer.read(&mut out);
//! ```

mod pages;

#[cfg(unix)]
pub mod posix;
#[cfg(windows)]
pub mod win32;

#[cfg(unix)]
pub use posix::MirrorMapping;
#[cfg(windows)]
pub use win32::MirrorMapping;

pub use audio_ring_core::{Consumer, Producer, RingBuffer, RingElement, RingError};

/// Allocate a mirrored ring buffer holding at least `min_elements`.
///
/// The capacity is rounded up so the backing storage is a whole number of
/// OS pages; it is never smaller than requested.
pub fn ring_buffer<T: RingElement>(min_elements: usize) -> Result<RingBuffer<T>, RingError> {
    if min_elements == 0 {
        return Err(RingError::InvalidCapacity("at least one element is required".into()));
    }
    let min_bytes = min_elements
        .checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| {
            RingError::InvalidCapacity(format!("{} elements overflow the address space", min_elements))
        })?;
    let mapping = MirrorMapping::allocate(min_bytes)?;
    RingBuffer::with_region(Box::new(mapping))
}

/// Allocate a mirrored ring and split it straight into its producer and
/// consumer handles.
pub fn ring<T: RingElement>(min_elements: usize) -> Result<(Producer<T>, Consumer<T>), RingError> {
    Ok(ring_buffer(min_elements)?.split())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// Element capacity of a single page, the rounding unit for every ring.
    fn page_elements<T: RingElement>() -> usize {
        ring_buffer::<T>(1).unwrap().capacity()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            ring_buffer::<f32>(0),
            Err(RingError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn resolved_capacity_is_smallest_page_multiple_covering_request() {
        let page = page_elements::<f32>();
        for request in [1, page, page + 1, 2000, 3 * page - 1] {
            let capacity = ring_buffer::<f32>(request).unwrap().capacity();
            assert_eq!(capacity, request.div_ceil(page) * page);
            assert!(capacity >= request);
        }
    }

    #[test]
    fn used_plus_free_is_capacity_after_every_operation() {
        let (mut producer, mut consumer) = ring::<u8>(1).unwrap();
        let capacity = producer.capacity();
        let check = |used: usize, free: usize| {
            assert_eq!(used + free, capacity);
        };

        check(producer.used(), producer.free());
        producer.write(&[1, 2, 3]);
        check(producer.used(), producer.free());
        let mut out = [0u8; 2];
        consumer.read(&mut out);
        check(consumer.used(), consumer.free());
        consumer.peek(1).unwrap();
        check(consumer.used(), consumer.free());
        producer.poke(5).unwrap();
        check(producer.used(), producer.free());
        // Lapping write: one full capacity on top of pending data.
        producer.write(&vec![9u8; capacity]);
        check(producer.used(), producer.free());
    }

    #[test]
    fn observers_are_idempotent() {
        let (mut producer, consumer) = ring::<i32>(1).unwrap();
        producer.write(&[1, 2, 3, 4]);

        for _ in 0..3 {
            assert_eq!(producer.used(), 4);
            assert_eq!(consumer.used(), 4);
            assert_eq!(producer.free(), producer.capacity() - 4);
            assert_eq!(consumer.free(), consumer.capacity() - 4);
            assert_eq!(producer.capacity(), consumer.capacity());
        }
    }

    #[test]
    fn round_trip_preserves_content_for_every_length() {
        let (mut producer, mut consumer) = ring::<u32>(1).unwrap();
        let capacity = producer.capacity();

        // Positions march around the ring as N grows, so every length gets
        // exercised at some offset, including spans across the seam.
        let mut next = 0u32;
        for n in 1..=capacity {
            let block: Vec<u32> = (0..n as u32).map(|i| next.wrapping_add(i)).collect();
            next = next.wrapping_add(n as u32);

            assert_eq!(producer.write(&block), n);
            assert_eq!(consumer.used(), n);

            let mut out = vec![0u32; n];
            assert_eq!(consumer.read(&mut out), n);
            assert_eq!(out, block);
            assert!(consumer.is_empty());
        }
    }

    #[test]
    fn wrap_seam_round_trip_with_seeded_positions() {
        let (mut producer, mut consumer) = ring::<u64>(1).unwrap();
        let capacity = producer.capacity();

        // Park both cursors one element short of the seam.
        let junk = vec![0u64; capacity - 1];
        assert_eq!(producer.write(&junk), capacity - 1);
        let mut sink = vec![0u64; capacity - 1];
        assert_eq!(consumer.read(&mut sink), capacity - 1);
        assert!(consumer.is_empty());

        // This span crosses the nominal end of the backing storage.
        let block = [11u64, 22, 33, 44, 55, 66, 77, 88];
        assert_eq!(producer.write(&block), block.len());
        let mut out = [0u64; 8];
        assert_eq!(consumer.read(&mut out), block.len());
        assert_eq!(out, block);
    }

    #[test]
    fn exact_fill_saturates_then_lapping_write_drops_oldest() {
        let (mut producer, mut consumer) = ring::<f32>(1).unwrap();
        let capacity = producer.capacity();

        let fill: Vec<f32> = (0..capacity).map(|i| i as f32).collect();
        assert_eq!(producer.write(&fill), capacity);
        assert_eq!(producer.used(), capacity);
        assert_eq!(producer.free(), 0);

        // One more element still gets written; the oldest one is lost.
        assert_eq!(producer.write(&[-1.0]), 1);
        assert_eq!(producer.used(), capacity);
        assert_eq!(producer.free(), 0);

        let mut out = vec![0.0f32; capacity];
        assert_eq!(consumer.read(&mut out), capacity);
        assert_eq!(out[..capacity - 1], fill[1..]);
        assert_eq!(out[capacity - 1], -1.0);
        assert!(consumer.is_empty());
    }

    #[test]
    fn partial_lapping_keeps_fifo_order_of_survivors() {
        let (mut producer, mut consumer) = ring::<u32>(1).unwrap();
        let capacity = producer.capacity();

        let old: Vec<u32> = (0..capacity as u32).collect();
        assert_eq!(producer.write(&old), capacity);

        // Overwrites the three oldest elements.
        assert_eq!(producer.write(&[900, 901, 902]), 3);
        assert_eq!(producer.used(), capacity);

        let mut out = vec![0u32; capacity];
        assert_eq!(consumer.read(&mut out), capacity);
        assert_eq!(out[..capacity - 3], old[3..]);
        assert_eq!(out[capacity - 3..], [900, 901, 902]);
    }

    #[test]
    fn oversized_write_is_clamped_to_capacity() {
        let (mut producer, mut consumer) = ring::<u8>(1).unwrap();
        let capacity = producer.capacity();

        let big: Vec<u8> = (0..capacity + 100).map(|i| (i % 251) as u8).collect();
        assert_eq!(producer.write(&big), capacity);
        assert_eq!(producer.used(), capacity);

        let mut out = vec![0u8; capacity];
        assert_eq!(consumer.read(&mut out), capacity);
        // The clamped write copied the first `capacity` elements.
        assert_eq!(out, big[..capacity]);
    }

    #[test]
    fn zero_length_operations_are_noops() {
        let (mut producer, mut consumer) = ring::<i16>(1).unwrap();
        producer.write(&[5, 6]);

        assert_eq!(producer.write(&[]), 0);
        assert_eq!(consumer.read(&mut []), 0);
        assert_eq!(consumer.used(), 2);

        let mut out = [0i16; 2];
        assert_eq!(consumer.read(&mut out), 2);
        assert_eq!(out, [5, 6]);
    }

    #[test]
    fn peek_is_read_without_the_copy() {
        let (mut producer, mut consumer) = ring::<u32>(1).unwrap();
        producer.write(&[10, 20, 30, 40, 50]);

        let mut sink = [0u32; 3];
        assert_eq!(consumer.read(&mut sink), 3);
        assert_eq!(consumer.used(), 2);

        // Asking for more than is buffered changes nothing.
        assert!(consumer.peek(3).is_none());
        assert_eq!(consumer.used(), 2);

        let view = consumer.peek(2).unwrap();
        assert_eq!(view, [40, 50]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn peek_commits_the_read_position() {
        let (mut producer, mut consumer) = ring::<u8>(1).unwrap();
        producer.write(&[1, 2, 3, 4]);

        assert_eq!(consumer.peek(2).unwrap(), [1, 2]);
        // The peeked span is consumed; the next read continues after it.
        let mut out = [0u8; 2];
        assert_eq!(consumer.read(&mut out), 2);
        assert_eq!(out, [3, 4]);
    }

    #[test]
    fn poke_leases_writable_storage() {
        let (mut producer, mut consumer) = ring::<i16>(1).unwrap();

        let lease = producer.poke(4).unwrap();
        lease.copy_from_slice(&[7, 8, 9, 10]);
        assert_eq!(producer.used(), 4);

        let mut out = [0i16; 4];
        assert_eq!(consumer.read(&mut out), 4);
        assert_eq!(out, [7, 8, 9, 10]);
    }

    #[test]
    fn poke_beyond_capacity_is_refused_without_effect() {
        let (mut producer, consumer) = ring::<i16>(1).unwrap();
        let capacity = producer.capacity();

        assert!(producer.poke(capacity + 1).is_none());
        assert!(consumer.is_empty());
        assert_eq!(producer.free(), capacity);
    }

    #[test]
    fn poke_applies_the_lapping_rule() {
        let (mut producer, mut consumer) = ring::<u32>(1).unwrap();
        let capacity = producer.capacity();

        let old: Vec<u32> = (0..capacity as u32).collect();
        assert_eq!(producer.write(&old), capacity);

        let lease = producer.poke(2).unwrap();
        lease.copy_from_slice(&[7000, 7001]);
        assert_eq!(producer.used(), capacity);

        let mut out = vec![0u32; capacity];
        assert_eq!(consumer.read(&mut out), capacity);
        assert_eq!(out[..capacity - 2], old[2..]);
        assert_eq!(out[capacity - 2..], [7000, 7001]);
    }

    #[test]
    fn listeners_fire_per_data_carrying_write() {
        let (mut producer, consumer) = ring::<f32>(1).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = Arc::clone(&seen);
        let id = consumer.subscribe(Box::new(move |used| {
            seen_clone.store(used, Ordering::SeqCst);
        }));

        producer.write(&[0.1, 0.2]);
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        producer.write(&[0.3]);
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        // Empty writes and pokes carry no data and stay silent.
        seen.store(999, Ordering::SeqCst);
        producer.write(&[]);
        producer.poke(1).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 999);

        assert!(consumer.unsubscribe(id));
        producer.write(&[0.4]);
        assert_eq!(seen.load(Ordering::SeqCst), 999);
    }

    #[test]
    fn threaded_spsc_stream_arrives_in_order() {
        let (mut producer, mut consumer) = ring::<u32>(1).unwrap();
        const TOTAL: u32 = 200_000;

        let writer = thread::spawn(move || {
            let mut next = 0u32;
            let mut block = Vec::with_capacity(257);
            while next < TOTAL {
                let room = producer.free().min(257) as u32;
                let n = room.min(TOTAL - next);
                if n == 0 {
                    thread::yield_now();
                    continue;
                }
                block.clear();
                block.extend(next..next + n);
                assert_eq!(producer.write(&block), n as usize);
                next += n;
            }
        });

        let mut expected = 0u32;
        let mut out = vec![0u32; 331];
        while expected < TOTAL {
            let n = consumer.read(&mut out);
            if n == 0 {
                thread::yield_now();
                continue;
            }
            for &value in &out[..n] {
                assert_eq!(value, expected);
                expected += 1;
            }
        }
        writer.join().unwrap();
        assert!(consumer.is_empty());
    }
}
