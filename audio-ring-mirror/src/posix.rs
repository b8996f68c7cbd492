//! POSIX mirrored mapping.
//!
//! Sequence: create an anonymous, page-file-like backing object
//! (`memfd_create` on Linux/Android, `shm_open` + immediate unlink
//! elsewhere), reserve a `PROT_NONE` address range of twice the resolved
//! length, then map the same backing object over both halves with
//! `MAP_FIXED | MAP_SHARED`. Writes through either half are visible through
//! the other. Each step gets a bounded retry budget; any terminal failure
//! tears down whatever was acquired and surfaces as a single construction
//! error.

use std::ffi::c_void;
use std::os::fd::OwnedFd;
use std::ptr::{null_mut, NonNull};

use rustix::fs::ftruncate;
use rustix::mm::{mmap, mmap_anonymous, munmap, MapFlags, ProtFlags};
use rustix::param::page_size;

use audio_ring_core::{MirrorRegion, RingError};

use crate::pages::page_aligned_len;

/// Retry budget per mapping step, tolerating transient contention.
const MAX_ATTEMPTS: usize = 255;

/// A region mapped twice, back-to-back, over one anonymous backing object.
///
/// Dropping unmaps both views, then closes the backing descriptor
/// (reverse-acquisition order).
pub struct MirrorMapping {
    base: NonNull<u8>,
    len: usize,
    _backing: OwnedFd,
}

// SAFETY: the mapping is exclusively owned, valid until drop, and carries no
// thread affinity; the descriptor is Send + Sync already.
unsafe impl Send for MirrorMapping {}
unsafe impl Sync for MirrorMapping {}

impl MirrorMapping {
    /// Map at least `min_bytes` of mirrored storage.
    ///
    /// The resolved length is `min_bytes` rounded up to whole pages; the
    /// kernel zero-fills the backing object.
    pub fn allocate(min_bytes: usize) -> Result<Self, RingError> {
        if min_bytes == 0 {
            return Err(RingError::InvalidCapacity("zero bytes requested".into()));
        }
        let len = page_aligned_len(min_bytes, page_size())
            .ok_or_else(|| RingError::InvalidCapacity(format!("{} bytes overflow when page-aligned", min_bytes)))?;
        let total = len
            .checked_mul(2)
            .ok_or_else(|| RingError::InvalidCapacity(format!("{} bytes cannot be doubled for mirroring", len)))?;

        let backing = retry(|| create_backing(len)).map_err(|e| fail("backing store", e))?;

        // Reserve a free range big enough for both placements, with no
        // access rights; the placements below replace it in place.
        let reservation = retry(|| unsafe {
            mmap_anonymous(null_mut(), total, ProtFlags::empty(), MapFlags::PRIVATE)
        })
        .map_err(|e| fail("address reservation", e))?;
        let mut reservation = Reservation {
            base: reservation.cast::<u8>(),
            total,
            armed: true,
        };

        // Left half: the backing object from offset zero.
        retry(|| unsafe {
            mmap(
                reservation.base.cast::<c_void>(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED | MapFlags::FIXED,
                &backing,
                0,
            )
        })
        .map_err(|e| fail("left view", e))?;

        // Right half: the same backing object again, directly behind it.
        retry(|| unsafe {
            mmap(
                reservation.base.add(len).cast::<c_void>(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED | MapFlags::FIXED,
                &backing,
                0,
            )
        })
        .map_err(|e| fail("right view", e))?;

        let base = NonNull::new(reservation.base)
            .ok_or_else(|| RingError::Allocation("mapping landed at the null page".into()))?;
        reservation.armed = false;

        log::debug!("mirrored mapping ready: {} bytes doubled at {:p}", len, base.as_ptr());
        Ok(Self {
            base,
            len,
            _backing: backing,
        })
    }
}

unsafe impl MirrorRegion for MirrorMapping {
    fn base(&self) -> NonNull<u8> {
        self.base
    }

    fn len_bytes(&self) -> usize {
        self.len
    }
}

impl Drop for MirrorMapping {
    fn drop(&mut self) {
        // One munmap covers both adjacent views; the descriptor closes
        // afterwards when the field drops.
        // SAFETY: base..base + 2 * len is exactly the range mapped in
        // `allocate` and nothing else unmapped it.
        unsafe {
            let _ = munmap(self.base.as_ptr().cast::<c_void>(), self.len * 2);
        }
    }
}

/// Unmaps a not-yet-adopted reservation when construction bails out.
struct Reservation {
    base: *mut u8,
    total: usize,
    armed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            // SAFETY: covers the anonymous reservation (or the views that
            // replaced parts of it) made during the failed construction.
            unsafe {
                let _ = munmap(self.base.cast::<c_void>(), self.total);
            }
        }
    }
}

fn retry<T>(mut step: impl FnMut() -> rustix::io::Result<T>) -> rustix::io::Result<T> {
    let mut attempts = 1;
    loop {
        match step() {
            Ok(value) => return Ok(value),
            Err(_) if attempts < MAX_ATTEMPTS => attempts += 1,
            Err(err) => return Err(err),
        }
    }
}

fn fail(step: &str, err: rustix::io::Errno) -> RingError {
    log::error!("mirrored allocation: {} failed: {}", step, err);
    RingError::Allocation(format!("{}: {}", step, err))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn create_backing(len: usize) -> rustix::io::Result<OwnedFd> {
    use rustix::fs::{memfd_create, MemfdFlags};

    let fd = memfd_create("audio-ring-mirror", MemfdFlags::CLOEXEC)?;
    ftruncate(&fd, len as u64)?;
    Ok(fd)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn create_backing(len: usize) -> rustix::io::Result<OwnedFd> {
    use std::sync::atomic::{AtomicU64, Ordering};

    use rustix::fs::Mode;
    use rustix::shm;

    static NEXT_NAME: AtomicU64 = AtomicU64::new(0);

    let name = format!(
        "/audio-ring-{}-{}",
        std::process::id(),
        NEXT_NAME.fetch_add(1, Ordering::Relaxed)
    );
    let fd = shm::open(
        &name,
        shm::OFlags::CREATE | shm::OFlags::EXCL | shm::OFlags::RDWR,
        Mode::RUSR | Mode::WUSR,
    )?;
    // The name exists only long enough to get a descriptor; the mappings
    // keep the object alive.
    let _ = shm::unlink(&name);
    ftruncate(&fd, len as u64)?;
    Ok(fd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_page_aligned_and_covers_request() {
        let mapping = MirrorMapping::allocate(1).unwrap();
        assert!(mapping.len_bytes() >= 1);
        assert_eq!(mapping.len_bytes() % page_size(), 0);

        let mapping = MirrorMapping::allocate(page_size() + 1).unwrap();
        assert_eq!(mapping.len_bytes(), page_size() * 2);
    }

    #[test]
    fn zero_request_is_rejected() {
        assert!(matches!(
            MirrorMapping::allocate(0),
            Err(RingError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn fresh_mapping_is_zero_filled() {
        let mapping = MirrorMapping::allocate(64).unwrap();
        let base = mapping.base().as_ptr();
        for offset in [0, 1, 7, mapping.len_bytes() - 1] {
            // SAFETY: offsets are inside the first view.
            assert_eq!(unsafe { base.add(offset).read() }, 0);
        }
    }

    #[test]
    fn halves_alias_each_other() {
        let mapping = MirrorMapping::allocate(32).unwrap();
        let len = mapping.len_bytes();
        let base = mapping.base().as_ptr();

        // SAFETY: both halves are mapped read/write and alias the same
        // backing object.
        unsafe {
            base.write(0xAB);
            assert_eq!(base.add(len).read(), 0xAB);

            base.add(len + 7).write(0x5A);
            assert_eq!(base.add(7).read(), 0x5A);

            base.add(len - 1).write(0xC3);
            assert_eq!(base.add(len + len - 1).read(), 0xC3);
        }
    }

    #[test]
    fn repeated_allocate_and_drop_is_stable() {
        for _ in 0..64 {
            let mapping = MirrorMapping::allocate(4 * page_size()).unwrap();
            assert_eq!(mapping.len_bytes(), 4 * page_size());
        }
    }
}
