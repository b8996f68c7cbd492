//! Windows mirrored mapping.
//!
//! Sequence: create a pagefile-backed section, reserve a placeholder of
//! twice the resolved length (`VirtualAlloc2` with
//! `MEM_RESERVE_PLACEHOLDER`), split it in half (`VirtualFree` with
//! `MEM_PRESERVE_PLACEHOLDER`), then map the section over both halves with
//! `MapViewOfFile3(MEM_REPLACE_PLACEHOLDER)`. Each step gets a bounded
//! retry budget; any terminal failure tears down whatever was acquired and
//! surfaces as a single construction error.
//!
//! Requires the placeholder APIs (Windows 10 1803+). There is no legacy
//! fallback: platforms without atomic placeholder splitting fail
//! construction instead of degrading.

use std::ffi::c_void;
use std::ptr::NonNull;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile3, UnmapViewOfFile, VirtualAlloc2, VirtualFree,
    MEMORY_MAPPED_VIEW_ADDRESS, MEM_PRESERVE_PLACEHOLDER, MEM_RELEASE, MEM_REPLACE_PLACEHOLDER,
    MEM_RESERVE, MEM_RESERVE_PLACEHOLDER, PAGE_NOACCESS, PAGE_READWRITE,
};
use windows::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

use audio_ring_core::{MirrorRegion, RingError};

use crate::pages::page_aligned_len;

/// Retry budget per mapping step, tolerating transient contention.
const MAX_ATTEMPTS: usize = 255;

/// A region mapped twice, back-to-back, over one pagefile-backed section.
///
/// Dropping unmaps the right view, then the left view, then closes the
/// section handle (reverse-acquisition order).
pub struct MirrorMapping {
    base: NonNull<u8>,
    len: usize,
    left: MEMORY_MAPPED_VIEW_ADDRESS,
    right: MEMORY_MAPPED_VIEW_ADDRESS,
    section: HANDLE,
}

// SAFETY: the views and the section handle are process-wide resources
// exclusively owned by this value; nothing here is tied to a thread.
unsafe impl Send for MirrorMapping {}
unsafe impl Sync for MirrorMapping {}

impl MirrorMapping {
    /// Map at least `min_bytes` of mirrored storage.
    ///
    /// The resolved length is `min_bytes` rounded up to whole allocation
    /// units (page size or allocation granularity, whichever is coarser);
    /// the section is zero-filled by the OS.
    pub fn allocate(min_bytes: usize) -> Result<Self, RingError> {
        if min_bytes == 0 {
            return Err(RingError::InvalidCapacity("zero bytes requested".into()));
        }
        let len = page_aligned_len(min_bytes, allocation_granularity())
            .ok_or_else(|| RingError::InvalidCapacity(format!("{} bytes overflow when page-aligned", min_bytes)))?;
        let total = len
            .checked_mul(2)
            .ok_or_else(|| RingError::InvalidCapacity(format!("{} bytes cannot be doubled for mirroring", len)))?;

        // Pagefile-backed section for the buffer.
        let Some(section) = retry(|| unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                None,
                PAGE_READWRITE,
                ((len as u64) >> 32) as u32,
                len as u32,
                PCWSTR::null(),
            )
            .ok()
        }) else {
            return Err(fail("backing section"));
        };

        // Reserve a doubled placeholder with no access rights, purely to
        // guarantee room for two adjacent placements.
        let Some(placeholder) = retry(|| unsafe {
            let ptr = VirtualAlloc2(
                None,
                None,
                total,
                MEM_RESERVE | MEM_RESERVE_PLACEHOLDER,
                PAGE_NOACCESS.0,
                None,
            );
            NonNull::new(ptr.cast::<u8>())
        }) else {
            unsafe {
                let _ = CloseHandle(section);
            }
            return Err(fail("placeholder reservation"));
        };
        let base = placeholder.as_ptr();

        // Split the placeholder in half; both halves stay reserved.
        if retry(|| unsafe {
            VirtualFree(base.cast::<c_void>(), len, MEM_RELEASE | MEM_PRESERVE_PLACEHOLDER).ok()
        })
        .is_none()
        {
            unsafe {
                let _ = VirtualFree(base.cast::<c_void>(), 0, MEM_RELEASE);
                let _ = CloseHandle(section);
            }
            return Err(fail("placeholder split"));
        }

        // Map the section into the left half.
        let Some(left) = retry(|| unsafe { map_view(section, base.cast::<c_void>(), len) }) else {
            unsafe {
                let _ = VirtualFree(base.cast::<c_void>(), 0, MEM_RELEASE);
                let _ = VirtualFree(base.add(len).cast::<c_void>(), 0, MEM_RELEASE);
                let _ = CloseHandle(section);
            }
            return Err(fail("left view"));
        };

        // And into the right half, directly behind it.
        let Some(right) = retry(|| unsafe { map_view(section, base.add(len).cast::<c_void>(), len) })
        else {
            unsafe {
                let _ = UnmapViewOfFile(left);
                let _ = VirtualFree(base.add(len).cast::<c_void>(), 0, MEM_RELEASE);
                let _ = CloseHandle(section);
            }
            return Err(fail("right view"));
        };

        log::debug!("mirrored mapping ready: {} bytes doubled at {:p}", len, base);
        Ok(Self {
            base: placeholder,
            len,
            left,
            right,
            section,
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
        // Reverse acquisition order: views, then the backing section.
        // SAFETY: the three objects were acquired in `allocate` and are
        // released exactly once, here.
        unsafe {
            let _ = UnmapViewOfFile(self.right);
            let _ = UnmapViewOfFile(self.left);
            let _ = CloseHandle(self.section);
        }
    }
}

/// Map `len` bytes of `section` over the placeholder at `at`.
///
/// Returns `None` on failure so the caller's retry loop can run.
unsafe fn map_view(
    section: HANDLE,
    at: *const c_void,
    len: usize,
) -> Option<MEMORY_MAPPED_VIEW_ADDRESS> {
    let view = MapViewOfFile3(
        section,
        None,
        Some(at),
        0,
        len,
        MEM_REPLACE_PLACEHOLDER,
        PAGE_READWRITE.0,
        None,
    );
    if view.Value.is_null() {
        None
    } else {
        Some(view)
    }
}

/// Page size or allocation granularity, whichever is coarser; placements
/// must respect the coarser of the two.
fn allocation_granularity() -> usize {
    let mut info = SYSTEM_INFO::default();
    unsafe { GetSystemInfo(&mut info) };
    info.dwPageSize.max(info.dwAllocationGranularity) as usize
}

fn retry<T>(mut step: impl FnMut() -> Option<T>) -> Option<T> {
    for _ in 0..MAX_ATTEMPTS {
        if let Some(value) = step() {
            return Some(value);
        }
    }
    None
}

fn fail(step: &str) -> RingError {
    let err = windows::core::Error::from_win32();
    log::error!("mirrored allocation: {} failed: {}", step, err);
    RingError::Allocation(format!("{}: {}", step, err))
}
