use std::ptr::NonNull;

/// A mirrored memory region: the storage provider seam between the
/// platform-agnostic ring logic and the per-OS mapping backends.
///
/// A region of `len_bytes()` bytes is mapped **twice**, back-to-back, in
/// virtual address space. Any access starting at `base() + o` for
/// `o < len_bytes()` and spanning at most `len_bytes()` bytes is therefore
/// one contiguous range, even when it crosses the nominal end of the first
/// mapping. The ring never branches on the wrap boundary because of this.
///
/// The implementing object is the opaque lifetime handle for the OS objects
/// behind the mapping (backing store plus views); dropping it releases them
/// all, views before backing store.
///
/// # Safety
///
/// Implementers must guarantee, for the whole lifetime of the object:
///
/// - `base()` is valid for reads and writes of `2 * len_bytes()` bytes.
/// - The upper half aliases the lower half: a write at `base() + o` is
///   visible at `base() + len_bytes() + o` and vice versa.
/// - `len_bytes()` is non-zero and a whole multiple of the OS page size.
/// - The memory is zero-filled when the region is created.
/// - No other party writes to the region while the ring owns it.
pub unsafe trait MirrorRegion: Send + Sync {
    /// Start of the first of the two mirrored mappings.
    fn base(&self) -> NonNull<u8>;

    /// Byte length of one half of the double mapping.
    fn len_bytes(&self) -> usize;
}
