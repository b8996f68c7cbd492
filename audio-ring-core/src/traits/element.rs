/// Sample types that can live inside a mirrored ring buffer.
///
/// The ring moves elements with raw byte copies and exposes freshly mapped
/// (zero-filled) pages as readable storage, so implementers must guarantee
/// **all** of the following:
///
/// - **Plain data**: no pointers, no `Drop` logic, no interior mutability.
/// - **Zero-init**: the all-zeros bit pattern is a valid value.
/// - **Any bytes**: every bit pattern of `size_of::<T>()` bytes is a valid
///   value (elements may be observed mid-overwrite under sustained
///   overflow).
///
/// Implemented for the usual fixed-size sample formats: `f32`/`f64` and the
/// signed/unsigned integers from 8 to 64 bits.
pub unsafe trait RingElement: Copy + Send + 'static {}

macro_rules! impl_ring_element {
    ($($t:ty),* $(,)?) => {
        $(
            unsafe impl RingElement for $t {}
        )*
    };
}

impl_ring_element! {
    f32, f64,
    i8, i16, i32, i64,
    u8, u16, u32, u64,
}
