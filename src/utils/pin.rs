use core::pin::Pin;
use core::slice::SliceIndex;

/// Returns a pinned mutable reference to an element or subslice depending on
/// the type of index, or `None` if the index is out of bounds.
#[inline]
pub(crate) fn get_pin_mut<T, I>(slice: Pin<&mut [T]>, index: I) -> Option<Pin<&mut I::Output>>
where
    I: SliceIndex<[T]>,
{
    // SAFETY: `get_unchecked_mut` is never used to move the slice inside `self` (`SliceIndex`
    // is sealed and all `SliceIndex::get_mut` implementations never move elements).
    // `x` is guaranteed to be pinned because it comes from `self` which is pinned.
    unsafe {
        slice
            .get_unchecked_mut()
            .get_mut(index)
            .map(|x| Pin::new_unchecked(x))
    }
}

/// Pinned access to one source in a pinned `Vec`.
#[inline]
pub(crate) fn get_pin_mut_from_vec<T>(vec: Pin<&mut Vec<T>>, index: usize) -> Option<Pin<&mut T>> {
    // SAFETY: the vec is never resized while pinned, so its elements never
    // move. We only narrow the projection to its slice.
    let slice = unsafe { vec.map_unchecked_mut(|v| v.as_mut_slice()) };
    get_pin_mut(slice, index)
}

/// Pinned access to one source in a pinned array.
#[inline]
pub(crate) fn get_pin_mut_from_array<T, const N: usize>(
    array: Pin<&mut [T; N]>,
    index: usize,
) -> Option<Pin<&mut T>> {
    // SAFETY: unsizing an array to a slice does not move its elements.
    let slice = unsafe { array.map_unchecked_mut(|a| &mut a[..]) };
    get_pin_mut(slice, index)
}
