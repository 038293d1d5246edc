/// Checks whether the pointer satisfies `address & (alignment - 1) == 0`.
#[inline]
pub fn is_aligned<T>(ptr: *const T, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    (ptr as usize) & (alignment - 1) == 0
}

/// Returns the largest byte count not exceeding `size` that is a whole number of
/// `U` elements, i.e. the size a region must be trimmed to before it can be cast to `U`.
///
/// # Examples
///
/// ```
/// use nativemem::align::whole_elements_size;
///
/// assert_eq!(whole_elements_size::<u32>(10), 8);
/// assert_eq!(whole_elements_size::<u64>(6), 0);
/// ```
#[inline]
pub fn whole_elements_size<U>(size: usize) -> usize {
    let type_size = std::mem::size_of::<U>();
    if type_size == 0 {
        return 0;
    }
    size - size % type_size
}
