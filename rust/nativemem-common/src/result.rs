pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

/// Verifies that `[offset, offset + size)` lies within a region of `limit` bytes
/// (or elements), reporting an overflowing sum as out of range.
#[inline]
pub fn verify_range(name: &str, offset: usize, size: usize, limit: usize) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= limit => Ok(()),
        _ => offset_out_of_range(name, offset, size, limit),
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn offset_out_of_range(name: &str, offset: usize, size: usize, limit: usize) -> Result<()> {
    Err(crate::error::Error::offset_out_of_range(
        name, offset, size, limit,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn check_alignment(alignment: usize) -> Result<()> {
        verify_arg!(alignment, alignment.is_power_of_two());
        Ok(())
    }

    #[test]
    fn test_verify_arg_macro() {
        assert!(check_alignment(16).is_ok());
        let err = check_alignment(12).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "alignment");
                assert_eq!(message, "alignment.is_power_of_two()");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_verify_range() {
        assert!(verify_range("offset", 0, 40, 40).is_ok());
        assert!(verify_range("offset", 36, 4, 40).is_ok());
        assert!(verify_range("offset", 37, 4, 40).is_err());
        assert!(verify_range("offset", usize::MAX, 2, 40).is_err());
        assert!(verify_range("offset", 40, 0, 40).is_ok());
    }
}
