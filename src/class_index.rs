//! Signed class-index resolution.
//!
//! Callers name the class column with a signed index where `-1` means the
//! last column, `-2` the one before it, and any out-of-range value wraps
//! around the column count.

use crate::error::{DatasetError, Result};

/// Map `requested` onto a valid 0-based column index for a table with
/// `column_count` columns.
///
/// # Examples
///
/// ```
/// use dataview::resolve_class_index;
///
/// assert_eq!(resolve_class_index(-1, 5).unwrap(), 4);
/// assert_eq!(resolve_class_index(5, 5).unwrap(), 0);
/// assert_eq!(resolve_class_index(-7, 5).unwrap(), 3);
/// assert!(resolve_class_index(0, 0).is_err());
/// ```
pub fn resolve_class_index(requested: i64, column_count: usize) -> Result<usize> {
    if column_count == 0 {
        return Err(DatasetError::invalid_table(
            "Cannot resolve a class index for a table without attributes",
        ));
    }
    Ok(requested.rem_euclid(column_count as i64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_in_range_is_identity() {
        for i in 0..5 {
            assert_eq!(resolve_class_index(i, 5).unwrap(), i as usize);
        }
    }

    #[test]
    fn test_resolve_negative_counts_from_end() {
        assert_eq!(resolve_class_index(-1, 5).unwrap(), 4);
        assert_eq!(resolve_class_index(-5, 5).unwrap(), 0);
        assert_eq!(resolve_class_index(-7, 5).unwrap(), 3);
        assert_eq!(resolve_class_index(-1, 1).unwrap(), 0);
    }

    #[test]
    fn test_resolve_overflowing_wraps() {
        assert_eq!(resolve_class_index(5, 5).unwrap(), 0);
        assert_eq!(resolve_class_index(12, 5).unwrap(), 2);
        assert_eq!(resolve_class_index(i64::MAX, 2).unwrap(), 1);
        assert_eq!(resolve_class_index(i64::MIN, 3).unwrap(), 1);
    }

    #[test]
    fn test_resolve_without_columns_fails() {
        assert!(matches!(
            resolve_class_index(-1, 0),
            Err(DatasetError::InvalidTable(_))
        ));
    }
}
