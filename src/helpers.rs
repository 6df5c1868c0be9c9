//! Index-list helpers shared by views and the dataset store.

use crate::error::{DatasetError, Result};

/// `[begin, end)` as a list, e.g. to wrap every row of a table.
pub fn int_range(begin: usize, end: usize) -> Vec<usize> {
    (begin..end).collect()
}

/// Check that every index lies in `[0, len)` and convert to positions.
///
/// # Examples
///
/// ```
/// use dataview::check_indices;
///
/// assert_eq!(check_indices(&[1, 0, 4], 5).unwrap(), vec![1, 0, 4]);
/// assert!(check_indices(&[-1], 5).is_err());
/// assert!(check_indices(&[5], 5).is_err());
/// ```
pub fn check_indices(indices: &[i64], len: usize) -> Result<Vec<usize>> {
    indices.iter().map(|&i| check_index(i, len)).collect()
}

pub fn check_index(index: i64, len: usize) -> Result<usize> {
    if index < 0 || index as u64 >= len as u64 {
        return Err(DatasetError::IndexOutOfRange { index, len });
    }
    Ok(index as usize)
}

/// Split `items` into consecutive chunks at cumulative `fractions` of its
/// length. `split(&items, &[0.6, 0.2])` yields three chunks holding roughly
/// 60%, 20% and the remaining 20% of the items, in order.
///
/// Chunk `k` ends before index `floor(c_k * len)`, where `c_k` is the sum of
/// the first `k + 1` fractions, so a fraction of `0.5` over 4 items puts
/// exactly items 0 and 1 in the first chunk. The result always has
/// `fractions.len() + 1` chunks; chunks past the end of `items` are empty.
/// This differs from a split that includes the boundary index in the
/// current chunk and drops trailing empty chunks.
pub fn split<T: Clone>(items: &[T], fractions: &[f64]) -> Vec<Vec<T>> {
    let len = items.len();
    let mut chunks = Vec::with_capacity(fractions.len() + 1);
    let mut start = 0;
    let mut cumulative = 0.0;
    for fraction in fractions {
        cumulative += fraction.max(0.0);
        let end = ((cumulative * len as f64) as usize).clamp(start, len);
        chunks.push(items[start..end].to_vec());
        start = end;
    }
    chunks.push(items[start..].to_vec());
    chunks
}
