//! Fixed-size partitioning of the sorted input list.
//!
//! Batch membership is determined solely by sorted-name position: the first
//! `size` files form batch 0, the next `size` form batch 1, and so on, with
//! the last batch holding whatever remains. Concatenating the batches in
//! order always reproduces the input exactly, so the correspondence order
//! committed by the scan stage survives partitioning.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    #[error("no files to partition — nothing to stack")]
    NoFiles,
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

/// Split `files` into batches of `size`, numbered 0..N-1 in creation order.
///
/// Every batch has exactly `size` entries except possibly the last, which
/// holds the remainder (1..=size). An empty input is an error, not zero
/// batches: the caller must be able to distinguish "nothing to stack" from a
/// degenerate success.
pub fn partition(files: &[String], size: usize) -> Result<Vec<Vec<String>>, BatchError> {
    if size == 0 {
        return Err(BatchError::ZeroBatchSize);
    }
    if files.is_empty() {
        return Err(BatchError::NoFiles);
    }
    Ok(files.chunks(size).map(|chunk| chunk.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("IMG_{i:04}.jpg")).collect()
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let batches = partition(&names(20), 10).unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 10));
    }

    #[test]
    fn remainder_lands_in_last_batch() {
        let batches = partition(&names(25), 10).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[1].len(), 10);
        assert_eq!(batches[2].len(), 5);
    }

    #[test]
    fn fewer_files_than_batch_size_is_one_batch() {
        let batches = partition(&names(8), 10).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 8);
    }

    #[test]
    fn batch_count_is_ceil_of_len_over_size() {
        for len in 1..=40 {
            for size in 1..=12 {
                let batches = partition(&names(len), size).unwrap();
                assert_eq!(batches.len(), len.div_ceil(size), "len={len} size={size}");
            }
        }
    }

    #[test]
    fn concatenation_reproduces_input_in_order() {
        let input = names(27);
        let batches = partition(&input, 10).unwrap();
        let rejoined: Vec<String> = batches.into_iter().flatten().collect();
        assert_eq!(rejoined, input);
    }

    #[test]
    fn only_last_batch_may_be_short() {
        let batches = partition(&names(34), 7).unwrap();
        for batch in &batches[..batches.len() - 1] {
            assert_eq!(batch.len(), 7);
        }
        assert_eq!(batches.last().unwrap().len(), 34 % 7);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(partition(&[], 10), Err(BatchError::NoFiles));
    }

    #[test]
    fn zero_batch_size_is_an_error() {
        assert_eq!(partition(&names(5), 0), Err(BatchError::ZeroBatchSize));
    }
}
