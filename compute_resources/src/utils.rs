/// Rounds `value` up to the next multiple of `alignment` (a power of two).
///
/// Returns `None` when the rounded value does not fit in a `u64`.
pub fn aligned_size_u64(value: u64, alignment: u64) -> Option<u64> {
    let mask = alignment.checked_sub(1)?;

    value.checked_add(mask).map(|padded| padded & !mask)
}

pub fn is_aligned_u64(value: u64, alignment: u64) -> bool {
    alignment == 0 || value % alignment == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_alignment() {
        assert_eq!(aligned_size_u64(1024, 256), Some(1024));
        assert_eq!(aligned_size_u64(1000, 256), Some(1024));
        assert_eq!(aligned_size_u64(1, 16), Some(16));
        assert_eq!(aligned_size_u64(7, 1), Some(7));
    }

    #[test]
    fn rounding_past_u64_is_none() {
        assert_eq!(aligned_size_u64(u64::MAX, 256), None);
        assert_eq!(aligned_size_u64(u64::MAX - 255, 256), None);
        assert_eq!(aligned_size_u64(u64::MAX - 255, 1), Some(u64::MAX - 255));
        assert_eq!(aligned_size_u64(1024, 0), None);
    }

    #[test]
    fn alignment_check() {
        assert!(is_aligned_u64(0, 64));
        assert!(is_aligned_u64(128, 64));
        assert!(!is_aligned_u64(100, 64));
        assert!(is_aligned_u64(3, 0));
    }
}
