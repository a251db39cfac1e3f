/// Size granularity and payload alignment of every block, in bytes.
pub const ALIGNMENT: usize = 8;

/// Rounds the given size up to the next multiple of [`ALIGNMENT`].
///
/// # Examples
///
/// ```rust
/// use rheap::align;
///
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(1), 8);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::ALIGNMENT)
  };
}

/// Rounds `value` up to the next multiple of `to`, which must be a power of two.
///
/// ```rust
/// use rheap::align_to;
///
/// assert_eq!(align_to!(1, 4096), 4096);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $to:expr) => {
    ($value + $to - 1) & !($to - 1)
  };
}

/// Overflow-checked version of [`align_to!`].
pub fn checked_align_to(
  value: usize,
  to: usize,
) -> Option<usize> {
  debug_assert!(to.is_power_of_two());
  value.checked_add(to - 1).map(|v| v & !(to - 1))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_to_pages() {
    assert_eq!(align_to!(0usize, 4096usize), 0);
    assert_eq!(align_to!(4095usize, 4096usize), 4096);
    assert_eq!(align_to!(4096usize, 4096usize), 4096);
    assert_eq!(align_to!(12_289usize, 16_384usize), 16_384);
  }

  #[test]
  fn test_checked_align_to() {
    assert_eq!(checked_align_to(9, 8), Some(16));
    assert_eq!(checked_align_to(usize::MAX, 8), None);
  }
}
