use crate::align::ALIGNMENT;

/// Bytes occupied by a header or footer word inside the arena.
pub const WORD: usize = 4;

/// Smallest block span: a header and a footer with no payload.
pub const MIN_BLOCK: usize = 2 * WORD;

const ALLOCATED: u32 = 0b01;
const PREV_ALLOCATED: u32 = 0b10;
const FLAGS: u32 = ALLOCATED | PREV_ALLOCATED;

/// One header (or footer) word.
///
/// The block size always has its low bits clear, so they carry two flags:
///
/// ```text
///   31                                   3   2   1   0
///   ┌────────────────────────────────────────┬───┬───┐
///   │               size (multiple of 8)     │ P │ A │
///   └────────────────────────────────────────┴───┴───┘
///                                              │   └── this block is allocated
///                                              └────── previous block is allocated
/// ```
///
/// A footer holds the size only, with both flags clear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header(u32);

impl Header {
  /// Largest block size a header can describe.
  pub const MAX_SIZE: usize = (u32::MAX & !(ALIGNMENT as u32 - 1)) as usize;

  /// The end sentinel: zero size, permanently allocated.
  pub fn sentinel(prev_allocated: bool) -> Self {
    Self::new(0, true, prev_allocated)
  }

  pub fn new(
    size: usize,
    allocated: bool,
    prev_allocated: bool,
  ) -> Self {
    debug_assert!(size % ALIGNMENT == 0, "block size {size} is not 8-byte aligned");
    debug_assert!(size <= Self::MAX_SIZE);

    let mut word = size as u32;
    if allocated {
      word |= ALLOCATED;
    }
    if prev_allocated {
      word |= PREV_ALLOCATED;
    }
    Self(word)
  }

  /// A footer word mirroring `size`.
  pub fn footer(size: usize) -> Self {
    Self::new(size, false, false)
  }

  pub fn from_word(word: u32) -> Self {
    Self(word)
  }

  pub fn word(self) -> u32 {
    self.0
  }

  pub fn size(self) -> usize {
    (self.0 & !FLAGS) as usize
  }

  pub fn is_allocated(self) -> bool {
    self.0 & ALLOCATED != 0
  }

  pub fn is_prev_allocated(self) -> bool {
    self.0 & PREV_ALLOCATED != 0
  }

  pub fn is_sentinel(self) -> bool {
    self.size() == 0 && self.is_allocated()
  }

  pub fn with_size(
    self,
    size: usize,
  ) -> Self {
    Self::new(size, self.is_allocated(), self.is_prev_allocated())
  }

  pub fn with_allocated(
    self,
    allocated: bool,
  ) -> Self {
    Self::new(self.size(), allocated, self.is_prev_allocated())
  }

  pub fn with_prev_allocated(
    self,
    prev_allocated: bool,
  ) -> Self {
    Self::new(self.size(), self.is_allocated(), prev_allocated)
  }
}
