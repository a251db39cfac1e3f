//! Diagnostic listing of the block chain.

use std::fmt;

/// Allocation state of a block, or of its predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
  Busy,
  Free,
}

impl BlockStatus {
  pub(crate) fn from_allocated(allocated: bool) -> Self {
    if allocated { Self::Busy } else { Self::Free }
  }
}

impl fmt::Display for BlockStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::Busy => f.write_str("Busy"),
      Self::Free => f.write_str("Free"),
    }
  }
}

/// One row of a [`HeapDump`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// 1-based position in address order.
  pub index: usize,
  pub status: BlockStatus,
  /// State of the block immediately before this one.
  pub prev_status: BlockStatus,
  /// Address of the first byte of the block (its header).
  pub start: usize,
  /// Address of the last byte of the block.
  pub end: usize,
  /// Total span including header and footer.
  pub size: usize,
}

/// Snapshot of every block from the first block to the end sentinel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapDump {
  pub blocks: Vec<BlockInfo>,
  pub busy_size: usize,
  pub free_size: usize,
}

impl HeapDump {
  pub fn total_size(&self) -> usize {
    self.busy_size + self.free_size
  }

  pub fn free_blocks(&self) -> impl Iterator<Item = &BlockInfo> {
    self.blocks.iter().filter(|block| block.status == BlockStatus::Free)
  }

  pub(crate) fn push(
    &mut self,
    status: BlockStatus,
    prev_status: BlockStatus,
    start: usize,
    size: usize,
  ) {
    match status {
      BlockStatus::Busy => self.busy_size += size,
      BlockStatus::Free => self.free_size += size,
    }

    self.blocks.push(BlockInfo {
      index: self.blocks.len() + 1,
      status,
      prev_status,
      start,
      end: start + size - 1,
      size,
    });
  }
}

const RULE: &str = "--------------------------------------------------------------------------------";
const STARS: &str = "********************************************************************************";

impl fmt::Display for HeapDump {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "*********************************** Block list *********************************")?;
    writeln!(f, "No.\tStatus\tPrev\tt_Begin\t\tt_End\t\tt_Size")?;
    writeln!(f, "{RULE}")?;

    for block in &self.blocks {
      writeln!(
        f,
        "{}\t{}\t{}\t{:#010x}\t{:#010x}\t{}",
        block.index, block.status, block.prev_status, block.start, block.end, block.size
      )?;
    }

    writeln!(f, "{RULE}")?;
    writeln!(f, "{STARS}")?;
    writeln!(f, "Total busy size = {}", self.busy_size)?;
    writeln!(f, "Total free size = {}", self.free_size)?;
    writeln!(f, "Total size = {}", self.total_size())?;
    writeln!(f, "{STARS}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_push_accumulates_totals() {
    let mut dump = HeapDump::default();
    dump.push(BlockStatus::Busy, BlockStatus::Busy, 0x1004, 24);
    dump.push(BlockStatus::Free, BlockStatus::Busy, 0x101c, 40);

    assert_eq!(dump.busy_size, 24);
    assert_eq!(dump.free_size, 40);
    assert_eq!(dump.total_size(), 64);
    assert_eq!(dump.blocks[1].index, 2);
    assert_eq!(dump.blocks[1].end, 0x101c + 39);
    assert_eq!(dump.free_blocks().count(), 1);
  }

  #[test]
  fn test_display_lists_rows_and_totals() {
    let mut dump = HeapDump::default();
    dump.push(BlockStatus::Busy, BlockStatus::Busy, 0x1004, 16);

    let text = dump.to_string();
    assert!(text.contains("1\tBusy\tBusy\t0x00001004\t0x00001013\t16"));
    assert!(text.contains("Total busy size = 16"));
    assert!(text.contains("Total free size = 0"));
    assert!(text.contains("Total size = 16"));
  }
}
