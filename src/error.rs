//! Error types for heap operations.

use std::io;

use thiserror::Error;

/// Everything that can go wrong in a [`Heap`](crate::Heap) operation.
///
/// Failed allocations and frees leave the arena untouched.
#[derive(Error, Debug)]
pub enum HeapError {
  // Initialization
  /// `init` already succeeded on this heap.
  #[error("heap has already been initialized")]
  AlreadyInitialized,

  /// `init` was asked for an empty arena.
  #[error("requested arena size is not positive")]
  ZeroSize,

  /// The page-rounded arena does not fit the header encoding.
  #[error("requested arena of {requested} bytes exceeds the maximum of {max} bytes")]
  RegionTooLarge {
    /// Bytes requested by the caller.
    requested: usize,
    /// Largest arena the encoding supports.
    max: usize,
  },

  /// The operating system refused the mapping.
  #[error("cannot map {size} bytes for the arena: {source}")]
  MapFailed {
    /// Page-rounded size of the refused mapping.
    size: usize,
    #[source]
    source: io::Error,
  },

  // Allocation
  /// `alloc` or `free` before a successful `init`.
  #[error("heap is not initialized")]
  NotInitialized,

  /// `alloc` with a zero or unrepresentable size.
  #[error("invalid allocation size {requested}")]
  InvalidSize {
    /// Bytes requested by the caller.
    requested: usize,
  },

  /// No free block is large enough.
  #[error("out of memory: requested {requested} bytes ({needed} bytes with header)")]
  OutOfMemory {
    /// Bytes requested by the caller.
    requested: usize,
    /// Block span the request needs.
    needed: usize,
  },

  // Release
  /// `free` with the null handle.
  #[error("cannot free a null handle")]
  NullHandle,

  /// `free` with a handle that is not 8-byte aligned.
  #[error("handle at offset {offset:#x} is not 8-byte aligned")]
  MisalignedHandle {
    /// Offending payload offset.
    offset: usize,
  },

  /// `free` with a handle whose block lies outside the arena.
  #[error("handle at offset {offset:#x} does not address a block in the arena")]
  InvalidHandle {
    /// Offending payload offset.
    offset: usize,
  },

  /// `free` with a handle whose block is already free.
  #[error("block at offset {offset:#x} is already free")]
  DoubleFree {
    /// Offending payload offset.
    offset: usize,
  },

  /// The block chain does not satisfy the heap invariants.
  #[error("heap corrupted at offset {offset:#x}: {reason}")]
  Corrupt {
    /// Header offset where the walk stopped.
    offset: usize,
    /// Which invariant failed.
    reason: &'static str,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages_carry_context() {
    let err = HeapError::OutOfMemory {
      requested: 500,
      needed: 504,
    };
    assert_eq!(
      err.to_string(),
      "out of memory: requested 500 bytes (504 bytes with header)"
    );

    let err = HeapError::DoubleFree { offset: 0x10 };
    assert_eq!(err.to_string(), "block at offset 0x10 is already free");
  }

  #[test]
  fn test_map_failure_exposes_source() {
    use std::error::Error;

    let err = HeapError::MapFailed {
      size: 4096,
      source: io::Error::from_raw_os_error(libc::ENOMEM),
    };
    assert!(err.source().is_some());
  }
}
