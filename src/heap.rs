use log::{debug, error, trace, warn};

use crate::{
  align::{ALIGNMENT, checked_align_to},
  block::{Header, MIN_BLOCK, WORD},
  dump::{BlockStatus, HeapDump},
  error::HeapError,
  region::Region,
};

/// Offset of the first block header. One padding word in front of it puts
/// every payload on an 8-byte boundary.
const FIRST_BLOCK: usize = ALIGNMENT - WORD;

/// Region bytes that never belong to a block: the padding word and the end sentinel.
const RESERVED: usize = FIRST_BLOCK + WORD;

/// Opaque reference to the payload of an allocated block.
///
/// A handle is the payload's offset from the start of the arena. Offset 0
/// is never a payload, so it doubles as the null handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
  pub const fn null() -> Self {
    Self(0)
  }

  /// Builds a handle from a raw payload offset.
  ///
  /// Nothing is validated here; [`Heap::free`] rejects null, misaligned,
  /// out-of-range and already-free handles.
  pub const fn from_offset(offset: usize) -> Self {
    Self(offset)
  }

  pub const fn offset(self) -> usize {
    self.0
  }

  pub const fn is_null(self) -> bool {
    self.0 == 0
  }
}

/// Best-fit heap over a single fixed arena.
///
/// Blocks are laid out back to back in address order, each starting with a
/// header word. Free blocks also end with a footer word so that `free`
/// can find the start of a free predecessor in O(1):
///
/// ```text
///   offset 0   4                                                       len-4
///   ┌─────┬────────────────┬───────────────────────────┬──────┬─────┬─────┐
///   │ pad │ hdr │ payload  │ hdr │       (free)    │ ftr │ hdr │ ... │ end │
///   └─────┴────────────────┴───────────────────────────┴──────┴─────┴─────┘
///               ▲
///               └── Handle (8-byte aligned)
/// ```
///
/// The heap is single-threaded and not reentrant. Payload views returned by
/// [`Heap::payload`] are tied to a borrow of the heap, so they cannot
/// outlive a `free`.
///
/// A heap maps at most one arena, and a second [`Heap::init`] on it fails.
/// The flag lives in the value rather than in a process-wide global, so
/// separate `Heap` values own separate arenas. Code that must have exactly
/// one arena per process should create a single `Heap` and share it.
#[derive(Default)]
pub struct Heap {
  /// `Some` once `init` has succeeded; a heap is initialized at most once.
  region: Option<Region>,
}

impl Heap {
  /// Creates a heap with no arena. Call [`Heap::init`] before allocating.
  pub fn new() -> Self {
    Self { region: None }
  }

  /// Maps the arena: `size` rounded up to whole pages.
  ///
  /// The arena starts out as one free block covering everything but the
  /// 8 reserved bytes, followed by the end sentinel.
  pub fn init(
    &mut self,
    size: usize,
  ) -> Result<(), HeapError> {
    if self.region.is_some() {
      error!("heap: init has allocated space during a previous call");
      return Err(HeapError::AlreadyInitialized);
    }
    if size == 0 {
      error!("heap: requested arena size is not positive");
      return Err(HeapError::ZeroSize);
    }

    let page_size = Region::page_size();
    let len = checked_align_to(size, page_size)
      .filter(|len| len - RESERVED <= Header::MAX_SIZE)
      .ok_or_else(|| {
        error!("heap: requested arena of {size} bytes is too large");
        HeapError::RegionTooLarge {
          requested: size,
          max: Header::MAX_SIZE,
        }
      })?;

    let mut region = Region::map(len).map_err(|source| {
      error!("heap: mmap cannot allocate {len} bytes: {source}");
      HeapError::MapFailed { size: len, source }
    })?;

    let usable = len - RESERVED;
    let arena = region.as_bytes_mut();
    write_word(arena, FIRST_BLOCK, Header::new(usable, false, true));
    write_word(arena, FIRST_BLOCK + usable - WORD, Header::footer(usable));
    write_word(arena, FIRST_BLOCK + usable, Header::sentinel(false));

    debug!(
      "heap: mapped {len} bytes at {:?} (page size {page_size}, {usable} bytes usable)",
      region.base()
    );

    self.region = Some(region);
    Ok(())
  }

  pub fn is_initialized(&self) -> bool {
    self.region.is_some()
  }

  /// Page-rounded length of the arena, or 0 before `init`.
  pub fn region_len(&self) -> usize {
    self.region.as_ref().map_or(0, Region::len)
  }

  /// Total span available to blocks, or 0 before `init`.
  pub fn capacity(&self) -> usize {
    self.region_len().saturating_sub(RESERVED)
  }

  /// Allocates at least `size` payload bytes from the best-fitting free block.
  ///
  /// Every block is visited; among the free blocks large enough, the one
  /// with the least slack wins, and the lowest address wins ties. The
  /// winner is split when the slack can hold a block of its own.
  pub fn alloc(
    &mut self,
    size: usize,
  ) -> Result<Handle, HeapError> {
    if size == 0 {
      return Err(HeapError::InvalidSize { requested: size });
    }

    let needed = size
      .checked_add(WORD)
      .and_then(|total| checked_align_to(total, ALIGNMENT))
      .filter(|&needed| needed <= Header::MAX_SIZE)
      .ok_or(HeapError::InvalidSize { requested: size })?;

    let arena = self.arena_mut()?;

    let mut best: Option<(usize, Header)> = None;
    for block in Blocks::new(arena) {
      let (offset, header) = block?;
      if header.is_allocated() || header.size() < needed {
        continue;
      }

      let slack = header.size() - needed;
      if best.is_none_or(|(_, current)| slack < current.size() - needed) {
        best = Some((offset, header));
      }
    }

    let Some((offset, header)) = best else {
      trace!("alloc: no free block fits {needed} bytes");
      return Err(HeapError::OutOfMemory {
        requested: size,
        needed,
      });
    };

    let chosen = header.size();
    let slack = chosen - needed;

    if slack >= MIN_BLOCK {
      let rest = offset + needed;
      write_word(arena, offset, Header::new(needed, true, header.is_prev_allocated()));
      write_word(arena, rest, Header::new(slack, false, true));
      write_word(arena, rest + slack - WORD, Header::footer(slack));

      trace!("alloc: {size} bytes at {offset:#x}, split {chosen} into {needed} + {slack}");
    } else {
      let next = offset + chosen;
      let successor = read_word(arena, next)?;
      write_word(arena, offset, header.with_allocated(true));
      write_word(arena, next, successor.with_prev_allocated(true));

      trace!("alloc: {size} bytes at {offset:#x}, whole block of {chosen}");
    }

    Ok(Handle(offset + WORD))
  }

  /// Releases the block behind `handle` and merges it with free neighbours.
  ///
  /// A header absorbed into a free predecessor is zeroed, so freeing the
  /// same handle again still reports [`HeapError::DoubleFree`].
  ///
  /// Null, misaligned, out-of-range and already-free handles are rejected
  /// without touching the arena. A handle that is aligned but was never
  /// returned by `alloc`, such as one pointing into the middle of a live
  /// block, cannot be told apart from a real one.
  pub fn free(
    &mut self,
    handle: Handle,
  ) -> Result<(), HeapError> {
    if handle.is_null() {
      warn!("free: null handle");
      return Err(HeapError::NullHandle);
    }

    let offset = handle.0;
    if offset % ALIGNMENT != 0 {
      warn!("free: handle {offset:#x} is not 8-byte aligned");
      return Err(HeapError::MisalignedHandle { offset });
    }

    let arena = self.arena_mut()?;

    let start = offset.checked_sub(WORD).ok_or(HeapError::InvalidHandle { offset })?;
    let header = read_word(arena, start).map_err(|_| {
      warn!("free: handle {offset:#x} is outside the arena");
      HeapError::InvalidHandle { offset }
    })?;

    if !header.is_allocated() {
      warn!("free: block at {start:#x} is already free");
      return Err(HeapError::DoubleFree { offset });
    }

    let size = header.size();
    let next = start
      .checked_add(size)
      .filter(|&next| size >= MIN_BLOCK && size % ALIGNMENT == 0 && next + WORD <= arena.len())
      .ok_or_else(|| {
        warn!("free: handle {offset:#x} does not address a block");
        HeapError::InvalidHandle { offset }
      })?;
    let successor = read_word(arena, next)?;
    if !successor.is_allocated() && next + successor.size() > arena.len() - WORD {
      return Err(HeapError::Corrupt {
        offset: next,
        reason: "free successor runs past the arena",
      });
    }

    let predecessor = if header.is_prev_allocated() {
      None
    } else {
      Some(free_predecessor(arena, start)?)
    };

    match (predecessor, successor.is_allocated()) {
      (None, true) => {
        write_word(arena, start, header.with_allocated(false));
        write_word(arena, next - WORD, Header::footer(size));
        write_word(arena, next, successor.with_prev_allocated(false));

        trace!("free: {start:#x} ({size} bytes), no merge");
      }
      (Some((prev_start, prev)), true) => {
        let merged = prev.size() + size;
        write_word(arena, prev_start, prev.with_size(merged));
        write_word(arena, start, Header::from_word(0));
        write_word(arena, next - WORD, Header::footer(merged));
        write_word(arena, next, successor.with_prev_allocated(false));

        trace!("free: {start:#x} merged into predecessor at {prev_start:#x} ({merged} bytes)");
      }
      (None, false) => {
        let merged = size + successor.size();
        write_word(arena, start, Header::new(merged, false, header.is_prev_allocated()));
        write_word(arena, start + merged - WORD, Header::footer(merged));

        trace!("free: {start:#x} absorbed successor ({merged} bytes)");
      }
      (Some((prev_start, prev)), false) => {
        let merged = prev.size() + size + successor.size();
        write_word(arena, prev_start, prev.with_size(merged));
        write_word(arena, start, Header::from_word(0));
        write_word(arena, prev_start + merged - WORD, Header::footer(merged));

        trace!("free: {start:#x} merged with both neighbours at {prev_start:#x} ({merged} bytes)");
      }
    }

    Ok(())
  }

  /// Payload bytes of a live allocation, or `None` if `handle` does not
  /// address an allocated block.
  pub fn payload(
    &self,
    handle: Handle,
  ) -> Option<&[u8]> {
    let arena = self.region.as_ref()?.as_bytes();
    let range = payload_range(arena, handle)?;
    Some(&arena[range])
  }

  /// Mutable counterpart of [`Heap::payload`].
  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> Option<&mut [u8]> {
    let arena = self.region.as_mut()?.as_bytes_mut();
    let range = payload_range(arena, handle)?;
    Some(&mut arena[range])
  }

  /// Absolute address of the payload behind `handle`, for display only.
  pub fn address_of(
    &self,
    handle: Handle,
  ) -> Option<usize> {
    let region = self.region.as_ref()?;
    (handle.0 < region.len()).then(|| region.base() as usize + handle.0)
  }

  /// Lists every block from the first one up to the end sentinel.
  pub fn dump(&self) -> Result<HeapDump, HeapError> {
    let region = self.region.as_ref().ok_or(HeapError::NotInitialized)?;
    let base = region.base() as usize;

    let mut dump = HeapDump::default();
    for block in Blocks::new(region.as_bytes()) {
      let (offset, header) = block?;
      dump.push(
        BlockStatus::from_allocated(header.is_allocated()),
        BlockStatus::from_allocated(header.is_prev_allocated()),
        base + offset,
        header.size(),
      );
    }

    Ok(dump)
  }

  /// Prints [`Heap::dump`] to stdout.
  pub fn print_dump(&self) -> Result<(), HeapError> {
    print!("{}", self.dump()?);
    Ok(())
  }

  /// Walks the block chain and verifies the layout invariants.
  pub fn check_integrity(&self) -> Result<(), HeapError> {
    let arena = self.region.as_ref().ok_or(HeapError::NotInitialized)?.as_bytes();

    let corrupt = |offset, reason| HeapError::Corrupt { offset, reason };

    let mut prev_allocated = true;
    let mut total = 0;
    let mut blocks = Blocks::new(arena);

    for block in &mut blocks {
      let (offset, header) = block?;
      let size = header.size();

      if size % ALIGNMENT != 0 {
        return Err(corrupt(offset, "block size is not a multiple of 8"));
      }
      if header.is_prev_allocated() != prev_allocated {
        return Err(corrupt(offset, "prev-allocated bit does not match the previous block"));
      }
      if !header.is_allocated() {
        if !prev_allocated {
          return Err(corrupt(offset, "two adjacent free blocks"));
        }
        if read_word(arena, offset + size - WORD)? != Header::footer(size) {
          return Err(corrupt(offset, "footer does not mirror the header"));
        }
      }

      prev_allocated = header.is_allocated();
      total += size;
    }

    let end = blocks.offset;
    if end != arena.len() - WORD {
      return Err(corrupt(end, "end sentinel is not at the end of the arena"));
    }
    if read_word(arena, end)?.is_prev_allocated() != prev_allocated {
      return Err(corrupt(end, "prev-allocated bit does not match the previous block"));
    }
    if total != arena.len() - RESERVED {
      return Err(corrupt(end, "blocks do not cover the arena"));
    }

    Ok(())
  }

  fn arena_mut(&mut self) -> Result<&mut [u8], HeapError> {
    self
      .region
      .as_mut()
      .map(Region::as_bytes_mut)
      .ok_or(HeapError::NotInitialized)
  }
}

/// Walks block headers in address order, stopping at the end sentinel.
struct Blocks<'a> {
  arena: &'a [u8],
  offset: usize,
  done: bool,
}

impl<'a> Blocks<'a> {
  fn new(arena: &'a [u8]) -> Self {
    Self {
      arena,
      offset: FIRST_BLOCK,
      done: false,
    }
  }
}

impl Iterator for Blocks<'_> {
  type Item = Result<(usize, Header), HeapError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }

    let offset = self.offset;
    let header = match read_word(self.arena, offset) {
      Ok(header) if header.is_sentinel() => {
        self.done = true;
        return None;
      }
      Ok(header) if header.size() < MIN_BLOCK => {
        self.done = true;
        return Some(Err(HeapError::Corrupt {
          offset,
          reason: "block smaller than the minimum span",
        }));
      }
      Ok(header) => header,
      Err(err) => {
        self.done = true;
        return Some(Err(err));
      }
    };

    self.offset = offset + header.size();
    Some(Ok((offset, header)))
  }
}

/// Locates the free block ending right before `start` through its footer.
fn free_predecessor(
  arena: &[u8],
  start: usize,
) -> Result<(usize, Header), HeapError> {
  let corrupt = || HeapError::Corrupt {
    offset: start,
    reason: "free predecessor has no valid footer",
  };

  let footer_offset = start.checked_sub(WORD).ok_or_else(corrupt)?;
  let size = read_word(arena, footer_offset)?.size();
  let prev_start = start
    .checked_sub(size)
    .filter(|_| size >= MIN_BLOCK)
    .ok_or_else(corrupt)?;

  let prev = read_word(arena, prev_start)?;
  if prev.is_allocated() || prev.size() != size {
    return Err(corrupt());
  }

  Ok((prev_start, prev))
}

/// Byte range of the payload behind `handle` if it addresses an allocated block.
fn payload_range(
  arena: &[u8],
  handle: Handle,
) -> Option<std::ops::Range<usize>> {
  let offset = handle.0;
  if handle.is_null() || offset % ALIGNMENT != 0 {
    return None;
  }

  let start = offset.checked_sub(WORD)?;
  let header = read_word(arena, start).ok()?;
  let size = header.size();
  let end = start.checked_add(size)?;
  if !header.is_allocated() || size < MIN_BLOCK || end > arena.len() - WORD {
    return None;
  }

  Some(offset..end)
}

fn read_word(
  arena: &[u8],
  offset: usize,
) -> Result<Header, HeapError> {
  let bytes: [u8; WORD] = offset
    .checked_add(WORD)
    .and_then(|end| arena.get(offset..end))
    .and_then(|bytes| bytes.try_into().ok())
    .ok_or(HeapError::Corrupt {
      offset,
      reason: "block metadata lies outside the arena",
    })?;

  Ok(Header::from_word(u32::from_ne_bytes(bytes)))
}

fn write_word(
  arena: &mut [u8],
  offset: usize,
  header: Header,
) {
  arena[offset..offset + WORD].copy_from_slice(&header.word().to_ne_bytes());
}
