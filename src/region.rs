use std::{io, ptr::NonNull, slice};

use libc::{c_void, sysconf};

/// One anonymous, zero-filled, read/write mapping obtained from the OS.
///
/// The mapping is page-aligned and never grows, shrinks or changes
/// protection. It is unmapped when the region is dropped.
pub(crate) struct Region {
  base: NonNull<u8>,
  len: usize,
}

impl Region {
  /// The system page size.
  pub fn page_size() -> usize {
    let size = unsafe { sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 { 4096 } else { size as usize }
  }

  /// Maps `len` bytes. `len` must be a non-zero multiple of the page size.
  pub fn map(len: usize) -> io::Result<Self> {
    debug_assert!(len > 0 && len % Self::page_size() == 0);

    let address = unsafe {
      libc::mmap(
        std::ptr::null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      return Err(io::Error::last_os_error());
    }

    let base = NonNull::new(address as *mut u8).ok_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable))?;

    Ok(Self { base, len })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn base(&self) -> *const u8 {
    self.base.as_ptr()
  }

  pub fn as_bytes(&self) -> &[u8] {
    // The mapping is live, readable and exclusively owned by `self`.
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
  }

  pub fn as_bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.base.as_ptr() as *mut c_void, self.len);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_size_is_power_of_two() {
    assert!(Region::page_size().is_power_of_two());
  }

  #[test]
  fn test_map_is_zeroed_and_page_aligned() {
    let page = Region::page_size();
    let mut region = Region::map(page).unwrap();

    assert_eq!(region.len(), page);
    assert_eq!(region.base() as usize % page, 0);
    assert!(region.as_bytes().iter().all(|&b| b == 0));

    region.as_bytes_mut()[page - 1] = 0xAB;
    assert_eq!(region.as_bytes()[page - 1], 0xAB);
  }
}
