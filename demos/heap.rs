use std::io::Read;

use log::LevelFilter;
use rheap::Heap;
use simple_logger::SimpleLogger;

/// Waits until the user presses ENTER.
/// Useful when you want to compare the block list between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() -> Result<(), rheap::HeapError> {
  SimpleLogger::new().with_level(LevelFilter::Trace).init().ok();

  let mut heap = Heap::new();
  heap.init(4096)?;

  println!("[start] one free block spanning {} bytes", heap.capacity());
  heap.print_dump()?;
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Fill the arena with 500-byte requests (504-byte blocks).
  // --------------------------------------------------------------------
  let mut handles = Vec::new();
  while let Ok(handle) = heap.alloc(500) {
    if let Some(payload) = heap.payload_mut(handle) {
      payload.fill(handles.len() as u8);
    }
    handles.push(handle);
  }
  println!("\n[1] Allocated {} blocks until the arena ran out", handles.len());
  heap.print_dump()?;
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Free two blocks with busy neighbours: nothing merges.
  // --------------------------------------------------------------------
  heap.free(handles[1])?;
  heap.free(handles[5])?;
  println!("\n[2] Freed blocks 2 and 6");
  heap.print_dump()?;
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Free the blocks between them: everything merges into one span.
  // --------------------------------------------------------------------
  for index in [2, 4, 3] {
    heap.free(handles[index])?;
  }
  println!("\n[3] Freed blocks 3, 5 and 4");
  heap.print_dump()?;
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) A large request now fits in the merged span.
  // --------------------------------------------------------------------
  let big = heap.alloc(2500)?;
  println!("\n[4] Allocated 2500 bytes at {:#x}", heap.address_of(big).unwrap_or(0));
  heap.print_dump()?;

  // --------------------------------------------------------------------
  // 5) Misuse is reported, not fatal.
  // --------------------------------------------------------------------
  heap.free(big)?;
  if let Err(err) = heap.free(big) {
    println!("\n[5] Second free rejected: {err}");
  }

  println!("\n[6] End of example. The arena is unmapped when the heap is dropped.");
  Ok(())
}
