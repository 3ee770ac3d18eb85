// # Record Store Implementations
//
// In-process implementations of the RecordStore trait. Hosted providers
// live in their own crates.

pub mod memory;

pub use memory::MemoryRecordStore;
