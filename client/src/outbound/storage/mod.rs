//! Local store adapters: process memory for tests and ephemeral runs, and a
//! directory of JSON files for durable caches.

mod file;
mod memory;

pub use file::FileLocalStore;
pub use memory::InMemoryLocalStore;
