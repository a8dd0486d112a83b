pub mod json;
pub mod memory;

pub use json::JsonHistoryStore;
pub use memory::MemoryHistoryStore;
