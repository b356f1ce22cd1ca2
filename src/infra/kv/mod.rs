//! `KeyValueStore` adapters.

mod memory;
mod upstash;

pub use memory::MemoryStore;
pub use upstash::UpstashStore;
