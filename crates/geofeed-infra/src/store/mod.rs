//! Process-local durable store, used when no database is configured and in tests.

mod memory;

pub use memory::InMemoryStore;

#[cfg(test)]
mod tests;
