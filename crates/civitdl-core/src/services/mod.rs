//! Core services that orchestrate between ports and domain logic.

mod entry_store;

pub use entry_store::{EntryStore, StoredEntry};
