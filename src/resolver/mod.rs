//! Search resolution: the boundary to the fact store.
//!
//! The trait is what a remote backend implements; the in-memory store is the
//! embedded reference backend.

mod memory;
mod traits;

pub use memory::InMemoryFactStore;
pub use traits::{ResolveError, ResolvedData, SearchResolver};
