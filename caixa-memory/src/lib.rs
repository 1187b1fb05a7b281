//! caixa-memory: in-memory implementations of the CaixaRS collaborator
//! traits, for tests and development.
//!
//! Each backend keeps the exact semantics the identity engine relies on:
//! all-or-nothing batches in the document store, sign-in-state broadcast in
//! the auth provider, and a synchronous process-local cache.

pub mod cache;
pub mod provider;
pub mod store;

pub use cache::MemoryLocalCache;
pub use provider::MemoryAuthProvider;
pub use store::MemoryDirectory;
