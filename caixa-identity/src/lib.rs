//! caixa-identity: the multi-tenant identity and access-resolution engine
//! for the CaixaRS clinic ledger.
//!
//! The engine authenticates a user against the identity provider, loads the
//! application profile, selects the active tenant through an ordered
//! fallback policy, atomically provisions new tenants, composes a
//! permission-bearing [`Session`](caixa_core::Session), write-through caches
//! it, and keeps a standing subscription on the provider's sign-in state so
//! the published session always tracks it.
//!
//! Collaborators (identity provider, document store, local cache) are trait
//! seams defined in `caixa-core`; `caixa-memory` provides in-memory
//! implementations used by the conformance tests.

pub mod grants;
pub mod manager;
pub mod options;
pub mod permissions;
pub mod provisioner;
pub mod resolver;
pub mod session_cache;

mod documents;

pub use grants::GrantDirectory;
pub use manager::{IdentitySessionManager, RegisterOutcome};
pub use options::{CategoryKind, CategorySeed, Collections, IdentityOptions};
pub use permissions::can;
pub use provisioner::TenantProvisioner;
pub use resolver::{Resolution, TenantResolver};
pub use session_cache::SessionCache;
