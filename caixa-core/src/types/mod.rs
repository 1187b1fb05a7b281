pub mod grant;
pub mod ids;
pub mod session;
pub mod tenant;
pub mod user;

pub use grant::{AccessGrant, GrantStatus, PermissionSet, Role};
pub use ids::{TenantId, UserId};
pub use session::{Provenance, Session};
pub use tenant::{Tenant, TenantSeed, TenantSettings, TenantStatus};
pub use user::{NewUserProfile, User, UserStatus};
