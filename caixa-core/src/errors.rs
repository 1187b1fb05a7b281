use std::fmt;
use thiserror::Error;

use crate::types::TenantId;

/// Result type for identity-core operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Malformed caller input. Fail fast, before any collaborator call; never
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("tenant name must not be empty")]
    MissingName,

    #[error("tenant owner is required")]
    MissingOwner,
}

/// Provider rejected the credentials or account state. Surfaced as-is; no
/// internal retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("no account exists for this email")]
    UserNotFound,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("too many attempts, try again later")]
    RateLimited,

    #[error("signed-in identity has no application profile")]
    ProfileMissing,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("email address is already in use")]
    EmailAlreadyInUse,

    #[error("no active session")]
    NotSignedIn,
}

/// Which provisioning step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    /// The atomic tenant + owner-grant batch.
    Persist,
    /// The read-after-write check on the committed tenant.
    Verify,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionStep::Persist => write!(f, "persist"),
            ProvisionStep::Verify => write!(f, "verify"),
        }
    }
}

/// Tenant provisioning failed. Carries which step failed so callers can
/// drive remediation messaging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tenant provisioning failed at {step}: {reason}")]
pub struct ProvisionError {
    pub step: ProvisionStep,
    pub reason: String,
}

impl ProvisionError {
    pub fn new(step: ProvisionStep, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }
}

/// Document-store collaborator errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store was unreachable or rejected the operation transiently.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("record serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Identity-provider collaborator errors. Credential/state variants mirror
/// [`AuthError`]; `Unavailable` is the transport class.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("no account exists for this email")]
    UserNotFound,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("too many attempts, try again later")]
    RateLimited,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("email address is already in use")]
    EmailAlreadyInUse,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error taxonomy for the identity core.
///
/// `PartialSuccess` is deliberately NOT an error: a partially completed
/// registration is surfaced as a distinct outcome value carrying the valid
/// tenant-less session (see the session manager), so callers cannot conflate
/// it with total failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The resolved identity lacks rights on the requested tenant. Terminal.
    #[error("access denied to tenant {tenant_id}")]
    AccessDenied { tenant_id: TenantId },

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// A collaborator was unreachable. Retrying is the caller's decision;
    /// nothing in this core retries internally.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// A stored record failed to decode into its domain type.
    #[error("record decode failed: {0}")]
    Decode(String),
}

impl IdentityError {
    /// Whether this error is in the transient-infrastructure class, i.e. a
    /// retry by the caller may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
            StoreError::Serialization(msg) => Self::Decode(msg),
        }
    }
}

impl From<ProviderError> for IdentityError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCredentials => AuthError::InvalidCredentials.into(),
            ProviderError::UserNotFound => AuthError::UserNotFound.into(),
            ProviderError::AccountDisabled => AuthError::AccountDisabled.into(),
            ProviderError::RateLimited => AuthError::RateLimited.into(),
            ProviderError::InvalidEmail => AuthError::InvalidEmail.into(),
            ProviderError::EmailAlreadyInUse => AuthError::EmailAlreadyInUse.into(),
            ProviderError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
