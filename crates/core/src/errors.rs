use thiserror::Error;

use crate::domain::submission::{ShapeViolation, SyncStatus};
use crate::enum_schema::EnumViolation;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("submission payload is malformed ({} field(s))", .0.len())]
    InvalidShape(Vec<ShapeViolation>),
    #[error("submission has invalid enum values ({} field(s))", .0.len())]
    InvalidEnums(Vec<EnumViolation>),
    #[error("invalid sync transition from {from:?} to {to:?}")]
    InvalidSyncTransition { from: SyncStatus, to: SyncStatus },
}

/// Failures reported by a submission store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a submission with idempotency key `{0}` already exists")]
    DuplicateKey(String),
    #[error("submission store unavailable: {0}")]
    Unavailable(String),
    #[error("stored submission could not be decoded: {0}")]
    Decode(String),
    #[error("submission `{0}` is not awaiting sync")]
    NotAwaitingSync(String),
}

/// Failures reported by the CRM contact directory.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error("crm request failed: {0}")]
    Transport(String),
    #[error("crm rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("crm response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("state conflict: {0}")]
    StateConflict(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotAwaitingSync(_) => Self::StateConflict(value.to_string()),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<CrmError> for ApplicationError {
    fn from(value: CrmError) -> Self {
        Self::Integration(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { code: &'static str, message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("upstream failure: {message}")]
    UpstreamFailure { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::UpstreamFailure { .. } => {
                "Your request was saved but could not be delivered. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Stable machine-readable code for response envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. } => code,
            Self::ServiceUnavailable { .. } => "database_error",
            Self::UpstreamFailure { .. } => "crm_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::UpstreamFailure { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::UpstreamFailure { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    /// Transient failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Integration(_))
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::InvalidShape(_)) => Self::BadRequest {
                code: "invalid_request",
                message: "submission payload is malformed".to_owned(),
                correlation_id,
            },
            ApplicationError::Domain(DomainError::InvalidEnums(_)) => Self::BadRequest {
                code: "invalid_enum",
                message: "submission has invalid enum values".to_owned(),
                correlation_id,
            },
            ApplicationError::Domain(DomainError::InvalidSyncTransition { .. }) => {
                Self::Internal { message: "invalid sync transition".to_owned(), correlation_id }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Integration(message) => {
                Self::UpstreamFailure { message, correlation_id }
            }
            ApplicationError::Configuration(message) | ApplicationError::StateConflict(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}
