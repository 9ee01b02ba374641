pub mod age;
pub mod config;
pub mod domain;
pub mod enum_schema;
pub mod errors;
pub mod idempotency;
pub mod normalize;
pub mod pipeline;
pub mod pricing;
pub mod redact;

pub use age::{effective_age_band, AgeBand, EffectiveAgeBand};
pub use domain::submission::{
    Attribution, ContactId, ContactProperties, DerivedFacts, NormalizedAnswers, RawSubmission,
    StoredSubmission, SubmissionId, SyncStatus, SyncUpdate,
};
pub use enum_schema::{EnumSchema, EnumViolation, SchemaError};
pub use errors::{ApplicationError, CrmError, DomainError, InterfaceError, StoreError};
pub use idempotency::IdempotencyKey;
pub use pipeline::{
    AcceptedSubmission, ContactDirectory, SubmissionContext, SubmissionPipeline, SubmissionStore,
};
pub use pricing::PaymentPlan;
