use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::age::AgeBand;
use crate::enum_schema;
use crate::errors::DomainError;
use crate::idempotency::IdempotencyKey;

/// CRM property name to string-or-null value.
pub type ContactProperties = BTreeMap<String, Option<String>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverySource {
    Facebook,
    Google,
    Referido,
    Otro,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
            Self::Referido => "referido",
            Self::Otro => "otro",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "facebook" => Some(Self::Facebook),
            "google" => Some(Self::Google),
            "referido" => Some(Self::Referido),
            "otro" => Some(Self::Otro),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub utm_term: Option<String>,
    #[serde(default)]
    pub utm_content: Option<String>,
    #[serde(default)]
    pub gclid: Option<String>,
    #[serde(default)]
    pub fbclid: Option<String>,
}

/// Untrusted web-form payload, exactly as received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubmission {
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub para_quien: String,
    pub dob_titular: String,
    #[serde(default)]
    pub dob_pareja: Option<String>,
    pub payment_plan: String,
    pub has_insurance: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub benefit_interest: Option<String>,
    #[serde(default)]
    pub coverage_start: Option<String>,
    #[serde(default)]
    pub discovery_source: Option<String>,
    #[serde(default)]
    pub wants_call: Option<bool>,
    #[serde(default)]
    pub insurer_name: Option<String>,
    #[serde(default)]
    pub insurance_expiry: Option<String>,
    #[serde(default)]
    pub group_size: Option<i64>,
    #[serde(default)]
    pub group_ages_text: Option<String>,
    #[serde(flatten)]
    pub attribution: Attribution,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeViolation {
    pub field: String,
    pub message: String,
}

impl ShapeViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

/// Typed values extracted while checking the payload shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeChecked {
    pub dob_titular: NaiveDate,
    pub dob_pareja: Option<NaiveDate>,
    pub discovery_source: Option<DiscoverySource>,
}

impl RawSubmission {
    /// Structural checks that run before any side effect. Reports every problem at once.
    pub fn check_shape(&self) -> Result<ShapeChecked, Vec<ShapeViolation>> {
        let mut violations = Vec::new();

        if !is_plausible_email(&self.email) {
            violations.push(ShapeViolation::new("email", "must be a valid email address"));
        }

        let dob_titular = parse_iso_date("dobTitular", &self.dob_titular, &mut violations);
        let dob_pareja = self
            .dob_pareja
            .as_deref()
            .and_then(|value| parse_iso_date("dobPareja", value, &mut violations));

        let discovery_source = match self.discovery_source.as_deref() {
            None => None,
            Some(value) => {
                let parsed = DiscoverySource::parse(value);
                if parsed.is_none() {
                    violations.push(ShapeViolation::new(
                        "discoverySource",
                        "expected one of facebook|google|referido|otro",
                    ));
                }
                parsed
            }
        };

        if matches!(self.group_size, Some(size) if size <= 0) {
            violations.push(ShapeViolation::new("groupSize", "must be a positive integer"));
        }

        for (field, value) in
            [("pageUrl", &self.attribution.page_url), ("referrer", &self.attribution.referrer)]
        {
            if let Some(value) = value {
                if Url::parse(value).is_err() {
                    violations.push(ShapeViolation::new(field, "must be an absolute URL"));
                }
            }
        }

        match dob_titular {
            Some(dob_titular) if violations.is_empty() => {
                Ok(ShapeChecked { dob_titular, dob_pareja, discovery_source })
            }
            _ => Err(violations),
        }
    }
}

fn is_plausible_email(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn parse_iso_date(
    field: &str,
    value: &str,
    violations: &mut Vec<ShapeViolation>,
) -> Option<NaiveDate> {
    let well_formed = value.len() == 10
        && value.char_indices().all(|(index, ch)| match index {
            4 | 7 => ch == '-',
            _ => ch.is_ascii_digit(),
        });
    let parsed =
        well_formed.then(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()).flatten();
    if parsed.is_none() {
        violations.push(ShapeViolation::new(field, "must be a calendar date formatted YYYY-MM-DD"));
    }
    parsed
}

/// Canonical form of the answers, one-to-one with a [`RawSubmission`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAnswers {
    pub email: String,
    pub phone: Option<String>,
    pub para_quien: Option<String>,
    pub age_band_titular: AgeBand,
    pub age_band_pareja: Option<AgeBand>,
    pub payment_plan: Option<String>,
    pub has_insurance: Option<String>,
    pub payment_method: Option<String>,
    pub benefit_interest: Option<String>,
    pub coverage_start: Option<String>,
    pub discovery_source: Option<DiscoverySource>,
    pub wants_call: Option<bool>,
    pub insurer_name: Option<String>,
    pub insurance_expiry: Option<String>,
    pub group_size: Option<i64>,
    pub group_ages_text: Option<String>,
}

impl NormalizedAnswers {
    pub fn wants_call_token(&self) -> Option<&'static str> {
        self.wants_call.map(|wants_call| if wants_call { "true" } else { "false" })
    }

    /// The CRM contact payload. Enumerated properties are validated against the schema.
    pub fn contact_properties(&self) -> ContactProperties {
        [
            (enum_schema::PROPERTY_EMAIL, Some(self.email.clone())),
            (enum_schema::PROPERTY_PHONE, self.phone.clone()),
            (enum_schema::PROPERTY_PARA_QUIEN, self.para_quien.clone()),
            (enum_schema::PROPERTY_AGE_BAND_TITULAR, Some(self.age_band_titular.to_string())),
            (
                enum_schema::PROPERTY_AGE_BAND_PAREJA,
                self.age_band_pareja.map(|band| band.to_string()),
            ),
            (enum_schema::PROPERTY_PAYMENT_PLAN, self.payment_plan.clone()),
            (enum_schema::PROPERTY_HAS_INSURANCE, self.has_insurance.clone()),
            (enum_schema::PROPERTY_PAYMENT_METHOD, self.payment_method.clone()),
            (enum_schema::PROPERTY_BENEFIT_INTEREST, self.benefit_interest.clone()),
            (enum_schema::PROPERTY_COVERAGE_START, self.coverage_start.clone()),
            (enum_schema::PROPERTY_WANTS_CALL, self.wants_call_token().map(str::to_string)),
        ]
        .into_iter()
        .map(|(property, value)| (property.to_string(), value))
        .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFacts {
    pub effective_age: i32,
    pub age_band_titular: AgeBand,
    pub age_band_pareja: Option<AgeBand>,
    pub quote: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Received,
    Synced,
    SyncFailed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Synced => "synced",
            Self::SyncFailed => "sync_failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "received" => Some(Self::Received),
            "synced" => Some(Self::Synced),
            "sync_failed" => Some(Self::SyncFailed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Synced) | (Self::Received, Self::SyncFailed)
        )
    }

    pub fn ensure_transition(&self, next: SyncStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            return Ok(());
        }
        Err(DomainError::InvalidSyncTransition { from: *self, to: next })
    }
}

/// Durable record of one logical lead, unique per idempotency key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSubmission {
    pub id: SubmissionId,
    pub idempotency_key: IdempotencyKey,
    pub schema_version: String,
    pub request_id: String,
    pub attribution: Attribution,
    pub answers: RawSubmission,
    pub normalized: NormalizedAnswers,
    pub derived: DerivedFacts,
    pub status: SyncStatus,
    pub contact_id: Option<ContactId>,
    pub crm_payload: Option<ContactProperties>,
    pub error_detail: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the sync step may change on an existing record.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncUpdate {
    pub status: SyncStatus,
    pub contact_id: Option<ContactId>,
    pub crm_payload: Option<ContactProperties>,
    pub error_detail: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl SyncUpdate {
    pub fn synced(
        contact_id: ContactId,
        crm_payload: ContactProperties,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: SyncStatus::Synced,
            contact_id: Some(contact_id),
            crm_payload: Some(crm_payload),
            error_detail: None,
            updated_at,
        }
    }

    pub fn failed(
        crm_payload: ContactProperties,
        error_detail: Value,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: SyncStatus::SyncFailed,
            contact_id: None,
            crm_payload: Some(crm_payload),
            error_detail: Some(error_detail),
            updated_at,
        }
    }

    /// Keeps a contact id that the CRM already assigned on a failed update.
    pub fn with_contact(mut self, contact_id: ContactId) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn apply_to(&self, record: &mut StoredSubmission) {
        record.status = self.status;
        if let Some(contact_id) = &self.contact_id {
            record.contact_id = Some(contact_id.clone());
        }
        if let Some(payload) = &self.crm_payload {
            record.crm_payload = Some(payload.clone());
        }
        record.error_detail = self.error_detail.clone();
        record.updated_at = self.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RawSubmission, SyncStatus};
    use crate::errors::DomainError;

    fn raw(overrides: serde_json::Value) -> RawSubmission {
        let mut base = json!({
            "email": "ana@example.com",
            "paraQuien": "single",
            "dobTitular": "1960-05-31",
            "paymentPlan": "yearly",
            "hasInsurance": "No",
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(base).expect("raw submission")
    }

    #[test]
    fn deserializes_camel_case_payload_with_attribution() {
        let submission = raw(json!({
            "utmSource": "newsletter",
            "pageUrl": "https://example.com/cotizar",
            "wantsCall": true,
        }));
        assert_eq!(submission.attribution.utm_source.as_deref(), Some("newsletter"));
        assert_eq!(submission.wants_call, Some(true));
        assert!(submission.check_shape().is_ok());
    }

    #[test]
    fn shape_check_reports_every_problem() {
        let submission = raw(json!({
            "email": "not-an-email",
            "dobTitular": "31/05/1960",
            "discoverySource": "tiktok",
            "groupSize": 0,
            "referrer": "nope",
        }));
        let violations = submission.check_shape().expect_err("shape should fail");
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "dobTitular", "discoverySource", "groupSize", "referrer"]);
    }

    #[test]
    fn shape_check_rejects_impossible_calendar_dates() {
        let submission = raw(json!({ "dobPareja": "1961-02-30" }));
        let violations = submission.check_shape().expect_err("invalid partner dob");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "dobPareja");
    }

    #[test]
    fn missing_required_field_fails_deserialization() {
        let payload = json!({ "email": "ana@example.com", "paraQuien": "single" });
        assert!(serde_json::from_value::<RawSubmission>(payload).is_err());
    }

    #[test]
    fn sync_status_only_leaves_received() {
        assert!(SyncStatus::Received.can_transition_to(SyncStatus::Synced));
        assert!(SyncStatus::Received.can_transition_to(SyncStatus::SyncFailed));
        assert!(!SyncStatus::Synced.can_transition_to(SyncStatus::SyncFailed));
        assert!(!SyncStatus::SyncFailed.can_transition_to(SyncStatus::Synced));

        let error = SyncStatus::Synced
            .ensure_transition(SyncStatus::Received)
            .expect_err("synced is terminal");
        assert!(matches!(error, DomainError::InvalidSyncTransition { .. }));
    }

    #[test]
    fn sync_status_round_trips_through_storage_labels() {
        for status in [SyncStatus::Received, SyncStatus::Synced, SyncStatus::SyncFailed] {
            assert_eq!(SyncStatus::parse(status.as_str()), Some(status));
        }
    }
}
