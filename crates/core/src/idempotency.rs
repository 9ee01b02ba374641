use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content-addressed de-duplication key for one logical submission per day.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(pub String);

impl IdempotencyKey {
    /// `sha256(email|schema_version|YYYY-MM-DD)` as lowercase hex.
    ///
    /// `email` is expected in canonical (trimmed, lowercased) form.
    pub fn derive(email: &str, schema_version: &str, day: NaiveDate) -> Self {
        let material = format!("{email}|{schema_version}|{}", day.format("%Y-%m-%d"));
        Self(sha256_hex(&material))
    }

    /// The dedup window is the UTC calendar day the request was received.
    pub fn for_receipt(email: &str, schema_version: &str, received_at: DateTime<Utc>) -> Self {
        Self::derive(email, schema_version, received_at.date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, Utc};

    use super::{sha256_hex, IdempotencyKey};

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn instant(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[test]
    fn key_is_sha256_of_pipe_joined_material() {
        let key = IdempotencyKey::derive("ana@example.com", "v1", day("2025-05-01"));
        assert_eq!(key.as_str(), sha256_hex("ana@example.com|v1|2025-05-01"));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn same_day_receipts_share_a_key() {
        let morning =
            IdempotencyKey::for_receipt("ana@example.com", "v1", instant("2025-05-01T00:00:01Z"));
        let night =
            IdempotencyKey::for_receipt("ana@example.com", "v1", instant("2025-05-01T23:59:59Z"));
        assert_eq!(morning, night);
    }

    #[test]
    fn day_email_and_version_each_change_the_key() {
        let base = IdempotencyKey::derive("ana@example.com", "v1", day("2025-05-01"));
        assert_ne!(base, IdempotencyKey::derive("ana@example.com", "v1", day("2025-05-02")));
        assert_ne!(base, IdempotencyKey::derive("bea@example.com", "v1", day("2025-05-01")));
        assert_ne!(base, IdempotencyKey::derive("ana@example.com", "v2", day("2025-05-01")));
    }

    #[test]
    fn receipt_day_is_taken_in_utc() {
        let late_local = DateTime::parse_from_rfc3339("2025-05-01T22:30:00-05:00")
            .expect("valid rfc3339")
            .with_timezone(&Utc);
        let key = IdempotencyKey::for_receipt("ana@example.com", "v1", late_local);
        assert_eq!(key, IdempotencyKey::derive("ana@example.com", "v1", day("2025-05-02")));
    }
}
