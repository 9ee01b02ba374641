use chrono::{NaiveDate, Utc};
use leadquote_core::idempotency::IdempotencyKey;
use leadquote_core::normalize::normalize_email;
use serde_json::json;

use crate::commands::CommandResult;

/// Derives the key a submission from `email` would carry on `date`, to look it up by hand.
pub fn run(email: &str, date: Option<&str>, schema_version: &str) -> CommandResult {
    let day = match date {
        Some(value) => match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            Ok(day) => day,
            Err(_) => {
                return CommandResult::failure(
                    "key",
                    "invalid_input",
                    format!("--date must be a calendar date formatted YYYY-MM-DD, got `{value}`"),
                    2,
                );
            }
        },
        None => Utc::now().date_naive(),
    };

    let canonical = normalize_email(email);
    if canonical.is_empty() || !canonical.contains('@') {
        return CommandResult::failure(
            "key",
            "invalid_input",
            format!("--email must be an email address, got `{email}`"),
            2,
        );
    }
    if schema_version.trim().is_empty() || schema_version.contains('|') {
        return CommandResult::failure(
            "key",
            "invalid_input",
            "--schema-version must be non-empty and must not contain `|`",
            2,
        );
    }

    let key = IdempotencyKey::derive(&canonical, schema_version, day);
    CommandResult::success_with_data(
        "key",
        key.as_str(),
        Some(json!({
            "email": canonical,
            "schema_version": schema_version,
            "day": day.format("%Y-%m-%d").to_string(),
            "idempotency_key": key,
        })),
    )
}
