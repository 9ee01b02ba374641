use std::path::Path;

use leadquote_core::enum_schema::{EnumSchema, CONTACT_FIELD_RULES};
use serde_json::json;

use crate::commands::CommandResult;

/// Loads an enum schema (the bundled one without `path`) and reports its coverage.
///
/// A schema missing a required property would reject every submission, so that
/// is reported as a failure; missing optional properties are only listed.
pub fn run(path: Option<&Path>) -> CommandResult {
    let schema = match EnumSchema::load(path) {
        Ok(schema) => schema,
        Err(error) => {
            return CommandResult::failure("schema", "schema_invalid", error.to_string(), 2);
        }
    };

    let source = path.map(|path| path.display().to_string()).unwrap_or_else(|| "bundled".into());
    let missing = schema.missing_properties();
    let missing_required: Vec<&str> = CONTACT_FIELD_RULES
        .iter()
        .filter(|rule| rule.required && missing.contains(&rule.property))
        .map(|rule| rule.property)
        .collect();

    if !missing_required.is_empty() {
        return CommandResult::failure(
            "schema",
            "schema_incomplete",
            format!("{source} lacks required properties: {}", missing_required.join(", ")),
            3,
        );
    }

    let properties: Vec<_> = CONTACT_FIELD_RULES
        .iter()
        .map(|rule| {
            json!({
                "field": rule.field,
                "property": rule.property,
                "required": rule.required,
                "allowed": schema.allowed_values(rule.property),
            })
        })
        .collect();

    CommandResult::success_with_data(
        "schema",
        format!("{source}: {} properties, {} unmapped", schema.property_count(), missing.len()),
        Some(json!({ "source": source, "missing": missing, "properties": properties })),
    )
}
