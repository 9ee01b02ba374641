//! CRM picklist schema and enum validation of contact properties.
//!
//! The schema is loaded once at startup (from the bundled JSON or a
//! configured file) and handed to the pipeline as an immutable value.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::submission::ContactProperties;

pub const BUNDLED_SCHEMA_JSON: &str = include_str!("../../../schemas/contact_enums.json");

pub const PROPERTY_EMAIL: &str = "email";
pub const PROPERTY_PHONE: &str = "phone";
pub const PROPERTY_PARA_QUIEN: &str = "para_quien_es_la_membresia__form";
pub const PROPERTY_AGE_BAND_TITULAR: &str = "cual_es_tu_edad__form";
pub const PROPERTY_AGE_BAND_PAREJA: &str = "cual_es_es_la_edad_del_segundo_cotizando_";
pub const PROPERTY_PAYMENT_PLAN: &str = "payment_plan__form";
pub const PROPERTY_HAS_INSURANCE: &str = "has_health_insurance__form";
pub const PROPERTY_PAYMENT_METHOD: &str = "metodo_de_pago";
pub const PROPERTY_BENEFIT_INTEREST: &str = "beneficio_de_interes";
pub const PROPERTY_COVERAGE_START: &str = "preferred_coverage_start__form";
pub const PROPERTY_WANTS_CALL: &str = "agendocalendario";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub property: &'static str,
    pub required: bool,
}

/// Enumerated contact properties, in reporting order.
pub const CONTACT_FIELD_RULES: [FieldRule; 9] = [
    FieldRule { field: "paraQuien", property: PROPERTY_PARA_QUIEN, required: true },
    FieldRule { field: "paymentPlan", property: PROPERTY_PAYMENT_PLAN, required: true },
    FieldRule { field: "hasInsurance", property: PROPERTY_HAS_INSURANCE, required: true },
    FieldRule { field: "paymentMethod", property: PROPERTY_PAYMENT_METHOD, required: false },
    FieldRule { field: "benefitInterest", property: PROPERTY_BENEFIT_INTEREST, required: false },
    FieldRule { field: "coverageStart", property: PROPERTY_COVERAGE_START, required: false },
    FieldRule { field: "ageBandTitular", property: PROPERTY_AGE_BAND_TITULAR, required: true },
    FieldRule { field: "ageBandPareja", property: PROPERTY_AGE_BAND_PAREJA, required: false },
    FieldRule { field: "wantsCall", property: PROPERTY_WANTS_CALL, required: false },
];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("could not read enum schema `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse enum schema: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("enum schema declares property `{0}` more than once")]
    DuplicateProperty(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumViolation {
    pub field: String,
    pub value: Option<String>,
    pub allowed: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    enums: Vec<SchemaEntry>,
}

// Labels and field types are carried by the document but only values matter here.
#[derive(Debug, Deserialize)]
struct SchemaEntry {
    name: String,
    #[serde(default)]
    options: Vec<SchemaOption>,
}

#[derive(Debug, Deserialize)]
struct SchemaOption {
    value: String,
}

/// CRM property name to the values the CRM accepts for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumSchema {
    allowed: BTreeMap<String, Vec<String>>,
}

impl EnumSchema {
    pub fn from_json(raw: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(raw)?;
        let mut allowed = BTreeMap::new();
        for entry in document.enums {
            let values = entry.options.into_iter().map(|option| option.value).collect();
            if allowed.insert(entry.name.clone(), values).is_some() {
                return Err(SchemaError::DuplicateProperty(entry.name));
            }
        }
        Ok(Self { allowed })
    }

    pub fn bundled() -> Result<Self, SchemaError> {
        Self::from_json(BUNDLED_SCHEMA_JSON)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| SchemaError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json(&raw)
    }

    /// Reads `path` when given, otherwise the bundled schema.
    pub fn load(path: Option<&Path>) -> Result<Self, SchemaError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    /// Unknown properties have no allowed values.
    pub fn allowed_values(&self, property: &str) -> &[String] {
        self.allowed.get(property).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_allowed(&self, property: &str, value: &str) -> bool {
        self.allowed_values(property).iter().any(|allowed| allowed == value)
    }

    pub fn property_count(&self) -> usize {
        self.allowed.len()
    }

    /// Enumerated contact properties this schema does not describe.
    pub fn missing_properties(&self) -> Vec<&'static str> {
        CONTACT_FIELD_RULES
            .iter()
            .filter(|rule| !self.allowed.contains_key(rule.property))
            .map(|rule| rule.property)
            .collect()
    }
}

/// Checks every enumerated property and returns all violations found.
pub fn validate_properties(
    schema: &EnumSchema,
    properties: &ContactProperties,
) -> Vec<EnumViolation> {
    CONTACT_FIELD_RULES
        .iter()
        .filter_map(|rule| {
            let value = properties.get(rule.property).cloned().flatten();
            check_field(schema, rule, value)
        })
        .collect()
}

pub fn check_field(
    schema: &EnumSchema,
    rule: &FieldRule,
    value: Option<String>,
) -> Option<EnumViolation> {
    let allowed = schema.allowed_values(rule.property);
    let violates = match value.as_deref() {
        None => rule.required,
        Some(value) => !allowed.iter().any(|candidate| candidate == value),
    };
    violates.then(|| EnumViolation {
        field: rule.field.to_string(),
        value,
        allowed: allowed.to_vec(),
    })
}
