//! Free-text answer normalization.
//!
//! Answers are trimmed, empty strings become absent, and a small set of
//! Spanish free-text phrasings is mapped onto the CRM's canonical tokens.
//! Alias lookups compare on a folded key (NFD, combining marks removed,
//! lowercase, whitespace collapsed); values with no alias pass through with
//! their original casing.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::age::AgeBand;
use crate::domain::submission::{NormalizedAnswers, RawSubmission, ShapeChecked};

/// Folded phrase to canonical token. Keys are stored already folded.
#[derive(Clone, Copy, Debug)]
pub struct AliasTable {
    pub field: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

impl AliasTable {
    pub fn resolve(&self, value: &str) -> Option<&'static str> {
        let key = alias_key(value);
        self.entries.iter().find(|(alias, _)| *alias == key).map(|(_, canonical)| *canonical)
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }
}

pub const PARA_QUIEN_ALIASES: AliasTable = AliasTable {
    field: "paraQuien",
    entries: &[
        ("para mi", "single"),
        ("solo para mi", "single"),
        ("para mi y mi pareja", "couple"),
        ("para un grupo", "Group of people"),
    ],
};

pub const COVERAGE_START_ALIASES: AliasTable = AliasTable {
    field: "coverageStart",
    entries: &[
        ("en este mes", "now"),
        ("el proximo mes", "next_month"),
        ("aun no lo decidimos", "undecided"),
    ],
};

pub const HAS_INSURANCE_ALIASES: AliasTable =
    AliasTable { field: "hasInsurance", entries: &[("si", "Yes"), ("no", "No")] };

pub const PAYMENT_PLAN_ALIASES: AliasTable = AliasTable {
    field: "paymentPlan",
    entries: &[("anual", "yearly"), ("annual", "yearly"), ("mensual", "monthly")],
};

pub const ALIAS_TABLES: [AliasTable; 4] =
    [PARA_QUIEN_ALIASES, COVERAGE_START_ALIASES, HAS_INSURANCE_ALIASES, PAYMENT_PLAN_ALIASES];

pub fn alias_key(value: &str) -> String {
    let folded: String =
        value.nfd().filter(|ch| !is_combining_mark(*ch)).flat_map(char::to_lowercase).collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims the value; empty after trimming counts as absent.
pub fn normalize_input(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn apply_alias(value: Option<String>, table: &AliasTable) -> Option<String> {
    let value = value?;
    match table.resolve(&value) {
        Some(canonical) => Some(canonical.to_string()),
        None => Some(value),
    }
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Strips formatting characters and rewrites a leading `00` to `+`. No further validation.
pub fn normalize_phone(value: Option<&str>) -> Option<String> {
    let compact: String = value?
        .trim()
        .chars()
        .filter(|ch| !ch.is_whitespace() && !matches!(ch, '(' | ')' | '-'))
        .collect();
    if compact.is_empty() {
        return None;
    }
    match compact.strip_prefix("00") {
        Some(rest) => Some(format!("+{rest}")),
        None => Some(compact),
    }
}

pub fn normalize_answers(
    raw: &RawSubmission,
    checked: &ShapeChecked,
    age_band_titular: AgeBand,
    age_band_pareja: Option<AgeBand>,
) -> NormalizedAnswers {
    NormalizedAnswers {
        email: normalize_email(&raw.email),
        phone: normalize_phone(raw.phone.as_deref()),
        para_quien: apply_alias(normalize_input(Some(&raw.para_quien)), &PARA_QUIEN_ALIASES),
        age_band_titular,
        age_band_pareja,
        payment_plan: apply_alias(normalize_input(Some(&raw.payment_plan)), &PAYMENT_PLAN_ALIASES),
        has_insurance: apply_alias(
            normalize_input(Some(&raw.has_insurance)),
            &HAS_INSURANCE_ALIASES,
        ),
        payment_method: normalize_input(raw.payment_method.as_deref()),
        benefit_interest: normalize_input(raw.benefit_interest.as_deref()),
        coverage_start: apply_alias(
            normalize_input(raw.coverage_start.as_deref()),
            &COVERAGE_START_ALIASES,
        ),
        discovery_source: checked.discovery_source,
        wants_call: raw.wants_call,
        insurer_name: normalize_input(raw.insurer_name.as_deref()),
        insurance_expiry: normalize_input(raw.insurance_expiry.as_deref()),
        group_size: raw.group_size,
        group_ages_text: normalize_input(raw.group_ages_text.as_deref()),
    }
}
