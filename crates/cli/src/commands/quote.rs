use chrono::{NaiveDate, Utc};
use leadquote_core::effective_age_band;
use leadquote_core::pricing::{household_quote, PaymentPlan};
use serde_json::json;

use crate::commands::CommandResult;

pub struct QuoteArgs {
    pub dob: String,
    pub plan: String,
    pub partner_dob: Option<String>,
    pub today: Option<String>,
}

/// Offline price preview; touches neither the database nor the CRM.
pub fn run(args: QuoteArgs) -> CommandResult {
    let today = match args.today.as_deref() {
        Some(value) => match parse_date("--today", value) {
            Ok(date) => date,
            Err(failure) => return failure,
        },
        None => Utc::now().date_naive(),
    };
    let dob = match parse_date("--dob", &args.dob) {
        Ok(date) => date,
        Err(failure) => return failure,
    };
    let partner_dob = match args.partner_dob.as_deref() {
        Some(value) => match parse_date("--partner-dob", value) {
            Ok(date) => Some(date),
            Err(failure) => return failure,
        },
        None => None,
    };
    let Some(plan) = PaymentPlan::parse(args.plan.trim()) else {
        return CommandResult::failure(
            "quote",
            "invalid_input",
            format!("--plan must be monthly, annual or yearly, got `{}`", args.plan),
            2,
        );
    };

    let titular = effective_age_band(dob, today);
    let partner = partner_dob.map(|dob| effective_age_band(dob, today));
    let quote = household_quote(titular.band, partner.map(|derived| derived.band), Some(plan));

    let message = match quote {
        Some(amount) => format!("{} quote for band {}: {amount}", plan.as_str(), titular.band),
        None => format!("no {} quote: an applicant is outside the priced bands", plan.as_str()),
    };

    CommandResult::success_with_data(
        "quote",
        message,
        Some(json!({
            "today": today.format("%Y-%m-%d").to_string(),
            "plan": plan.as_str(),
            "effectiveAge": titular.effective_age,
            "ageBandTitular": titular.band,
            "ageBandPareja": partner.map(|derived| derived.band),
            "quote": quote,
        })),
    )
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate, CommandResult> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        CommandResult::failure(
            "quote",
            "invalid_input",
            format!("{flag} must be a calendar date formatted YYYY-MM-DD, got `{value}`"),
            2,
        )
    })
}
