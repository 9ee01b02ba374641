//! Calendar age arithmetic and age-band bucketing.
//!
//! All dates are UTC calendar dates; there is no time-of-day component.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days before a birthday during which the applicant is priced at the next age.
pub const BIRTHDAY_GRACE_DAYS: i64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "50 - 54")]
    From50To54,
    #[serde(rename = "55 - 59")]
    From55To59,
    #[serde(rename = "60 - 64")]
    From60To64,
    #[serde(rename = "65 - 69")]
    From65To69,
    #[serde(rename = "70 - 74")]
    From70To74,
    #[serde(rename = "75 - 79")]
    From75To79,
    #[serde(rename = "80 - 84")]
    From80To84,
    #[serde(rename = "out_of_range")]
    OutOfRange,
}

impl AgeBand {
    pub const PRICED: [AgeBand; 7] = [
        Self::From50To54,
        Self::From55To59,
        Self::From60To64,
        Self::From65To69,
        Self::From70To74,
        Self::From75To79,
        Self::From80To84,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::From50To54 => "50 - 54",
            Self::From55To59 => "55 - 59",
            Self::From60To64 => "60 - 64",
            Self::From65To69 => "65 - 69",
            Self::From70To74 => "70 - 74",
            Self::From75To79 => "75 - 79",
            Self::From80To84 => "80 - 84",
            Self::OutOfRange => "out_of_range",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "50 - 54" => Some(Self::From50To54),
            "55 - 59" => Some(Self::From55To59),
            "60 - 64" => Some(Self::From60To64),
            "65 - 69" => Some(Self::From65To69),
            "70 - 74" => Some(Self::From70To74),
            "75 - 79" => Some(Self::From75To79),
            "80 - 84" => Some(Self::From80To84),
            "out_of_range" => Some(Self::OutOfRange),
            _ => None,
        }
    }

    /// Inclusive age bounds, `None` for the out-of-range sentinel.
    pub fn bounds(&self) -> Option<(i32, i32)> {
        match self {
            Self::From50To54 => Some((50, 54)),
            Self::From55To59 => Some((55, 59)),
            Self::From60To64 => Some((60, 64)),
            Self::From65To69 => Some((65, 69)),
            Self::From70To74 => Some((70, 74)),
            Self::From75To79 => Some((75, 79)),
            Self::From80To84 => Some((80, 84)),
            Self::OutOfRange => None,
        }
    }

    pub fn is_priced(&self) -> bool {
        !matches!(self, Self::OutOfRange)
    }
}

impl std::fmt::Display for AgeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveAgeBand {
    pub effective_age: i32,
    pub band: AgeBand,
}

pub fn age(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

pub fn days_to_next_birthday(dob: NaiveDate, today: NaiveDate) -> i64 {
    let mut next = anniversary_in(dob, today.year());
    if next < today {
        next = anniversary_in(dob, today.year() + 1);
    }
    (next - today).num_days()
}

pub fn effective_age(dob: NaiveDate, today: NaiveDate) -> i32 {
    let base = age(dob, today);
    if days_to_next_birthday(dob, today) <= BIRTHDAY_GRACE_DAYS {
        base + 1
    } else {
        base
    }
}

pub fn age_band(effective_age: i32) -> AgeBand {
    AgeBand::PRICED
        .into_iter()
        .find(|band| {
            band.bounds().is_some_and(|(low, high)| (low..=high).contains(&effective_age))
        })
        .unwrap_or(AgeBand::OutOfRange)
}

pub fn effective_age_band(dob: NaiveDate, today: NaiveDate) -> EffectiveAgeBand {
    let effective_age = effective_age(dob, today);
    EffectiveAgeBand { effective_age, band: age_band(effective_age) }
}

// 29 February rolls over to 1 March in non-leap years.
fn anniversary_in(dob: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, dob.month(), dob.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(dob)
}
