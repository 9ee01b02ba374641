use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::age::AgeBand;

/// Enum token that selects annual billing; [`MONTHLY_PLAN_TOKEN`] selects monthly and no
/// other token is priced.
pub const ANNUAL_PLAN_TOKEN: &str = "yearly";
pub const MONTHLY_PLAN_TOKEN: &str = "monthly";

const ANNUAL_MONTHS: i64 = 12;
const ANNUAL_DISCOUNT_FACTOR: Decimal = Decimal::from_parts(9, 0, 0, false, 1);

/// Monthly base price per band, whole currency units.
const MONTHLY_PRICE_TABLE: [(AgeBand, u32); 7] = [
    (AgeBand::From50To54, 899),
    (AgeBand::From55To59, 999),
    (AgeBand::From60To64, 1199),
    (AgeBand::From65To69, 1399),
    (AgeBand::From70To74, 1599),
    (AgeBand::From75To79, 1799),
    (AgeBand::From80To84, 1999),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPlan {
    Monthly,
    Annual,
}

impl PaymentPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Maps a validated CRM payment-plan token onto a pricing plan.
    pub fn from_enum_token(token: &str) -> Option<Self> {
        match token {
            ANNUAL_PLAN_TOKEN => Some(Self::Annual),
            MONTHLY_PLAN_TOKEN => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "annual" | "yearly" => Some(Self::Annual),
            _ => None,
        }
    }
}

pub fn monthly_base_price(band: AgeBand) -> Option<u32> {
    MONTHLY_PRICE_TABLE.iter().find(|(candidate, _)| *candidate == band).map(|(_, price)| *price)
}

pub fn quote(band: AgeBand, plan: PaymentPlan) -> Option<u32> {
    let monthly = monthly_base_price(band)?;
    match plan {
        PaymentPlan::Monthly => Some(monthly),
        PaymentPlan::Annual => annual_price(monthly),
    }
}

/// Primary plus optional secondary quote. Any missing component voids the whole quote.
pub fn household_quote(
    primary: AgeBand,
    secondary: Option<AgeBand>,
    plan: Option<PaymentPlan>,
) -> Option<u32> {
    let plan = plan?;
    let primary_quote = quote(primary, plan)?;
    let secondary_quote = match secondary {
        Some(band) => quote(band, plan)?,
        None => 0,
    };
    primary_quote.checked_add(secondary_quote)
}

fn annual_price(monthly: u32) -> Option<u32> {
    let annual = Decimal::from(monthly) * Decimal::from(ANNUAL_MONTHS) * ANNUAL_DISCOUNT_FACTOR;
    annual.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_u32()
}

#[cfg(test)]
mod tests {
    use crate::age::AgeBand;

    use super::{household_quote, monthly_base_price, quote, PaymentPlan};

    #[test]
    fn annual_quote_is_rounded_discounted_year_of_monthly() {
        for band in AgeBand::PRICED {
            let monthly = quote(band, PaymentPlan::Monthly).expect("monthly quote");
            let expected = (f64::from(monthly) * 12.0 * 0.9).round() as u32;
            assert_eq!(quote(band, PaymentPlan::Annual), Some(expected), "band {band}");
        }
    }

    #[test]
    fn sixty_five_band_annual_quote() {
        assert_eq!(quote(AgeBand::From65To69, PaymentPlan::Annual), Some(15109));
        assert_eq!(quote(AgeBand::From65To69, PaymentPlan::Monthly), Some(1399));
    }

    #[test]
    fn out_of_range_is_never_priced() {
        assert_eq!(quote(AgeBand::OutOfRange, PaymentPlan::Monthly), None);
        assert_eq!(quote(AgeBand::OutOfRange, PaymentPlan::Annual), None);
        assert_eq!(monthly_base_price(AgeBand::OutOfRange), None);
    }

    #[test]
    fn monthly_prices_increase_with_age() {
        let prices: Vec<u32> = AgeBand::PRICED
            .into_iter()
            .map(|band| monthly_base_price(band).expect("priced band"))
            .collect();
        assert!(prices.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn household_quote_sums_both_applicants() {
        let total = household_quote(
            AgeBand::From50To54,
            Some(AgeBand::From55To59),
            Some(PaymentPlan::Monthly),
        );
        assert_eq!(total, Some(899 + 999));

        let single = household_quote(AgeBand::From50To54, None, Some(PaymentPlan::Monthly));
        assert_eq!(single, Some(899));
    }

    #[test]
    fn household_quote_is_void_without_plan_or_with_unpriced_partner() {
        assert_eq!(household_quote(AgeBand::From50To54, None, None), None);
        assert_eq!(
            household_quote(
                AgeBand::From50To54,
                Some(AgeBand::OutOfRange),
                Some(PaymentPlan::Annual)
            ),
            None
        );
        assert_eq!(
            household_quote(AgeBand::OutOfRange, None, Some(PaymentPlan::Annual)),
            None
        );
    }

    #[test]
    fn plan_tokens_map_to_pricing_plans() {
        assert_eq!(PaymentPlan::from_enum_token("yearly"), Some(PaymentPlan::Annual));
        assert_eq!(PaymentPlan::from_enum_token("monthly"), Some(PaymentPlan::Monthly));
        assert_eq!(PaymentPlan::from_enum_token("weekly"), None);
        assert_eq!(PaymentPlan::parse(" Annual "), Some(PaymentPlan::Annual));
    }
}
