use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::booking::InsuranceType;

/// One entry of the fixed insurance catalog. Prices are per rental day.
#[derive(Debug, Serialize, Clone)]
pub struct InsuranceTier {
    #[serde(rename = "type")]
    pub insurance_type: InsuranceType,
    pub name: &'static str,
    pub price: Decimal,
    pub deductible: Decimal,
    pub features: &'static [&'static str],
}

pub fn tier(insurance_type: InsuranceType) -> InsuranceTier {
    match insurance_type {
        InsuranceType::Basic => InsuranceTier {
            insurance_type: InsuranceType::Basic,
            name: "Basic Insurance",
            price: Decimal::new(15, 0),
            deductible: Decimal::new(1500, 0),
            features: &[
                "Liability insurance (EUR 1,000,000)",
                "Collision coverage (EUR 1,500 deductible)",
                "Theft protection",
                "Fire protection",
            ],
        },
        InsuranceType::Standard => InsuranceTier {
            insurance_type: InsuranceType::Standard,
            name: "Standard Insurance",
            price: Decimal::new(25, 0),
            deductible: Decimal::new(750, 0),
            features: &[
                "Liability insurance (EUR 2,000,000)",
                "Collision coverage (EUR 750 deductible)",
                "Theft protection",
                "Fire protection",
                "Glass breakage coverage",
                "Tire and rim protection",
                "Interior protection",
            ],
        },
        InsuranceType::Premium => InsuranceTier {
            insurance_type: InsuranceType::Premium,
            name: "Premium Insurance",
            price: Decimal::new(45, 0),
            deductible: Decimal::ZERO,
            features: &[
                "Liability insurance (EUR 5,000,000)",
                "Comprehensive coverage with zero deductible",
                "Theft protection",
                "Fire protection",
                "Glass breakage coverage",
                "Tire and rim protection",
                "Undercarriage protection",
                "Interior protection",
                "Personal belongings insured (up to EUR 500)",
                "24/7 roadside assistance included",
                "Free replacement vehicle in case of breakdown",
            ],
        },
    }
}

pub fn catalog() -> Vec<InsuranceTier> {
    vec![
        tier(InsuranceType::Basic),
        tier(InsuranceType::Standard),
        tier(InsuranceType::Premium),
    ]
}

/// Resolve a requested insurance type by name. Unknown names fall back to
/// the basic tier; that is deliberate quoting behavior, not an error, but
/// it is logged so the fallback stays visible.
pub fn parse_type(name: &str) -> InsuranceType {
    match name {
        "basic" => InsuranceType::Basic,
        "standard" => InsuranceType::Standard,
        "premium" => InsuranceType::Premium,
        other => {
            log::warn!("unknown insurance type '{}', falling back to basic", other);
            InsuranceType::Basic
        }
    }
}
