use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Available,
    Maintenance,
    Retired,
}

/// How an optional extra is billed.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    PerDay,
    PerRental,
    PerPerson,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VehicleExtra {
    pub name: String,
    pub price: Decimal,
    pub price_type: PriceType,
    pub max_quantity: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MileagePolicy {
    /// Included kilometres per rental day.
    pub included_per_day: i64,
    /// Surcharge per kilometre beyond the allowance (EUR).
    pub extra_cost: Decimal,
}

impl Default for MileagePolicy {
    fn default() -> Self {
        Self {
            included_per_day: 200,
            extra_cost: Decimal::new(35, 2), // 0.35 EUR/km
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VehiclePricing {
    pub base_price_per_day: Decimal,
    pub deposit: Decimal,
    #[serde(default)]
    pub cleaning_fee: Decimal,
    #[serde(default)]
    pub mileage: MileagePolicy,
    #[serde(default)]
    pub extras: Vec<VehicleExtra>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Vehicle {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub category: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub seats: Option<u32>,
    pub sleeps: Option<u32>,
    pub status: VehicleStatus,
    pub pricing: VehiclePricing,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}
