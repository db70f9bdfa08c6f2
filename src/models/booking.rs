use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::vehicle::PriceType;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsuranceType {
    Basic,
    Standard,
    Premium,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Stripe,
    Paypal,
    BankTransfer,
    Cash,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    PartialRefund,
    Failed,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Held,
    Released,
    PartialRelease,
    Forfeited,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingDates {
    pub start: DateTime,
    pub end: DateTime,
    pub number_of_days: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GuestInfo {
    pub adults: u32,
    pub children: u32,
    /// adults + children; pets never count towards per-person pricing.
    pub total_guests: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DriverInfo {
    pub name: String,
    pub license_number: String,
}

/// One line of the priced extras on a booking, with the resolved catalog
/// price and the computed line total.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BookedExtra {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub price_type: PriceType,
    pub total: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InsuranceSelection {
    #[serde(rename = "type")]
    pub insurance_type: InsuranceType,
    pub price: Decimal,
    pub deductible: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DepositInfo {
    pub amount: Decimal,
    pub status: DepositStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forfeit_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TaxInfo {
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Itemized price snapshot, sealed onto the booking at creation time and
/// immutable afterwards. All amounts are EUR, rounded to two decimal
/// places when the breakdown is built.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub daily_rate: Decimal,
    pub number_of_days: i64,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub extras: Vec<BookedExtra>,
    pub extras_total: Decimal,
    pub insurance: InsuranceSelection,
    pub service_fee: Decimal,
    pub cleaning_fee: Decimal,
    pub deposit: DepositInfo,
    pub taxable_amount: Decimal,
    pub taxes: TaxInfo,
    pub total_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DamageSeverity {
    Minor,
    Moderate,
    Severe,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Damage {
    pub description: String,
    pub severity: Option<DamageSeverity>,
    pub estimated_cost: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CheckInRecord {
    pub actual: DateTime,
    pub mileage_start: i64,
    pub fuel_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<ObjectId>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CheckOutRecord {
    pub actual: DateTime,
    pub mileage_end: i64,
    pub fuel_level: u8,
    pub total_mileage: i64,
    pub excess_mileage: i64,
    pub excess_mileage_charge: Decimal,
    #[serde(default)]
    pub damages: Vec<Damage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<ObjectId>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Cancellation {
    pub cancelled_at: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub refund_amount: Decimal,
    pub refund_percentage: u32,
    /// pending / completed / failed
    pub refund_status: String,
    /// False when the payment collaborator rejected the refund; the
    /// cancellation itself stays committed regardless.
    pub refund_processed: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub booking_number: String,
    pub vehicle_id: ObjectId,
    pub user_id: ObjectId,
    /// Snapshot of the renter's email at creation time, used for
    /// lifecycle notifications.
    pub contact_email: String,
    pub dates: BookingDates,
    pub guest_info: GuestInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_info: Option<DriverInfo>,
    pub pricing: PriceBreakdown,
    pub payment: PaymentInfo,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<CheckInRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<CheckOutRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

/// Same-day sequence for human-readable booking numbers, incremented
/// atomically with `$inc` so concurrent creations never collide.
#[derive(Debug, Deserialize, Serialize)]
pub struct DailyCounter {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: i64,
}

// ---- request payloads ----

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GuestCounts {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtraSelection {
    pub name: String,
    pub quantity: u32,
}

fn default_insurance() -> String {
    "basic".to_string()
}

/// Transient request created per quote attempt. The same shape backs the
/// quote endpoint (driver/payment ignored) and booking creation (payment
/// method required).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingRequest {
    pub vehicle_id: String,
    pub start_date: ChronoDateTime<Utc>,
    pub end_date: ChronoDateTime<Utc>,
    pub guest_info: GuestCounts,
    #[serde(default)]
    pub extras: Vec<ExtraSelection>,
    #[serde(default = "default_insurance")]
    pub insurance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_info: Option<DriverInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateInput {
    pub status: BookingStatus,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelInput {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckInInput {
    pub mileage_start: i64,
    pub fuel_level: u8,
    pub condition: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckOutInput {
    pub mileage_end: i64,
    pub fuel_level: u8,
    #[serde(default)]
    pub damages: Vec<Damage>,
    pub notes: Option<String>,
}
