use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::BookingError;

pub struct PaymentService;

impl PaymentService {
    /// Ask Stripe to refund part or all of a captured payment intent.
    /// Amounts are EUR decimals; Stripe wants integer cents.
    pub async fn refund_payment(
        client: &stripe::Client,
        payment_intent: &str,
        amount: Decimal,
    ) -> Result<stripe::Refund, BookingError> {
        let intent_id = stripe::PaymentIntentId::from_str(payment_intent)
            .map_err(|e| BookingError::Dependency(format!("invalid payment intent id: {}", e)))?;
        let cents = (amount * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| {
                BookingError::Dependency(format!("refund amount {} out of range", amount))
            })?;

        let mut params = stripe::CreateRefund::new();
        params.payment_intent = Some(intent_id);
        params.amount = Some(cents);

        stripe::Refund::create(client, params)
            .await
            .map_err(|e| BookingError::Dependency(format!("stripe refund failed: {}", e)))
    }
}
