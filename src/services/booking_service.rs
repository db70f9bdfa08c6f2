use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::ReturnDocument;
use mongodb::{Client, ClientSession};
use rust_decimal::Decimal;

use crate::db::mongo::DB_NAME;
use crate::errors::BookingError;
use crate::models::booking::{
    Booking, BookingDates, BookingRequest, BookingStatus, Cancellation, CheckInInput,
    CheckInRecord, CheckOutInput, CheckOutRecord, DailyCounter, Damage, DepositStatus, GuestInfo,
    PaymentInfo, PaymentStatus,
};
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::services::availability_service::AvailabilityService;
use crate::services::payment_service::PaymentService;
use crate::services::pricing_service::PricingService;
use crate::services::refund_service::RefundService;

/// Mileage and deposit figures derived at check-out.
#[derive(Debug, PartialEq)]
pub struct CheckoutTotals {
    pub total_mileage: i64,
    pub excess_mileage: i64,
    pub excess_mileage_charge: Decimal,
}

pub struct BookingService;

impl BookingService {
    /// Lifecycle state machine. `cancelled` and `no_show` are reachable
    /// from every non-terminal state; nothing leaves a terminal state.
    pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (from, to),
            (Pending, Confirmed)
                | (Confirmed, Active)
                | (Active, Completed)
                | (Pending | Confirmed | Active, Cancelled)
                | (Pending | Confirmed | Active, NoShow)
        )
    }

    /// `BK{yymmdd}{seq:04}`, e.g. `BK2506140012`.
    pub fn format_booking_number(date: ChronoDateTime<Utc>, seq: i64) -> String {
        format!("BK{}{:04}", date.format("%y%m%d"), seq)
    }

    /// Next same-day sequence number via an atomic `$inc` upsert, so two
    /// concurrent creations can never produce the same booking number.
    async fn next_booking_number(
        client: &Client,
        session: &mut ClientSession,
        now: ChronoDateTime<Utc>,
    ) -> Result<String, BookingError> {
        let counters: mongodb::Collection<DailyCounter> =
            client.database(DB_NAME).collection("Counters");
        let key = format!("bookings-{}", now.format("%y%m%d"));

        let counter = counters
            .find_one_and_update(doc! { "_id": &key }, doc! { "$inc": { "seq": 1 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await?;

        let seq = counter.map(|c| c.seq).unwrap_or(1);
        Ok(Self::format_booking_number(now, seq))
    }

    pub async fn load(client: &Client, id: ObjectId) -> Result<Booking, BookingError> {
        let bookings: mongodb::Collection<Booking> =
            client.database(DB_NAME).collection("Bookings");
        bookings
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| BookingError::not_found("Booking not found"))
    }

    /// Create a booking: quote the request, then re-check the calendar and
    /// insert inside one transaction. Two overlapping submissions for the
    /// same vehicle cannot both commit, and a rejected request leaves no
    /// partial state behind.
    pub async fn create(
        client: &Client,
        user_id: ObjectId,
        contact_email: &str,
        request: &BookingRequest,
    ) -> Result<Booking, BookingError> {
        let payment_method = request
            .payment_method
            .ok_or_else(|| BookingError::validation("payment method is required"))?;

        let vehicle_id = ObjectId::parse_str(&request.vehicle_id)
            .map_err(|_| BookingError::validation("invalid vehicle id"))?;

        let vehicles: mongodb::Collection<Vehicle> =
            client.database(DB_NAME).collection("Vehicles");
        let vehicle = vehicles
            .find_one(doc! { "_id": vehicle_id })
            .await?
            .ok_or_else(|| BookingError::not_found("Vehicle not found"))?;

        if vehicle.status != VehicleStatus::Available {
            return Err(BookingError::Conflict(
                "Vehicle is not available for rental".to_string(),
            ));
        }

        // Validates dates and guest counts as a side effect
        let pricing = PricingService::compute_quote(
            &vehicle.pricing,
            request.start_date,
            request.end_date,
            &request.guest_info,
            &request.extras,
            &request.insurance,
        )?;

        let now = Utc::now();
        let bookings: mongodb::Collection<Booking> =
            client.database(DB_NAME).collection("Bookings");

        let mut session = client.start_session().await?;
        session.start_transaction().await?;

        let conflict_filter = AvailabilityService::conflict_filter(
            vehicle_id,
            DateTime::from_chrono(request.start_date),
            DateTime::from_chrono(request.end_date),
        );
        let conflicts = bookings
            .count_documents(conflict_filter)
            .session(&mut session)
            .await?;
        if conflicts > 0 {
            session.abort_transaction().await.ok();
            return Err(BookingError::Conflict(
                "Vehicle is not available for the requested dates".to_string(),
            ));
        }

        let booking_number = match Self::next_booking_number(client, &mut session, now).await {
            Ok(number) => number,
            Err(e) => {
                session.abort_transaction().await.ok();
                return Err(e);
            }
        };

        let booking = Booking {
            id: Some(ObjectId::new()),
            booking_number,
            vehicle_id,
            user_id,
            contact_email: contact_email.to_string(),
            dates: BookingDates {
                start: DateTime::from_chrono(request.start_date),
                end: DateTime::from_chrono(request.end_date),
                number_of_days: pricing.number_of_days,
            },
            guest_info: GuestInfo {
                adults: request.guest_info.adults,
                children: request.guest_info.children,
                total_guests: request.guest_info.adults + request.guest_info.children,
            },
            driver_info: request.driver_info.clone(),
            pricing,
            payment: PaymentInfo {
                method: payment_method,
                status: PaymentStatus::Pending,
                transaction_id: None,
            },
            status: BookingStatus::Pending,
            check_in: None,
            check_out: None,
            cancellation: None,
            created_at: Some(DateTime::from_chrono(now)),
            updated_at: Some(DateTime::from_chrono(now)),
        };

        if let Err(e) = bookings.insert_one(&booking).session(&mut session).await {
            session.abort_transaction().await.ok();
            return Err(e.into());
        }
        session.commit_transaction().await?;

        log::info!(
            "created booking {} for vehicle {}",
            booking.booking_number,
            vehicle_id
        );
        Ok(booking)
    }

    /// Plain status transition (e.g. agent approval `pending -> confirmed`,
    /// or marking a no-show). Cancellation goes through [`Self::cancel`].
    pub async fn transition(
        client: &Client,
        mut booking: Booking,
        to: BookingStatus,
    ) -> Result<Booking, BookingError> {
        if !Self::can_transition(booking.status, to) {
            return Err(BookingError::InvalidTransition(format!(
                "{} -> {}",
                booking.status.as_str(),
                to.as_str()
            )));
        }

        let now = DateTime::now();
        let bookings: mongodb::Collection<Booking> =
            client.database(DB_NAME).collection("Bookings");
        bookings
            .update_one(
                doc! { "_id": booking.id },
                doc! { "$set": { "status": to.as_str(), "updated_at": now } },
            )
            .await?;

        booking.status = to;
        booking.updated_at = Some(now);
        Ok(booking)
    }

    pub async fn check_in(
        client: &Client,
        mut booking: Booking,
        input: CheckInInput,
        staff_id: Option<ObjectId>,
    ) -> Result<Booking, BookingError> {
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition(format!(
                "check-in requires a confirmed booking, current status is {}",
                booking.status.as_str()
            )));
        }

        let now = DateTime::now();
        let record = CheckInRecord {
            actual: now,
            mileage_start: input.mileage_start,
            fuel_level: input.fuel_level,
            condition: input.condition,
            notes: input.notes,
            staff_id,
        };

        let record_bson = mongodb::bson::to_bson(&record)
            .map_err(|e| BookingError::Dependency(e.to_string()))?;
        let bookings: mongodb::Collection<Booking> =
            client.database(DB_NAME).collection("Bookings");
        bookings
            .update_one(
                doc! { "_id": booking.id },
                doc! { "$set": {
                    "check_in": record_bson,
                    "status": BookingStatus::Active.as_str(),
                    "updated_at": now,
                } },
            )
            .await?;

        booking.check_in = Some(record);
        booking.status = BookingStatus::Active;
        booking.updated_at = Some(now);
        Ok(booking)
    }

    /// Mileage math for check-out: everything beyond the per-day allowance
    /// is billed at the vehicle's per-km surcharge.
    pub fn checkout_totals(
        mileage_start: i64,
        mileage_end: i64,
        included_per_day: i64,
        number_of_days: i64,
        extra_cost: Decimal,
    ) -> Result<CheckoutTotals, BookingError> {
        if mileage_end < mileage_start {
            return Err(BookingError::validation(
                "end mileage cannot be below start mileage",
            ));
        }
        let total_mileage = mileage_end - mileage_start;
        let included = included_per_day * number_of_days;
        let excess_mileage = (total_mileage - included).max(0);
        let excess_mileage_charge = (Decimal::from(excess_mileage) * extra_cost).round_dp(2);

        Ok(CheckoutTotals {
            total_mileage,
            excess_mileage,
            excess_mileage_charge,
        })
    }

    /// Deposit release after damages: the sum of estimated repair costs is
    /// withheld, floored at zero. Returns (damage total, release amount).
    pub fn deposit_release(deposit: Decimal, damages: &[Damage]) -> (Decimal, Decimal) {
        let damage_total: Decimal = damages.iter().map(|d| d.estimated_cost).sum();
        let release = (deposit - damage_total).max(Decimal::ZERO);
        (damage_total, release.round_dp(2))
    }

    pub async fn check_out(
        client: &Client,
        mut booking: Booking,
        input: CheckOutInput,
        staff_id: Option<ObjectId>,
    ) -> Result<Booking, BookingError> {
        if booking.status != BookingStatus::Active {
            return Err(BookingError::InvalidTransition(format!(
                "check-out requires an active booking, current status is {}",
                booking.status.as_str()
            )));
        }
        let check_in = booking.check_in.as_ref().ok_or_else(|| {
            BookingError::InvalidTransition("booking has no check-in record".to_string())
        })?;

        let vehicles: mongodb::Collection<Vehicle> =
            client.database(DB_NAME).collection("Vehicles");
        let vehicle = vehicles
            .find_one(doc! { "_id": booking.vehicle_id })
            .await?
            .ok_or_else(|| BookingError::not_found("Vehicle not found"))?;

        let totals = Self::checkout_totals(
            check_in.mileage_start,
            input.mileage_end,
            vehicle.pricing.mileage.included_per_day,
            booking.dates.number_of_days,
            vehicle.pricing.mileage.extra_cost,
        )?;

        let now = DateTime::now();
        let record = CheckOutRecord {
            actual: now,
            mileage_end: input.mileage_end,
            fuel_level: input.fuel_level,
            total_mileage: totals.total_mileage,
            excess_mileage: totals.excess_mileage,
            excess_mileage_charge: totals.excess_mileage_charge,
            damages: input.damages,
            notes: input.notes,
            staff_id,
        };

        let (damage_total, release_amount) =
            Self::deposit_release(booking.pricing.deposit.amount, &record.damages);
        booking.pricing.deposit.release_amount = Some(release_amount);
        if damage_total > Decimal::ZERO {
            booking.pricing.deposit.forfeit_reason = Some("Vehicle damages".to_string());
            booking.pricing.deposit.status = if release_amount == Decimal::ZERO {
                DepositStatus::Forfeited
            } else {
                DepositStatus::PartialRelease
            };
        } else {
            booking.pricing.deposit.status = DepositStatus::Released;
        }

        let record_bson = mongodb::bson::to_bson(&record)
            .map_err(|e| BookingError::Dependency(e.to_string()))?;
        let deposit_bson = mongodb::bson::to_bson(&booking.pricing.deposit)
            .map_err(|e| BookingError::Dependency(e.to_string()))?;
        let bookings: mongodb::Collection<Booking> =
            client.database(DB_NAME).collection("Bookings");
        bookings
            .update_one(
                doc! { "_id": booking.id },
                doc! { "$set": {
                    "check_out": record_bson,
                    "pricing.deposit": deposit_bson,
                    "status": BookingStatus::Completed.as_str(),
                    "updated_at": now,
                } },
            )
            .await?;

        booking.check_out = Some(record);
        booking.status = BookingStatus::Completed;
        booking.updated_at = Some(now);
        Ok(booking)
    }

    /// Cancel a non-terminal booking. The refund policy result is attached
    /// to the cancellation record and committed first; only then is the
    /// payment collaborator asked to move money. A refund failure is
    /// logged and recorded as `refund_processed: false`, it never rolls
    /// back the cancellation.
    pub async fn cancel(
        client: &Client,
        stripe_client: Option<&stripe::Client>,
        mut booking: Booking,
        cancelled_by: Option<ObjectId>,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        if !Self::can_transition(booking.status, BookingStatus::Cancelled) {
            return Err(BookingError::InvalidTransition(format!(
                "{} -> cancelled",
                booking.status.as_str()
            )));
        }

        let now = Utc::now();
        let days_until_start =
            RefundService::days_until_start(booking.dates.start.to_chrono(), now);
        let refund = RefundService::compute_refund(booking.pricing.total_amount, days_until_start);

        let mut cancellation = Cancellation {
            cancelled_at: DateTime::from_chrono(now),
            cancelled_by,
            reason,
            refund_amount: refund.refund_amount,
            refund_percentage: refund.refund_percentage,
            refund_status: "pending".to_string(),
            refund_processed: false,
        };

        let bookings: mongodb::Collection<Booking> =
            client.database(DB_NAME).collection("Bookings");
        let cancellation_bson = mongodb::bson::to_bson(&cancellation)
            .map_err(|e| BookingError::Dependency(e.to_string()))?;
        bookings
            .update_one(
                doc! { "_id": booking.id },
                doc! { "$set": {
                    "status": BookingStatus::Cancelled.as_str(),
                    "cancellation": cancellation_bson,
                    "updated_at": DateTime::from_chrono(now),
                } },
            )
            .await?;

        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Some(DateTime::from_chrono(now));

        // The cancellation is committed; from here every collaborator
        // failure is recorded but swallowed.
        if refund.refund_amount > Decimal::ZERO {
            let outcome = match (stripe_client, &booking.payment.transaction_id) {
                (Some(stripe), Some(payment_intent)) => {
                    PaymentService::refund_payment(stripe, payment_intent, refund.refund_amount)
                        .await
                }
                _ => Err(BookingError::Dependency(
                    "no payment transaction to refund".to_string(),
                )),
            };

            match outcome {
                Ok(_) => {
                    cancellation.refund_status = "completed".to_string();
                    cancellation.refund_processed = true;
                    booking.payment.status = if refund.refund_percentage == 100 {
                        PaymentStatus::Refunded
                    } else {
                        PaymentStatus::PartialRefund
                    };
                }
                Err(e) => {
                    log::error!(
                        "refund of {} for booking {} failed: {}",
                        refund.refund_amount,
                        booking.booking_number,
                        e
                    );
                    cancellation.refund_status = "failed".to_string();
                }
            }

            let payment_bson = mongodb::bson::to_bson(&booking.payment)
                .map_err(|e| BookingError::Dependency(e.to_string()))?;
            let cancellation_bson = mongodb::bson::to_bson(&cancellation)
                .map_err(|e| BookingError::Dependency(e.to_string()))?;
            if let Err(e) = bookings
                .update_one(
                    doc! { "_id": booking.id },
                    doc! { "$set": {
                        "cancellation": cancellation_bson,
                        "payment": payment_bson,
                    } },
                )
                .await
            {
                log::error!(
                    "failed to record refund outcome for booking {}: {}",
                    booking.booking_number,
                    e
                );
            }
        }

        booking.cancellation = Some(cancellation);
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transition_matrix() {
        use BookingStatus::*;

        assert!(BookingService::can_transition(Pending, Confirmed));
        assert!(BookingService::can_transition(Confirmed, Active));
        assert!(BookingService::can_transition(Active, Completed));

        assert!(BookingService::can_transition(Pending, Cancelled));
        assert!(BookingService::can_transition(Confirmed, Cancelled));
        assert!(BookingService::can_transition(Active, Cancelled));
        assert!(BookingService::can_transition(Confirmed, NoShow));

        // Terminal states stay terminal
        assert!(!BookingService::can_transition(Completed, Cancelled));
        assert!(!BookingService::can_transition(Cancelled, Cancelled));
        assert!(!BookingService::can_transition(Cancelled, Confirmed));
        assert!(!BookingService::can_transition(NoShow, Active));

        // No skipping forward
        assert!(!BookingService::can_transition(Pending, Active));
        assert!(!BookingService::can_transition(Pending, Completed));
        assert!(!BookingService::can_transition(Confirmed, Completed));
        assert!(!BookingService::can_transition(Active, Confirmed));
    }

    #[test]
    fn test_booking_number_format() {
        let date = Utc.with_ymd_and_hms(2025, 6, 14, 9, 30, 0).unwrap();
        assert_eq!(
            BookingService::format_booking_number(date, 12),
            "BK2506140012"
        );
        assert_eq!(
            BookingService::format_booking_number(date, 1),
            "BK2506140001"
        );
    }

    #[test]
    fn test_checkout_totals() {
        // 10 days at 200 km/day included, 0.35/km beyond
        let totals =
            BookingService::checkout_totals(10_000, 12_500, 200, 10, Decimal::new(35, 2)).unwrap();
        assert_eq!(totals.total_mileage, 2_500);
        assert_eq!(totals.excess_mileage, 500);
        assert_eq!(totals.excess_mileage_charge, Decimal::from(175));

        // Within the allowance: no charge
        let totals =
            BookingService::checkout_totals(10_000, 11_800, 200, 10, Decimal::new(35, 2)).unwrap();
        assert_eq!(totals.excess_mileage, 0);
        assert_eq!(totals.excess_mileage_charge, Decimal::ZERO);

        assert!(matches!(
            BookingService::checkout_totals(10_000, 9_000, 200, 10, Decimal::new(35, 2)),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_deposit_release_floors_at_zero() {
        let damages = vec![
            Damage {
                description: "Scratched bumper".to_string(),
                severity: None,
                estimated_cost: Decimal::from(300),
            },
            Damage {
                description: "Broken awning".to_string(),
                severity: None,
                estimated_cost: Decimal::from(450),
            },
        ];

        let (total, release) = BookingService::deposit_release(Decimal::from(1000), &damages);
        assert_eq!(total, Decimal::from(750));
        assert_eq!(release, Decimal::from(250));

        // Damages above the deposit never produce a negative release
        let (total, release) = BookingService::deposit_release(Decimal::from(500), &damages);
        assert_eq!(total, Decimal::from(750));
        assert_eq!(release, Decimal::ZERO);

        let (total, release) = BookingService::deposit_release(Decimal::from(500), &[]);
        assert_eq!(total, Decimal::ZERO);
        assert_eq!(release, Decimal::from(500));
    }
}
