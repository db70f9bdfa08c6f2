use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Client;

use crate::db::mongo::DB_NAME;
use crate::errors::BookingError;
use crate::models::booking::{Booking, BookingStatus};

/// Statuses that block a vehicle's calendar. Pending bookings do not hold
/// the dates; cancelled/no-show never do.
pub const OCCUPYING_STATUSES: [BookingStatus; 2] =
    [BookingStatus::Confirmed, BookingStatus::Active];

pub struct AvailabilityService;

impl AvailabilityService {
    /// Closed-interval overlap test: `stored.start <= candidate.end &&
    /// stored.end >= candidate.start`. Bookings sharing a boundary date DO
    /// conflict, which leaves a turnover day between back-to-back rentals.
    pub fn ranges_overlap(
        stored_start: DateTime<Utc>,
        stored_end: DateTime<Utc>,
        candidate_start: DateTime<Utc>,
        candidate_end: DateTime<Utc>,
    ) -> bool {
        stored_start <= candidate_end && stored_end >= candidate_start
    }

    /// Mongo filter mirroring [`Self::ranges_overlap`] against occupying
    /// bookings of one vehicle. Shared with booking creation so the
    /// in-transaction re-check uses the exact same predicate.
    pub fn conflict_filter(
        vehicle_id: ObjectId,
        start: mongodb::bson::DateTime,
        end: mongodb::bson::DateTime,
    ) -> Document {
        let statuses: Vec<&str> = OCCUPYING_STATUSES.iter().map(|s| s.as_str()).collect();
        doc! {
            "vehicle_id": vehicle_id,
            "status": { "$in": statuses },
            "dates.start": { "$lte": end },
            "dates.end": { "$gte": start },
        }
    }

    pub async fn count_conflicts(
        client: &Client,
        vehicle_id: ObjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, BookingError> {
        let bookings: mongodb::Collection<Booking> =
            client.database(DB_NAME).collection("Bookings");

        let filter = Self::conflict_filter(
            vehicle_id,
            mongodb::bson::DateTime::from_chrono(start),
            mongodb::bson::DateTime::from_chrono(end),
        );
        let count = bookings.count_documents(filter).await?;
        Ok(count)
    }

    pub async fn has_conflict(
        client: &Client,
        vehicle_id: ObjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        Ok(Self::count_conflicts(client, vehicle_id, start, end).await? > 0)
    }
}
