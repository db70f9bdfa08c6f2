use serde_json::json;

use crate::models::booking::{Booking, BookingStatus};

/// Fire-and-forget transactional mail, delivered through the HTTP relay
/// configured via `MAIL_API_URL`. A failed or unconfigured relay is logged
/// and swallowed; notifications must never fail the lifecycle transition
/// that triggered them.
pub struct NotificationService;

impl NotificationService {
    async fn deliver(
        to: &str,
        subject: &str,
        template: &str,
        data: serde_json::Value,
    ) -> Result<(), String> {
        let url = match std::env::var("MAIL_API_URL") {
            Ok(url) => url,
            Err(_) => {
                log::debug!("MAIL_API_URL not configured, skipping '{}' mail", template);
                return Ok(());
            }
        };

        reqwest::Client::new()
            .post(&url)
            .json(&json!({
                "to": to,
                "subject": subject,
                "template": template,
                "data": data,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    pub async fn send_booking_confirmation(to: &str, booking: &Booking) {
        let result = Self::deliver(
            to,
            "Your booking request",
            "booking_confirmation",
            json!({
                "booking_number": booking.booking_number,
                "start_date": booking.dates.start.to_chrono().to_rfc3339(),
                "end_date": booking.dates.end.to_chrono().to_rfc3339(),
                "total_amount": booking.pricing.total_amount,
            }),
        )
        .await;

        if let Err(e) = result {
            log::warn!(
                "failed to send booking confirmation for {}: {}",
                booking.booking_number,
                e
            );
        }
    }

    pub async fn send_status_update(to: &str, booking: &Booking) {
        let message = match booking.status {
            BookingStatus::Confirmed => "Your booking has been confirmed",
            BookingStatus::Cancelled => "Your booking has been cancelled",
            BookingStatus::Completed => "Thank you for your booking",
            BookingStatus::Active => "Your rental has started",
            BookingStatus::NoShow => "Your booking was marked as a no-show",
            BookingStatus::Pending => "Your booking is awaiting confirmation",
        };

        let mut data = json!({
            "booking_number": booking.booking_number,
            "status": booking.status.as_str(),
            "message": message,
        });
        if let Some(cancellation) = &booking.cancellation {
            data["refund_amount"] = json!(cancellation.refund_amount);
            data["refund_percentage"] = json!(cancellation.refund_percentage);
        }

        let result = Self::deliver(
            to,
            &format!("Booking update - {}", message),
            "booking_status_update",
            data,
        )
        .await;

        if let Err(e) = result {
            log::warn!(
                "failed to send status update for {}: {}",
                booking.booking_number,
                e
            );
        }
    }
}
