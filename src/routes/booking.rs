use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::db::mongo::DB_NAME;
use crate::errors::BookingError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::booking::{
    Booking, BookingRequest, BookingStatus, CancelInput, CheckInInput, CheckOutInput,
    StatusUpdateInput,
};
use crate::models::vehicle::Vehicle;
use crate::services::booking_service::BookingService;
use crate::services::notification_service::NotificationService;
use crate::services::pricing_service::PricingService;

fn parse_object_id(id: &str, what: &str) -> Result<ObjectId, BookingError> {
    ObjectId::parse_str(id).map_err(|_| BookingError::validation(format!("invalid {} id", what)))
}

/// Price a prospective booking without persisting anything.
pub async fn quote(
    data: web::Data<Arc<Client>>,
    input: web::Json<BookingRequest>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let input = input.into_inner();

    let vehicle_id = parse_object_id(&input.vehicle_id, "vehicle")?;
    let vehicles: mongodb::Collection<Vehicle> = client.database(DB_NAME).collection("Vehicles");
    let vehicle = vehicles
        .find_one(doc! { "_id": vehicle_id })
        .await?
        .ok_or_else(|| BookingError::not_found("Vehicle not found"))?;

    let breakdown = PricingService::compute_quote(
        &vehicle.pricing,
        input.start_date,
        input.end_date,
        &input.guest_info,
        &input.extras,
        &input.insurance,
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": breakdown,
    })))
}

pub async fn create_booking(
    data: web::Data<Arc<Client>>,
    user: AuthenticatedUser,
    input: web::Json<BookingRequest>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let user_id = parse_object_id(&user.user_id, "user")?;

    let booking = BookingService::create(&client, user_id, &user.email, &input).await?;

    NotificationService::send_booking_confirmation(&booking.contact_email, &booking).await;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Booking created",
        "data": booking,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

pub async fn get_my_bookings(
    data: web::Data<Arc<Client>>,
    user: AuthenticatedUser,
    query: web::Query<BookingListQuery>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let user_id = parse_object_id(&user.user_id, "user")?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let mut filter = doc! { "user_id": user_id };
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }

    let bookings: mongodb::Collection<Booking> = client.database(DB_NAME).collection("Bookings");
    let total = bookings.count_documents(filter.clone()).await?;
    let results: Vec<Booking> = bookings
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip((page - 1) * limit as u64)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "bookings": results,
            "pagination": {
                "total": total,
                "pages": (total as f64 / limit as f64).ceil() as u64,
                "current_page": page,
                "per_page": limit,
            },
        },
    })))
}

pub async fn get_booking(
    data: web::Data<Arc<Client>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let booking_id = parse_object_id(&path.into_inner(), "booking")?;

    let booking = BookingService::load(&client, booking_id).await?;

    let is_owner = user
        .user_id
        .parse::<ObjectId>()
        .map(|id| id == booking.user_id)
        .unwrap_or(false);
    if !user.is_staff() && !is_owner {
        return Ok(HttpResponse::Forbidden().json(json!({
            "success": false,
            "message": "Forbidden",
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": booking,
    })))
}

/// Agent/admin status transition. Cancellations route through the refund
/// flow; everything else is a plain transition.
pub async fn update_status(
    data: web::Data<Arc<Client>>,
    stripe: web::Data<Arc<stripe::Client>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    input: web::Json<StatusUpdateInput>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let booking_id = parse_object_id(&path.into_inner(), "booking")?;
    let input = input.into_inner();

    let booking = BookingService::load(&client, booking_id).await?;
    let staff_id = ObjectId::parse_str(&user.user_id).ok();

    let updated = if input.status == BookingStatus::Cancelled {
        BookingService::cancel(
            &client,
            Some(stripe.as_ref()),
            booking,
            staff_id,
            input.cancellation_reason,
        )
        .await?
    } else {
        BookingService::transition(&client, booking, input.status).await?
    };

    NotificationService::send_status_update(&updated.contact_email, &updated).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking status updated",
        "data": updated,
    })))
}

/// Renter-initiated cancellation of their own booking.
pub async fn cancel_booking(
    data: web::Data<Arc<Client>>,
    stripe: web::Data<Arc<stripe::Client>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    input: web::Json<CancelInput>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let booking_id = parse_object_id(&path.into_inner(), "booking")?;
    let caller_id = parse_object_id(&user.user_id, "user")?;

    let booking = BookingService::load(&client, booking_id).await?;
    if !user.is_staff() && booking.user_id != caller_id {
        return Ok(HttpResponse::Forbidden().json(json!({
            "success": false,
            "message": "Forbidden",
        })));
    }

    let cancelled = BookingService::cancel(
        &client,
        Some(stripe.as_ref()),
        booking,
        Some(caller_id),
        input.into_inner().reason,
    )
    .await?;

    NotificationService::send_status_update(&cancelled.contact_email, &cancelled).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking cancelled",
        "data": cancelled,
    })))
}

pub async fn check_in(
    data: web::Data<Arc<Client>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    input: web::Json<CheckInInput>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let booking_id = parse_object_id(&path.into_inner(), "booking")?;
    let staff_id = ObjectId::parse_str(&user.user_id).ok();

    let booking = BookingService::load(&client, booking_id).await?;
    let updated = BookingService::check_in(&client, booking, input.into_inner(), staff_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Check-in completed",
        "data": updated,
    })))
}

pub async fn check_out(
    data: web::Data<Arc<Client>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    input: web::Json<CheckOutInput>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let booking_id = parse_object_id(&path.into_inner(), "booking")?;
    let staff_id = ObjectId::parse_str(&user.user_id).ok();

    let booking = BookingService::load(&client, booking_id).await?;
    let updated = BookingService::check_out(&client, booking, input.into_inner(), staff_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Check-out completed",
        "data": updated,
    })))
}
