use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::db::mongo::DB_NAME;
use crate::errors::BookingError;
use crate::models::vehicle::Vehicle;
use crate::services::availability_service::AvailabilityService;

#[derive(Debug, Deserialize)]
pub struct VehicleListQuery {
    pub category: Option<String>,
}

pub async fn get_vehicles(
    data: web::Data<Arc<Client>>,
    query: web::Query<VehicleListQuery>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let vehicles: mongodb::Collection<Vehicle> = client.database(DB_NAME).collection("Vehicles");

    let mut filter = doc! { "status": "available" };
    if let Some(category) = &query.category {
        filter.insert("category", category);
    }

    let results: Vec<Vehicle> = vehicles.find(filter).await?.try_collect().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": results,
    })))
}

pub async fn get_vehicle(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let vehicle_id = ObjectId::parse_str(path.into_inner())
        .map_err(|_| BookingError::validation("invalid vehicle id"))?;

    let vehicles: mongodb::Collection<Vehicle> = client.database(DB_NAME).collection("Vehicles");
    let vehicle = vehicles
        .find_one(doc! { "_id": vehicle_id })
        .await?
        .ok_or_else(|| BookingError::not_found("Vehicle not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": vehicle,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Calendar check for a candidate date range against occupying bookings.
pub async fn check_availability(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, BookingError> {
    let client = data.into_inner();
    let vehicle_id = ObjectId::parse_str(path.into_inner())
        .map_err(|_| BookingError::validation("invalid vehicle id"))?;

    if query.end_date <= query.start_date {
        return Err(BookingError::validation(
            "end date must be after start date",
        ));
    }

    let vehicles: mongodb::Collection<Vehicle> = client.database(DB_NAME).collection("Vehicles");
    if vehicles
        .find_one(doc! { "_id": vehicle_id })
        .await?
        .is_none()
    {
        return Err(BookingError::not_found("Vehicle not found"));
    }

    let conflicts =
        AvailabilityService::count_conflicts(&client, vehicle_id, query.start_date, query.end_date)
            .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "available": conflicts == 0,
            "conflicting_bookings": conflicts,
        },
    })))
}
