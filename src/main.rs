use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::sync::Arc;

use camper_rental_api::db;
use camper_rental_api::middleware::{auth::AuthMiddleware, role_auth::RequireRole};
use camper_rental_api::models::user::UserRole;
use camper_rental_api::routes;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        println!("Release mode");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    let mongo_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    let client = db::mongo::create_mongo_client(&mongo_uri).await;
    println!("MongoDB connection established");

    let stripe_secret = std::env::var("STRIPE_SECRET_KEY").unwrap_or_default();
    let stripe_client = Arc::new(stripe::Client::new(stripe_secret));

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(stripe_client.clone()))
            .route("/health", web::get().to(routes::health::health_check))
            .service(
                web::scope("/api")
                    // Public routes
                    .route(
                        "/insurance",
                        web::get().to(routes::insurance::get_insurance_options),
                    )
                    .service(
                        web::scope("/vehicles")
                            .route("", web::get().to(routes::vehicle::get_vehicles))
                            .route(
                                "/{id}/availability",
                                web::get().to(routes::vehicle::check_availability),
                            )
                            .route("/{id}", web::get().to(routes::vehicle::get_vehicle)),
                    )
                    .service(
                        web::scope("/bookings")
                            .route("/quote", web::post().to(routes::booking::quote))
                            // Protected routes
                            .service(
                                web::scope("")
                                    .wrap(AuthMiddleware)
                                    .route("", web::post().to(routes::booking::create_booking))
                                    .route(
                                        "/my-bookings",
                                        web::get().to(routes::booking::get_my_bookings),
                                    )
                                    .route(
                                        "/{id}/cancel",
                                        web::post().to(routes::booking::cancel_booking),
                                    )
                                    // The exact-match GET must come first; the
                                    // staff scope below prefix-matches /{id}
                                    // and would swallow renter reads.
                                    .route("/{id}", web::get().to(routes::booking::get_booking))
                                    // Agent/admin routes
                                    .service(
                                        web::scope("/{id}")
                                            .wrap(RequireRole::new(UserRole::Agent))
                                            .route(
                                                "/status",
                                                web::patch().to(routes::booking::update_status),
                                            )
                                            .route(
                                                "/check-in",
                                                web::post().to(routes::booking::check_in),
                                            )
                                            .route(
                                                "/check-out",
                                                web::post().to(routes::booking::check_out),
                                            ),
                                    ),
                            ),
                    ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
