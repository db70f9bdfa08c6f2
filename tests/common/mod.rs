use actix_cors::Cors;
use actix_web::dev::Service as _;
use actix_web::{middleware::Logger, web, App};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use camper_rental_api::db::mongo::create_mongo_client;
use camper_rental_api::middleware::{auth::AuthMiddleware, auth::Claims, role_auth::RequireRole};
use camper_rental_api::models::user::UserRole;
use camper_rental_api::routes;

pub const TEST_JWT_SECRET: &str = "test_secret";

pub struct TestApp {
    pub client: Arc<mongodb::Client>,
    pub stripe_client: Arc<stripe::Client>,
}

impl TestApp {
    pub async fn new() -> Self {
        std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);

        let mongo_uri = std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let client = create_mongo_client(&mongo_uri).await;
        let stripe_client = Arc::new(stripe::Client::new("sk_test_dummy".to_string()));

        Self {
            client,
            stripe_client,
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            // `test::call_service` panics on service-level errors; render
            // them into HTTP responses the way a real server would.
            .wrap_fn(|req, srv| {
                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => Ok(res.map_into_left_body()),
                        Err(err) => {
                            let res = actix_web::HttpResponse::from_error(err);
                            let req = actix_web::test::TestRequest::default().to_http_request();
                            Ok(actix_web::dev::ServiceResponse::new(req, res)
                                .map_into_right_body())
                        }
                    }
                }
            })
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(web::Data::new(self.client.clone()))
            .app_data(web::Data::new(self.stripe_client.clone()))
            .route("/health", web::get().to(routes::health::health_check))
            .service(
                web::scope("/api")
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
                                    .route("/{id}", web::get().to(routes::booking::get_booking))
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
    }
}

/// Signed bearer token for the given role, accepted by `AuthMiddleware`.
pub fn auth_token(role: &str) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: "renter@example.com".to_string(),
        exp: now + 3600,
        iat: now,
        user_id: mongodb::bson::oid::ObjectId::new().to_hex(),
        role: Some(role.to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("failed to sign test token")
}
