use actix_web::HttpResponse;
use serde_json::json;

use crate::services::insurance;
use crate::services::refund_service::REFUND_POLICY;

/// Static insurance catalog plus the cancellation refund policy, for
/// display during checkout.
pub async fn get_insurance_options() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "insurance": insurance::catalog(),
            "refund_policy": REFUND_POLICY,
        },
    }))
}
