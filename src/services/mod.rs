pub mod availability_service;
pub mod booking_service;
pub mod insurance;
pub mod notification_service;
pub mod payment_service;
pub mod pricing_service;
pub mod refund_service;
