pub mod booking;
pub mod health;
pub mod insurance;
pub mod vehicle;
