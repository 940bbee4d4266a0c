pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod clients;
pub mod health;
