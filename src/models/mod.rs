pub mod booking;
pub mod catalog;
pub mod client;

pub use booking::{Booking, BookingStatus, PaymentMethod, PaymentStatus};
pub use catalog::{Location, PricingTier, Puja, PujaPackage, Service, ServiceOffering};
pub use client::{Agent, Client, Coupon, DiscountType};
