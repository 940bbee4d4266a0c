use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub client_id: String,
    /// Exactly one of `service_id` (with `location_id`) or `puja_id` is set.
    pub service_id: Option<String>,
    pub location_id: Option<String>,
    pub puja_id: Option<String>,
    /// Tier/package name snapshotted at creation; never re-derived from the
    /// catalog afterwards.
    pub tier_name: String,
    /// Server-resolved price, snapshotted at creation.
    pub price: i64,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub payment_details: Option<String>,
    pub is_payment_verified: bool,
    pub payment_status: PaymentStatus,
    pub agent_id: Option<String>,
    pub status: BookingStatus,
    pub booking_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Bumped on every write; admin updates are compare-and-set on this.
    pub version: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Confirmed" => BookingStatus::Confirmed,
            "Completed" => BookingStatus::Completed,
            _ => BookingStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Razorpay,
    Qr,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Razorpay => "razorpay",
            PaymentMethod::Qr => "qr",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "razorpay" => PaymentMethod::Razorpay,
            _ => PaymentMethod::Qr,
        }
    }
}

/// Denormalized view of `is_payment_verified` kept on the row for listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Completed" => PaymentStatus::Completed,
            _ => PaymentStatus::Pending,
        }
    }

    pub fn from_verified(verified: bool) -> Self {
        if verified {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        }
    }
}
