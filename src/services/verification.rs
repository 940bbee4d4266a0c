use std::sync::Arc;

use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, PaymentStatus};
use crate::services::notifier::BookingConfirmation;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct VerifyAssignRequest {
    /// Omitted fields keep their current value; partial updates are allowed.
    pub is_payment_verified: Option<bool>,
    pub agent_id: Option<String>,
}

pub struct VerifyOutcome {
    pub booking: Booking,
    /// True on the edge where this call first moved the booking to Confirmed.
    pub newly_confirmed: bool,
}

/// The admin verification & assignment transition. Applies the proposed
/// verification flag and agent binding, then recomputes status: Confirmed
/// requires both a verified payment and a bound agent. The write is a
/// compare-and-set on the booking version; losing the race is a retryable
/// Conflict. Completed bookings keep their status — only the explicit
/// mark-completed action touches that state.
pub fn verify_and_assign(
    conn: &rusqlite::Connection,
    booking_id: &str,
    request: &VerifyAssignRequest,
) -> Result<VerifyOutcome, AppError> {
    let booking = queries::get_booking_by_id(conn, booking_id)
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if let Some(agent_id) = &request.agent_id {
        queries::get_agent_by_id(conn, agent_id)
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(format!("agent {agent_id}")))?;
    }

    let verified = request.is_payment_verified.unwrap_or(booking.is_payment_verified);
    let agent_id = request.agent_id.clone().or_else(|| booking.agent_id.clone());

    let status = if booking.status == BookingStatus::Completed {
        BookingStatus::Completed
    } else if verified && agent_id.is_some() {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Pending
    };

    let updated = queries::update_booking_cas(
        conn,
        &booking.id,
        booking.version,
        verified,
        PaymentStatus::from_verified(verified),
        agent_id.as_deref(),
        status,
    )
    .map_err(AppError::Database)?;

    if !updated {
        return Err(AppError::Conflict(format!(
            "booking {booking_id} was updated concurrently, retry"
        )));
    }

    let newly_confirmed =
        status == BookingStatus::Confirmed && booking.status != BookingStatus::Confirmed;

    tracing::info!(
        booking_id = %booking.id,
        verified,
        agent = agent_id.as_deref().unwrap_or("-"),
        status = status.as_str(),
        "booking verification updated"
    );

    Ok(VerifyOutcome {
        booking: Booking {
            is_payment_verified: verified,
            payment_status: PaymentStatus::from_verified(verified),
            agent_id,
            status,
            version: booking.version + 1,
            ..booking
        },
        newly_confirmed,
    })
}

/// Explicit admin action marking the service as delivered, independent of
/// payment and agent state.
pub fn mark_completed(conn: &rusqlite::Connection, booking_id: &str) -> Result<Booking, AppError> {
    let booking = queries::get_booking_by_id(conn, booking_id)
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    let updated = queries::complete_booking_cas(conn, &booking.id, booking.version)
        .map_err(AppError::Database)?;
    if !updated {
        return Err(AppError::Conflict(format!(
            "booking {booking_id} was updated concurrently, retry"
        )));
    }

    Ok(Booking {
        status: BookingStatus::Completed,
        version: booking.version + 1,
        ..booking
    })
}

/// Fire-and-forget confirmation email for a booking that just reached
/// Confirmed. The admin response never waits on the send, and a failed send
/// is logged, not surfaced.
pub fn notify_confirmation(state: &Arc<AppState>, booking: &Booking) {
    let confirmation = {
        let db = state.db.lock().unwrap();

        let client = match queries::get_client_by_id(&db, &booking.client_id) {
            Ok(Some(c)) => c,
            Ok(None) => {
                tracing::error!(booking_id = %booking.id, "confirmed booking has unknown client");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load client for confirmation email");
                return;
            }
        };

        let agent_name = booking
            .agent_id
            .as_deref()
            .and_then(|id| queries::get_agent_by_id(&db, id).ok().flatten())
            .map(|a| a.name)
            .unwrap_or_else(|| "our team".to_string());

        BookingConfirmation {
            to: client.email,
            name: client.name,
            booking_id: booking.id.clone(),
            agent_name,
        }
    };

    let state = Arc::clone(state);
    tokio::spawn(async move {
        if let Err(e) = state.notifier.send_booking_confirmation(&confirmation).await {
            tracing::error!(
                error = %e,
                booking_id = %confirmation.booking_id,
                "failed to send booking confirmation email"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Agent, Client, PaymentMethod};
    use chrono::Utc;
    use rusqlite::Connection;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn seed_people(conn: &Connection) {
        let now = Utc::now().naive_utc();
        queries::insert_client(
            conn,
            &Client {
                id: "client-1".to_string(),
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                phone: "+911234567890".to_string(),
                address: None,
                api_token: "tok-client-1".to_string(),
                created_at: now,
            },
        )
        .unwrap();

        conn.execute(
            "INSERT INTO locations (id, name, city, state) VALUES ('loc-1', 'Puri', 'Puri', 'Odisha')",
            [],
        )
        .unwrap();

        queries::insert_agent(
            conn,
            &Agent {
                id: "agent-1".to_string(),
                name: "Pandit Sharma".to_string(),
                email: "sharma@example.com".to_string(),
                phone: "+919999999999".to_string(),
                location_id: "loc-1".to_string(),
                created_at: now,
            },
        )
        .unwrap();
    }

    fn seed_booking(conn: &Connection) -> Booking {
        let now = Utc::now().naive_utc();
        let booking = Booking {
            id: "booking-1".to_string(),
            client_id: "client-1".to_string(),
            service_id: Some("svc-1".to_string()),
            location_id: Some("loc-1".to_string()),
            puja_id: None,
            tier_name: "Basic".to_string(),
            price: 1500,
            payment_method: PaymentMethod::Qr,
            transaction_id: Some("UTR123".to_string()),
            payment_details: None,
            is_payment_verified: false,
            payment_status: PaymentStatus::Pending,
            agent_id: None,
            status: BookingStatus::Pending,
            booking_date: now.date(),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        queries::create_booking(conn, &booking).unwrap();
        booking
    }

    #[test]
    fn test_verify_without_agent_stays_pending() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        let outcome = verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(true),
                agent_id: None,
            },
        )
        .unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Pending);
        assert!(outcome.booking.is_payment_verified);
        assert_eq!(outcome.booking.payment_status, PaymentStatus::Completed);
        assert!(!outcome.newly_confirmed);

        let stored = queries::get_booking_by_id(&conn, "booking-1").unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        assert!(stored.is_payment_verified);
    }

    #[test]
    fn test_assign_without_verify_stays_pending() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        let outcome = verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: None,
                agent_id: Some("agent-1".to_string()),
            },
        )
        .unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Pending);
        assert!(!outcome.booking.is_payment_verified);
        assert_eq!(outcome.booking.agent_id.as_deref(), Some("agent-1"));
        assert!(!outcome.newly_confirmed);
    }

    #[test]
    fn test_both_factors_confirm() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        let outcome = verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(true),
                agent_id: Some("agent-1".to_string()),
            },
        )
        .unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Confirmed);
        assert!(outcome.newly_confirmed);

        let stored = queries::get_booking_by_id(&conn, "booking-1").unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
    }

    #[test]
    fn test_two_step_confirmation() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(true),
                agent_id: None,
            },
        )
        .unwrap();

        // Agent arrives later; previously-set verification still counts.
        let outcome = verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: None,
                agent_id: Some("agent-1".to_string()),
            },
        )
        .unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Confirmed);
        assert!(outcome.newly_confirmed);
    }

    #[test]
    fn test_repeat_call_is_idempotent_and_not_newly_confirmed() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        let request = VerifyAssignRequest {
            is_payment_verified: Some(true),
            agent_id: Some("agent-1".to_string()),
        };
        let first = verify_and_assign(&conn, "booking-1", &request).unwrap();
        assert!(first.newly_confirmed);

        let second = verify_and_assign(&conn, "booking-1", &request).unwrap();
        assert_eq!(second.booking.status, BookingStatus::Confirmed);
        assert!(!second.newly_confirmed);
    }

    #[test]
    fn test_unverify_demotes_to_pending() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(true),
                agent_id: Some("agent-1".to_string()),
            },
        )
        .unwrap();

        let outcome = verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(false),
                agent_id: None,
            },
        )
        .unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Pending);
        assert_eq!(outcome.booking.payment_status, PaymentStatus::Pending);
        // Agent binding survives the un-verify.
        assert_eq!(outcome.booking.agent_id.as_deref(), Some("agent-1"));
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        let result = verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(true),
                agent_id: Some("agent-missing".to_string()),
            },
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_unknown_booking_rejected() {
        let conn = setup_db();
        seed_people(&conn);

        let result = verify_and_assign(&conn, "booking-missing", &VerifyAssignRequest::default());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_stale_version_conflicts() {
        let conn = setup_db();
        seed_people(&conn);
        let booking = seed_booking(&conn);

        // Simulate a concurrent writer bumping the version between our read
        // and write.
        let request = VerifyAssignRequest {
            is_payment_verified: Some(true),
            agent_id: None,
        };
        let outcome = verify_and_assign(&conn, &booking.id, &request).unwrap();
        assert_eq!(outcome.booking.version, booking.version + 1);

        let raced = queries::update_booking_cas(
            &conn,
            &booking.id,
            booking.version,
            true,
            PaymentStatus::Completed,
            None,
            BookingStatus::Pending,
        )
        .unwrap();
        assert!(!raced);
    }

    #[test]
    fn test_verification_never_mutates_price() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(true),
                agent_id: Some("agent-1".to_string()),
            },
        )
        .unwrap();
        mark_completed(&conn, "booking-1").unwrap();

        let stored = queries::get_booking_by_id(&conn, "booking-1").unwrap().unwrap();
        assert_eq!(stored.price, 1500);
        assert_eq!(stored.transaction_id.as_deref(), Some("UTR123"));
    }

    #[test]
    fn test_completed_survives_verification_recompute() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        mark_completed(&conn, "booking-1").unwrap();

        let outcome = verify_and_assign(
            &conn,
            "booking-1",
            &VerifyAssignRequest {
                is_payment_verified: Some(true),
                agent_id: Some("agent-1".to_string()),
            },
        )
        .unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Completed);
        assert!(!outcome.newly_confirmed);
    }

    #[test]
    fn test_mark_completed_independent_of_payment_state() {
        let conn = setup_db();
        seed_people(&conn);
        seed_booking(&conn);

        let booking = mark_completed(&conn, "booking-1").unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        assert!(!booking.is_payment_verified);
    }
}
