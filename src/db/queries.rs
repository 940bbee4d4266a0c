use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Agent, Booking, BookingStatus, Client, Coupon, DiscountType, Location, PaymentMethod,
    PaymentStatus, PricingTier, Puja, PujaPackage, Service, ServiceOffering,
};

fn now_str() -> String {
    Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Clients ──

pub fn insert_client(conn: &Connection, client: &Client) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO clients (id, name, email, phone, address, api_token, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            client.id,
            client.name,
            client.email,
            client.phone,
            client.address,
            client.api_token,
            client.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn parse_client_row(row: &rusqlite::Row) -> anyhow::Result<Client> {
    let created_at_str: String = row.get(6)?;
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        api_token: row.get(5)?,
        created_at: parse_dt(&created_at_str),
    })
}

const CLIENT_COLS: &str = "id, name, email, phone, address, api_token, created_at";

pub fn get_client_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Client>> {
    let result = conn.query_row(
        &format!("SELECT {CLIENT_COLS} FROM clients WHERE id = ?1"),
        params![id],
        |row| Ok(parse_client_row(row)),
    );

    match result {
        Ok(client) => Ok(Some(client?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_client_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<Client>> {
    let result = conn.query_row(
        &format!("SELECT {CLIENT_COLS} FROM clients WHERE api_token = ?1"),
        params![token],
        |row| Ok(parse_client_row(row)),
    );

    match result {
        Ok(client) => Ok(Some(client?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_client_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Client>> {
    let result = conn.query_row(
        &format!("SELECT {CLIENT_COLS} FROM clients WHERE email = ?1"),
        params![email],
        |row| Ok(parse_client_row(row)),
    );

    match result {
        Ok(client) => Ok(Some(client?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Agents ──

pub fn insert_agent(conn: &Connection, agent: &Agent) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO agents (id, name, email, phone, location_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            agent.id,
            agent.name,
            agent.email,
            agent.phone,
            agent.location_id,
            agent.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn parse_agent_row(row: &rusqlite::Row) -> anyhow::Result<Agent> {
    let created_at_str: String = row.get(5)?;
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        location_id: row.get(4)?,
        created_at: parse_dt(&created_at_str),
    })
}

pub fn get_agent_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Agent>> {
    let result = conn.query_row(
        "SELECT id, name, email, phone, location_id, created_at FROM agents WHERE id = ?1",
        params![id],
        |row| Ok(parse_agent_row(row)),
    );

    match result {
        Ok(agent) => Ok(Some(agent?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_agents(conn: &Connection, location_id: Option<&str>) -> anyhow::Result<Vec<Agent>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match location_id {
        Some(loc) => (
            "SELECT id, name, email, phone, location_id, created_at FROM agents
             WHERE location_id = ?1 ORDER BY name ASC"
                .to_string(),
            vec![Box::new(loc.to_string()) as Box<dyn rusqlite::types::ToSql>],
        ),
        None => (
            "SELECT id, name, email, phone, location_id, created_at FROM agents ORDER BY name ASC"
                .to_string(),
            vec![],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_agent_row(row)))?;

    let mut agents = vec![];
    for row in rows {
        agents.push(row??);
    }
    Ok(agents)
}

// ── Services ──

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, description) VALUES (?1, ?2, ?3)",
        params![service.id, service.name, service.description],
    )?;
    Ok(())
}

pub fn get_service_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, name, description FROM services WHERE id = ?1",
        params![id],
        |row| {
            Ok(Service {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        },
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM services ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Service {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    })?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

// ── Locations ──

pub fn insert_location(conn: &Connection, location: &Location) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO locations (id, name, city, state) VALUES (?1, ?2, ?3, ?4)",
        params![location.id, location.name, location.city, location.state],
    )?;

    for (pos, offering) in location.offerings.iter().enumerate() {
        insert_offering(conn, &location.id, offering, pos as i64)?;
    }
    Ok(())
}

pub fn insert_offering(
    conn: &Connection,
    location_id: &str,
    offering: &ServiceOffering,
    position: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO service_offerings (location_id, service_id, position) VALUES (?1, ?2, ?3)",
        params![location_id, offering.service_id, position],
    )?;
    let offering_id = conn.last_insert_rowid();

    for (pos, tier) in offering.tiers.iter().enumerate() {
        let features = serde_json::to_string(&tier.features)?;
        conn.execute(
            "INSERT INTO pricing_tiers (offering_id, tier_name, price, features, recommended, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                offering_id,
                tier.tier_name,
                tier.price,
                features,
                tier.recommended,
                pos as i64,
            ],
        )?;
    }
    Ok(())
}

fn load_offerings(conn: &Connection, location_id: &str) -> anyhow::Result<Vec<ServiceOffering>> {
    let mut stmt = conn.prepare(
        "SELECT id, service_id FROM service_offerings WHERE location_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![location_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut offerings = vec![];
    for row in rows {
        let (offering_id, service_id) = row?;

        let mut tier_stmt = conn.prepare(
            "SELECT tier_name, price, features, recommended FROM pricing_tiers
             WHERE offering_id = ?1 ORDER BY position ASC",
        )?;
        let tier_rows = tier_stmt.query_map(params![offering_id], |row| {
            let features_json: String = row.get(2)?;
            Ok(PricingTier {
                tier_name: row.get(0)?,
                price: row.get(1)?,
                features: serde_json::from_str(&features_json).unwrap_or_default(),
                recommended: row.get(3)?,
            })
        })?;

        let mut tiers = vec![];
        for tier in tier_rows {
            tiers.push(tier?);
        }

        offerings.push(ServiceOffering { service_id, tiers });
    }
    Ok(offerings)
}

pub fn get_location_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Location>> {
    let result = conn.query_row(
        "SELECT id, name, city, state FROM locations WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((id, name, city, state)) => {
            let offerings = load_offerings(conn, &id)?;
            Ok(Some(Location {
                id,
                name,
                city,
                state,
                offerings,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_locations(conn: &Connection) -> anyhow::Result<Vec<Location>> {
    let mut stmt = conn.prepare("SELECT id FROM locations ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let ids: Vec<String> = rows.collect::<Result<_, _>>()?;

    let mut locations = vec![];
    for id in ids {
        if let Some(location) = get_location_by_id(conn, &id)? {
            locations.push(location);
        }
    }
    Ok(locations)
}

// ── Pujas ──

pub fn insert_puja(conn: &Connection, puja: &Puja) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO pujas (id, name, location, temple_type) VALUES (?1, ?2, ?3, ?4)",
        params![puja.id, puja.name, puja.location, puja.temple_type],
    )?;

    for (pos, package) in puja.packages.iter().enumerate() {
        let features = serde_json::to_string(&package.features)?;
        conn.execute(
            "INSERT INTO puja_packages (puja_id, name, price_amount, features, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![puja.id, package.name, package.price_amount, features, pos as i64],
        )?;
    }
    Ok(())
}

fn load_packages(conn: &Connection, puja_id: &str) -> anyhow::Result<Vec<PujaPackage>> {
    let mut stmt = conn.prepare(
        "SELECT name, price_amount, features FROM puja_packages
         WHERE puja_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![puja_id], |row| {
        let features_json: String = row.get(2)?;
        Ok(PujaPackage {
            name: row.get(0)?,
            price_amount: row.get(1)?,
            features: serde_json::from_str(&features_json).unwrap_or_default(),
        })
    })?;

    let mut packages = vec![];
    for row in rows {
        packages.push(row?);
    }
    Ok(packages)
}

pub fn get_puja_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Puja>> {
    let result = conn.query_row(
        "SELECT id, name, location, temple_type FROM pujas WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((id, name, location, temple_type)) => {
            let packages = load_packages(conn, &id)?;
            Ok(Some(Puja {
                id,
                name,
                location,
                temple_type,
                packages,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_pujas(conn: &Connection) -> anyhow::Result<Vec<Puja>> {
    let mut stmt = conn.prepare("SELECT id FROM pujas ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let ids: Vec<String> = rows.collect::<Result<_, _>>()?;

    let mut pujas = vec![];
    for id in ids {
        if let Some(puja) = get_puja_by_id(conn, &id)? {
            pujas.push(puja);
        }
    }
    Ok(pujas)
}

// ── Coupons ──

pub fn insert_coupon(conn: &Connection, coupon: &Coupon) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO coupons (id, code, discount_type, discount_value, min_order_value, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            coupon.id,
            coupon.code.to_uppercase(),
            coupon.discount_type.as_str(),
            coupon.discount_value,
            coupon.min_order_value,
            coupon.is_active,
        ],
    )?;
    Ok(())
}

pub fn get_coupon_by_code(conn: &Connection, code: &str) -> anyhow::Result<Option<Coupon>> {
    let result = conn.query_row(
        "SELECT id, code, discount_type, discount_value, min_order_value, is_active
         FROM coupons WHERE code = ?1",
        params![code.to_uppercase()],
        |row| {
            let discount_type_str: String = row.get(2)?;
            Ok(Coupon {
                id: row.get(0)?,
                code: row.get(1)?,
                discount_type: DiscountType::parse(&discount_type_str),
                discount_value: row.get(3)?,
                min_order_value: row.get(4)?,
                is_active: row.get(5)?,
            })
        },
    );

    match result {
        Ok(coupon) => Ok(Some(coupon)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn record_redemption(
    conn: &Connection,
    coupon_id: &str,
    booking_id: &str,
    applied_discount: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO coupon_redemptions (coupon_id, booking_id, applied_discount, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![coupon_id, booking_id, applied_discount, now_str()],
    )?;
    Ok(())
}

// ── Bookings ──

const BOOKING_COLS: &str = "id, client_id, service_id, location_id, puja_id, tier_name, price, \
     payment_method, transaction_id, payment_details, is_payment_verified, payment_status, \
     agent_id, status, booking_date, created_at, updated_at, version";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        ),
        params![
            booking.id,
            booking.client_id,
            booking.service_id,
            booking.location_id,
            booking.puja_id,
            booking.tier_name,
            booking.price,
            booking.payment_method.as_str(),
            booking.transaction_id,
            booking.payment_details,
            booking.is_payment_verified,
            booking.payment_status.as_str(),
            booking.agent_id,
            booking.status.as_str(),
            booking.booking_date.format("%Y-%m-%d").to_string(),
            booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            booking.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            booking.version,
        ],
    )?;
    Ok(())
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let payment_method_str: String = row.get(7)?;
    let payment_status_str: String = row.get(11)?;
    let status_str: String = row.get(13)?;
    let booking_date_str: String = row.get(14)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;

    let booking_date = NaiveDate::parse_from_str(&booking_date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| Utc::now().date_naive());

    Ok(Booking {
        id: row.get(0)?,
        client_id: row.get(1)?,
        service_id: row.get(2)?,
        location_id: row.get(3)?,
        puja_id: row.get(4)?,
        tier_name: row.get(5)?,
        price: row.get(6)?,
        payment_method: PaymentMethod::parse(&payment_method_str),
        transaction_id: row.get(8)?,
        payment_details: row.get(9)?,
        is_payment_verified: row.get(10)?,
        payment_status: PaymentStatus::parse(&payment_status_str),
        agent_id: row.get(12)?,
        status: BookingStatus::parse(&status_str),
        booking_date,
        created_at: parse_dt(&created_at_str),
        updated_at: parse_dt(&updated_at_str),
        version: row.get(17)?,
    })
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_client(conn: &Connection, client_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLS} FROM bookings WHERE client_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![client_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLS} FROM bookings WHERE status = ?1
                 ORDER BY created_at DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("SELECT {BOOKING_COLS} FROM bookings ORDER BY created_at DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Compare-and-set write of the admin-mutable booking fields. Returns false
/// when the row moved on from `expected_version` (the caller lost a race).
#[allow(clippy::too_many_arguments)]
pub fn update_booking_cas(
    conn: &Connection,
    id: &str,
    expected_version: i64,
    is_payment_verified: bool,
    payment_status: PaymentStatus,
    agent_id: Option<&str>,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings
         SET is_payment_verified = ?1, payment_status = ?2, agent_id = ?3, status = ?4,
             updated_at = ?5, version = version + 1
         WHERE id = ?6 AND version = ?7",
        params![
            is_payment_verified,
            payment_status.as_str(),
            agent_id,
            status.as_str(),
            now_str(),
            id,
            expected_version,
        ],
    )?;
    Ok(count > 0)
}

pub fn complete_booking_cas(
    conn: &Connection,
    id: &str,
    expected_version: i64,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1, updated_at = ?2, version = version + 1
         WHERE id = ?3 AND version = ?4",
        params![BookingStatus::Completed.as_str(), now_str(), id, expected_version],
    )?;
    Ok(count > 0)
}
