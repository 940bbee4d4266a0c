use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Coupon, DiscountType, PaymentMethod};

/// Which catalog a booking draws from. The two catalogs are mutually
/// exclusive per booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogSelector {
    Service {
        service_id: String,
        location_id: String,
        tier: String,
    },
    Puja {
        puja_id: String,
        package: String,
    },
}

/// Looks up the authoritative price for a selector. Any miss is a hard
/// NotFound; the caller must refuse to create a booking rather than fall
/// back to a default or stale price.
pub fn resolve_price(conn: &Connection, selector: &CatalogSelector) -> Result<i64, AppError> {
    match selector {
        CatalogSelector::Service {
            service_id,
            location_id,
            tier,
        } => {
            let location = queries::get_location_by_id(conn, location_id)
                .map_err(AppError::Database)?
                .ok_or_else(|| AppError::NotFound(format!("location {location_id}")))?;

            let offering = location
                .offerings
                .iter()
                .find(|o| o.service_id == *service_id)
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "service {service_id} is not offered at location {location_id}"
                    ))
                })?;

            // Case-sensitive exact match on the tier name.
            let matched = offering
                .tiers
                .iter()
                .find(|t| t.tier_name == *tier)
                .ok_or_else(|| AppError::NotFound(format!("pricing tier {tier:?}")))?;

            Ok(matched.price)
        }
        CatalogSelector::Puja { puja_id, package } => {
            let puja = queries::get_puja_by_id(conn, puja_id)
                .map_err(AppError::Database)?
                .ok_or_else(|| AppError::NotFound(format!("puja {puja_id}")))?;

            let matched = puja
                .packages
                .iter()
                .find(|p| p.name == *package)
                .ok_or_else(|| AppError::NotFound(format!("puja package {package:?}")))?;

            Ok(matched.price_amount)
        }
    }
}

/// Display total for a payment method: the gateway path carries an 18% GST
/// surcharge, the manual QR path does not. The persisted booking price is
/// always the resolved base.
pub fn quote_total(base: i64, method: PaymentMethod) -> i64 {
    match method {
        PaymentMethod::Razorpay => base * 118 / 100,
        PaymentMethod::Qr => base,
    }
}

/// Discount a coupon grants on a base price, clamped to the base. Inactive
/// coupons and orders below the minimum are rejected.
pub fn apply_coupon(coupon: &Coupon, base: i64) -> Result<i64, AppError> {
    if !coupon.is_active {
        return Err(AppError::Validation(format!(
            "coupon {} is not active",
            coupon.code
        )));
    }
    if base < coupon.min_order_value {
        return Err(AppError::Validation(format!(
            "order total below coupon minimum of {}",
            coupon.min_order_value
        )));
    }

    let discount = match coupon.discount_type {
        DiscountType::Percentage => base * coupon.discount_value / 100,
        DiscountType::Flat => coupon.discount_value,
    };
    Ok(discount.min(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Location, PricingTier, Puja, PujaPackage, Service, ServiceOffering};

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn seed_catalog(conn: &Connection) {
        queries::insert_service(
            conn,
            &Service {
                id: "svc-pind-daan".to_string(),
                name: "Pind Daan".to_string(),
                description: "Ancestral rites".to_string(),
            },
        )
        .unwrap();

        queries::insert_location(
            conn,
            &Location {
                id: "loc-puri".to_string(),
                name: "Puri".to_string(),
                city: "Puri".to_string(),
                state: "Odisha".to_string(),
                offerings: vec![ServiceOffering {
                    service_id: "svc-pind-daan".to_string(),
                    tiers: vec![
                        PricingTier {
                            tier_name: "Basic".to_string(),
                            price: 1500,
                            features: vec!["Single priest".to_string()],
                            recommended: false,
                        },
                        PricingTier {
                            tier_name: "Premium".to_string(),
                            price: 5100,
                            features: vec!["Three priests".to_string()],
                            recommended: true,
                        },
                    ],
                }],
            },
        )
        .unwrap();

        queries::insert_puja(
            conn,
            &Puja {
                id: "puja-rudra".to_string(),
                name: "Rudrabhishek".to_string(),
                location: "Kashi Vishwanath".to_string(),
                temple_type: "Jyotirlinga".to_string(),
                packages: vec![PujaPackage {
                    name: "Family".to_string(),
                    price_amount: 2100,
                    features: vec![],
                }],
            },
        )
        .unwrap();
    }

    fn service_selector(tier: &str) -> CatalogSelector {
        CatalogSelector::Service {
            service_id: "svc-pind-daan".to_string(),
            location_id: "loc-puri".to_string(),
            tier: tier.to_string(),
        }
    }

    #[test]
    fn test_resolves_stored_tier_price() {
        let conn = setup_db();
        seed_catalog(&conn);

        assert_eq!(resolve_price(&conn, &service_selector("Basic")).unwrap(), 1500);
        assert_eq!(resolve_price(&conn, &service_selector("Premium")).unwrap(), 5100);
    }

    #[test]
    fn test_missing_tier_is_not_found() {
        let conn = setup_db();
        seed_catalog(&conn);

        let result = resolve_price(&conn, &service_selector("Deluxe"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_tier_match_is_case_sensitive() {
        let conn = setup_db();
        seed_catalog(&conn);

        let result = resolve_price(&conn, &service_selector("basic"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_unknown_location_is_not_found() {
        let conn = setup_db();
        seed_catalog(&conn);

        let result = resolve_price(
            &conn,
            &CatalogSelector::Service {
                service_id: "svc-pind-daan".to_string(),
                location_id: "loc-nowhere".to_string(),
                tier: "Basic".to_string(),
            },
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_service_not_offered_at_location_is_not_found() {
        let conn = setup_db();
        seed_catalog(&conn);

        let result = resolve_price(
            &conn,
            &CatalogSelector::Service {
                service_id: "svc-unlisted".to_string(),
                location_id: "loc-puri".to_string(),
                tier: "Basic".to_string(),
            },
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_resolves_puja_package_price() {
        let conn = setup_db();
        seed_catalog(&conn);

        let price = resolve_price(
            &conn,
            &CatalogSelector::Puja {
                puja_id: "puja-rudra".to_string(),
                package: "Family".to_string(),
            },
        )
        .unwrap();
        assert_eq!(price, 2100);
    }

    #[test]
    fn test_missing_puja_package_is_not_found() {
        let conn = setup_db();
        seed_catalog(&conn);

        let result = resolve_price(
            &conn,
            &CatalogSelector::Puja {
                puja_id: "puja-rudra".to_string(),
                package: "Solo".to_string(),
            },
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_gateway_surcharge() {
        assert_eq!(quote_total(1500, PaymentMethod::Razorpay), 1770);
        assert_eq!(quote_total(1500, PaymentMethod::Qr), 1500);
    }

    fn coupon(discount_type: DiscountType, value: i64, min: i64, active: bool) -> Coupon {
        Coupon {
            id: "c1".to_string(),
            code: "DIWALI10".to_string(),
            discount_type,
            discount_value: value,
            min_order_value: min,
            is_active: active,
        }
    }

    #[test]
    fn test_percentage_coupon() {
        let c = coupon(DiscountType::Percentage, 10, 0, true);
        assert_eq!(apply_coupon(&c, 1500).unwrap(), 150);
    }

    #[test]
    fn test_flat_coupon_clamped_to_base() {
        let c = coupon(DiscountType::Flat, 2000, 0, true);
        assert_eq!(apply_coupon(&c, 1500).unwrap(), 1500);
    }

    #[test]
    fn test_coupon_below_minimum_rejected() {
        let c = coupon(DiscountType::Flat, 100, 2000, true);
        assert!(matches!(apply_coupon(&c, 1500), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_inactive_coupon_rejected() {
        let c = coupon(DiscountType::Flat, 100, 0, false);
        assert!(matches!(apply_coupon(&c, 1500), Err(AppError::Validation(_))));
    }
}
