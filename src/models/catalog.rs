use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A physical location (e.g. a pilgrimage town) offering services at
/// location-specific prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub offerings: Vec<ServiceOffering>,
}

/// Binds one service to this location's pricing tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub service_id: String,
    pub tiers: Vec<PricingTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    pub tier_name: String,
    /// Whole currency units, no minor part.
    pub price: i64,
    pub features: Vec<String>,
    #[serde(default)]
    pub recommended: bool,
}

/// Temple-scoped package catalog, parallel to the service/location catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puja {
    pub id: String,
    pub name: String,
    pub location: String,
    pub temple_type: String,
    pub packages: Vec<PujaPackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PujaPackage {
    pub name: String,
    pub price_amount: i64,
    pub features: Vec<String>,
}
