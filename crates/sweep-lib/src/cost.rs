//! Monthly cost estimation
//!
//! Static on-demand price tables per resource kind. This is an estimate for
//! ranking cleanup candidates, not a billing lookup: it never fails, and
//! unknown shapes fall back to a flat hourly price.

use crate::models::{ResourceKind, ShapeAttributes};

/// Hours billed per month (24 hours * 30 days)
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Hourly price used for unrecognized shape tags
pub const FALLBACK_HOURLY_PRICE: f64 = 0.10;

/// Monthly cost charged for a composite member whose shape is unknown
pub const UNPRICED_MEMBER_MONTHLY_COST: f64 = 50.0;

/// Regions with a historical price surcharge
pub const EXPENSIVE_REGIONS: &[&str] = &["ap-south-1", "ap-southeast-1", "sa-east-1", "eu-central-1"];

pub const EXPENSIVE_REGION_MULTIPLIER: f64 = 1.2;

const CACHE_HOURLY_PRICES: &[(&str, f64)] = &[
    ("cache.t2.micro", 0.017),
    ("cache.t2.small", 0.034),
    ("cache.t3.micro", 0.017),
    ("cache.t3.small", 0.034),
    ("cache.t3.medium", 0.068),
    ("cache.t4g.micro", 0.016),
    ("cache.t4g.small", 0.032),
    ("cache.t4g.medium", 0.065),
    ("cache.m5.large", 0.156),
    ("cache.m5.xlarge", 0.311),
    ("cache.m6g.large", 0.149),
    ("cache.m6g.xlarge", 0.298),
    ("cache.r5.large", 0.216),
    ("cache.r5.xlarge", 0.432),
    ("cache.r6g.large", 0.206),
    ("cache.r6g.xlarge", 0.411),
];

const CACHE_VARIANT_MULTIPLIERS: &[(&str, f64)] = &[
    ("redis", 1.0),
    ("memcached", 1.0),
    ("valkey", 0.8),
];

const DB_HOURLY_PRICES: &[(&str, f64)] = &[
    // General purpose
    ("db.t3.micro", 0.017),
    ("db.t3.small", 0.034),
    ("db.t3.medium", 0.068),
    ("db.t3.large", 0.136),
    ("db.t3.xlarge", 0.272),
    ("db.t3.2xlarge", 0.544),
    // Memory optimized
    ("db.r5.large", 0.240),
    ("db.r5.xlarge", 0.480),
    ("db.r5.2xlarge", 0.960),
    ("db.r5.4xlarge", 1.920),
    // Compute optimized
    ("db.c5.large", 0.192),
    ("db.c5.xlarge", 0.384),
    ("db.c5.2xlarge", 0.768),
    // Previous generation
    ("db.t2.micro", 0.017),
    ("db.t2.small", 0.034),
    ("db.t2.medium", 0.068),
    ("db.m5.large", 0.192),
    ("db.m5.xlarge", 0.384),
];

const DB_VARIANT_MULTIPLIERS: &[(&str, f64)] = &[
    ("mysql", 1.0),
    ("postgres", 1.0),
    ("mariadb", 1.0),
    ("oracle-ee", 2.5),
    ("oracle-se2", 1.8),
    ("sqlserver-ex", 1.0),
    ("sqlserver-web", 1.3),
    ("sqlserver-se", 2.0),
    ("sqlserver-ee", 3.0),
    ("aurora-mysql", 1.2),
    ("aurora-postgresql", 1.2),
    ("aurora", 1.2),
];

/// Unit prices and variant multipliers for one resource kind
#[derive(Debug, Clone, Copy)]
pub struct PriceTable {
    hourly_prices: &'static [(&'static str, f64)],
    variant_multipliers: &'static [(&'static str, f64)],
}

impl PriceTable {
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::CacheCluster => Self {
                hourly_prices: CACHE_HOURLY_PRICES,
                variant_multipliers: CACHE_VARIANT_MULTIPLIERS,
            },
            ResourceKind::DbInstance => Self {
                hourly_prices: DB_HOURLY_PRICES,
                variant_multipliers: DB_VARIANT_MULTIPLIERS,
            },
        }
    }

    /// Hourly unit price for a shape tag, or the fallback price
    pub fn hourly_price(&self, shape_tag: &str) -> f64 {
        lookup(self.hourly_prices, &shape_tag.to_ascii_lowercase()).unwrap_or(FALLBACK_HOURLY_PRICE)
    }

    /// Variant multiplier: exact match first, then the family before the first '-'
    pub fn variant_multiplier(&self, variant: &str) -> f64 {
        let variant = variant.to_ascii_lowercase();
        lookup(self.variant_multipliers, &variant)
            .or_else(|| {
                let family = variant.split('-').next().unwrap_or_default();
                lookup(self.variant_multipliers, family)
            })
            .unwrap_or(1.0)
    }

    pub fn is_known_shape(&self, shape_tag: &str) -> bool {
        lookup(self.hourly_prices, &shape_tag.to_ascii_lowercase()).is_some()
    }
}

fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Region surcharge factor
pub fn region_multiplier(region: &str) -> f64 {
    if EXPENSIVE_REGIONS.contains(&region) {
        EXPENSIVE_REGION_MULTIPLIER
    } else {
        1.0
    }
}

/// Monthly cost from already-resolved factors
pub fn monthly_cost(hourly_price: f64, variant_multiplier: f64, region_multiplier: f64, quantity: u32) -> f64 {
    let cost = hourly_price * HOURS_PER_MONTH * variant_multiplier * region_multiplier * f64::from(quantity);
    if cost.is_finite() && cost > 0.0 {
        cost
    } else {
        0.0
    }
}

/// Cost model for one resource kind
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    table: PriceTable,
}

impl CostModel {
    pub fn new(table: PriceTable) -> Self {
        Self { table }
    }

    pub fn for_kind(kind: ResourceKind) -> Self {
        Self::new(PriceTable::for_kind(kind))
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }

    /// Estimate the monthly cost of one shape in one region
    ///
    /// `quantity` defaults to 1 when the caller does not know it.
    pub fn monthly_cost(
        &self,
        shape_tag: &str,
        variant: Option<&str>,
        region: &str,
        quantity: Option<u32>,
    ) -> f64 {
        monthly_cost(
            self.table.hourly_price(shape_tag),
            variant.map(|v| self.table.variant_multiplier(v)).unwrap_or(1.0),
            region_multiplier(region),
            quantity.unwrap_or(1),
        )
    }

    /// Estimate from shape attributes, using the documented keys
    pub fn estimate(&self, shape: &ShapeAttributes, region: &str) -> f64 {
        self.monthly_cost(
            shape.shape_tag().unwrap_or_default(),
            shape.variant(),
            region,
            shape.quantity(),
        )
    }
}
