//! Warehouse configuration, loaded from the environment or a JSON document.

use serde::{Deserialize, Serialize};

use solewms_warehouse::{BinCode, WarehouseError, WarehouseResult};

/// Hard cap on activity page size, whatever the caller asks for.
pub const MAX_ACTIVITY_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Overflow bin used when an allocation finds no room.
    pub staging_bin: BinCode,
    pub staging_capacity: u32,
    /// Re-plan attempts when a reservation loses a race.
    pub allocation_max_attempts: u32,
    /// Reject swaps into bins of another size class or smaller capacity.
    pub strict_reassignment: bool,
    pub activity_page_limit: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            staging_bin: default_staging_bin(),
            staging_capacity: 10_000,
            allocation_max_attempts: 3,
            strict_reassignment: false,
            activity_page_limit: 50,
        }
    }
}

fn default_staging_bin() -> BinCode {
    match BinCode::new("STG-00-01") {
        Ok(code) => code,
        Err(_) => unreachable!("STG-00-01 is a well-formed bin code"),
    }
}

impl WarehouseConfig {
    /// Read `SOLEWMS_*` variables; unset or invalid values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("SOLEWMS_STAGING_BIN") {
            parse_into(&mut config.staging_bin, "SOLEWMS_STAGING_BIN", &v);
        }
        if let Some(v) = lookup("SOLEWMS_STAGING_CAPACITY") {
            parse_into(&mut config.staging_capacity, "SOLEWMS_STAGING_CAPACITY", &v);
        }
        if let Some(v) = lookup("SOLEWMS_ALLOCATION_MAX_ATTEMPTS") {
            parse_into(&mut config.allocation_max_attempts, "SOLEWMS_ALLOCATION_MAX_ATTEMPTS", &v);
        }
        if let Some(v) = lookup("SOLEWMS_STRICT_REASSIGNMENT") {
            parse_into(&mut config.strict_reassignment, "SOLEWMS_STRICT_REASSIGNMENT", &v);
        }
        if let Some(v) = lookup("SOLEWMS_ACTIVITY_PAGE_LIMIT") {
            parse_into(&mut config.activity_page_limit, "SOLEWMS_ACTIVITY_PAGE_LIMIT", &v);
        }

        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "invalid warehouse configuration from environment; using defaults");
            return Self::default();
        }
        config
    }

    pub fn from_json(json: &str) -> WarehouseResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WarehouseError::validation(format!("invalid warehouse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WarehouseResult<()> {
        if self.staging_capacity == 0 {
            return Err(WarehouseError::validation("staging_capacity must be positive"));
        }
        if self.allocation_max_attempts == 0 {
            return Err(WarehouseError::validation("allocation_max_attempts must be at least 1"));
        }
        if self.activity_page_limit == 0 {
            return Err(WarehouseError::validation("activity_page_limit must be positive"));
        }
        Ok(())
    }

    /// Page size for a request: the caller's limit or the default, capped.
    pub fn page_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.activity_page_limit)
            .clamp(1, MAX_ACTIVITY_PAGE_LIMIT)
    }
}

fn parse_into<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = raw, "ignoring unparsable configuration value"),
    }
}
