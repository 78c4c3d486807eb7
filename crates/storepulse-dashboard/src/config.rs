use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use storepulse_core::Result;
use storepulse_egress::{ApiConfig, HttpClientConfig};
use storepulse_observability::LoggingConfig;
use storepulse_traversal::TraversalLimits;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub http: HttpClientConfig,

    #[serde(default)]
    pub limits: ViewLimits,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Traversal limits per view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewLimits {
    #[serde(default = "default_sales_kpis")]
    pub sales_kpis: TraversalLimits,

    #[serde(default = "default_dashboard_sales")]
    pub dashboard_sales: TraversalLimits,

    #[serde(default = "default_inventory")]
    pub inventory: TraversalLimits,

    #[serde(default = "default_products")]
    pub products: TraversalLimits,

    #[serde(default = "default_catalog")]
    pub catalog: TraversalLimits,

    /// Rows per page of the live sales table
    #[serde(default = "default_table_page_size")]
    pub table_page_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds between retention sweeps
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self {
            sales_kpis: default_sales_kpis(),
            dashboard_sales: default_dashboard_sales(),
            inventory: default_inventory(),
            products: default_products(),
            catalog: default_catalog(),
            table_page_size: default_table_page_size(),
        }
    }
}

impl ViewLimits {
    pub fn validate(&self) -> Result<()> {
        self.sales_kpis.validate()?;
        self.dashboard_sales.validate()?;
        self.inventory.validate()?;
        self.products.validate()?;
        self.catalog.validate()?;
        if self.table_page_size == 0 {
            return Err(storepulse_core::Error::InvalidLimits(
                "table_page_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            janitor_interval_secs: default_janitor_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs.max(1))
    }
}

impl DashboardConfig {
    pub fn from_file(
        path: impl AsRef<Path>,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        config.limits.validate()?;
        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        // API settings
        if let Ok(val) = std::env::var("STOREPULSE_API_BASE_URL") {
            self.api.base_url = val;
        }

        if let Ok(val) = std::env::var("STOREPULSE_API_TOKEN") {
            self.api.token = (!val.is_empty()).then_some(val);
        }

        // Logging settings
        if let Ok(val) = std::env::var("STOREPULSE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("STOREPULSE_LOG_JSON") {
            match val.parse::<bool>() {
                Ok(json) => self.logging.json = json,
                Err(_) => warn!(value = %val, "ignoring invalid STOREPULSE_LOG_JSON"),
            }
        }

        // HTTP settings
        if let Ok(val) = std::env::var("STOREPULSE_PAGE_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => self.http.page_timeout_ms = ms,
                _ => warn!(value = %val, "ignoring invalid STOREPULSE_PAGE_TIMEOUT_MS"),
            }
        }

        if let Ok(val) = std::env::var("STOREPULSE_MAX_RETRIES") {
            match val.parse::<u32>() {
                Ok(retries) => self.http.max_retries = retries,
                Err(_) => warn!(value = %val, "ignoring invalid STOREPULSE_MAX_RETRIES"),
            }
        }
    }
}

fn default_sales_kpis() -> TraversalLimits {
    TraversalLimits::SALES_KPIS
}

fn default_dashboard_sales() -> TraversalLimits {
    TraversalLimits::DASHBOARD_SALES
}

fn default_inventory() -> TraversalLimits {
    TraversalLimits::INVENTORY
}

fn default_products() -> TraversalLimits {
    TraversalLimits::PRODUCTS
}

fn default_catalog() -> TraversalLimits {
    TraversalLimits::CATALOG
}

fn default_table_page_size() -> usize {
    50
}

fn default_janitor_interval_secs() -> u64 {
    60
}
