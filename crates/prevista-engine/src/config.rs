use std::path::PathBuf;

use prevista_warehouse::WarehouseConfig;

pub const DEFAULT_MARKET_SUFFIX: &str = ".SA";
pub const DEFAULT_HISTORY_DAYS: i64 = 5 * 365;
pub const DEFAULT_LAGS: usize = 3;
/// Widest lag window accepted by training and inference.
pub const MAX_LAGS: usize = 250;
pub const DEFAULT_SEED: u64 = 42;

/// Everything the engine needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub warehouse: WarehouseConfig,
    /// Directory holding one serialized model per ticker.
    pub artifact_dir: PathBuf,
    /// Appended to the ticker when querying the provider (`PETR4` → `PETR4.SA`).
    pub market_suffix: String,
    /// History fetched on the first sync of a ticker.
    pub history_days: i64,
    pub default_lags: usize,
    /// Seed for the tree ensembles.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_warehouse(WarehouseConfig::default())
    }
}

impl EngineConfig {
    /// Defaults rooted at `prevista_home`.
    pub fn under(prevista_home: impl Into<PathBuf>) -> Self {
        Self::from_warehouse(WarehouseConfig::under(prevista_home))
    }

    fn from_warehouse(warehouse: WarehouseConfig) -> Self {
        let artifact_dir = warehouse.prevista_home.join("models");
        Self {
            warehouse,
            artifact_dir,
            market_suffix: DEFAULT_MARKET_SUFFIX.to_string(),
            history_days: DEFAULT_HISTORY_DAYS,
            default_lags: DEFAULT_LAGS,
            seed: DEFAULT_SEED,
        }
    }
}
