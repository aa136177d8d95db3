use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vigil_core::api::ApiConfig;
use vigil_core::{ListConfig, ListKind};

/// High-level configuration for the list browser demo
#[derive(Clone, Debug)]
pub struct ListBrowserConfig {
    /// Directory holding saved filter presets
    pub data_dir: PathBuf,
    /// Talk to a real dashboard API instead of the built-in simulation
    pub use_api: bool,
    pub api: ApiConfig,
    pub list: ListConfig,
    pub simulation: SimulationConfig,
}

/// Shape of the simulated events backend
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub total_events: usize,
    pub latency_ms: u64,
    /// Fail every Nth request; 0 never fails
    pub fail_every: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_events: 240,
            latency_ms: 80,
            fail_every: 0,
        }
    }
}

impl Default for ListBrowserConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::var("VIGIL_DATA_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".vigil")),
            use_api: std::env::var("VIGIL_API_URL")
                .map(|s| !s.is_empty())
                .unwrap_or(false),
            api: ApiConfig::default(),
            list: ListConfig::from_env(ListKind::Events),
            simulation: SimulationConfig::default(),
        }
    }
}

impl ListBrowserConfig {
    /// Load configuration from a TOML file (path via LIST_BROWSER_CONFIG or ./list_browser.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path =
            std::env::var("LIST_BROWSER_CONFIG").unwrap_or_else(|_| "list_browser.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "list_browser", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => Self::from_toml(&s).unwrap_or_else(|e| {
                tracing::warn!(target: "list_browser", error = %e, "Failed to parse TOML; using defaults");
                default
            }),
            Err(e) => {
                tracing::warn!(target: "list_browser", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ListBrowserToml>(s).map(|t| t.overlay(Self::default()))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ListBrowserToml {
    pub data_dir: Option<PathBuf>,
    pub use_api: Option<bool>,
    pub api: Option<ApiToml>,
    pub list: Option<ListToml>,
    pub simulation: Option<SimulationToml>,
}

impl ListBrowserToml {
    fn overlay(self, mut base: ListBrowserConfig) -> ListBrowserConfig {
        if let Some(d) = self.data_dir {
            base.data_dir = d;
        }
        if let Some(u) = self.use_api {
            base.use_api = u;
        }
        if let Some(a) = self.api {
            a.apply(&mut base.api);
        }
        if let Some(l) = self.list {
            l.apply(&mut base.list);
        }
        if let Some(s) = self.simulation {
            s.apply(&mut base.simulation);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ApiToml {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}
impl ApiToml {
    fn apply(self, a: &mut ApiConfig) {
        if let Some(x) = self.base_url {
            a.base_url = x;
        }
        if let Some(x) = self.request_timeout_ms {
            a.request_timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ListToml {
    pub page_size: Option<usize>,
    pub search_debounce_ms: Option<u64>,
    pub stale_secs: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub window_days: Option<i64>,
}
impl ListToml {
    fn apply(self, l: &mut ListConfig) {
        if let Some(x) = self.page_size {
            l.page_size = x.max(1);
        }
        if let Some(x) = self.search_debounce_ms {
            l.search_debounce = Duration::from_millis(x);
        }
        if let Some(x) = self.stale_secs {
            l.stale_time = Duration::from_secs(x);
        }
        if let Some(x) = self.cache_capacity {
            l.cache_capacity = x.max(1);
        }
        if let Some(x) = self.window_days {
            l.default_window_days = x.max(0);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SimulationToml {
    pub total_events: Option<usize>,
    pub latency_ms: Option<u64>,
    pub fail_every: Option<u64>,
}
impl SimulationToml {
    fn apply(self, s: &mut SimulationConfig) {
        if let Some(x) = self.total_events {
            s.total_events = x;
        }
        if let Some(x) = self.latency_ms {
            s.latency_ms = x;
        }
        if let Some(x) = self.fail_every {
            s.fail_every = x;
        }
    }
}
