use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::files::SearchRoots;
use crate::routing::RoutingTable;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings for one OpenAI-compatible model endpoint.
///
/// Every field may be missing; the connector reports that on first use.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmSettings {
    /// Reads `{PREFIX}_API_KEY`, `{PREFIX}_BASE_URL` and `{PREFIX}_MODEL_NAME`.
    pub fn from_env(prefix: &str) -> Self {
        let temperature = env_var("LLM_TEMPERATURE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);
        let timeout = env_var("LLM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key: env_var(&format!("{}_API_KEY", prefix)),
            base_url: env_var(&format!("{}_BASE_URL", prefix)),
            model_name: env_var(&format!("{}_MODEL_NAME", prefix)),
            temperature,
            timeout: Duration::from_secs(timeout),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.base_url.is_some() || self.model_name.is_some()
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub fallback_llm: Option<LlmSettings>,
    pub roots: SearchRoots,
    pub routing: RoutingTable,
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub env_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub routes: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let env_file = overrides
            .env_file
            .unwrap_or_else(|| PathBuf::from("demo.env"));
        if dotenv::from_path(&env_file).is_ok() {
            info!("Loaded environment from {:?}", env_file);
        }
        dotenv::dotenv().ok();

        let llm = LlmSettings::from_env("DEFAULT_LLM");
        let fallback = LlmSettings::from_env("FALLBACK_LLM");
        let fallback_llm = fallback.is_configured().then_some(fallback);

        let primary = overrides
            .data_dir
            .or_else(|| env_var("MFQA_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("./test"));
        let secondary = overrides
            .project_root
            .or_else(|| env_var("MFQA_PROJECT_ROOT").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let routing = match overrides.routes {
            Some(path) => load_routing_table(&path)?,
            None => RoutingTable::default(),
        };

        debug!(
            "Search roots: {:?} then {:?}; fallback model: {}",
            primary,
            secondary,
            fallback_llm.is_some()
        );

        Ok(Self {
            llm,
            fallback_llm,
            roots: SearchRoots::new(primary, secondary),
            routing,
        })
    }
}

#[derive(Deserialize)]
struct RoutesFile {
    routing: RoutingTable,
}

/// Loads a `[routing]` table from TOML, replacing the built-in table wholesale.
pub fn load_routing_table(path: &Path) -> Result<RoutingTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_routing_table(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_routing_table(content: &str) -> Result<RoutingTable, toml::de::Error> {
    let file: RoutesFile = toml::from_str(content)?;
    Ok(file.routing)
}
