use std::env;

use crate::cli::Cli;
use crate::services::databricks::DatabricksSettings;
use crate::weather::RainThresholds;

pub const DEFAULT_CATALOG: &str = "hcmut.gold";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SQLITE_URL: &str = "sqlite://weather.db";
pub const DEFAULT_QUERY_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: WarehouseBackend,
    pub bind_addr: String,
    pub query_timeout_seconds: u64,
    pub rain_thresholds: RainThresholds,
}

/// Where the weather tables are read from. Only the selected backend's
/// settings are resolved, so a SQLite setup needs no Databricks credentials.
#[derive(Debug, Clone)]
pub enum WarehouseBackend {
    Databricks(DatabricksSettings),
    Sqlite { url: String },
}

impl WarehouseBackend {
    pub fn name(&self) -> &'static str {
        match self {
            WarehouseBackend::Databricks(_) => "databricks",
            WarehouseBackend::Sqlite { .. } => "sqlite",
        }
    }
}

impl Config {
    /// Environment plus command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self, String> {
        Self::from_source(|key| env::var(key).ok(), cli)
    }

    /// Build from any key lookup; CLI flags win over looked-up values.
    pub fn from_source<F>(lookup: F, cli: &Cli) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let query_timeout_seconds = match lookup("QUERY_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| "QUERY_TIMEOUT_SECONDS must be a valid number")?,
            None => DEFAULT_QUERY_TIMEOUT_SECONDS,
        };

        let backend_name = cli
            .backend
            .clone()
            .or_else(|| lookup("WAREHOUSE_BACKEND"))
            .unwrap_or_else(|| "databricks".to_string());

        let backend = match backend_name.as_str() {
            "databricks" => {
                let required = |key: &str| {
                    lookup(key)
                        .filter(|v| !v.trim().is_empty())
                        .ok_or_else(|| format!("{} is required", key))
                };
                WarehouseBackend::Databricks(DatabricksSettings {
                    server_hostname: required("DATABRICKS_SERVER_HOSTNAME")?,
                    http_path: required("DATABRICKS_HTTP_PATH")?,
                    access_token: required("DATABRICKS_ACCESS_TOKEN")?,
                    catalog: cli
                        .catalog
                        .clone()
                        .or_else(|| lookup("WAREHOUSE_CATALOG"))
                        .unwrap_or_else(|| DEFAULT_CATALOG.to_string()),
                    wait_timeout_seconds: query_timeout_seconds,
                })
            }
            "sqlite" => WarehouseBackend::Sqlite {
                url: cli
                    .sqlite_url
                    .clone()
                    .or_else(|| lookup("SQLITE_URL"))
                    .unwrap_or_else(|| DEFAULT_SQLITE_URL.to_string()),
            },
            other => return Err(format!("Invalid WAREHOUSE_BACKEND: {}", other)),
        };

        let bind_addr = cli
            .bind
            .clone()
            .or_else(|| lookup("BIND_ADDR"))
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let rain_thresholds = match lookup("RAIN_THRESHOLDS") {
            Some(raw) => raw
                .parse::<RainThresholds>()
                .map_err(|err| format!("Invalid RAIN_THRESHOLDS: {}", err))?,
            None => RainThresholds::default(),
        };

        Ok(Self {
            backend,
            bind_addr,
            query_timeout_seconds,
            rain_thresholds,
        })
    }
}
