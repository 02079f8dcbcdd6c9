//! Databricks SQL Statement Execution API client.
//!
//! Statements are submitted synchronously (`wait_timeout`) with inline
//! `JSON_ARRAY` results. Credentials are handed in once at construction and
//! never leave this module.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::warehouse::{ResultSet, WarehouseClient, WeatherQuery};

/// Connection settings for a Databricks SQL warehouse.
#[derive(Clone)]
pub struct DatabricksSettings {
    /// `adb-123.azuredatabricks.net`, or a full `http(s)://` base URL.
    pub server_hostname: String,
    /// `/sql/1.0/warehouses/<id>`; the last segment is the warehouse id.
    pub http_path: String,
    pub access_token: String,
    /// `catalog.schema` prefix of the weather tables.
    pub catalog: String,
    pub wait_timeout_seconds: u64,
}

impl std::fmt::Debug for DatabricksSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabricksSettings")
            .field("server_hostname", &self.server_hostname)
            .field("http_path", &self.http_path)
            .field("access_token", &"<redacted>")
            .field("catalog", &self.catalog)
            .field("wait_timeout_seconds", &self.wait_timeout_seconds)
            .finish()
    }
}

#[derive(Clone)]
pub struct DatabricksClient {
    base_url: String,
    warehouse_id: String,
    access_token: String,
    catalog: String,
    wait_timeout_seconds: u64,
    http: Client,
}

impl DatabricksClient {
    pub fn new(settings: DatabricksSettings) -> Result<Self, AppError> {
        let warehouse_id = settings
            .http_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::Config(format!("Invalid Databricks http_path: {}", settings.http_path))
            })?
            .to_string();

        let host = settings.server_hostname.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        // The API caps wait_timeout at 50s; leave headroom for the round trip.
        let wait_timeout_seconds = settings.wait_timeout_seconds.clamp(5, 50);
        let http = Client::builder()
            .timeout(Duration::from_secs(wait_timeout_seconds + 10))
            .build()
            .map_err(|err| AppError::Config(err.to_string()))?;

        Ok(Self {
            base_url,
            warehouse_id,
            access_token: settings.access_token,
            catalog: settings.catalog,
            wait_timeout_seconds,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn warehouse_id(&self) -> &str {
        &self.warehouse_id
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    warehouse_id: &'a str,
    statement: String,
    parameters: Vec<StatementParameter>,
    wait_timeout: String,
    on_wait_timeout: &'static str,
    disposition: &'static str,
    format: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StatementParameter {
    pub name: &'static str,
    pub value: String,
    #[serde(rename = "type")]
    pub param_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement_id: Option<String>,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultChunk>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
struct ColumnInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultChunk {
    #[serde(default)]
    data_array: Vec<Vec<Option<String>>>,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}

fn string_param(name: &'static str, value: &str) -> StatementParameter {
    StatementParameter {
        name,
        value: value.to_string(),
        param_type: "STRING",
    }
}

fn int_param(name: &'static str, value: u32) -> StatementParameter {
    StatementParameter {
        name,
        value: value.to_string(),
        param_type: "INT",
    }
}

/// Render `query` as Databricks SQL with named parameter markers.
pub fn render_statement(catalog: &str, query: &WeatherQuery) -> (String, Vec<StatementParameter>) {
    let city = string_param("city", query.city().warehouse_name());
    let bound = match query.window_hours() {
        Some(hours) => int_param("hours", hours),
        None => int_param("limit", query.limit()),
    };

    let statement = match query {
        WeatherQuery::DailyWeather { .. } => format!(
            "SELECT * FROM {catalog}.fact_vn_weather_daily \
             WHERE ds_location = :city \
             ORDER BY dt_date_record DESC LIMIT :limit"
        ),
        WeatherQuery::HourlyWeather { .. } => format!(
            "SELECT * FROM {catalog}.fact_vn_weather_hourly \
             WHERE ds_location = :city AND dt_date_record <= CURRENT_TIMESTAMP() \
             ORDER BY dt_date_record DESC LIMIT :limit"
        ),
        WeatherQuery::ComparisonObservations { .. } => format!(
            "SELECT * FROM {catalog}.fact_vn_weather_hourly \
             WHERE ds_location = :city \
               AND dt_date_record >= timestampadd(HOUR, -:hours, CURRENT_TIMESTAMP()) \
               AND dt_date_record <= CURRENT_TIMESTAMP() \
             ORDER BY dt_date_record DESC"
        ),
        WeatherQuery::TemperatureForecast { .. } => format!(
            "WITH latest_forecast AS ( \
               SELECT * FROM {catalog}.lstm_weather_24h WHERE ds_location = :city \
               QUALIFY row_number() OVER ( \
                 PARTITION BY dt_forecast_time, ds_location ORDER BY dt_model_run_time DESC) = 1) \
             SELECT dt_forecast_time AS forecast_time, \
                    nr_predicted_temperature AS predicted_temperature, \
                    ds_location AS location, \
                    dt_model_run_time AS model_run_time \
             FROM latest_forecast \
             WHERE dt_forecast_time >= CURRENT_TIMESTAMP() \
             ORDER BY dt_forecast_time ASC LIMIT :limit"
        ),
        WeatherQuery::ComparisonForecasts { .. } => format!(
            "WITH latest_forecast AS ( \
               SELECT * FROM {catalog}.lstm_weather_24h WHERE ds_location = :city \
               QUALIFY row_number() OVER ( \
                 PARTITION BY dt_forecast_time, ds_location ORDER BY dt_model_run_time DESC) = 1) \
             SELECT dt_forecast_time AS forecast_time, \
                    nr_predicted_temperature AS predicted_temperature, \
                    ds_location AS location, \
                    dt_model_run_time AS model_run_time \
             FROM latest_forecast \
             WHERE dt_forecast_time >= timestampadd(HOUR, -:hours, CURRENT_TIMESTAMP()) \
               AND dt_forecast_time <= CURRENT_TIMESTAMP() \
             ORDER BY dt_forecast_time DESC"
        ),
        WeatherQuery::RainForecast { .. } => format!(
            "SELECT dt_forecast_date AS forecast_date, \
                    prediction_probability AS rain_probability, \
                    prediction_label AS rain_label, \
                    ds_location AS location, \
                    dt_model_run_time AS model_run_time \
             FROM ( \
               SELECT *, ROW_NUMBER() OVER ( \
                 PARTITION BY dt_forecast_date, ds_location ORDER BY dt_model_run_time DESC) AS rn \
               FROM {catalog}.lstm_rain_daily \
               WHERE ds_location = :city \
                 AND DATE(from_utc_timestamp(dt_forecast_date, 'Asia/Ho_Chi_Minh')) >= \
                     DATE(from_utc_timestamp(CURRENT_TIMESTAMP(), 'Asia/Ho_Chi_Minh'))) \
             WHERE rn = 1 \
             ORDER BY dt_forecast_date ASC LIMIT :limit"
        ),
    };

    (statement, vec![city, bound])
}

impl DatabricksClient {
    async fn get_chunk(&self, link: &str) -> Result<ResultChunk, AppError> {
        let url = format!("{}{}", self.base_url, link);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "Databricks returned HTTP {} for result chunk",
                response.status()
            )));
        }

        response
            .json::<ResultChunk>()
            .await
            .map_err(|err| AppError::Parse(err.to_string()))
    }

    pub async fn execute(
        &self,
        statement: String,
        parameters: Vec<StatementParameter>,
    ) -> Result<ResultSet, AppError> {
        let url = format!("{}/api/2.0/sql/statements", self.base_url);
        let body = StatementRequest {
            warehouse_id: &self.warehouse_id,
            statement,
            parameters,
            wait_timeout: format!("{}s", self.wait_timeout_seconds),
            on_wait_timeout: "CANCEL",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "Databricks returned HTTP {}",
                response.status()
            )));
        }

        let parsed = response
            .json::<StatementResponse>()
            .await
            .map_err(|err| AppError::Parse(err.to_string()))?;

        if parsed.status.state != "SUCCEEDED" {
            let detail = parsed
                .status
                .error
                .map(|e| {
                    format!(
                        "{}: {}",
                        e.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                        e.message.unwrap_or_default()
                    )
                })
                .unwrap_or_default();
            return Err(AppError::Warehouse(format!(
                "Statement {} ended in state {} {}",
                parsed.statement_id.as_deref().unwrap_or("?"),
                parsed.status.state,
                detail
            )
            .trim_end()
            .to_string()));
        }

        let columns = parsed
            .manifest
            .map(|m| m.schema.columns.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();

        let mut rows = Vec::new();
        let mut next = match parsed.result {
            Some(chunk) => {
                rows.extend(chunk.data_array);
                chunk.next_chunk_internal_link
            }
            None => None,
        };
        while let Some(link) = next {
            let chunk = self.get_chunk(&link).await?;
            rows.extend(chunk.data_array);
            next = chunk.next_chunk_internal_link;
        }

        Ok(ResultSet { columns, rows })
    }
}

#[async_trait]
impl WarehouseClient for DatabricksClient {
    async fn fetch(&self, query: &WeatherQuery) -> Result<ResultSet, AppError> {
        let (statement, parameters) = render_statement(&self.catalog, query);
        tracing::debug!("Databricks {} for {}", query.kind(), query.city().warehouse_name());
        self.execute(statement, parameters).await
    }

    fn name(&self) -> &str {
        "databricks"
    }
}
