//! Warehouse executor collaborator.
//!
//! The core consumes the `WarehouseExecutor` trait; the production
//! implementation runs the fixed SQL templates against BigQuery's
//! `jobs.query` REST endpoint with named query parameters. Executors accept
//! only specs the guard has validated.

use crate::models::{AnalyticsQuerySpec, FilterValue};
use crate::services::schema;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// One result row, keyed by output column name.
pub type AnalyticsRow = HashMap<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Request timed out")]
    Timeout,

    #[error("Warehouse API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Refusing to execute an unvalidated query spec")]
    Unvalidated,
}

#[async_trait]
pub trait WarehouseExecutor: Send + Sync {
    async fn execute(&self, spec: &AnalyticsQuerySpec) -> Result<Vec<AnalyticsRow>, WarehouseError>;
}

/// BigQuery executor configuration. `table` is the dataset-qualified table
/// name; together with `project_id` it fills the `{table}` template slot.
/// Both come from configuration, never from user input.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub base_url: String,
    pub project_id: String,
    pub table: String,
    pub access_token: String,
    pub timeout_secs: u64,
}

/// BigQuery `jobs.query` executor.
pub struct BigQueryExecutor {
    config: WarehouseConfig,
    client: Client,
}

impl BigQueryExecutor {
    pub fn new(config: WarehouseConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn render_sql(&self, spec: &AnalyticsQuerySpec) -> String {
        let table = format!("`{}.{}`", self.config.project_id, self.config.table);
        let year_clause = if spec.filters.contains_key("year") {
            "AND year = @year"
        } else {
            ""
        };
        schema::sql_template(spec.query_type)
            .replace("{table}", &table)
            .replace("{year_clause}", year_clause)
    }

    fn build_parameters(spec: &AnalyticsQuerySpec, sql: &str) -> Vec<QueryParameter> {
        let mut parameters: Vec<QueryParameter> = spec
            .filters
            .iter()
            .map(|(name, value)| QueryParameter::new(name, value))
            .collect();
        if sql.contains("@limit") {
            parameters.push(QueryParameter::new("limit", &FilterValue::Int(spec.limit)));
        }
        parameters
    }
}

#[async_trait]
impl WarehouseExecutor for BigQueryExecutor {
    async fn execute(&self, spec: &AnalyticsQuerySpec) -> Result<Vec<AnalyticsRow>, WarehouseError> {
        if !spec.validated {
            return Err(WarehouseError::Unvalidated);
        }

        let sql = self.render_sql(spec);
        let request = QueryRequest {
            query: sql.clone(),
            use_legacy_sql: false,
            parameter_mode: "NAMED".to_string(),
            query_parameters: Self::build_parameters(spec, &sql),
        };

        let url = format!(
            "{}/projects/{}/queries",
            self.config.base_url, self.config.project_id
        );

        tracing::debug!(
            query_type = spec.query_type.as_str(),
            filter_count = spec.filters.len(),
            "Executing warehouse query"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WarehouseError::Timeout
                } else {
                    WarehouseError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Api(format!(
                "BigQuery error {}: {}",
                status, error_text
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| WarehouseError::Api(format!("Failed to parse response: {}", e)))?;

        Ok(body.into_rows())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    use_legacy_sql: bool,
    parameter_mode: String,
    query_parameters: Vec<QueryParameter>,
}

#[derive(Serialize)]
struct QueryParameter {
    name: String,
    #[serde(rename = "parameterType")]
    parameter_type: ParameterType,
    #[serde(rename = "parameterValue")]
    parameter_value: ParameterValue,
}

#[derive(Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    param_type: String,
}

#[derive(Serialize)]
struct ParameterValue {
    value: String,
}

impl QueryParameter {
    fn new(name: &str, value: &FilterValue) -> Self {
        let (param_type, value) = match value {
            FilterValue::Str(s) => ("STRING", s.clone()),
            FilterValue::Int(i) => ("INT64", i.to_string()),
        };
        Self {
            name: name.to_string(),
            parameter_type: ParameterType {
                param_type: param_type.to_string(),
            },
            parameter_value: ParameterValue { value },
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Deserialize)]
struct Cell {
    v: serde_json::Value,
}

impl QueryResponse {
    /// BigQuery serializes every cell as a string; coerce numerics back
    /// using the declared field types.
    fn into_rows(self) -> Vec<AnalyticsRow> {
        let fields = self.schema.map(|s| s.fields).unwrap_or_default();
        self.rows
            .into_iter()
            .map(|row| {
                fields
                    .iter()
                    .zip(row.f)
                    .map(|(field, cell)| (field.name.clone(), coerce_value(field, cell.v)))
                    .collect()
            })
            .collect()
    }
}

fn coerce_value(field: &FieldSchema, value: serde_json::Value) -> serde_json::Value {
    let Some(text) = value.as_str() else {
        return value;
    };
    match field.field_type.as_str() {
        "INTEGER" | "INT64" => text
            .parse::<i64>()
            .map(serde_json::Value::from)
            .unwrap_or_else(|_| serde_json::Value::from(text)),
        "FLOAT" | "FLOAT64" | "NUMERIC" => text
            .parse::<f64>()
            .map(serde_json::Value::from)
            .unwrap_or_else(|_| serde_json::Value::from(text)),
        _ => serde_json::Value::from(text),
    }
}

/// Recording mock executor for tests and local development. Returns the
/// configured rows and keeps every executed spec for inspection.
pub struct MockWarehouseExecutor {
    rows: Vec<AnalyticsRow>,
    executed: Mutex<Vec<AnalyticsQuerySpec>>,
}

impl MockWarehouseExecutor {
    pub fn with_rows(rows: Vec<AnalyticsRow>) -> Self {
        Self {
            rows,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Canned on-time-airlines rows, enough to exercise rendering.
    pub fn with_default_rows() -> Self {
        let rows = vec![
            default_row("DL", "Delta Air Lines", 1204, 91.3, 4.2),
            default_row("AA", "American Airlines", 986, 87.9, 6.8),
            default_row("UA", "United Airlines", 754, 84.1, 9.5),
        ];
        Self::with_rows(rows)
    }

    /// Specs seen so far, in execution order.
    pub fn executed(&self) -> Vec<AnalyticsQuerySpec> {
        self.executed.lock().expect("mock executed log poisoned").clone()
    }
}

fn default_row(
    carrier: &str,
    name: &str,
    total: i64,
    on_time_pct: f64,
    avg_delay: f64,
) -> AnalyticsRow {
    HashMap::from([
        ("carrier".to_string(), serde_json::Value::from(carrier)),
        ("airline_name".to_string(), serde_json::Value::from(name)),
        ("total_flights".to_string(), serde_json::Value::from(total)),
        (
            "on_time_percentage".to_string(),
            serde_json::Value::from(on_time_pct),
        ),
        (
            "avg_overall_delay".to_string(),
            serde_json::Value::from(avg_delay),
        ),
    ])
}

#[async_trait]
impl WarehouseExecutor for MockWarehouseExecutor {
    async fn execute(&self, spec: &AnalyticsQuerySpec) -> Result<Vec<AnalyticsRow>, WarehouseError> {
        if !spec.validated {
            return Err(WarehouseError::Unvalidated);
        }
        self.executed
            .lock()
            .expect("mock executed log poisoned")
            .push(spec.clone());
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryType;
    use std::collections::BTreeMap;

    fn spec(validated: bool) -> AnalyticsQuerySpec {
        AnalyticsQuerySpec {
            query_type: QueryType::OnTimeAirlines,
            filters: BTreeMap::from([
                ("origin".to_string(), FilterValue::Str("SFO".to_string())),
                ("dest".to_string(), FilterValue::Str("JFK".to_string())),
            ]),
            limit: 10,
            validated,
        }
    }

    #[tokio::test]
    async fn mock_rejects_unvalidated_specs() {
        let executor = MockWarehouseExecutor::with_default_rows();
        let result = executor.execute(&spec(false)).await;
        assert!(matches!(result, Err(WarehouseError::Unvalidated)));
        assert!(executor.executed().is_empty());
    }

    #[test]
    fn rendered_sql_substitutes_only_fixed_fragments() {
        let executor = BigQueryExecutor::new(WarehouseConfig {
            base_url: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            project_id: "demo-project".to_string(),
            table: "flight_data.flights".to_string(),
            access_token: "token".to_string(),
            timeout_secs: 20,
        });

        let mut with_year = spec(true);
        with_year
            .filters
            .insert("year".to_string(), FilterValue::Int(2023));

        let sql = executor.render_sql(&with_year);
        assert!(sql.contains("`demo-project.flight_data.flights`"));
        assert!(sql.contains("AND year = @year"));
        assert!(!sql.contains("{table}"));
        assert!(!sql.contains("{year_clause}"));
        assert!(!sql.contains("2023"));

        let sql = executor.render_sql(&spec(true));
        assert!(!sql.contains("@year"));
    }

    #[test]
    fn parameters_carry_typed_values() {
        let s = spec(true);
        let sql = "SELECT 1 FROM t WHERE origin = @origin AND dest = @dest LIMIT @limit";
        let params = BigQueryExecutor::build_parameters(&s, sql);

        let limit = params.iter().find(|p| p.name == "limit").unwrap();
        assert_eq!(limit.parameter_type.param_type, "INT64");
        assert_eq!(limit.parameter_value.value, "10");

        let origin = params.iter().find(|p| p.name == "origin").unwrap();
        assert_eq!(origin.parameter_type.param_type, "STRING");
        assert_eq!(origin.parameter_value.value, "SFO");
    }

    #[test]
    fn response_rows_coerce_numeric_cells() {
        let response = QueryResponse {
            schema: Some(TableSchema {
                fields: vec![
                    FieldSchema {
                        name: "carrier".to_string(),
                        field_type: "STRING".to_string(),
                    },
                    FieldSchema {
                        name: "total_flights".to_string(),
                        field_type: "INTEGER".to_string(),
                    },
                    FieldSchema {
                        name: "on_time_percentage".to_string(),
                        field_type: "FLOAT".to_string(),
                    },
                ],
            }),
            rows: vec![TableRow {
                f: vec![
                    Cell {
                        v: serde_json::Value::from("DL"),
                    },
                    Cell {
                        v: serde_json::Value::from("1204"),
                    },
                    Cell {
                        v: serde_json::Value::from("91.3"),
                    },
                ],
            }],
        };

        let rows = response.into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["carrier"], "DL");
        assert_eq!(rows[0]["total_flights"], 1204);
        assert_eq!(rows[0]["on_time_percentage"], 91.3);
    }
}
