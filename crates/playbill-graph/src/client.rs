//! Neo4j connection management and the query adapter.
//!
//! [`GraphClient::fetch`] is the single store-execution boundary: one
//! Cypher body plus a parameter tree in, an ordered sequence of `record`
//! values out. Everything Bolt-specific (parameter conversion, numeric
//! widths, row decoding) stays inside this module.

use neo4rs::{query, BoltMap, BoltNull, BoltType, ConfigBuilder, Graph};
use serde_json::{Map, Value};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("No {operation} query registered for type {kind}")]
    MissingQuery {
        kind: String,
        operation: &'static str,
    },

    #[error("Unknown entity type: {0}")]
    UnknownKind(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Model(#[from] playbill_core::PlaybillError),
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl GraphConfig {
    /// Load the `[neo4j]` section from `{file_prefix}.toml` and
    /// `PLAYBILL__`-prefixed environment variables, falling back to
    /// defaults when neither is present.
    pub fn load(file_prefix: &str) -> Result<GraphConfig, StoreError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("PLAYBILL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        match cfg.get::<GraphConfig>("neo4j") {
            Ok(config) => Ok(config),
            Err(_) => Ok(GraphConfig::default()),
        }
    }
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "playbill-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

/// Execution flags for a single templated query.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Zero records is a NotFound failure rather than an empty result.
    pub result_required: bool,
    /// Return every record instead of the first.
    pub return_as_list: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            result_required: true,
            return_as_list: false,
        }
    }
}

/// Result of a templated query, shaped per
/// [`FetchOptions::return_as_list`]. The caller decides which shape a
/// given query implies; the adapter never infers it.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    One(Option<Value>),
    Many(Vec<Value>),
}

impl Fetched {
    /// The single (or first) record, when present.
    pub fn record(self) -> Option<Value> {
        match self {
            Fetched::One(record) => record,
            Fetched::Many(records) => records.into_iter().next(),
        }
    }

    pub fn records(self) -> Vec<Value> {
        match self {
            Fetched::One(record) => record.into_iter().collect(),
            Fetched::Many(records) => records,
        }
    }
}

/// Thread-safe Neo4j client with connection pooling.
///
/// Every fetch checks a connection out of the pool for that call alone
/// and returns it before resolving; no backend resource is shared across
/// lifecycle calls. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, StoreError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute one Cypher body with its parameter tree.
    ///
    /// Every template returns a single column aliased `record`. The row
    /// stream is drained before returning so the pooled connection goes
    /// back on every exit path (early errors drop the stream, which
    /// releases it as well).
    pub async fn fetch(
        &self,
        kind: &str,
        cypher: &str,
        params: &Map<String, Value>,
        options: FetchOptions,
    ) -> Result<Fetched, StoreError> {
        tracing::debug!(kind, "Executing store query");

        let mut q = query(cypher);
        for (key, value) in params {
            q = q.param(key, json_to_bolt(value));
        }

        let mut stream = self.graph.execute(q).await?;
        let mut records = Vec::new();
        while let Some(row) = stream.next().await? {
            let record: Value = row
                .get("record")
                .map_err(|e| StoreError::Serialization(format!("bad record column: {e}")))?;
            records.push(record);
        }

        if records.is_empty() && options.result_required {
            return Err(StoreError::NotFound {
                kind: kind.to_string(),
                id: params
                    .get("uuid")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        Ok(if options.return_as_list {
            Fetched::Many(records)
        } else {
            Fetched::One(records.into_iter().next())
        })
    }
}

/// Translate a normalized parameter tree into Bolt parameter values.
///
/// Integers travel as Bolt integers (`i64` is exact on both sides),
/// other numbers as floats; maps and lists recurse. The inverse
/// direction, Bolt records back to JSON, rides neo4rs's row
/// deserialization in [`GraphClient::fetch`]. No other layer touches
/// Bolt numerics.
fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull {}),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        Value::String(s) => s.clone().into(),
        Value::Array(items) => items.iter().map(json_to_bolt).collect::<Vec<_>>().into(),
        Value::Object(map) => {
            let mut bolt = BoltMap::default();
            for (key, value) in map {
                bolt.put(key.as_str().into(), json_to_bolt(value));
            }
            BoltType::Map(bolt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.fetch_size, 256);
    }

    #[test]
    fn test_load_without_sources_falls_back_to_defaults() {
        let config = GraphConfig::load("playbill-missing-config").unwrap();
        assert_eq!(config.uri, GraphConfig::default().uri);
    }

    #[test]
    fn test_fetch_options_default_to_required_single() {
        let options = FetchOptions::default();
        assert!(options.result_required);
        assert!(!options.return_as_list);
    }

    #[test]
    fn test_fetched_record_and_records() {
        let one = Fetched::One(Some(json!({"name": "Hamlet"})));
        assert_eq!(one.clone().record(), Some(json!({"name": "Hamlet"})));
        assert_eq!(one.records().len(), 1);

        let empty = Fetched::One(None);
        assert_eq!(empty.clone().record(), None);
        assert!(empty.records().is_empty());

        let many = Fetched::Many(vec![json!(1), json!(2)]);
        assert_eq!(many.clone().record(), Some(json!(1)));
        assert_eq!(many.records(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_json_to_bolt_variants() {
        assert!(matches!(json_to_bolt(&json!(null)), BoltType::Null(_)));
        assert!(matches!(json_to_bolt(&json!(true)), BoltType::Boolean(_)));
        assert!(matches!(json_to_bolt(&json!(42)), BoltType::Integer(_)));
        assert!(matches!(json_to_bolt(&json!(2.5)), BoltType::Float(_)));
        assert!(matches!(json_to_bolt(&json!("x")), BoltType::String(_)));
        assert!(matches!(json_to_bolt(&json!([1, 2])), BoltType::List(_)));
        assert!(matches!(
            json_to_bolt(&json!({"uuid": "r-1", "position": 0})),
            BoltType::Map(_)
        ));
    }
}
