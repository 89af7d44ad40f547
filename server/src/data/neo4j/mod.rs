//! Neo4j graph store client
//!
//! Talks to the HTTP transactional endpoint (`POST /db/{database}/tx/commit`),
//! one auto-committed transaction per statement.

mod protocol;

use std::time::Duration;

use async_trait::async_trait;

use self::protocol::{TxRequest, TxResponse, TxStatement};
use crate::core::config::GraphConfig;
use crate::data::error::DataError;
use crate::data::traits::{GraphReader, Params, Row};
use crate::utils::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, retry_with_backoff_async};

#[derive(Debug)]
pub struct Neo4jHttpReader {
    client: reqwest::Client,
    commit_url: String,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: u64,
}

impl Neo4jHttpReader {
    pub fn new(config: &GraphConfig) -> Result<Self, DataError> {
        let base = config.url.trim_end_matches('/');
        if base.is_empty() {
            return Err(DataError::Config("graph url must not be empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::Config(format!("failed to build HTTP client: {}", e)))?;

        let commit_url = format!("{}/db/{}/tx/commit", base, config.database);
        tracing::debug!(url = %commit_url, "Neo4j reader initialized");

        Ok(Self {
            client,
            commit_url,
            username: config.username.clone(),
            password: config.password.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn execute(&self, statement: &str, params: &Params) -> Result<Vec<Row>, DataError> {
        let body = TxRequest {
            statements: vec![TxStatement {
                statement,
                parameters: params,
            }],
        };

        let mut request = self.client.post(&self.commit_url).json(&body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let resp = request.send().await.map_err(|e| self.map_http(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DataError::GraphStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.map_http(e))?;
        let mut parsed: TxResponse = serde_json::from_slice(&bytes)?;
        if !parsed.errors.is_empty() {
            let first = parsed.errors.swap_remove(0);
            return Err(DataError::graph(first.code, first.message));
        }
        Ok(parsed.into_rows())
    }

    fn map_http(&self, e: reqwest::Error) -> DataError {
        if e.is_timeout() {
            DataError::timeout(self.timeout_secs)
        } else {
            DataError::Http(e)
        }
    }
}

#[async_trait]
impl GraphReader for Neo4jHttpReader {
    async fn run(&self, statement: &str, params: &Params) -> Result<Vec<Row>, DataError> {
        tracing::debug!(statement, params = params.len(), "Running graph statement");
        match retry_with_backoff_async(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY_MS,
            DataError::is_transient,
            || self.execute(statement, params),
        )
        .await
        {
            Ok((rows, _)) => Ok(rows),
            Err((e, attempts)) => {
                tracing::debug!(error = %e, attempts, "Graph statement failed");
                Err(e)
            }
        }
    }
}
