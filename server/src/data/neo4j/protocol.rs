//! Wire types for the Neo4j HTTP transactional endpoint

use serde::{Deserialize, Serialize};

use crate::data::traits::{Params, Row};

#[derive(Debug, Serialize)]
pub struct TxRequest<'a> {
    pub statements: Vec<TxStatement<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TxStatement<'a> {
    pub statement: &'a str,
    pub parameters: &'a Params,
}

#[derive(Debug, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub results: Vec<TxResult>,
    #[serde(default)]
    pub errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    pub data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
pub struct TxRow {
    pub row: Row,
}

#[derive(Debug, Deserialize)]
pub struct TxError {
    pub code: String,
    pub message: String,
}

impl TxResponse {
    /// Rows of the first statement result
    pub fn into_rows(self) -> Vec<Row> {
        self.results
            .into_iter()
            .next()
            .map(|r| r.data.into_iter().map(|d| d.row).collect())
            .unwrap_or_default()
    }
}
