//! PostgREST-style table client.
//!
//! `POST {base_url}/rest/v1/{table}` with `Prefer: return=representation`;
//! the inserted row comes back as `[{ "id": .. }]`.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::StoreConfig;
use crate::intake::OutboundRecord;
use crate::store::{RecordStore, StoreError};

pub struct RestStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl RestStore {
    pub fn from_config(config: &StoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }
}

/// Pull the row id out of a representation response.  PostgREST returns an
/// array of rows; some gateways unwrap single rows into an object.
fn extract_id(body: &Value) -> Option<String> {
    let row = match body {
        Value::Array(rows) => rows.first()?,
        other => other,
    };
    match row.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn create(&self, record: &OutboundRecord) -> Result<String, StoreError> {
        let mut req = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(record);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.header("apikey", key).bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            log::error!("store: insert into {} failed ({status})", self.config.table);
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        extract_id(&body).ok_or(StoreError::MissingId)
    }
}
