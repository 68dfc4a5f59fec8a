//! HTTP client for a PostgREST-style record store

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::error::StoreError;
use super::record::{Filter, OrderBy, Record, RecordStore};
use crate::config::RemoteConfig;

/// Record store reached over the PostgREST HTTP conventions
pub struct RestRecordStore {
    /// HTTP client
    client: Client,
    /// Project base URL (without trailing slash)
    base_url: String,
    /// API key sent as `apikey` and bearer token
    api_key: String,
}

impl RestRecordStore {
    /// Path prefix for table endpoints
    const REST_PATH: &'static str = "/rest/v1";

    /// Create a store client from connection settings
    pub fn new(config: &RemoteConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(std::time::Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, Self::REST_PATH, table)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Remote { status: status.as_u16(), message })
    }
}

/// Render a filter value the way PostgREST expects it after `eq.`
fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Build the query string pairs for a select
pub(crate) fn select_params(filters: &[Filter], order: Option<&OrderBy>) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for filter in filters {
        params.push((filter.column.clone(), format!("eq.{}", filter_literal(&filter.value))));
    }

    if let Some(order) = order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    params
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Record>, StoreError> {
        let response = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&select_params(filters, order))
            .send()
            .await?;

        let body = Self::check_status(response).await?.text().await?;
        let rows: Vec<Record> = serde_json::from_str(&body)?;
        Ok(rows)
    }

    async fn upsert(
        &self,
        table: &str,
        record: Record,
        conflict: &[&str],
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", conflict.join(","))])
            .json(&vec![record])
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}
