//! HTTP connector for the Directus items API.
//!
//! The same client talks to both sides of the migration: v8 for reads and v9
//! for writes. Both expose collections under `/items/{collection}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::connectors::common::{check_response, create_http_client};
use crate::connectors::{DestinationApi, SourceApi};
use crate::error::{Error, Result};
use crate::model::Item;

/// Envelope of an items response.
#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    data: ItemsData,
    #[serde(default)]
    meta: Option<ResponseMeta>,
}

/// Singletons come back as a bare object, list collections as an array.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum ItemsData {
    Many(Vec<Item>),
    One(Item),
    #[default]
    Empty,
}

impl From<ItemsData> for Vec<Item> {
    fn from(data: ItemsData) -> Self {
        match data {
            ItemsData::Many(items) => items,
            ItemsData::One(item) => vec![item],
            ItemsData::Empty => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseMeta {
    total_count: Option<u64>,
}

/// Authenticated client for one Directus instance.
pub struct DirectusClient {
    base_url: String,
    token: Option<String>,
    api_name: &'static str,
    client: Client,
}

impl DirectusClient {
    /// Creates a client with the given request deadline.
    ///
    /// `api_name` only shows up in error messages.
    pub fn new(config: &ApiConfig, api_name: &'static str, timeout: Duration) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            api_name,
            client: create_http_client(timeout),
        }
    }

    /// Builds the items URL for a collection.
    fn items_url(&self, collection: &str) -> String {
        format!("{}/items/{}", self.base_url, collection)
    }

    /// Attaches the bearer token, if any.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_items(&self, collection: &str, query: &[(&str, String)]) -> Result<ItemsResponse> {
        let url = self.items_url(collection);
        debug!("GET {} {:?}", url, query);

        let response = self
            .authorize(self.client.get(&url))
            .query(query)
            .send()
            .await?;
        let response = check_response(response, self.api_name).await?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SourceApi for DirectusClient {
    async fn count(&self, collection: &str) -> Result<u64> {
        let body = self
            .get_items(
                collection,
                &[
                    ("limit", "0".to_string()),
                    ("meta", "total_count".to_string()),
                ],
            )
            .await?;

        body.meta.and_then(|m| m.total_count).ok_or_else(|| Error::Api {
            status: 200,
            body: format!("response for '{}' carries no total_count", collection),
        })
    }

    async fn fetch(&self, collection: &str, offset: u64, limit: u64) -> Result<Vec<Item>> {
        let body = self
            .get_items(
                collection,
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(body.data.into())
    }
}

#[async_trait]
impl DestinationApi for DirectusClient {
    async fn bulk_create(&self, collection: &str, items: &[Item]) -> Result<()> {
        let url = self.items_url(collection);
        debug!("POST {} ({} items)", url, items.len());

        let response = self
            .authorize(self.client.post(&url))
            .json(items)
            .send()
            .await?;
        check_response(response, self.api_name).await?;

        Ok(())
    }

    async fn update(&self, collection: &str, item: &Item) -> Result<()> {
        let url = self.items_url(collection);
        debug!("PATCH {}", url);

        let response = self
            .authorize(self.client.patch(&url))
            .json(item)
            .send()
            .await?;
        check_response(response, self.api_name).await?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "directus_tests.rs"]
mod tests;
