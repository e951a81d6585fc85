//! REST implementation of the [`Collection`] contract.
//!
//! Each record type maps to one resource under the configured base URL:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `fetch` | `GET {base}/{collection}?page=&limit=&search=` |
//! | `get` | `GET {base}/{collection}/{id}` (404 → `None`) |
//! | `create` | `POST {base}/{collection}` |
//! | `update` | `PUT {base}/{collection}/{id}` |
//! | `delete` | `DELETE {base}/{collection}/{id}` |
//!
//! Request and response bodies are JSON. Any non-2xx response becomes an
//! error carrying the status and body text. Requests are never retried;
//! the controllers surface the failure and leave their state intact.
//!
//! # Environment Variables
//!
//! - `BIZDESK_API_TOKEN`: optional, sent as `Authorization: Bearer <token>`.

use std::marker::PhantomData;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};

use bizdesk_core::collection::{Collection, PageQuery};
use bizdesk_core::models::Record;

use crate::config::ApiConfig;

/// Shared HTTP client for one backend.
///
/// Cheap to clone; hand out typed collections with [`collection`](Self::collection).
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl RestClient {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let base = Url::parse(&api.base_url)
            .with_context(|| format!("Invalid api.base_url: {}", api.base_url))?;
        if base.cannot_be_a_base() {
            bail!("api.base_url cannot be used as a base URL: {}", api.base_url);
        }
        let token = std::env::var("BIZDESK_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Ok(Self { http, base, token })
    }

    pub fn collection<T: Record>(&self) -> RestCollection<T> {
        RestCollection {
            client: self.clone(),
            _record: PhantomData,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("api.base_url cannot be a base: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Typed view of one REST resource.
pub struct RestCollection<T> {
    client: RestClient,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RestCollection<T> {
    async fn send(&self, what: &str, req: RequestBuilder) -> Result<Response> {
        let req = self.client.authorize(req);
        tracing::debug!(collection = T::COLLECTION, "{}", what);
        req.send()
            .await
            .with_context(|| format!("{} {}: request failed", what, T::COLLECTION))
    }
}

async fn expect_success(what: &str, collection: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    bail!(
        "{} {}: server returned {}: {}",
        what,
        collection,
        status,
        body.trim()
    )
}

async fn decode<T: Record>(what: &str, resp: Response) -> Result<T> {
    resp.json::<T>()
        .await
        .with_context(|| format!("{} {}: invalid response body", what, T::COLLECTION))
}

#[async_trait]
impl<T: Record> Collection<T> for RestCollection<T> {
    async fn fetch(&self, query: &PageQuery) -> Result<Vec<T>> {
        let url = self.client.url(&[T::COLLECTION])?;
        let req = self.client.http.get(url).query(query);
        let resp = self.send("fetch", req).await?;
        let resp = expect_success("fetch", T::COLLECTION, resp).await?;
        resp.json::<Vec<T>>()
            .await
            .with_context(|| format!("fetch {}: invalid response body", T::COLLECTION))
    }

    async fn get(&self, id: &str) -> Result<Option<T>> {
        let url = self.client.url(&[T::COLLECTION, id])?;
        let resp = self.send("get", self.client.http.get(url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = expect_success("get", T::COLLECTION, resp).await?;
        decode("get", resp).await.map(Some)
    }

    async fn create(&self, record: &T) -> Result<T> {
        let url = self.client.url(&[T::COLLECTION])?;
        let resp = self
            .send("create", self.client.http.post(url).json(record))
            .await?;
        let resp = expect_success("create", T::COLLECTION, resp).await?;
        decode("create", resp).await
    }

    async fn update(&self, id: &str, record: &T) -> Result<T> {
        let url = self.client.url(&[T::COLLECTION, id])?;
        let resp = self
            .send("update", self.client.http.put(url).json(record))
            .await?;
        let resp = expect_success("update", T::COLLECTION, resp).await?;
        decode("update", resp).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.client.url(&[T::COLLECTION, id])?;
        let resp = self.send("delete", self.client.http.delete(url)).await?;
        expect_success("delete", T::COLLECTION, resp).await?;
        Ok(())
    }
}
