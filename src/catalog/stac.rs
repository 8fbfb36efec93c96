//! STAC API catalog client.
//!
//! Queries `POST {stac_url}/search` per archive and follows `next` links
//! until the result set is exhausted. Only item datetimes are requested.

use super::{day_start, in_window, ImageryCatalog};
use crate::config::{ArchiveSource, CatalogConfig};
use crate::error::CatalogError;
use crate::models::Archive;
use crate::region::Region;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One page of a STAC item search.
#[derive(Debug, Deserialize)]
struct ItemCollection {
    #[serde(default)]
    features: Vec<Item>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    properties: ItemProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ItemProperties {
    #[serde(default)]
    datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    start_datetime: Option<DateTime<Utc>>,
}

impl Item {
    fn capture_time(&self) -> Option<DateTime<Utc>> {
        self.properties
            .datetime
            .or(self.properties.start_datetime)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Link {
    rel: String,
    href: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    merge: bool,
}

/// A page request, either the initial search or a followed link.
#[derive(Debug, Clone, PartialEq)]
enum PageRequest {
    Post { url: String, body: Value },
    Get { url: String },
}

impl PageRequest {
    fn url(&self) -> &str {
        match self {
            PageRequest::Post { url, .. } | PageRequest::Get { url } => url,
        }
    }
}

/// Catalog client for a STAC API.
pub struct StacCatalog {
    config: CatalogConfig,
    http_client: reqwest::Client,
}

impl StacCatalog {
    /// Create a new client for the configured STAC API.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        info!("Using STAC catalog at {}", config.stac_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("geoavail/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.stac_url.trim_end_matches('/'))
    }

    /// Body of the initial search request.
    fn search_body(
        &self,
        source: &ArchiveSource,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Value {
        // STAC intervals are closed; items stamped exactly at `end` come
        // back and are dropped by `in_window`.
        let datetime = format!(
            "{}/{}",
            day_start(start).to_rfc3339_opts(SecondsFormat::Millis, true),
            day_start(end).to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        let mut body = json!({
            "collections": [source.collection],
            "intersects": region.to_geometry(),
            "datetime": datetime,
            "limit": self.config.page_size,
            "fields": {
                "include": ["properties.datetime", "properties.start_datetime"],
                "exclude": ["assets", "links", "geometry", "bbox"]
            }
        });

        if let Some(ref platform) = source.platform {
            body["query"] = json!({ "platform": { "eq": platform } });
        }

        body
    }

    /// Send one page request, retrying transient failures.
    async fn fetch_page(&self, request: &PageRequest) -> Result<ItemCollection, CatalogError> {
        let mut attempt = 0;
        loop {
            match self.send(request).await {
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        "Catalog request failed ({}), retry {}/{}",
                        e, attempt, self.config.retries
                    );
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                other => return other,
            }
        }
    }

    async fn send(&self, request: &PageRequest) -> Result<ItemCollection, CatalogError> {
        let builder = match request {
            PageRequest::Post { url, body } => self.http_client.post(url).json(body),
            PageRequest::Get { url } => self.http_client.get(url),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout(self.config.timeout_seconds)
            } else if e.is_connect() {
                CatalogError::Connect(self.config.stac_url.clone())
            } else {
                CatalogError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Quota(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ItemCollection>()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

/// Request for the `next` link of a page, if there is one.
fn next_request(links: &[Link], previous_body: &Value) -> Option<PageRequest> {
    let link = links.iter().find(|l| l.rel == "next")?;
    let is_post = link
        .method
        .as_deref()
        .map_or(link.body.is_some(), |m| m.eq_ignore_ascii_case("POST"));

    if !is_post {
        return Some(PageRequest::Get {
            url: link.href.clone(),
        });
    }

    let body = match (&link.body, link.merge) {
        (Some(Value::Object(extra)), true) => {
            let mut merged = previous_body.clone();
            if let Value::Object(ref mut map) = merged {
                for (k, v) in extra {
                    map.insert(k.clone(), v.clone());
                }
            }
            merged
        }
        (Some(body), _) => body.clone(),
        (None, _) => previous_body.clone(),
    };

    Some(PageRequest::Post {
        url: link.href.clone(),
        body,
    })
}

#[async_trait]
impl ImageryCatalog for StacCatalog {
    async fn list_acquisitions(
        &self,
        archive: Archive,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, CatalogError> {
        let source = self.config.archives.source(archive);
        if source.collection.is_empty() {
            return Err(CatalogError::Unconfigured(archive));
        }

        let body = self.search_body(source, region, start, end);
        let mut request = PageRequest::Post {
            url: self.search_url(),
            body: body.clone(),
        };
        let mut last_body = body;
        let mut times = Vec::new();
        let mut pages = 0;

        loop {
            if pages == self.config.max_pages {
                return Err(CatalogError::LimitExceeded {
                    pages: self.config.max_pages,
                });
            }
            pages += 1;

            debug!("{} page {}: {}", archive, pages, request.url());
            let page = self.fetch_page(&request).await?;

            times.extend(
                page.features
                    .iter()
                    .filter_map(Item::capture_time)
                    .filter(|t| in_window(t, start, end)),
            );

            match next_request(&page.links, &last_body) {
                Some(next) => {
                    if let PageRequest::Post { ref body, .. } = next {
                        last_body = body.clone();
                    }
                    request = next;
                }
                None => break,
            }
        }

        debug!("{}: {} acquisitions in {} page(s)", archive, times.len(), pages);
        Ok(times)
    }

    fn describe(&self) -> String {
        format!("STAC API {}", self.config.stac_url)
    }
}
