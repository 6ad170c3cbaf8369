use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use titlecast_core::{DisplayRecord, StatusKind};
use titlecast_runtime_config::LookupSettings;
use tracing::debug;
use url::Url;

use crate::error::{LookupError, Result};
use crate::TitleLookup;

/// Longest response body kept in a [`LookupError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// HTTP client for the title metadata services.
///
/// Retail titles go to the patch-tracker APIs (`?titleid=`), homebrew ids go
/// to the homebrew store search whose artwork is served through an image
/// proxy.
pub struct LookupClient {
    client: reqwest::Client,
    settings: LookupSettings,
}

#[derive(Debug, Deserialize)]
struct RetailResponse {
    metadata: Option<RetailMetadata>,
}

#[derive(Debug, Deserialize)]
struct RetailMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HomebrewResponse {
    #[serde(default)]
    items: Vec<HomebrewItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HomebrewItem {
    #[serde(default)]
    name: String,
    #[serde(default, alias = "titleid", alias = "title_id")]
    title_id: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl LookupClient {
    pub fn new(settings: LookupSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client, settings })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, title_id: &str) -> Result<T> {
        debug!("GET {url}?titleid={title_id}");
        let resp = self
            .client
            .get(url)
            .query(&[("titleid", title_id)])
            .send()
            .await?;
        parse_response(resp).await
    }

    async fn lookup_retail(&self, url: &str, site: &str, key: &str) -> Result<DisplayRecord> {
        let body: RetailResponse = self.get_json(url, key).await?;
        let metadata = body
            .metadata
            .filter(|m| !m.name.trim().is_empty())
            .ok_or_else(|| LookupError::NotFound(key.to_string()))?;
        let page = format!("{}/{}", site.trim_end_matches('/'), key);
        Ok(DisplayRecord::new(
            metadata.name,
            metadata.icon.unwrap_or_default(),
            page,
            key,
        ))
    }

    async fn lookup_homebrew(&self, key: &str) -> Result<DisplayRecord> {
        let body: HomebrewResponse = self.get_json(&self.settings.homebrew_url, key).await?;
        let item = pick_homebrew_item(body.items, key)
            .ok_or_else(|| LookupError::NotFound(key.to_string()))?;
        let image = item
            .image
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(|path| {
                proxied_image_url(&self.settings.image_proxy, &self.settings.homebrew_url, path)
            })
            .transpose()?
            .unwrap_or_default();
        Ok(DisplayRecord::new(
            item.name,
            image,
            item.url.unwrap_or_default(),
            key,
        ))
    }

    /// Fetch the remote snapshot used to seed an empty title cache.
    pub async fn fetch_seed(&self) -> Result<BTreeMap<String, DisplayRecord>> {
        let url = self.settings.seed_url.trim();
        if url.is_empty() {
            return Err(LookupError::NotFound("seed snapshot".to_string()));
        }
        let resp = self.client.get(url).send().await?;
        let seed: BTreeMap<String, DisplayRecord> = parse_response(resp).await?;
        Ok(seed
            .into_iter()
            .map(|(key, record)| {
                let record = record.normalized(&key);
                (key, record)
            })
            .collect())
    }
}

impl TitleLookup for LookupClient {
    async fn lookup(&self, kind: StatusKind, key: &str) -> Result<DisplayRecord> {
        match kind {
            StatusKind::RetailA => {
                self.lookup_retail(&self.settings.orbis_url, &self.settings.orbis_site, key)
                    .await
            }
            StatusKind::RetailB => {
                self.lookup_retail(
                    &self.settings.prospero_url,
                    &self.settings.prospero_site,
                    key,
                )
                .await
            }
            StatusKind::Homebrew => self.lookup_homebrew(key).await,
            StatusKind::Idle | StatusKind::Unknown => Err(LookupError::Unsupported(kind)),
        }
    }
}

/// Prefer the item whose title id matches `key`, else the first named item.
fn pick_homebrew_item(items: Vec<HomebrewItem>, key: &str) -> Option<HomebrewItem> {
    let named: Vec<HomebrewItem> = items
        .into_iter()
        .filter(|item| !item.name.trim().is_empty())
        .collect();
    let index = named
        .iter()
        .position(|item| {
            item.title_id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(key))
        })
        .unwrap_or(0);
    named.into_iter().nth(index)
}

/// Resolve `image` against `base_url` and, when `proxy` is set, wrap the
/// absolute URL as the proxy's `url` query parameter.
pub fn proxied_image_url(proxy: &str, base_url: &str, image: &str) -> Result<String> {
    let absolute = Url::parse(base_url)?.join(image)?;
    let proxy = proxy.trim();
    if proxy.is_empty() {
        return Ok(absolute.into());
    }
    let mut proxied = Url::parse(proxy)?;
    proxied
        .query_pairs_mut()
        .append_pair("url", absolute.as_str());
    Ok(proxied.into())
}

/// Return the deserialized body on 2xx, or a status error carrying a
/// truncated body.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        let body: String = text.chars().take(MAX_ERROR_BODY).collect();
        return Err(LookupError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&text)?)
}
