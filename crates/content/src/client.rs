use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub space: String,
    pub environment: String,
    pub access_token: String,
    pub api_base: Url,
    pub media_base: Url,
}

impl ContentConfig {
    pub fn new(
        space: impl Into<String>,
        environment: impl Into<String>,
        access_token: impl Into<String>,
        api_base: &str,
    ) -> Result<Self> {
        let space = space.into();
        if space.trim().is_empty() {
            bail!("CMS space id must not be empty");
        }
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            bail!("CMS access token must not be empty");
        }
        let environment = environment.into();
        let environment = if environment.trim().is_empty() {
            "master".to_string()
        } else {
            environment
        };
        let api_base = Url::parse(api_base).with_context(|| format!("CMS base url '{api_base}'"))?;
        let media_base = api_base.clone();
        Ok(Self {
            space,
            environment,
            access_token,
            api_base,
            media_base,
        })
    }

    pub fn with_media_base(mut self, media_base: &str) -> Result<Self> {
        self.media_base =
            Url::parse(media_base).with_context(|| format!("media base url '{media_base}'"))?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntrySys {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub sys: EntrySys,
    pub fields: AssetFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetFields {
    #[serde(default)]
    pub title: Option<String>,
    pub file: AssetFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetFile {
    pub url: String,
    #[serde(default, rename = "contentType")]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntriesResponse {
    items: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(alias = "Message")]
    message: String,
}

#[derive(Debug, Clone)]
pub struct ContentClient {
    http: Client,
    config: ContentConfig,
}

impl ContentClient {
    pub fn new(config: ContentConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    pub async fn entries(&self, content_type: &str) -> Result<Vec<Entry>> {
        if content_type.trim().is_empty() {
            bail!("content type must not be empty");
        }
        let url = self.collection_url("entries")?;
        let url = Url::parse_with_params(
            url.as_str(),
            &[
                ("access_token", self.config.access_token.as_str()),
                ("content_type", content_type),
            ],
        )?;
        debug!(content_type, "fetching CMS entries");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .context("CMS returned an error status")?;
        let body = response.text().await?;
        parse_entries_body(&body, &url)
    }

    pub async fn asset(&self, id: &str) -> Result<Asset> {
        if id.trim().is_empty() {
            bail!("asset id must not be empty");
        }
        let mut url = self.collection_url("assets")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("invalid CMS base url"))?;
            segments.push(id);
        }
        url.set_query(Some(&format!("access_token={}", self.config.access_token)));
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .context("CMS asset request failed")?;
        let asset: Asset = response
            .json()
            .await
            .with_context(|| format!("decoding asset {id}"))?;
        Ok(asset)
    }

    /// Asset URLs arrive protocol-relative (`//images…`); normalize them to
    /// https before handing them to a media element.
    pub fn resolve_media_url(&self, src: &str) -> Result<Url> {
        if src.starts_with("http://") || src.starts_with("https://") {
            return Ok(Url::parse(src)?);
        }
        if src.starts_with("//") {
            return Ok(Url::parse(&format!("https:{src}"))?);
        }
        let trimmed = src.trim_start_matches('/');
        self.config
            .media_base
            .join(trimmed)
            .context("joining media url")
    }

    fn collection_url(&self, collection: &str) -> Result<Url> {
        let mut url = self.config.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("invalid CMS base url"))?;
            segments.push("spaces");
            segments.push(&self.config.space);
            segments.push("environments");
            segments.push(&self.config.environment);
            segments.push(collection);
        }
        Ok(url)
    }
}

/// HEAD-probe a URL, reporting whether a derived asset variant actually
/// exists before a player commits to it. Any network or status failure
/// degrades to false; the probe never surfaces an error.
pub async fn probe_head(http: &Client, url: &str) -> bool {
    match http.head(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(err) => {
            debug!(url, error = %err, "transcode probe failed");
            false
        }
    }
}

fn parse_entries_body(body: &str, url: &Url) -> Result<Vec<Entry>> {
    // Try to decode the happy path first.
    if let Ok(payload) = serde_json::from_str::<EntriesResponse>(body) {
        return Ok(payload.items);
    }
    // Try to decode the CMS error shape.
    if let Ok(err) = serde_json::from_str::<ApiError>(body) {
        bail!("CMS error: {} (while requesting {url})", err.message);
    }
    let snippet = body.chars().take(200).collect::<String>();
    bail!("unexpected CMS response; could not find 'items'. First 200 bytes: {snippet}")
}
