use std::time::Duration;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{segment, SourceError, TextSource};
use crate::state::{Locale, SourceSettings};

const USER_AGENT: &str = concat!("ReadToMe/", env!("CARGO_PKG_VERSION"));

/// Subset of the REST `page/summary` response we read
#[derive(Debug, Deserialize)]
pub struct PageSummary {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub extract: Option<String>,
}

/// Article summaries from a Wikipedia language edition.
pub struct WikipediaSource {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaSource {
    pub fn new(locale: Locale, settings: &SourceSettings) -> Result<Self, SourceError> {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.wikipedia.org", locale.code()));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_s))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn summary_url(&self, topic: &str) -> String {
        format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base_url,
            urlencoding::encode(topic.trim())
        )
    }
}

#[async_trait]
impl TextSource for WikipediaSource {
    async fn fetch(&self, topic: &str) -> Result<Vec<String>, SourceError> {
        if topic.trim().is_empty() {
            return Err(SourceError::EmptyTopic);
        }

        let url = self.summary_url(topic);
        tracing::info!("Fetching summary: {}", url);

        let resp = self.client.get(&url).send().await?;
        check_status(resp.status())?;

        let summary: PageSummary = resp.json().await?;
        sentences_from_summary(summary)
    }
}

/// Maps an HTTP status to the source error taxonomy.
pub fn check_status(status: StatusCode) -> Result<(), SourceError> {
    if status == StatusCode::NOT_FOUND {
        Err(SourceError::NotFound)
    } else if !status.is_success() {
        Err(SourceError::Connection(format!("server responded with {}", status)))
    } else {
        Ok(())
    }
}

pub fn sentences_from_summary(summary: PageSummary) -> Result<Vec<String>, SourceError> {
    let Some(extract) = summary.extract.filter(|e| !e.trim().is_empty()) else {
        tracing::debug!("Summary without extract (type {:?})", summary.kind);
        return Err(SourceError::NotFound);
    };

    let sentences = segment::segment(&extract);
    if sentences.is_empty() {
        return Err(SourceError::EmptyContent);
    }

    tracing::info!(
        "Summary for '{}' split into {} sentences",
        summary.title.as_deref().unwrap_or("?"),
        sentences.len()
    );
    Ok(sentences)
}
