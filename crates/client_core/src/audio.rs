use std::{collections::HashSet, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use shared::protocol::Word;
use tracing::{debug, info, warn};
use url::Url;

/// Fetches one media file fully so later playback starts without waiting.
#[async_trait]
pub trait MediaLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<()>;
}

pub struct HttpMediaLoader {
    http: Client,
    origin: Option<Url>,
}

impl HttpMediaLoader {
    /// Relative media paths (`/media/...`) resolve against the origin of `api_base`.
    pub fn new(api_base: &str) -> Self {
        Self {
            http: Client::new(),
            origin: Url::parse(api_base).ok(),
        }
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .origin
                .as_ref()
                .context("relative media url without a base")?
                .join(url)
                .with_context(|| format!("invalid media url '{url}'")),
            Err(err) => Err(err).with_context(|| format!("invalid media url '{url}'")),
        }
    }
}

#[async_trait]
impl MediaLoader for HttpMediaLoader {
    async fn load(&self, url: &str) -> Result<()> {
        let resolved = self.resolve(url)?;
        self.http
            .get(resolved)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(())
    }
}

/// Audio files known to be playable right away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioCache {
    ready: HashSet<String>,
}

impl AudioCache {
    pub fn contains(&self, url: &str) -> bool {
        self.ready.contains(url)
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Audio for `word` is offered only when it was preloaded.
    pub fn has_audio(&self, word: &Word) -> bool {
        word.audio_url
            .as_deref()
            .is_some_and(|url| self.contains(url))
    }
}

/// Warms every distinct `audio_url` concurrently. A load that outlives
/// `timeout` still counts as ready; a failed one does not.
pub async fn preload_audio(loader: &dyn MediaLoader, words: &[Word], timeout: Duration) -> AudioCache {
    let mut urls: Vec<&str> = Vec::new();
    for url in words.iter().filter_map(|word| word.audio_url.as_deref()) {
        if !url.is_empty() && !urls.contains(&url) {
            urls.push(url);
        }
    }

    let loads = urls.iter().map(|url| async move {
        match tokio::time::timeout(timeout, loader.load(url)).await {
            Ok(Ok(())) => {
                debug!(url, "audio: preloaded");
                Some(url.to_string())
            }
            Err(_) => {
                info!(url, "audio: preload timed out, treating as loaded");
                Some(url.to_string())
            }
            Ok(Err(err)) => {
                warn!(url, error = %err, "audio: preload failed");
                None
            }
        }
    });

    let ready: HashSet<String> = join_all(loads).await.into_iter().flatten().collect();
    info!(requested = urls.len(), ready = ready.len(), "audio: preload finished");
    AudioCache { ready }
}
