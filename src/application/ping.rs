//! Best-effort search engine notifications after a post mutation.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::application::blog::BlogConfig;
use crate::domain::types::SearchEngine;

pub const PING_SENT_METRIC: &str = "scriba_search_engine_ping_total";
pub const PING_FAILED_METRIC: &str = "scriba_search_engine_ping_failed_total";

#[derive(Debug, Error)]
pub enum PingError {
    #[error("could not build ping url: {0}")]
    Url(String),
    #[error("ping request failed: {0}")]
    Transport(String),
    #[error("ping rejected with status {0}")]
    Status(u16),
}

/// Sends one notification announcing that `feed_url` changed.
#[async_trait]
pub trait SearchEnginePinger: Send + Sync {
    async fn ping(&self, engine: SearchEngine, feed_url: &Url) -> Result<(), PingError>;
}

/// Ping target for `engine`, with the feed URL in the engine's query parameter.
pub fn ping_url(engine: SearchEngine, feed_url: &Url) -> Result<Url, PingError> {
    let (base, param) = engine.endpoint();
    let mut url = Url::parse(base).map_err(|err| PingError::Url(err.to_string()))?;
    url.query_pairs_mut().append_pair(param, feed_url.as_str());
    Ok(url)
}

/// Fans a mutation out to every configured engine on detached tasks.
#[derive(Clone)]
pub struct PingDispatcher {
    pinger: Arc<dyn SearchEnginePinger>,
    engines: Vec<SearchEngine>,
    feed_url: Url,
    enabled: bool,
}

impl PingDispatcher {
    pub fn new(pinger: Arc<dyn SearchEnginePinger>, config: &BlogConfig) -> Self {
        Self {
            pinger,
            engines: config.ping_search_engines.engines().to_vec(),
            feed_url: config.feed_url(),
            enabled: config.pings_enabled(),
        }
    }

    /// Spawn one ping per engine and return immediately; outcomes are only logged.
    pub fn dispatch(&self) {
        if !self.enabled {
            return;
        }

        for engine in self.engines.iter().copied() {
            let pinger = Arc::clone(&self.pinger);
            let feed_url = self.feed_url.clone();
            tokio::spawn(async move {
                match pinger.ping(engine, &feed_url).await {
                    Ok(()) => {
                        counter!(PING_SENT_METRIC, "engine" => engine.as_str()).increment(1);
                        debug!(
                            target = "application::ping",
                            engine = engine.as_str(),
                            feed = %feed_url,
                            "search engine pinged"
                        );
                    }
                    Err(err) => {
                        counter!(PING_FAILED_METRIC, "engine" => engine.as_str()).increment(1);
                        warn!(
                            target = "application::ping",
                            engine = engine.as_str(),
                            feed = %feed_url,
                            error = %err,
                            "search engine ping failed"
                        );
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_url_carries_feed_url_in_engine_param() {
        let feed = Url::parse("https://blog.example.com/posts.xml").unwrap();

        let google = ping_url(SearchEngine::Google, &feed).unwrap();
        assert_eq!(
            google.as_str(),
            "https://www.google.com/webmasters/tools/ping?sitemap=https%3A%2F%2Fblog.example.com%2Fposts.xml"
        );

        let bing = ping_url(SearchEngine::Bing, &feed).unwrap();
        assert_eq!(bing.query(), Some("siteMap=https%3A%2F%2Fblog.example.com%2Fposts.xml"));
    }
}
