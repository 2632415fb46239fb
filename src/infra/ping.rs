//! reqwest-backed search engine pinger.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::application::ping::{PingError, SearchEnginePinger, ping_url};
use crate::domain::types::SearchEngine;

use super::error::InfraError;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ReqwestPinger {
    client: Client,
}

impl ReqwestPinger {
    pub fn new() -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(PING_TIMEOUT)
            .build()
            .map_err(|err| InfraError::configuration(format!("http client: {err}")))?;
        Ok(Self { client })
    }

    pub fn user_agent() -> &'static str {
        concat!("scriba/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl SearchEnginePinger for ReqwestPinger {
    async fn ping(&self, engine: SearchEngine, feed_url: &Url) -> Result<(), PingError> {
        let target = ping_url(engine, feed_url)?;
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|err| PingError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PingError::Status(status.as_u16()))
        }
    }
}
