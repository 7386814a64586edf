use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{DslService, post_json};
use crate::error::{Result, Stage};
use crate::model::{Dag, DslRequest, DslResponse};

/// DSL service reached over `POST {url}` with a `{dsl_text}` body.
#[derive(Clone)]
pub struct HttpDslService {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpDslService {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DslService for HttpDslService {
    async fn parse(&self, dsl_text: &str) -> Result<Dag> {
        debug!("Sending {} bytes of DSL to {}", dsl_text.len(), self.url);

        let request = DslRequest { dsl_text };
        let response: DslResponse =
            post_json(&self.client, &self.url, &request, Stage::Dsl, self.timeout).await?;

        Ok(response.dag)
    }
}
