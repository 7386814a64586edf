use std::time::Duration;

use async_trait::async_trait;

use super::{SchedulingService, post_json};
use crate::error::{Result, Stage};
use crate::model::{Dag, Resources, ScheduleResponse, SchedulingRequest};

/// Scheduling service reached over `POST {url}` with a `{dag, resources}` body.
#[derive(Clone)]
pub struct HttpSchedulingService {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSchedulingService {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SchedulingService for HttpSchedulingService {
    async fn schedule(&self, dag: &Dag, resources: &Resources) -> Result<ScheduleResponse> {
        let request = SchedulingRequest { dag, resources };
        post_json(
            &self.client,
            &self.url,
            &request,
            Stage::Scheduling,
            self.timeout,
        )
        .await
    }
}
