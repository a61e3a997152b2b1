use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::fetch::FETCH_TIMEOUT;
use super::{FetchRequest, SourceFetcher, decode_event_array};
use crate::env::{IsoFormatOptions, TimeZoneSetting};
use crate::error::{DatebookError, DatebookResult};
use crate::event::EventInput;

/// A URL answering with a JSON array of events for the requested range.
#[derive(Debug, Clone)]
pub struct JsonFeedFetcher {
    url: Url,
    pub start_param: String,
    pub end_param: String,
    pub time_zone_param: String,
    pub extra_params: BTreeMap<String, String>,
    client: reqwest::Client,
}

impl JsonFeedFetcher {
    pub fn new(url: &str) -> DatebookResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| DatebookError::Config(format!("Invalid feed URL '{url}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| DatebookError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(JsonFeedFetcher {
            url,
            start_param: "start".to_string(),
            end_param: "end".to_string(),
            time_zone_param: "timeZone".to_string(),
            extra_params: BTreeMap::new(),
            client,
        })
    }

    /// The URL for one request: extra params, then the range and the time zone.
    pub fn request_url(&self, request: &FetchRequest) -> Url {
        let env = &request.env;
        let iso = |m| {
            env.format_iso(
                m,
                IsoFormatOptions {
                    omit_time: true,
                    ..Default::default()
                },
            )
        };
        let mut url = self.url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.extra_params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(&self.start_param, &iso(request.range.start));
            pairs.append_pair(&self.end_param, &iso(request.range.end));
            if *env.time_zone() != TimeZoneSetting::Local {
                pairs.append_pair(&self.time_zone_param, env.time_zone().as_str());
            }
        }
        url
    }
}

#[async_trait]
impl SourceFetcher for JsonFeedFetcher {
    fn kind(&self) -> &'static str {
        "json"
    }

    async fn fetch(&self, request: &FetchRequest) -> DatebookResult<Vec<EventInput>> {
        let url = self.request_url(request);
        debug!(source = %request.source_id, url = %url, "Fetching JSON feed");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DatebookError::Fetch(format!("Request to {url} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DatebookError::Fetch(format!(
                "Feed {url} answered with status {status}"
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| DatebookError::Fetch(format!("Failed to read feed {url}: {e}")))?;
        decode_event_array(&body, url.as_str())
            .map_err(|e| DatebookError::Fetch(format!("Feed {url} is not a JSON event array: {e}")))
    }
}
