//! locations.rs
//!
//! Best-effort list of place names for building sensor configurations.
//! Sources, all merged: the fixed county list, the `<datalist>` on the police
//! news list page, and location labels seen in the live events feed. Either
//! remote source may fail without affecting the result of the others.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::polisen_client::EventSource;

pub const COUNTY_LOCATIONS: [&str; 21] = [
    "Blekinge län",
    "Dalarnas län",
    "Gotlands län",
    "Gävleborgs län",
    "Hallands län",
    "Jämtlands län",
    "Jönköpings län",
    "Kalmar län",
    "Kronobergs län",
    "Norrbottens län",
    "Skåne län",
    "Stockholms län",
    "Södermanlands län",
    "Uppsala län",
    "Värmlands län",
    "Västerbottens län",
    "Västernorrlands län",
    "Västmanlands län",
    "Västra Götalands län",
    "Örebro län",
    "Östergötlands län",
];

static DATALIST_OPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"datalist[id^="datalist-"] option"#).expect("datalist option selector")
});

/// Option values of every `datalist-*` element, trimmed, entities decoded.
pub fn parse_datalist_options(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&DATALIST_OPTION)
        .filter_map(|option| option.value().attr("value"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

struct CachedLocations {
    fetched_at: DateTime<Utc>,
    values: Arc<Vec<String>>,
}

pub struct LocationDirectory<S: EventSource> {
    http_client: reqwest::Client,
    list_page_url: String,
    timeout_secs: u64,
    events: Arc<S>,
    ttl: Duration,
    cache: RwLock<Option<CachedLocations>>,
}

impl<S: EventSource> LocationDirectory<S> {
    pub fn new(http_client: reqwest::Client, config: &UpstreamConfig, events: Arc<S>) -> Self {
        Self {
            http_client,
            list_page_url: config.list_page_url.clone(),
            timeout_secs: config.request_timeout_secs,
            events,
            ttl: Duration::hours(config.suggestions_ttl_hours),
            cache: RwLock::new(None),
        }
    }

    pub async fn suggestions(&self) -> Arc<Vec<String>> {
        self.suggestions_at(Utc::now()).await
    }

    pub async fn suggestions_at(&self, now: DateTime<Utc>) -> Arc<Vec<String>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if now - cached.fetched_at < self.ttl {
                return cached.values.clone();
            }
        }

        let mut cache = self.cache.write().await;
        // another caller may have refilled it while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if now - cached.fetched_at < self.ttl {
                return cached.values.clone();
            }
        }

        let values = Arc::new(self.collect().await);
        info!(count = values.len(), "Location suggestions refreshed");
        *cache = Some(CachedLocations {
            fetched_at: now,
            values: values.clone(),
        });
        values
    }

    async fn collect(&self) -> Vec<String> {
        let mut seen: HashSet<String> = COUNTY_LOCATIONS.iter().map(|c| c.to_string()).collect();

        match self.fetch_list_page().await {
            Ok(html) => seen.extend(parse_datalist_options(&html)),
            Err(e) => debug!(error = %e, "Failed to scrape location datalist"),
        }

        match self.events.fetch().await {
            Ok(events) => seen.extend(
                events
                    .into_iter()
                    .map(|e| e.location.name.trim().to_string())
                    .filter(|name| !name.is_empty()),
            ),
            Err(e) => debug!(error = %e, "Failed to collect locations from events feed"),
        }

        let mut values: Vec<String> = seen.into_iter().collect();
        values.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        values
    }

    async fn fetch_list_page(&self) -> Result<String, FetchError> {
        let response = self
            .http_client
            .get(&self.list_page_url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout_secs))
    }
}
