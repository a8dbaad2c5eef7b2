//! Service configuration.
//!
//! Provides `NotesConfig`, the endpoint and pagination/batching settings for a
//! `NotesService`, loadable from serde sources or from the process environment.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum number of records the lookup endpoint accepts per call.
pub const MAX_LOOKUP_BATCH_SIZE: usize = 50;

const DEFAULT_MAX_PAGES: usize = 1000;
const DEFAULT_LOOKUP_CONCURRENCY: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DATABASE_PATH: &str = "database/1/com.apple.notes/production/private";

const ENV_SERVICE_ROOT: &str = "ZONENOTES_SERVICE_ROOT";
const ENV_DSID: &str = "ZONENOTES_DSID";
const ENV_MAX_PAGES: &str = "ZONENOTES_MAX_PAGES";
const ENV_LOOKUP_BATCH_SIZE: &str = "ZONENOTES_LOOKUP_BATCH_SIZE";
const ENV_LOOKUP_CONCURRENCY: &str = "ZONENOTES_LOOKUP_CONCURRENCY";
const ENV_REQUEST_TIMEOUT_SECS: &str = "ZONENOTES_REQUEST_TIMEOUT_SECS";

/// Settings for talking to one account's notes database.
///
/// `service_root` and `dsid` come from the session collaborator that
/// authenticated the account; everything else has a sensible default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NotesConfig {
    pub service_root: String,
    pub dsid: String,
    /// Ceiling on change-feed pages drained by one refresh
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_lookup_batch_size")]
    pub lookup_batch_size: usize,
    /// Number of lookup chunks in flight at once
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl NotesConfig {
    /// Build a config with default limits for the given endpoint and account.
    pub fn new(service_root: impl Into<String>, dsid: impl Into<String>) -> Result<Self> {
        let config = Self {
            service_root: service_root.into(),
            dsid: dsid.into(),
            max_pages: DEFAULT_MAX_PAGES,
            lookup_batch_size: MAX_LOOKUP_BATCH_SIZE,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        config.validate()
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no `ZONENOTES_*` variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub const fn with_lookup_batch_size(mut self, batch_size: usize) -> Self {
        self.lookup_batch_size = batch_size;
        self
    }

    #[must_use]
    pub const fn with_lookup_concurrency(mut self, concurrency: usize) -> Self {
        self.lookup_concurrency = concurrency;
        self
    }

    /// Check ranges and normalize the service root, returning the cleaned config.
    pub fn validate(mut self) -> Result<Self> {
        self.service_root = normalize_service_root(&self.service_root)?;
        self.dsid = non_blank(&self.dsid)
            .ok_or_else(|| Error::Config("dsid must not be empty".to_string()))?;

        if self.max_pages == 0 {
            return Err(Error::Config("max_pages must be at least 1".to_string()));
        }
        if !(1..=MAX_LOOKUP_BATCH_SIZE).contains(&self.lookup_batch_size) {
            return Err(Error::Config(format!(
                "lookup_batch_size must be between 1 and {MAX_LOOKUP_BATCH_SIZE}"
            )));
        }
        if self.lookup_concurrency == 0 {
            return Err(Error::Config(
                "lookup_concurrency must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// URL of the zone change-feed endpoint.
    #[must_use]
    pub fn changes_url(&self) -> String {
        format!(
            "{}/{DATABASE_PATH}/changes/zone?dsid={}",
            self.service_root,
            urlencoding::encode(&self.dsid)
        )
    }

    /// URL of the batch record lookup endpoint.
    #[must_use]
    pub fn lookup_url(&self) -> String {
        format!(
            "{}/{DATABASE_PATH}/records/lookup?remapEnums=true&dsid={}",
            self.service_root,
            urlencoding::encode(&self.dsid)
        )
    }
}

const fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

const fn default_lookup_batch_size() -> usize {
    MAX_LOOKUP_BATCH_SIZE
}

const fn default_lookup_concurrency() -> usize {
    DEFAULT_LOOKUP_CONCURRENCY
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Trimmed copy of `value`, or `None` when only whitespace remains.
fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Trim the root, require an http(s) scheme, and drop trailing slashes so
/// endpoint paths can be appended directly.
fn normalize_service_root(value: &str) -> Result<String> {
    let root = non_blank(value)
        .ok_or_else(|| Error::Config("service_root must not be empty".to_string()))?;
    if !(root.starts_with("http://") || root.starts_with("https://")) {
        return Err(Error::Config(format!(
            "service_root must include http:// or https://, got '{root}'"
        )));
    }
    Ok(root.trim_end_matches('/').to_string())
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<NotesConfig>> {
    let read = |key: &str| lookup(key).as_deref().and_then(non_blank);

    let service_root = read(ENV_SERVICE_ROOT);
    let dsid = read(ENV_DSID);
    let max_pages = read(ENV_MAX_PAGES);
    let batch_size = read(ENV_LOOKUP_BATCH_SIZE);
    let concurrency = read(ENV_LOOKUP_CONCURRENCY);
    let timeout = read(ENV_REQUEST_TIMEOUT_SECS);

    let any_present = service_root.is_some()
        || dsid.is_some()
        || max_pages.is_some()
        || batch_size.is_some()
        || concurrency.is_some()
        || timeout.is_some();

    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    if service_root.is_none() {
        missing.push(ENV_SERVICE_ROOT);
    }
    if dsid.is_none() {
        missing.push(ENV_DSID);
    }
    let (Some(service_root), Some(dsid)) = (service_root, dsid) else {
        return Err(Error::Config(format!(
            "notes configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    };

    let mut config = NotesConfig {
        service_root,
        dsid,
        max_pages: DEFAULT_MAX_PAGES,
        lookup_batch_size: MAX_LOOKUP_BATCH_SIZE,
        lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
    };
    if let Some(value) = max_pages {
        config.max_pages = parse_number(ENV_MAX_PAGES, &value)?;
    }
    if let Some(value) = batch_size {
        config.lookup_batch_size = parse_number(ENV_LOOKUP_BATCH_SIZE, &value)?;
    }
    if let Some(value) = concurrency {
        config.lookup_concurrency = parse_number(ENV_LOOKUP_CONCURRENCY, &value)?;
    }
    if let Some(value) = timeout {
        config.request_timeout_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &value)?;
    }

    config.validate().map(Some)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}
