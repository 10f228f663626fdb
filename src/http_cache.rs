use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{
    ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const FORMAT_VERSION: u32 = 2;
const APP_DIR: &str = "fplalytics";
const CACHE_FILE: &str = "http_cache.json";
const AGENT: &str = "Mozilla/5.0 (fplalytics)";

/// A response body kept with the validators needed to revalidate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub body: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub stored_at: i64,
}

impl CachedResponse {
    pub fn from_headers(body: String, headers: &HeaderMap) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            body,
            etag: header(ETAG),
            last_modified: header(LAST_MODIFIED),
            stored_at: Utc::now().timestamp(),
        }
    }

    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    fn revalidate(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(etag) = &self.etag {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &self.last_modified {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
        req
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseCache {
    version: u32,
    responses: HashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn get(&self, url: &str) -> Option<&CachedResponse> {
        self.responses.get(url)
    }

    pub fn insert(&mut self, url: &str, response: CachedResponse) {
        self.version = FORMAT_VERSION;
        self.responses.insert(url.to_string(), response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// A missing, unreadable or older-format file gives an empty cache.
    pub fn load(path: &Path) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(cache) if cache.version == FORMAT_VERSION => cache,
            _ => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create cache dir {}", dir.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(self).context("serialize http cache")?;
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }
}

/// Blocking GETs shared by both feed clients. Responses carrying an ETag or
/// Last-Modified are kept and revalidated on the next request; a 304 is
/// answered from the stored body.
pub struct HttpFetcher {
    client: &'static Client,
    cache: Mutex<ResponseCache>,
    path: Option<PathBuf>,
}

impl HttpFetcher {
    /// `path: None` keeps the cache in memory only.
    pub fn new(client: &'static Client, path: Option<PathBuf>) -> Self {
        let cache = path.as_deref().map(ResponseCache::load).unwrap_or_default();
        debug!(entries = cache.len(), path = ?path, "http cache opened");
        Self {
            client,
            cache: Mutex::new(cache),
            path,
        }
    }

    pub fn with_default_cache(client: &'static Client) -> Self {
        Self::new(client, default_cache_path())
    }

    pub fn get_text(&self, url: &str, extra_headers: &[(&str, &str)]) -> Result<String> {
        let cached = self.cache().get(url).cloned();

        let mut req = self.client.get(url).header(USER_AGENT, AGENT);
        for (name, value) in extra_headers {
            req = req.header(*name, *value);
        }
        if let Some(entry) = &cached {
            req = entry.revalidate(req);
        }

        let resp = req.send().with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        if status == StatusCode::NOT_MODIFIED {
            debug!(url, "not modified");
            return cached
                .map(|entry| entry.body)
                .ok_or_else(|| anyhow!("304 from {url} with nothing cached"));
        }
        let headers = resp.headers().clone();
        let body = resp.text().with_context(|| format!("failed reading body of {url}"))?;
        if !status.is_success() {
            return Err(anyhow!("http {status} from {url}: {body}"));
        }

        let entry = CachedResponse::from_headers(body.clone(), &headers);
        if entry.has_validators() {
            let mut cache = self.cache();
            cache.insert(url, entry);
            if let Some(path) = &self.path
                && let Err(err) = cache.save(path)
            {
                warn!(error = %format!("{err:#}"), "http cache not persisted");
            }
        }
        Ok(body)
    }

    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `$XDG_CACHE_HOME/fplalytics/http_cache.json`, else under `~/.cache`.
pub fn default_cache_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CACHE_HOME")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|home| PathBuf::from(home).join(".cache"))
        })?;
    Some(base.join(APP_DIR).join(CACHE_FILE))
}
