//! Offline cache shim.
//!
//! Models the service worker shipped at `/sw.js`: on install it precaches a
//! fixed set of URLs under one versioned cache; on fetch it answers from the
//! cache when it can and goes to the network otherwise. Nothing fetched at
//! runtime is written back, and old caches are never cleaned up.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

pub const CACHE_NAME: &str = "helpdesk-v1";
pub const PRECACHE_URLS: [&str; 3] = ["/", "/static/css/style.css", "/static/js/main.js"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OfflineError {
    #[error("network request for {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("{url} answered {status}; refusing to cache it")]
    BadStatus { url: String, status: u16 },
}

pub trait Network {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<CachedResponse, OfflineError>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct Cache {
    entries: BTreeMap<String, CachedResponse>,
}

impl Cache {
    pub fn get(&self, url: &str) -> Option<&CachedResponse> {
        self.entries.get(url)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches.entry(name.to_string()).or_default()
    }

    pub fn cache(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// First match across every cache, like `caches.match`.
    pub fn lookup(&self, url: &str) -> Option<&CachedResponse> {
        self.caches.values().find_map(|cache| cache.get(url))
    }
}

/// Precaches [`PRECACHE_URLS`] under [`CACHE_NAME`]. Either every URL is
/// stored or none is.
pub async fn install<N: Network>(storage: &mut CacheStorage, network: &N) -> Result<(), OfflineError> {
    let mut fetched = Vec::with_capacity(PRECACHE_URLS.len());
    for url in PRECACHE_URLS {
        let response = network.fetch(url).await?;
        if !response.is_ok() {
            warn!(url, status = response.status, "precache fetch rejected");
            return Err(OfflineError::BadStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        fetched.push((url.to_string(), response));
    }

    let cache = storage.open(CACHE_NAME);
    cache.entries.extend(fetched);
    debug!(cache = CACHE_NAME, entries = cache.len(), "precache complete");
    Ok(())
}

/// Cache first, then network.
pub async fn respond<N: Network>(
    storage: &CacheStorage,
    network: &N,
    url: &str,
) -> Result<CachedResponse, OfflineError> {
    if let Some(hit) = storage.lookup(url) {
        return Ok(hit.clone());
    }
    network.fetch(url).await
}

pub fn render_service_worker() -> String {
    let urls = PRECACHE_URLS
        .iter()
        .map(|url| format!("'{url}'"))
        .collect::<Vec<_>>()
        .join(", ");
    SERVICE_WORKER_JS
        .replace("{{CACHE_NAME}}", CACHE_NAME)
        .replace("{{URLS}}", &urls)
}

const SERVICE_WORKER_JS: &str = r#"self.addEventListener('install', (event) => {
  event.waitUntil(
    caches.open('{{CACHE_NAME}}').then((cache) =>
      cache.addAll([{{URLS}}])
    )
  );
});

self.addEventListener('fetch', (event) => {
  event.respondWith(
    caches.match(event.request).then((response) => response || fetch(event.request))
  );
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeNetwork {
        requests: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
        status_for: Option<(&'static str, u16)>,
    }

    impl FakeNetwork {
        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Network for FakeNetwork {
        async fn fetch(&self, url: &str) -> Result<CachedResponse, OfflineError> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.fail_on == Some(url) {
                return Err(OfflineError::Network {
                    url: url.to_string(),
                    reason: "offline".to_string(),
                });
            }
            let mut response = CachedResponse::ok("text/plain", format!("network:{url}"));
            if let Some((target, status)) = self.status_for {
                if target == url {
                    response.status = status;
                }
            }
            Ok(response)
        }
    }

    #[tokio::test]
    async fn install_caches_exactly_the_precache_list() {
        let network = FakeNetwork::default();
        let mut storage = CacheStorage::default();

        install(&mut storage, &network).await.unwrap();

        let cache = storage.cache("helpdesk-v1").expect("cache created");
        let urls: Vec<&str> = cache.urls().collect();
        assert_eq!(urls, ["/", "/static/css/style.css", "/static/js/main.js"]);
        assert_eq!(network.requests().len(), 3);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let network = FakeNetwork {
            fail_on: Some("/static/js/main.js"),
            ..FakeNetwork::default()
        };
        let mut storage = CacheStorage::default();

        let err = install(&mut storage, &network).await.unwrap_err();
        assert!(matches!(err, OfflineError::Network { .. }));
        assert!(storage.cache(CACHE_NAME).is_none_or(Cache::is_empty));

        let network = FakeNetwork {
            status_for: Some(("/static/css/style.css", 404)),
            ..FakeNetwork::default()
        };
        let err = install(&mut storage, &network).await.unwrap_err();
        assert_eq!(
            err,
            OfflineError::BadStatus {
                url: "/static/css/style.css".to_string(),
                status: 404
            }
        );
        assert!(storage.lookup("/").is_none());
    }

    #[tokio::test]
    async fn cached_urls_never_reach_the_network() {
        let mut storage = CacheStorage::default();
        install(&mut storage, &FakeNetwork::default()).await.unwrap();

        let network = FakeNetwork::default();
        for url in PRECACHE_URLS {
            let response = respond(&storage, &network, url).await.unwrap();
            assert_eq!(response.body, format!("network:{url}").into_bytes());
        }
        assert!(network.requests().is_empty());
    }

    #[tokio::test]
    async fn uncached_urls_always_reach_the_network_and_stay_uncached() {
        let mut storage = CacheStorage::default();
        install(&mut storage, &FakeNetwork::default()).await.unwrap();

        let network = FakeNetwork::default();
        respond(&storage, &network, "/static/js/chart.js").await.unwrap();
        respond(&storage, &network, "/static/js/chart.js").await.unwrap();
        assert_eq!(network.requests(), ["/static/js/chart.js", "/static/js/chart.js"]);
        assert_eq!(storage.cache(CACHE_NAME).map(Cache::len), Some(3));
    }

    #[test]
    fn service_worker_script_uses_cache_constants() {
        let script = render_service_worker();
        assert!(script.contains("caches.open('helpdesk-v1')"));
        assert!(script.contains("cache.addAll(['/', '/static/css/style.css', '/static/js/main.js'])"));
        assert!(script.contains("response || fetch(event.request)"));
    }
}
