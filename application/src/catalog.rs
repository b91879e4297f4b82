//! Capability catalog: the process-wide registry of services and tools.
//!
//! Reads go through a [`tokio::sync::RwLock`] and hand out clones, so a
//! planning pass works on a consistent snapshot. Tool discovery is the only
//! mutation path:
//!
//! - discovery for one service key is serialised by that key's mutex;
//! - the map write lock is taken only for the in-memory swap, never across
//!   the network call;
//! - [`CapabilityCatalog::ensure_fresh`] uses `try_lock`, so a workflow never
//!   waits on another workflow's refresh and simply uses the current cache.

use crate::ports::service_transport::{ServiceTransport, TransportRequest};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use stepwise_domain::{
    DomainError, ServiceDescriptor, ToolDescriptor, parse_tool_listing,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub struct CapabilityCatalog {
    services: RwLock<BTreeMap<String, ServiceDescriptor>>,
    /// Fixed at construction, one per service key
    refresh_locks: HashMap<String, Arc<Mutex<()>>>,
    transport: Arc<dyn ServiceTransport>,
    discovery_timeout: Duration,
    retry_backoff: Duration,
}

impl CapabilityCatalog {
    /// Build the catalog from configured descriptors. Keys must be unique.
    pub fn new(
        services: Vec<ServiceDescriptor>,
        transport: Arc<dyn ServiceTransport>,
    ) -> Result<Self, DomainError> {
        let mut map = BTreeMap::new();
        for service in services {
            if service.base_url.trim().is_empty() {
                return Err(DomainError::InvalidService {
                    key: service.key,
                    reason: "missing base address".to_string(),
                });
            }
            if map.contains_key(&service.key) {
                return Err(DomainError::InvalidService {
                    key: service.key,
                    reason: "duplicate service key".to_string(),
                });
            }
            map.insert(service.key.clone(), service);
        }
        let refresh_locks = map
            .keys()
            .map(|k| (k.clone(), Arc::new(Mutex::new(()))))
            .collect();

        Ok(Self {
            services: RwLock::new(map),
            refresh_locks,
            transport,
            discovery_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(60),
        })
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Minimum wait before a failed discovery is attempted again by `ensure_fresh`
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn len(&self) -> usize {
        self.refresh_locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refresh_locks.is_empty()
    }

    pub async fn get(&self, key: &str) -> Option<ServiceDescriptor> {
        self.services.read().await.get(key).cloned()
    }

    /// Enabled service, or `None` for unknown and disabled keys
    pub async fn enabled(&self, key: &str) -> Option<ServiceDescriptor> {
        self.get(key).await.filter(|s| s.enabled)
    }

    /// Consistent copy of every enabled descriptor, sorted by key
    pub async fn snapshot(&self) -> Vec<ServiceDescriptor> {
        self.services
            .read()
            .await
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect()
    }

    pub async fn tool(&self, service_key: &str, tool_name: &str) -> Option<ToolDescriptor> {
        self.services
            .read()
            .await
            .get(service_key)
            .and_then(|s| s.find_tool(tool_name).cloned())
    }

    pub async fn is_cache_valid(&self, service_key: &str, ttl: Duration) -> bool {
        self.services
            .read()
            .await
            .get(service_key)
            .is_some_and(|s| s.is_cache_valid(Utc::now(), ttl))
    }

    /// Re-read the tool listing of one service.
    ///
    /// Waits for a refresh of the same key already in progress. Returns whether
    /// the cache was replaced; failures are logged and leave the cache as it was.
    pub async fn refresh_tools(&self, service_key: &str) -> bool {
        let Some(lock) = self.refresh_locks.get(service_key) else {
            warn!("Cannot refresh unknown service '{}'", service_key);
            return false;
        };
        let _guard = lock.lock().await;
        self.discover(service_key).await
    }

    /// Refresh only if the cache is stale and nobody else is refreshing it.
    ///
    /// Returns whether this call replaced the cache.
    pub async fn ensure_fresh(&self, service_key: &str, ttl: Duration) -> bool {
        let Some(lock) = self.refresh_locks.get(service_key) else {
            return false;
        };
        if !self.needs_refresh(service_key, ttl).await {
            return false;
        }
        let Ok(_guard) = lock.try_lock() else {
            debug!(
                "Discovery for '{}' already in progress, using current cache",
                service_key
            );
            return false;
        };
        // Another task may have finished a refresh between the check and the lock
        if !self.needs_refresh(service_key, ttl).await {
            return false;
        }
        self.discover(service_key).await
    }

    /// `ensure_fresh` for every enabled service, concurrently
    pub async fn ensure_all_fresh(&self, ttl: Duration) {
        let keys = self.enabled_keys().await;
        join_all(keys.iter().map(|key| self.ensure_fresh(key, ttl))).await;
    }

    /// Refresh every enabled service concurrently; returns how many succeeded
    pub async fn refresh_all(&self) -> usize {
        let keys = self.enabled_keys().await;
        let results = join_all(keys.iter().map(|key| self.refresh_tools(key))).await;
        let refreshed = results.into_iter().filter(|ok| *ok).count();
        info!(
            "Tool discovery refreshed {}/{} services",
            refreshed,
            keys.len()
        );
        refreshed
    }

    async fn enabled_keys(&self) -> Vec<String> {
        self.services
            .read()
            .await
            .values()
            .filter(|s| s.enabled)
            .map(|s| s.key.clone())
            .collect()
    }

    async fn needs_refresh(&self, service_key: &str, ttl: Duration) -> bool {
        let now = Utc::now();
        match self.services.read().await.get(service_key) {
            Some(service) if service.enabled => {
                let last_attempt_failed =
                    match (&service.tool_cache, service.discovery_attempted_at) {
                        (Some(cache), Some(at)) => at > cache.refreshed_at,
                        (None, Some(_)) => true,
                        _ => false,
                    };
                !service.is_cache_valid(now, ttl)
                    && !(last_attempt_failed && service.attempted_within(now, self.retry_backoff))
            }
            _ => false,
        }
    }

    /// Network call plus swap. The caller holds the per-key lock.
    async fn discover(&self, service_key: &str) -> bool {
        let Some(url) = self
            .services
            .read()
            .await
            .get(service_key)
            .map(|s| s.discovery_url())
        else {
            return false;
        };

        debug!("Discovering tools for '{}' at {}", service_key, url);
        let request = TransportRequest::read(url.clone(), self.discovery_timeout);
        let result = match tokio::time::timeout(self.discovery_timeout, self.transport.send(&request))
            .await
        {
            Ok(Ok(response)) if response.is_success() => {
                serde_json::from_str::<serde_json::Value>(&response.body)
                    .map_err(|e| format!("invalid JSON: {}", e))
                    .and_then(|body| parse_tool_listing(&body).map_err(|e| e.to_string()))
            }
            Ok(Ok(response)) => Err(format!("HTTP {}", response.status)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.discovery_timeout)),
        };

        let now = Utc::now();
        let mut services = self.services.write().await;
        let Some(service) = services.get_mut(service_key) else {
            return false;
        };
        match result {
            Ok(tools) => {
                info!(
                    "Discovered {} tools for '{}'",
                    tools.len(),
                    service_key
                );
                service.replace_tools(tools, now);
                true
            }
            Err(reason) => {
                warn!(
                    "Tool discovery for '{}' failed ({}); keeping {} cached tools",
                    service_key,
                    reason,
                    service.tools().len()
                );
                service.discovery_attempted_at = Some(now);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::service_transport::{TransportError, TransportResponse};
    use crate::test_support::{MockTransport, profile_service, search_service};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(1800);

    fn listing() -> serde_json::Value {
        json!({"tools": [{
            "name": "find_similar_workshops",
            "description": "Similar workshops",
            "parameters": {"query": {"type": "string", "required": true}}
        }]})
    }

    fn catalog(transport: Arc<MockTransport>) -> CapabilityCatalog {
        CapabilityCatalog::new(vec![search_service(), profile_service()], transport).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_replaces_cache() {
        let transport = Arc::new(MockTransport::always(200, listing()));
        let catalog = catalog(transport.clone());

        assert!(!catalog.is_cache_valid("semantic_search", TTL).await);
        assert!(catalog.refresh_tools("semantic_search").await);
        assert!(catalog.is_cache_valid("semantic_search", TTL).await);

        let service = catalog.get("semantic_search").await.unwrap();
        assert_eq!(service.tools()[0].name, "find_similar_workshops");
        assert_eq!(transport.requests()[0].url, "http://search.test/tools");
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_cache() {
        let transport = Arc::new(MockTransport::new({
            let calls = std::sync::atomic::AtomicUsize::new(0);
            move |_| {
                if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                    Ok(TransportResponse::new(200, listing().to_string()))
                } else {
                    Err(TransportError::Connection("refused".to_string()))
                }
            }
        }));
        let catalog = catalog(transport);

        assert!(catalog.refresh_tools("semantic_search").await);
        assert!(!catalog.refresh_tools("semantic_search").await);

        let service = catalog.get("semantic_search").await.unwrap();
        assert_eq!(service.tools()[0].name, "find_similar_workshops");
    }

    #[tokio::test]
    async fn test_malformed_listing_is_not_cached() {
        let transport = Arc::new(MockTransport::always(200, json!({"tools": "none"})));
        let catalog = catalog(transport);

        assert!(!catalog.refresh_tools("semantic_search").await);
        let service = catalog.get("semantic_search").await.unwrap();
        assert!(service.tool_cache.is_none());
        // Static tools remain usable
        assert_eq!(service.tools()[0].name, "search_livelabs_workshops");
    }

    #[tokio::test]
    async fn test_ensure_fresh_skips_valid_cache_and_recent_failures() {
        let transport = Arc::new(MockTransport::always(200, listing()));
        let catalog = catalog(transport.clone());

        assert!(catalog.ensure_fresh("semantic_search", TTL).await);
        assert!(!catalog.ensure_fresh("semantic_search", TTL).await);
        assert_eq!(transport.requests().len(), 1);

        let failing = Arc::new(MockTransport::always(500, json!({})));
        let catalog = CapabilityCatalog::new(vec![search_service()], failing.clone()).unwrap();
        assert!(!catalog.ensure_fresh("semantic_search", TTL).await);
        assert!(!catalog.ensure_fresh("semantic_search", TTL).await);
        assert_eq!(failing.requests().len(), 1);
    }

    struct BlockingTransport {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ServiceTransport for BlockingTransport {
        async fn send(
            &self,
            _request: &TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(TransportResponse::new(200, listing().to_string()))
        }
    }

    #[tokio::test]
    async fn test_ensure_fresh_never_waits_on_running_refresh() {
        let transport = Arc::new(BlockingTransport {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let catalog = Arc::new(
            CapabilityCatalog::new(vec![search_service()], transport.clone()).unwrap(),
        );

        let refresher = {
            let catalog = catalog.clone();
            tokio::spawn(async move { catalog.refresh_tools("semantic_search").await })
        };
        transport.entered.notified().await;

        // Readers and ensure_fresh proceed while the refresh holds the key lock
        let skipped = tokio::time::timeout(
            Duration::from_millis(200),
            catalog.ensure_fresh("semantic_search", TTL),
        )
        .await
        .expect("ensure_fresh must not block");
        assert!(!skipped);
        assert_eq!(catalog.snapshot().await.len(), 1);

        transport.release.notify_one();
        assert!(refresher.await.unwrap());
        assert!(catalog.is_cache_valid("semantic_search", TTL).await);
    }

    #[tokio::test]
    async fn test_duplicate_keys_rejected_and_disabled_hidden() {
        let transport = Arc::new(MockTransport::always(200, listing()));
        let result = CapabilityCatalog::new(
            vec![search_service(), search_service()],
            transport.clone(),
        );
        assert!(matches!(result, Err(DomainError::InvalidService { .. })));

        let catalog =
            CapabilityCatalog::new(vec![search_service(), profile_service().disabled()], transport)
                .unwrap();
        let snapshot = catalog.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].key, "semantic_search");
        assert!(catalog.enabled("nl_query").await.is_none());
        assert!(catalog.get("nl_query").await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_all_counts_successes() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.url.starts_with("http://search.test") {
                Ok(TransportResponse::new(200, listing().to_string()))
            } else {
                Ok(TransportResponse::new(404, "not found"))
            }
        }));
        let catalog = catalog(transport);
        assert_eq!(catalog.refresh_all().await, 1);
    }
}
