use super::RuntimeFeatureStore;
use crate::error::StoreResult;
use crate::model::{Feature, FeatureKey};
use crate::options::CacheSettings;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use switchboard_config::{ConfigError, Validate};
use switchboard_log::trace;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct CacheEntry {
    feature: Option<Feature>,
    expires_at: Instant,
}

/// Read-through TTL cache in front of another store.
///
/// Successful answers are cached for the configured TTL; "not found" answers
/// only when `cache_misses` is set. Errors are never cached. Once
/// `max_entries` is reached, inserting sweeps expired entries and then evicts
/// the one closest to expiry.
pub struct CachedFeatureStore<S> {
    inner: S,
    settings: CacheSettings,
    entries: RwLock<HashMap<FeatureKey, CacheEntry>>,
}

impl<S: RuntimeFeatureStore> CachedFeatureStore<S> {
    pub fn new(inner: S) -> Self {
        Self::build(inner, CacheSettings::default())
    }

    /// Fails when the settings do not validate (zero TTL or capacity).
    pub fn with_settings(inner: S, settings: CacheSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::build(inner, settings))
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Result<Self, ConfigError> {
        Self::with_settings(inner, CacheSettings::default().with_ttl(ttl))
    }

    fn build(inner: S, settings: CacheSettings) -> Self {
        Self {
            inner,
            settings,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Drop the cached answer for one feature.
    pub async fn invalidate(&self, feature_name: &str, product_name: Option<&str>) {
        self.entries
            .write()
            .await
            .remove(&FeatureKey::new(feature_name, product_name));
    }

    /// Drop every cached answer.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove entries whose TTL has elapsed.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.write().await.retain(|_, e| e.expires_at > now);
    }

    fn make_room(&self, entries: &mut HashMap<FeatureKey, CacheEntry>) {
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);

        if entries.len() >= self.settings.max_entries
            && let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.expires_at)
                .map(|(key, _)| key.clone())
        {
            trace!("feature" = oldest; "Evicting cached feature");
            entries.remove(&oldest);
        }
    }
}

#[async_trait]
impl<S: RuntimeFeatureStore> RuntimeFeatureStore for CachedFeatureStore<S> {
    async fn find_feature(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
    ) -> StoreResult<Option<Feature>> {
        let key = FeatureKey::new(feature_name, product_name);

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key)
                && Instant::now() < entry.expires_at
            {
                trace!("feature" = key; "Feature cache hit");
                return Ok(entry.feature.clone());
            }
        }

        // no lock is held while the inner store answers
        let feature = self.inner.find_feature(feature_name, product_name).await?;

        if feature.is_some() || self.settings.cache_misses {
            let entry = CacheEntry {
                feature: feature.clone(),
                expires_at: Instant::now() + self.settings.ttl(),
            };
            let mut entries = self.entries.write().await;
            if !entries.contains_key(&key) && entries.len() >= self.settings.max_entries {
                self.make_room(&mut entries);
            }
            entries.insert(key, entry);
        }

        Ok(feature)
    }
}

impl<S> std::fmt::Debug for CachedFeatureStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFeatureStore")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
