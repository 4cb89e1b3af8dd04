use super::RuntimeFeatureStore;
use crate::error::{StoreError, StoreResult};
use crate::model::{Feature, FeatureKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use switchboard_config::{ConfigLoader, FileFormat};
use switchboard_log::debug;
use tokio::sync::RwLock;

/// On-disk shape of a feature file: `{ "features": [ ... ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCatalog {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Feature definitions held in process memory.
///
/// # Examples
///
/// ```
/// use switchboard_features::{Feature, InMemoryFeatureStore, RuntimeFeatureStore, Toggle};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryFeatureStore::new();
/// store.add(Feature::new("beta").enabled().with_toggle(Toggle::new("on"))).await;
///
/// let found = store.find_feature("beta", None).await.unwrap();
/// assert!(found.is_some());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryFeatureStore {
    features: RwLock<HashMap<FeatureKey, Feature>>,
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from definitions, rejecting duplicate keys.
    pub fn with_features(features: impl IntoIterator<Item = Feature>) -> StoreResult<Self> {
        let mut map = HashMap::new();
        for feature in features {
            let key = feature.key();
            if map.contains_key(&key) {
                return Err(StoreError::DuplicateFeature {
                    name: key.name,
                    product: key.product_name,
                });
            }
            map.insert(key, feature);
        }
        Ok(Self {
            features: RwLock::new(map),
        })
    }

    /// Load definitions from a JSON or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        let catalog: FeatureCatalog =
            serde_json::from_value(value).map_err(|e| StoreError::Load(e.to_string()))?;
        debug!("path" = path.display(), "count" = catalog.features.len(); "Loaded feature file");
        Self::with_features(catalog.features)
    }

    /// Load definitions from a JSON document.
    pub fn from_json_str(content: &str) -> StoreResult<Self> {
        let value = ConfigLoader::new(FileFormat::Json).parse(content)?;
        let catalog: FeatureCatalog =
            serde_json::from_value(value).map_err(|e| StoreError::Load(e.to_string()))?;
        Self::with_features(catalog.features)
    }

    /// Insert or replace a definition, returning the previous one.
    pub async fn add(&self, feature: Feature) -> Option<Feature> {
        self.features.write().await.insert(feature.key(), feature)
    }

    pub async fn remove(&self, feature_name: &str, product_name: Option<&str>) -> Option<Feature> {
        self.features
            .write()
            .await
            .remove(&FeatureKey::new(feature_name, product_name))
    }

    /// All definitions, ordered by product then name.
    pub async fn features(&self) -> Vec<Feature> {
        let guard = self.features.read().await;
        let mut features: Vec<Feature> = guard.values().cloned().collect();
        features.sort_by_key(|f| f.key());
        features
    }

    pub async fn len(&self) -> usize {
        self.features.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.features.read().await.is_empty()
    }
}

#[async_trait]
impl RuntimeFeatureStore for InMemoryFeatureStore {
    async fn find_feature(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
    ) -> StoreResult<Option<Feature>> {
        let key = FeatureKey::new(feature_name, product_name);
        Ok(self.features.read().await.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Toggle;
    use std::env;

    #[tokio::test]
    async fn test_lookup_is_scoped_by_product() {
        let store = InMemoryFeatureStore::with_features([
            Feature::new("beta").enabled(),
            Feature::new("beta").with_product("shop"),
        ])
        .unwrap();

        let default = store.find_feature("beta", None).await.unwrap().unwrap();
        assert!(default.is_enabled());

        let shop = store.find_feature("beta", Some("shop")).await.unwrap().unwrap();
        assert!(!shop.is_enabled());

        assert!(store.find_feature("beta", Some("blog")).await.unwrap().is_none());
        assert!(store.find_feature("gamma", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let store = InMemoryFeatureStore::new();
        assert!(store.add(Feature::new("beta")).await.is_none());
        assert!(store.add(Feature::new("beta").enabled()).await.is_some());
        assert_eq!(store.len().await, 1);

        assert!(store.remove("beta", None).await.is_some());
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_duplicate_definitions_are_rejected() {
        let result = InMemoryFeatureStore::with_features([
            Feature::new("beta").with_product("shop"),
            Feature::new("beta").with_product("shop"),
        ]);

        assert!(matches!(
            result,
            Err(StoreError::DuplicateFeature { ref name, ref product })
                if name == "beta" && product.as_deref() == Some("shop")
        ));
    }

    #[tokio::test]
    async fn test_from_json_str() {
        let store = InMemoryFeatureStore::from_json_str(
            r#"{
                "features": [
                    { "name": "beta", "enabled": true, "toggles": [ { "type": "on" } ] },
                    { "name": "checkout", "product": "shop", "enabled": true, "toggles": [
                        { "type": "from_to", "parameters": { "From": "2020-01-01 00:00:00", "To": "2030-01-01 00:00:00" } }
                    ] }
                ]
            }"#,
        )
        .unwrap();

        let features = store.features().await;
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name(), "beta");
        assert_eq!(features[1].key().to_string(), "shop/checkout");
    }

    #[test]
    fn test_from_json_str_rejects_bad_documents() {
        assert!(matches!(
            InMemoryFeatureStore::from_json_str("{ not json"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            InMemoryFeatureStore::from_json_str(r#"{"features": [{"enabled": true}]}"#),
            Err(StoreError::Load(_))
        ));
    }

    #[tokio::test]
    async fn test_from_toml_file() {
        let path = env::temp_dir().join("switchboard_memory_store_test.toml");
        std::fs::write(
            &path,
            r#"
[[features]]
name = "dark-mode"
enabled = true

[[features.toggles]]
type = "environment_variable"
parameters = { EnvironmentVariable = "APP_ENV", Values = "dev;staging" }
"#,
        )
        .unwrap();

        let store = InMemoryFeatureStore::from_file(&path).unwrap();
        let feature = store.find_feature("dark-mode", None).await.unwrap().unwrap();
        assert_eq!(
            feature.get_toggle("environment_variable").unwrap().parameters().get("Values"),
            Some("dev;staging")
        );
        assert_eq!(
            feature.toggles()[0],
            Toggle::new("environment_variable")
                .with_parameter("EnvironmentVariable", "APP_ENV")
                .with_parameter("Values", "dev;staging")
        );

        std::fs::remove_file(&path).ok();
    }
}
