//! Runtime feature stores.
//!
//! A store answers one question: the definition of a feature by name within
//! an optional product, or `None` when there is no such feature.

mod cached;
mod memory;

pub use cached::CachedFeatureStore;
pub use memory::{FeatureCatalog, InMemoryFeatureStore};

use crate::error::StoreResult;
use crate::model::Feature;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of feature definitions.
///
/// "Not found" is `Ok(None)`; an `Err` means the store could not answer.
#[async_trait]
pub trait RuntimeFeatureStore: Send + Sync {
    async fn find_feature(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
    ) -> StoreResult<Option<Feature>>;
}

#[async_trait]
impl<S: RuntimeFeatureStore + ?Sized> RuntimeFeatureStore for Arc<S> {
    async fn find_feature(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
    ) -> StoreResult<Option<Feature>> {
        (**self).find_feature(feature_name, product_name).await
    }
}
