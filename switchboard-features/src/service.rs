//! Feature evaluation engine.
//!
//! [`FeatureService`] fetches a feature from the store, activates each of its
//! toggles through the activator and combines the answers with logical AND.
//! Expected conditions (missing feature, unregistered toggle type) resolve to
//! a boolean; store and toggle failures go through
//! [`OnErrorBehavior`](crate::OnErrorBehavior).

use crate::activator::ToggleActivator;
use crate::error::{FeatureError, FeatureResult, StoreError, ToggleError};
use crate::model::{Feature, Toggle};
use crate::options::{EvaluationOptions, FailureScope};
use crate::store::RuntimeFeatureStore;
use crate::toggle::EvaluationContext;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use switchboard_log::{debug, error, warn};
use tokio_util::sync::CancellationToken;

/// Outcome of one evaluation and what decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub enabled: bool,
    pub reason: Reason,
}

impl Evaluation {
    fn new(enabled: bool, reason: Reason) -> Self {
        Self { enabled, reason }
    }
}

/// Why an evaluation produced its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// No such feature; the not-found behavior decided
    NotFound,
    /// The master switch is off
    Disabled,
    /// Enabled with no toggles attached
    NoToggles,
    /// Every toggle granted activation
    AllTogglesActive,
    /// The named toggle type answered inactive
    ToggleInactive(String),
    /// The named toggle type has no registered strategy
    ToggleUnregistered(String),
    /// A failure was replaced by the on-error behavior
    Substituted(Cause),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::NotFound => f.write_str("not found"),
            Reason::Disabled => f.write_str("disabled"),
            Reason::NoToggles => f.write_str("no toggles"),
            Reason::AllTogglesActive => f.write_str("all toggles active"),
            Reason::ToggleInactive(t) => write!(f, "toggle '{}' inactive", t),
            Reason::ToggleUnregistered(t) => write!(f, "toggle '{}' unregistered", t),
            Reason::Substituted(cause) => write!(f, "substituted after {}", cause),
        }
    }
}

/// Failure replaced by a policy substitute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    Store { message: String },
    Toggle { toggle_type: String, message: String },
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Store { message } => write!(f, "store: {}", message),
            Cause::Toggle {
                toggle_type,
                message,
            } => write!(f, "toggle '{}': {}", toggle_type, message),
        }
    }
}

/// Result of the store fetch.
enum Lookup {
    Found(Feature),
    NotFound,
    Failed(StoreError),
}

/// Result of one toggle check.
enum ToggleOutcome {
    Active,
    Inactive,
    Unregistered,
    Failed(ToggleError),
}

/// Evaluates features against a store and a toggle activator.
///
/// The service holds no mutable state and can be shared behind an `Arc`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use switchboard_features::*;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryFeatureStore::with_features([
///     Feature::new("beta").enabled().with_toggle(Toggle::new("on")),
/// ])
/// .unwrap();
///
/// let service = FeatureService::new(
///     Arc::new(store),
///     Arc::new(ToggleRegistry::with_defaults()),
///     EvaluationOptions::default(),
/// );
///
/// let token = CancellationToken::new();
/// assert!(service.is_enabled("beta", None, &token).await.unwrap());
/// assert!(!service.is_enabled("unknown", None, &token).await.unwrap());
/// # });
/// ```
#[derive(Clone)]
pub struct FeatureService {
    store: Arc<dyn RuntimeFeatureStore>,
    activator: Arc<dyn ToggleActivator>,
    options: EvaluationOptions,
}

impl FeatureService {
    pub fn new(
        store: Arc<dyn RuntimeFeatureStore>,
        activator: Arc<dyn ToggleActivator>,
        options: EvaluationOptions,
    ) -> Self {
        Self {
            store,
            activator,
            options,
        }
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<dyn RuntimeFeatureStore> {
        &self.store
    }

    pub fn activator(&self) -> &Arc<dyn ToggleActivator> {
        &self.activator
    }

    /// Whether the feature is active.
    ///
    /// Only errors on cancellation, or on a failure under
    /// [`OnErrorBehavior::Throw`](crate::OnErrorBehavior::Throw).
    pub async fn is_enabled(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
        cancellation: &CancellationToken,
    ) -> FeatureResult<bool> {
        self.evaluate(feature_name, product_name, cancellation)
            .await
            .map(|evaluation| evaluation.enabled)
    }

    /// Like [`is_enabled`](Self::is_enabled), also reporting what decided the result.
    pub async fn evaluate(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
        cancellation: &CancellationToken,
    ) -> FeatureResult<Evaluation> {
        debug!(
            "feature" = feature_name,
            "product" = product_name.unwrap_or("-");
            "Evaluating feature"
        );

        let result = self.run(feature_name, product_name, cancellation).await;
        if let Ok(ref evaluation) = result {
            debug!(
                "feature" = feature_name,
                "product" = product_name.unwrap_or("-"),
                "enabled" = evaluation.enabled,
                "reason" = evaluation.reason;
                "Feature evaluated"
            );
        }
        result
    }

    async fn run(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
        cancellation: &CancellationToken,
    ) -> FeatureResult<Evaluation> {
        if cancellation.is_cancelled() {
            return Err(FeatureError::Cancelled);
        }

        let feature = match self.lookup(feature_name, product_name, cancellation).await? {
            Lookup::Found(feature) => feature,
            Lookup::NotFound => {
                let enabled = self.options.not_found.resolve();
                return Ok(Evaluation::new(enabled, Reason::NotFound));
            }
            Lookup::Failed(source) => {
                let cause = Cause::Store {
                    message: source.to_string(),
                };
                let enabled = self.substitute(feature_name, product_name, &cause, || {
                    FeatureError::Store {
                        feature: feature_name.to_string(),
                        source,
                    }
                })?;
                return Ok(Evaluation::new(enabled, Reason::Substituted(cause)));
            }
        };

        if !feature.is_enabled() {
            return Ok(Evaluation::new(false, Reason::Disabled));
        }
        if feature.toggles().is_empty() {
            return Ok(Evaluation::new(true, Reason::NoToggles));
        }

        let mut substituted = None;
        for toggle in feature.toggles() {
            let toggle_type = toggle.type_name();
            match self.check_toggle(&feature, toggle, cancellation).await? {
                ToggleOutcome::Active => {}
                ToggleOutcome::Inactive => {
                    return Ok(Evaluation::new(
                        false,
                        Reason::ToggleInactive(toggle_type.to_string()),
                    ));
                }
                ToggleOutcome::Unregistered => {
                    debug!(
                        "feature" = feature_name,
                        "toggle" = toggle_type;
                        "Toggle type is unregistered, treating it as inactive"
                    );
                    return Ok(Evaluation::new(
                        false,
                        Reason::ToggleUnregistered(toggle_type.to_string()),
                    ));
                }
                ToggleOutcome::Failed(source) => {
                    let cause = Cause::Toggle {
                        toggle_type: toggle_type.to_string(),
                        message: source.to_string(),
                    };
                    let enabled = self.substitute(feature_name, product_name, &cause, || {
                        FeatureError::Toggle {
                            feature: feature_name.to_string(),
                            toggle_type: toggle_type.to_string(),
                            source,
                        }
                    })?;

                    match self.options.failure_scope {
                        FailureScope::Toggle if enabled => substituted = Some(cause),
                        FailureScope::Toggle | FailureScope::Feature => {
                            return Ok(Evaluation::new(enabled, Reason::Substituted(cause)));
                        }
                    }
                }
            }
        }

        let reason = match substituted {
            Some(cause) => Reason::Substituted(cause),
            None => Reason::AllTogglesActive,
        };
        Ok(Evaluation::new(true, reason))
    }

    async fn lookup(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
        cancellation: &CancellationToken,
    ) -> FeatureResult<Lookup> {
        let result = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(FeatureError::Cancelled),
            result = self.store.find_feature(feature_name, product_name) => result,
        };

        Ok(match result {
            Ok(Some(feature)) => Lookup::Found(feature),
            Ok(None) => Lookup::NotFound,
            Err(e) => Lookup::Failed(e),
        })
    }

    async fn check_toggle(
        &self,
        feature: &Feature,
        toggle: &Toggle,
        cancellation: &CancellationToken,
    ) -> FeatureResult<ToggleOutcome> {
        let activation = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.activator.create_instance(toggle.type_name())
        }));
        let strategy = match activation {
            Ok(Some(strategy)) => strategy,
            Ok(None) => return Ok(ToggleOutcome::Unregistered),
            Err(panic) => {
                return Ok(ToggleOutcome::Failed(ToggleError::Panicked(
                    panic_message(panic.as_ref()),
                )));
            }
        };

        let ctx = EvaluationContext::new(feature, toggle, cancellation);
        let check = AssertUnwindSafe(strategy.is_active(&ctx)).catch_unwind();
        let result = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(FeatureError::Cancelled),
            result = check => result,
        };

        Ok(match result {
            Ok(Ok(true)) => ToggleOutcome::Active,
            Ok(Ok(false)) => ToggleOutcome::Inactive,
            // a strategy may report cancellation on its own; only the caller's token counts
            Ok(Err(ToggleError::Cancelled)) if cancellation.is_cancelled() => {
                return Err(FeatureError::Cancelled);
            }
            Ok(Err(e)) => ToggleOutcome::Failed(e),
            Err(panic) => ToggleOutcome::Failed(ToggleError::Panicked(panic_message(panic.as_ref()))),
        })
    }

    /// Apply the on-error behavior to a failure.
    fn substitute(
        &self,
        feature_name: &str,
        product_name: Option<&str>,
        cause: &Cause,
        into_error: impl FnOnce() -> FeatureError,
    ) -> FeatureResult<bool> {
        match self.options.on_error.apply(cause) {
            Ok(enabled) => {
                warn!(
                    "feature" = feature_name,
                    "product" = product_name.unwrap_or("-"),
                    "cause" = cause,
                    "substitute" = enabled;
                    "Feature evaluation failed, substituting result"
                );
                Ok(enabled)
            }
            Err(_) => {
                error!(
                    "feature" = feature_name,
                    "product" = product_name.unwrap_or("-"),
                    "cause" = cause;
                    "Feature evaluation failed"
                );
                Err(into_error())
            }
        }
    }
}

impl fmt::Debug for FeatureService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::ToggleRegistry;
    use crate::error::{StoreResult, ToggleResult};
    use crate::options::{NotFoundBehavior, OnErrorBehavior};
    use crate::store::InMemoryFeatureStore;
    use crate::toggle::ToggleStrategy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingToggle;

    #[async_trait]
    impl ToggleStrategy for FailingToggle {
        async fn is_active(&self, _ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
            Err(ToggleError::Failed("boom".to_string()))
        }
    }

    struct PanickingToggle;

    #[async_trait]
    impl ToggleStrategy for PanickingToggle {
        async fn is_active(&self, _ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
            panic!("strategy bug")
        }
    }

    struct PendingToggle;

    #[async_trait]
    impl ToggleStrategy for PendingToggle {
        async fn is_active(&self, _ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
            std::future::pending().await
        }
    }

    /// Reports cancellation without the caller asking for it.
    struct SelfCancellingToggle;

    #[async_trait]
    impl ToggleStrategy for SelfCancellingToggle {
        async fn is_active(&self, _ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
            Err(ToggleError::Cancelled)
        }
    }

    struct CountingToggle(Arc<AtomicUsize>);

    #[async_trait]
    impl ToggleStrategy for CountingToggle {
        async fn is_active(&self, _ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RuntimeFeatureStore for FailingStore {
        async fn find_feature(&self, _: &str, _: Option<&str>) -> StoreResult<Option<Feature>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    struct PendingStore(Arc<AtomicUsize>);

    #[async_trait]
    impl RuntimeFeatureStore for PendingStore {
        async fn find_feature(&self, _: &str, _: Option<&str>) -> StoreResult<Option<Feature>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    fn registry() -> Arc<ToggleRegistry> {
        let registry = ToggleRegistry::with_defaults();
        registry.register_factory("failing", || Arc::new(FailingToggle) as Arc<dyn ToggleStrategy>);
        registry.register_factory("panicking", || Arc::new(PanickingToggle) as Arc<dyn ToggleStrategy>);
        registry.register_factory("pending", || Arc::new(PendingToggle) as Arc<dyn ToggleStrategy>);
        registry.register_factory("self_cancelling", || {
            Arc::new(SelfCancellingToggle) as Arc<dyn ToggleStrategy>
        });
        Arc::new(registry)
    }

    fn service_with(features: Vec<Feature>, options: EvaluationOptions) -> FeatureService {
        let store = InMemoryFeatureStore::with_features(features).unwrap();
        FeatureService::new(Arc::new(store), registry(), options)
    }

    fn single(toggle_type: &str) -> Vec<Feature> {
        vec![Feature::new("feature").enabled().with_toggle(Toggle::new(toggle_type))]
    }

    async fn check(service: &FeatureService) -> FeatureResult<bool> {
        service.is_enabled("feature", None, &CancellationToken::new()).await
    }

    fn on_error(behavior: OnErrorBehavior) -> EvaluationOptions {
        EvaluationOptions::default().with_on_error(behavior)
    }

    #[tokio::test]
    async fn test_failing_toggle_with_throw_propagates() {
        let service = service_with(single("failing"), on_error(OnErrorBehavior::Throw));

        let err = check(&service).await.unwrap_err();
        assert!(matches!(
            err,
            FeatureError::Toggle { ref toggle_type, source: ToggleError::Failed(_), .. } if toggle_type == "failing"
        ));
    }

    #[tokio::test]
    async fn test_failing_toggle_with_set_disabled_is_false() {
        let service = service_with(single("failing"), on_error(OnErrorBehavior::SetDisabled));
        assert!(!check(&service).await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_toggle_with_set_enabled_is_true() {
        let service = service_with(single("failing"), on_error(OnErrorBehavior::SetEnabled));
        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(evaluation.enabled);
        assert!(matches!(
            evaluation.reason,
            Reason::Substituted(Cause::Toggle { ref toggle_type, .. }) if toggle_type == "failing"
        ));
    }

    #[tokio::test]
    async fn test_on_toggle_is_true() {
        let service = service_with(single("on"), EvaluationOptions::default());
        assert!(check(&service).await.unwrap());
    }

    #[tokio::test]
    async fn test_off_toggle_is_false() {
        let service = service_with(single("off"), EvaluationOptions::default());
        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            evaluation,
            Evaluation::new(false, Reason::ToggleInactive("off".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_feature_follows_not_found_behavior() {
        let enabled = EvaluationOptions::default().with_not_found(NotFoundBehavior::SetEnabled);
        let service = service_with(Vec::new(), enabled);
        assert!(check(&service).await.unwrap());

        let disabled = EvaluationOptions::default().with_not_found(NotFoundBehavior::SetDisabled);
        let service = service_with(Vec::new(), disabled);
        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(evaluation, Evaluation::new(false, Reason::NotFound));
    }

    #[tokio::test]
    async fn test_unregistered_toggle_type_is_inactive() {
        let service = service_with(single("Non_Existing_Toggle_Type"), on_error(OnErrorBehavior::Throw));
        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            evaluation,
            Evaluation::new(
                false,
                Reason::ToggleUnregistered("Non_Existing_Toggle_Type".to_string())
            )
        );
    }

    #[tokio::test]
    async fn test_disabled_feature_never_runs_toggles() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ToggleRegistry::new();
        let counter = Arc::clone(&calls);
        registry.register_factory("counting", move || {
            Arc::new(CountingToggle(Arc::clone(&counter))) as Arc<dyn ToggleStrategy>
        });

        let store = InMemoryFeatureStore::with_features([
            Feature::new("feature").with_toggle(Toggle::new("counting"))
        ])
        .unwrap();
        let service = FeatureService::new(Arc::new(store), Arc::new(registry), EvaluationOptions::default());

        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(evaluation, Evaluation::new(false, Reason::Disabled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enabled_without_toggles_is_true() {
        let service = service_with(vec![Feature::new("feature").enabled()], EvaluationOptions::default());
        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(evaluation, Evaluation::new(true, Reason::NoToggles));
    }

    #[tokio::test]
    async fn test_toggles_combine_with_and() {
        let window = Toggle::new("from_to")
            .with_parameter("From", "2000-01-01 00:00:00")
            .with_parameter("To", "2999-01-01 00:00:00");

        let all_active = Feature::new("feature")
            .enabled()
            .with_toggle(Toggle::new("on"))
            .with_toggle(window.clone());
        let service = service_with(vec![all_active], EvaluationOptions::default());
        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(evaluation, Evaluation::new(true, Reason::AllTogglesActive));

        let one_inactive = Feature::new("feature")
            .enabled()
            .with_toggle(Toggle::new("on"))
            .with_toggle(window)
            .with_toggle(Toggle::new("off"));
        let service = service_with(vec![one_inactive], EvaluationOptions::default());
        assert!(!check(&service).await.unwrap());
    }

    #[tokio::test]
    async fn test_evaluation_stops_at_first_inactive_toggle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ToggleRegistry::with_defaults();
        let counter = Arc::clone(&calls);
        registry.register_factory("counting", move || {
            Arc::new(CountingToggle(Arc::clone(&counter))) as Arc<dyn ToggleStrategy>
        });

        let store = InMemoryFeatureStore::with_features([Feature::new("feature")
            .enabled()
            .with_toggle(Toggle::new("off"))
            .with_toggle(Toggle::new("counting"))])
        .unwrap();
        let service = FeatureService::new(Arc::new(store), Arc::new(registry), EvaluationOptions::default());

        assert!(!check(&service).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_scope_toggle_continues_with_substitute() {
        let feature = Feature::new("feature")
            .enabled()
            .with_toggle(Toggle::new("failing"))
            .with_toggle(Toggle::new("off"));
        let options = on_error(OnErrorBehavior::SetEnabled).with_failure_scope(FailureScope::Toggle);
        let service = service_with(vec![feature], options);

        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            evaluation,
            Evaluation::new(false, Reason::ToggleInactive("off".to_string()))
        );
    }

    #[tokio::test]
    async fn test_failure_scope_feature_decides_whole_result() {
        let feature = Feature::new("feature")
            .enabled()
            .with_toggle(Toggle::new("failing"))
            .with_toggle(Toggle::new("off"));
        let options = on_error(OnErrorBehavior::SetEnabled).with_failure_scope(FailureScope::Feature);
        let service = service_with(vec![feature], options);

        let evaluation = service
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(evaluation.enabled);
        assert!(matches!(evaluation.reason, Reason::Substituted(Cause::Toggle { .. })));
    }

    #[tokio::test]
    async fn test_store_failure_follows_on_error_behavior() {
        let registry = registry();
        let service = |behavior| {
            FeatureService::new(Arc::new(FailingStore), registry.clone(), on_error(behavior))
        };

        assert!(
            service(OnErrorBehavior::SetEnabled)
                .is_enabled("feature", None, &CancellationToken::new())
                .await
                .unwrap()
        );

        let evaluation = service(OnErrorBehavior::SetDisabled)
            .evaluate("feature", None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!evaluation.enabled);
        assert!(matches!(evaluation.reason, Reason::Substituted(Cause::Store { .. })));

        let err = service(OnErrorBehavior::Throw)
            .is_enabled("feature", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeatureError::Store { source: StoreError::Unavailable(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_panicking_toggle_is_a_failure() {
        let service = service_with(single("panicking"), on_error(OnErrorBehavior::Throw));
        let err = check(&service).await.unwrap_err();
        assert!(matches!(
            err,
            FeatureError::Toggle { source: ToggleError::Panicked(ref message), .. } if message == "strategy bug"
        ));

        let service = service_with(single("panicking"), on_error(OnErrorBehavior::SetEnabled));
        assert!(check(&service).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_before_evaluation_skips_store() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = FeatureService::new(
            Arc::new(PendingStore(Arc::clone(&calls))),
            registry(),
            EvaluationOptions::default(),
        );

        let token = CancellationToken::new();
        token.cancel();
        let err = service.is_enabled("feature", None, &token).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_store_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = FeatureService::new(
            Arc::new(PendingStore(Arc::clone(&calls))),
            registry(),
            on_error(OnErrorBehavior::SetEnabled),
        );

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = service.is_enabled("feature", None, &token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_toggle_is_not_masked() {
        let service = service_with(single("pending"), on_error(OnErrorBehavior::SetEnabled));

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = service.is_enabled("feature", None, &token).await.unwrap_err();
        assert!(matches!(err, FeatureError::Cancelled));
    }

    #[tokio::test]
    async fn test_strategy_cancellation_without_caller_is_a_failure() {
        let service = service_with(single("self_cancelling"), on_error(OnErrorBehavior::SetDisabled));
        let token = CancellationToken::new();
        assert!(!service.is_enabled("feature", None, &token).await.unwrap());
        assert!(!token.is_cancelled());

        let service = service_with(single("self_cancelling"), on_error(OnErrorBehavior::SetEnabled));
        let evaluation = service.evaluate("feature", None, &token).await.unwrap();
        assert!(evaluation.enabled);
        assert!(matches!(
            evaluation.reason,
            Reason::Substituted(Cause::Toggle { ref toggle_type, .. }) if toggle_type == "self_cancelling"
        ));

        let service = service_with(single("self_cancelling"), on_error(OnErrorBehavior::Throw));
        let err = check(&service).await.unwrap_err();
        assert!(!err.is_cancelled());
        assert!(matches!(
            err,
            FeatureError::Toggle { source: ToggleError::Cancelled, .. }
        ));
    }

    #[tokio::test]
    async fn test_product_scoping() {
        let service = service_with(
            vec![
                Feature::new("feature").with_product("shop").enabled(),
                Feature::new("feature").with_product("blog"),
            ],
            EvaluationOptions::default(),
        );
        let token = CancellationToken::new();

        assert!(service.is_enabled("feature", Some("shop"), &token).await.unwrap());
        assert!(!service.is_enabled("feature", Some("blog"), &token).await.unwrap());
        assert!(!service.is_enabled("feature", None, &token).await.unwrap());
    }

    #[tokio::test]
    async fn test_evaluation_is_idempotent() {
        let service = service_with(single("on"), EvaluationOptions::default());
        let token = CancellationToken::new();

        let first = service.evaluate("feature", None, &token).await.unwrap();
        for _ in 0..5 {
            assert_eq!(service.evaluate("feature", None, &token).await.unwrap(), first);
        }
    }

    #[tokio::test]
    async fn test_service_is_shareable_across_tasks() {
        let service = Arc::new(service_with(single("on"), EvaluationOptions::default()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .is_enabled("feature", None, &CancellationToken::new())
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(Reason::ToggleInactive("off".into()).to_string(), "toggle 'off' inactive");

        let cause = Cause::Toggle {
            toggle_type: "from_to".into(),
            message: "Missing parameter 'To'".into(),
        };
        assert_eq!(
            Reason::Substituted(cause).to_string(),
            "substituted after toggle 'from_to': Missing parameter 'To'"
        );
    }
}
