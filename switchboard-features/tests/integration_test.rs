//! Integration tests for switchboard-features

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use switchboard_features::*;
use tokio_util::sync::CancellationToken;

fn service(store: InMemoryFeatureStore, options: EvaluationOptions) -> FeatureService {
    FeatureService::new(
        Arc::new(store),
        Arc::new(ToggleRegistry::with_defaults()),
        options,
    )
}

#[tokio::test]
async fn test_feature_lifecycle() {
    let store = Arc::new(InMemoryFeatureStore::new());
    let service = FeatureService::new(
        store.clone(),
        Arc::new(ToggleRegistry::with_defaults()),
        EvaluationOptions::default(),
    );
    let token = CancellationToken::new();

    assert!(!service.is_enabled("reports", None, &token).await.unwrap());

    store
        .add(Feature::new("reports").enabled().with_toggle(Toggle::new("off")))
        .await;
    assert!(!service.is_enabled("reports", None, &token).await.unwrap());

    store
        .add(Feature::new("reports").enabled().with_toggle(Toggle::new("on")))
        .await;
    assert!(service.is_enabled("reports", None, &token).await.unwrap());

    store.remove("reports", None).await;
    assert!(!service.is_enabled("reports", None, &token).await.unwrap());
}

#[tokio::test]
async fn test_time_window_through_engine() {
    let store = InMemoryFeatureStore::from_json_str(
        r#"{
            "features": [
                { "name": "past", "enabled": true, "toggles": [
                    { "type": "from_to", "parameters": { "From": "2000-01-01 00:00:00", "To": "2001-01-01 00:00:00" } } ] },
                { "name": "current", "enabled": true, "toggles": [
                    { "type": "from_to", "parameters": { "From": "2000-01-01 00:00:00", "To": "2999-01-01 00:00:00" } } ] },
                { "name": "malformed", "enabled": true, "toggles": [
                    { "type": "from_to", "parameters": { "From": "yesterday", "To": "2999-01-01 00:00:00" } } ] }
            ]
        }"#,
    )
    .unwrap();
    let service = service(store, EvaluationOptions::new().with_on_error(OnErrorBehavior::Throw));
    let token = CancellationToken::new();

    assert!(!service.is_enabled("past", None, &token).await.unwrap());
    assert!(service.is_enabled("current", None, &token).await.unwrap());

    let err = service.is_enabled("malformed", None, &token).await.unwrap_err();
    assert!(matches!(
        err,
        FeatureError::Toggle {
            source: ToggleError::Parameter(ParameterError::Invalid { .. }),
            ..
        }
    ));
}

#[tokio::test]
async fn test_time_window_with_fixed_clock() {
    use chrono::{TimeZone, Utc};

    let registry = ToggleRegistry::with_defaults();
    let frozen = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    registry.register_shared(FromToToggle::with_clock(Arc::new(FixedClock(frozen))));

    let store = InMemoryFeatureStore::with_features([Feature::new("launch").enabled().with_toggle(
        Toggle::new("from_to")
            .with_parameter("From", "2020-01-01 00:00:00")
            .with_parameter("To", "2030-01-01 00:00:00"),
    )])
    .unwrap();
    let service = FeatureService::new(Arc::new(store), Arc::new(registry), EvaluationOptions::default());

    let evaluation = service
        .evaluate("launch", None, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!evaluation.enabled);
    assert_eq!(evaluation.reason, Reason::ToggleInactive("from_to".to_string()));
}

#[tokio::test]
async fn test_custom_activator() {
    struct CountingActivator {
        inner: ToggleRegistry,
        calls: AtomicUsize,
    }

    impl ToggleActivator for CountingActivator {
        fn create_instance(&self, type_name: &str) -> Option<Arc<dyn ToggleStrategy>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create_instance(type_name)
        }
    }

    let activator = Arc::new(CountingActivator {
        inner: ToggleRegistry::with_defaults(),
        calls: AtomicUsize::new(0),
    });
    let store = InMemoryFeatureStore::with_features([Feature::new("multi")
        .enabled()
        .with_toggle(Toggle::new("on"))
        .with_toggle(Toggle::new("geo_ip"))
        .with_toggle(Toggle::new("off"))])
    .unwrap();
    let service = FeatureService::new(Arc::new(store), activator.clone(), EvaluationOptions::default());

    let evaluation = service
        .evaluate("multi", None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(evaluation.reason, Reason::ToggleUnregistered("geo_ip".to_string()));
    assert_eq!(activator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancellation_is_reported_under_every_policy() {
    let token = CancellationToken::new();
    token.cancel();

    for behavior in [
        OnErrorBehavior::Throw,
        OnErrorBehavior::SetEnabled,
        OnErrorBehavior::SetDisabled,
    ] {
        let store = InMemoryFeatureStore::with_features([Feature::new("f").enabled()]).unwrap();
        let service = service(store, EvaluationOptions::new().with_on_error(behavior));

        let err = service.is_enabled("f", None, &token).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}

#[test]
fn test_registry_descriptors() {
    let registry = ToggleRegistry::with_defaults();
    let from_to = registry
        .descriptors()
        .into_iter()
        .find(|d| d.type_name == "from_to")
        .unwrap();

    let names: Vec<_> = from_to.parameters.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["From", "To"]);
    assert!(from_to.parameters.iter().all(|p| p.kind == ParameterKind::Date));
}
