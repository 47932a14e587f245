//! Behavior-driven tests for the model lifecycle: train on first use,
//! concurrent first requests and teardown.

use std::sync::Arc;
use std::time::Duration;

use prevista_engine::ForecastError;
use prevista_tests::{engine_with, ticker_of, StaticSource};
use tempfile::tempdir;

#[tokio::test]
async fn when_a_new_ticker_is_predicted_then_a_model_is_trained_and_registered() {
    // Given: a ticker the engine has never seen
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(temp.path(), Arc::new(StaticSource::recent(120)));
    let ticker = ticker_of("petr4");

    // When: the next open is requested
    let prediction = engine.predict_next_open(&ticker, 3).await.expect("predict");

    // Then: a model was trained, persisted and pointed to
    assert!(prediction.trained_now);
    assert!(prediction.logs.iter().any(|l| l.contains("no model found")));
    let pointer = engine
        .warehouse()
        .model_pointer(&ticker)
        .expect("lookup")
        .expect("pointer registered");
    assert!(pointer.model_path.ends_with("PETR4_model.json"));
    assert!(std::path::Path::new(&pointer.model_path).is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn when_two_first_predictions_race_then_only_one_model_is_trained() {
    // Given: a slow provider and a brand-new ticker
    let temp = tempdir().expect("tempdir");
    let source = Arc::new(StaticSource::recent(120).with_latency(Duration::from_millis(20)));
    let engine = engine_with(temp.path(), source.clone());
    let ticker = ticker_of("VALE3");

    // When: two predictions arrive together
    let (a, b) = tokio::join!(
        engine.predict_next_open(&ticker, 3),
        engine.predict_next_open(&ticker, 3)
    );
    let (a, b) = (a.expect("first"), b.expect("second"));

    // Then: exactly one of them trained and both agree on the forecast
    assert_eq!(usize::from(a.trained_now) + usize::from(b.trained_now), 1);
    assert_eq!(a.open_price, b.open_price);
    // The training sync finds yesterday already stored; a request syncing
    // after the first one committed finds it too.
    assert!((1..=2).contains(&source.calls()));
}

#[tokio::test]
async fn when_a_ticker_is_removed_then_nothing_of_it_remains() {
    // Given: a trained ticker
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(temp.path(), Arc::new(StaticSource::recent(100)));
    let ticker = ticker_of("ITUB4");
    let report = engine.train(&ticker, 3).await.expect("train");
    assert_eq!(engine.warehouse().count_bars(&ticker).expect("count"), 100);

    // When: it is removed
    let message = engine.remove(&ticker).await.expect("remove");

    // Then: bars, pointer and artifact are all gone
    assert!(message.contains("ITUB4"));
    assert_eq!(engine.warehouse().count_bars(&ticker).expect("count"), 0);
    assert!(engine.warehouse().model_pointer(&ticker).expect("lookup").is_none());
    assert!(!report.model_path.exists());

    // And: the next prediction behaves like a brand-new ticker
    let prediction = engine.predict_next_open(&ticker, 3).await.expect("predict");
    assert!(prediction.trained_now);
    assert_eq!(engine.warehouse().count_bars(&ticker).expect("count"), 100);
}

#[tokio::test]
async fn when_removing_a_ticker_without_model_then_it_is_not_found() {
    // Given: stored bars but no model
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(temp.path(), Arc::new(StaticSource::recent(30)));
    let ticker = ticker_of("ABEV3");
    engine.sync(&ticker).await;

    // When: removal is requested
    let err = engine.remove(&ticker).await.expect_err("no model");

    // Then: it is not found and the bars are untouched
    assert!(matches!(err, ForecastError::ModelNotFound { .. }));
    assert_eq!(engine.warehouse().count_bars(&ticker).expect("count"), 30);
}

#[tokio::test]
async fn when_the_artifact_vanished_then_removal_reports_the_desync_and_keeps_rows() {
    // Given: a pointer whose artifact file was deleted externally
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(temp.path(), Arc::new(StaticSource::recent(80)));
    let ticker = ticker_of("BBAS3");
    let report = engine.train(&ticker, 3).await.expect("train");
    std::fs::remove_file(&report.model_path).expect("delete artifact");

    // When: removal is requested
    let err = engine.remove(&ticker).await.expect_err("desync");

    // Then: it is an integrity failure and nothing was deleted
    assert_eq!(err.code(), "forecast.artifact_missing");
    assert!(engine.warehouse().model_pointer(&ticker).expect("lookup").is_some());
    assert_eq!(engine.warehouse().count_bars(&ticker).expect("count"), 80);
}

#[tokio::test]
async fn when_retraining_then_the_pointer_is_replaced_not_duplicated() {
    // Given: a trained ticker
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(temp.path(), Arc::new(StaticSource::recent(90)));
    let ticker = ticker_of("RENT3");
    let first = engine.train(&ticker, 3).await.expect("first train");

    // When: it is trained again with another lag window
    let second = engine.train(&ticker, 5).await.expect("second train");

    // Then: the same artifact path is reused and now carries five lags
    assert_eq!(first.model_path, second.model_path);
    let pointer = engine
        .warehouse()
        .model_pointer(&ticker)
        .expect("lookup")
        .expect("pointer");
    let stored = engine
        .artifacts()
        .load(std::path::Path::new(&pointer.model_path))
        .expect("load");
    assert_eq!(stored.pipeline.n_lags, 5);
}
