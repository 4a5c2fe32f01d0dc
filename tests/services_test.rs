//! Tests for the history store and correlation engine

use confluence::config::EngineConfig;
use confluence::services::signals::{correlation_matrix, strong_correlations};
use confluence::services::{HistoryStore, SignalEngine};
use confluence::types::*;
use confluence::SignalError;
use std::time::Duration;

const HOUR: i64 = 3_600_000;

fn series(n: usize) -> Vec<PricePoint> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            PricePoint::new(
                i as i64 * HOUR,
                50.0 + (t * 0.25).sin() * 4.0 + t * 0.05,
                800.0 + (t * 0.7).cos() * 200.0,
            )
        })
        .collect()
}

#[test]
fn test_stored_history_reproduces_correlation_matrix() {
    let engine = SignalEngine::from_config(EngineConfig::default());
    engine.evaluate("btc", &series(150)).unwrap();

    let history = engine.history("btc", None);
    let first = correlation_matrix(&history, 30).unwrap();
    let second = correlation_matrix(&history, 30).unwrap();
    assert_eq!(first, second);

    // Replaying the snapshots into a fresh store yields the same window.
    let replay = HistoryStore::new(Duration::from_secs(240 * 3600), Duration::from_secs(3600));
    for snapshot in history.iter().rev() {
        replay.append("btc", snapshot.clone());
    }
    let replayed = correlation_matrix(&replay.history("btc", None), 30).unwrap();
    assert_eq!(first, replayed);

    assert_eq!(engine.correlation_matrix("btc").unwrap(), first);
}

#[test]
fn test_correlation_matrix_insufficient_history() {
    let engine = SignalEngine::from_config(EngineConfig {
        backfill_on_evaluate: false,
        ..EngineConfig::default()
    });
    engine.evaluate("eth", &series(40)).unwrap();

    assert_eq!(
        engine.correlation_matrix("eth").unwrap_err(),
        SignalError::InsufficientHistory {
            required: 30,
            actual: 1
        }
    );
}

#[test]
fn test_matrix_properties_from_engine_history() {
    let engine = SignalEngine::from_config(EngineConfig::default());
    let result = engine.evaluate("sol", &series(200)).unwrap();
    let matrix = result.correlation_matrix.unwrap();

    for a in IndicatorKind::ALL {
        assert_eq!(matrix.get(a, a), 1.0);
        for b in IndicatorKind::ALL {
            assert_eq!(matrix.get(a, b), matrix.get(b, a));
            assert!((-1.0..=1.0).contains(&matrix.get(a, b)));
        }
    }

    let strong = strong_correlations(&matrix, 0.5, 5);
    assert_eq!(strong, result.strong_correlations);
    assert!(strong
        .windows(2)
        .all(|w| w[0].correlation.abs() >= w[1].correlation.abs()));
}

#[test]
fn test_history_window_and_retention() {
    let store = HistoryStore::new(Duration::from_secs(48 * 3600), Duration::from_secs(3600));
    for h in 0..100 {
        let snapshot = HistorySnapshot::new(
            h * HOUR + 59_000,
            &SignalVector::new([0.1, 0.2, 0.3, 0.4, 0.5]),
            Default::default(),
        );
        store.append("doge", snapshot);
    }

    let all = store.history("DOGE", None);
    assert_eq!(all.len(), 49);
    assert_eq!(all[0].timestamp, 51 * HOUR);
    assert!(all.iter().all(|s| s.timestamp % HOUR == 0));

    let day = store.history("doge", Some(Duration::from_secs(24 * 3600)));
    assert_eq!(day.len(), 25);
    assert_eq!(day.last().unwrap().timestamp, 99 * HOUR);
}

#[test]
fn test_assets_are_independent() {
    let engine = SignalEngine::from_config(EngineConfig::default());
    let points = series(60);

    std::thread::scope(|scope| {
        for asset in ["btc", "eth", "sol", "ada"] {
            let engine = &engine;
            let points = &points;
            scope.spawn(move || engine.evaluate(asset, points).unwrap());
        }
    });

    let lengths: Vec<usize> = ["btc", "eth", "sol", "ada"]
        .iter()
        .map(|a| engine.history(a, None).len())
        .collect();
    assert!(lengths.iter().all(|l| *l == lengths[0] && *l > 0));
    assert_eq!(
        engine.history("btc", None),
        engine.history("eth", None)
    );
}
