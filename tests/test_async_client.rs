//! Async catalog tests: bulk valuation and spreadsheet import through the
//! mock enrichment seams.

mod common;

use std::sync::{Arc, Mutex};

use common::{row, MockAppraiser, MockMapper};
use numisma::appraisal::Appraiser;
use numisma::models::{Coin, Valuation};
use numisma::pipeline::FailureKind;
use numisma::{AliasMapper, AsyncNumisma, BatchPipeline, NumismaError};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn sample_async() -> AsyncNumisma {
    AsyncNumisma::new(common::setup_sample_db())
}

// ---------------------------------------------------------------------------
// valuation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn estimate_pending_skips_failures_and_stores_successes() {
    let db = sample_async();
    let appraiser = MockAppraiser::failing(&["c1"]);
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();

    let outcome = db
        .estimate_pending(&appraiser, &BatchPipeline::new(), move |p| {
            sink.lock().unwrap().push((p.completed, p.total));
        })
        .await
        .unwrap();

    assert_eq!(appraiser.calls(), vec!["c1", "c3"]);
    let valued: Vec<&str> = outcome.succeeded.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(valued, vec!["c3"]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].item.id, "c1");
    assert_eq!(outcome.failed[0].kind, FailureKind::Failed);
    assert_eq!(*log.lock().unwrap(), vec![(0, 2), (1, 2), (2, 2)]);

    let pending = db.run(|d| d.coins().pending_valuation()).await.unwrap();
    let ids: Vec<String> = pending.into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["c1"]);

    let stored = db.run(|d| d.coins().get("c3")).await.unwrap().unwrap();
    assert_eq!(stored.estimated_value_min, Some(10.0));
    assert_eq!(stored.valuation_notes.as_deref(), Some("steady demand"));
}

#[tokio::test]
async fn estimate_pending_with_nothing_pending() {
    let db = sample_async();
    let appraiser = MockAppraiser::default();
    db.estimate_pending(&appraiser, &BatchPipeline::new(), |_| {})
        .await
        .unwrap();

    let again = db
        .estimate_pending(&appraiser, &BatchPipeline::new(), |_| {})
        .await
        .unwrap();
    assert!(again.succeeded.is_empty());
    assert!(again.is_clean());
    assert_eq!(appraiser.calls().len(), 2);
}

#[tokio::test]
async fn estimate_one_values_single_coin() {
    let db = sample_async();
    let coin = db.estimate_one(&MockAppraiser::default(), "c3").await.unwrap();
    assert_eq!(coin.estimated_value_max, Some(20.0));
    assert_eq!(coin.face_value_usd, Some(1.0));

    let err = db.estimate_one(&MockAppraiser::default(), "missing").await.unwrap_err();
    assert!(matches!(err, NumismaError::NotFound(_)));

    let err = db.estimate_one(&MockAppraiser::failing(&["c1"]), "c1").await.unwrap_err();
    assert!(matches!(err, NumismaError::Enrichment(_)));
    let c1 = db.run(|d| d.coins().get("c1")).await.unwrap().unwrap();
    assert!(c1.is_pending_valuation());
}

/// Appraiser that cancels the batch from inside its first call, then
/// returns a valuation anyway.
struct CancelDuringCall {
    token: CancellationToken,
    yield_after_cancel: bool,
}

impl Appraiser for CancelDuringCall {
    async fn appraise(&self, _coin: &Coin) -> numisma::Result<Valuation> {
        self.token.cancel();
        if self.yield_after_cancel {
            tokio::task::yield_now().await;
        }
        Ok(Valuation {
            min: 5.0,
            max: 6.0,
            ..Valuation::default()
        })
    }
}

#[tokio::test]
async fn reported_outcome_matches_store_when_cancelled_mid_call() {
    for yield_after_cancel in [false, true] {
        let db = sample_async();
        let token = CancellationToken::new();
        let appraiser = CancelDuringCall {
            token: token.clone(),
            yield_after_cancel,
        };

        let outcome = db
            .estimate_pending(&appraiser, &BatchPipeline::new().cancel_token(token), |_| {})
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.succeeded.len() + outcome.failed.len(), 2);
        for coin in &outcome.succeeded {
            let id = coin.id.clone();
            let stored = db.run(move |d| d.coins().get(&id)).await.unwrap().unwrap();
            assert_eq!(stored.estimated_value_max, Some(6.0));
        }
        for failure in &outcome.failed {
            assert_eq!(failure.kind, FailureKind::Cancelled);
            let id = failure.item.id.clone();
            let stored = db.run(move |d| d.coins().get(&id)).await.unwrap().unwrap();
            assert!(stored.is_pending_valuation(), "{} was reported cancelled but stored", stored.id);
        }

        // Returning without yielding finishes the first coin; yielding lets
        // the cancellation win before anything is written.
        let expected_valued = if yield_after_cancel { 0 } else { 1 };
        assert_eq!(outcome.succeeded.len(), expected_valued);
    }
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_sets_aside_broken_rows_and_stores_the_rest() {
    let db = sample_async();
    let rows = vec![
        row(json!({"Year": "1943", "Denomination": "Cent", "Metal Content": "Steel"})),
        row(json!({"Country": "Peru", "Cost": 3})),
        row(json!({" Date ": 1899, "Coin Type": "Morgan Dollar", "Cost": "$45.00"})),
    ];

    let report = db
        .import_rows(rows, &AliasMapper::new(), &BatchPipeline::for_import(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.coins.len(), 2);
    assert_eq!(report.broken.len(), 1);
    assert_eq!(report.broken[0]["Country"], "Peru");
    assert!(report.failed.is_empty());

    assert_eq!(report.coins[0].metal_content.as_deref(), Some("Steel"));
    assert_eq!(report.coins[1].year, "1899");
    assert_eq!(report.coins[1].purchase_cost, Some(45.0));
    assert_ne!(report.coins[0].id, report.coins[1].id);

    assert_eq!(db.run(|d| d.coins().count()).await.unwrap(), 5);
}

#[tokio::test]
async fn failed_chunk_is_reported_and_others_survive() {
    let db = sample_async();
    let rows = vec![
        row(json!({"Year": "1", "Denomination": "A"})),
        row(json!({"Year": "2", "Denomination": "B", "Country": "FAIL"})),
        row(json!({"Year": "3", "Denomination": "C"})),
    ];
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();

    let report = db
        .import_rows(rows, &MockMapper, &BatchPipeline::new().chunk_size(2), move |p| {
            sink.lock().unwrap().push(p.completed);
        })
        .await
        .unwrap();

    let years: Vec<&str> = report.coins.iter().map(|c| c.year.as_str()).collect();
    assert_eq!(years, vec!["3"]);
    let failed: Vec<usize> = report.failed.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![0, 1]);
    assert_eq!(*log.lock().unwrap(), vec![0, 2, 3]);
    assert_eq!(db.run(|d| d.coins().count()).await.unwrap(), 4);
}

#[tokio::test]
async fn prepare_import_does_not_write() {
    let db = sample_async();
    let report = db
        .prepare_import(
            vec![row(json!({"Year": "1976", "Denomination": "Quarter"}))],
            &AliasMapper::new(),
            &BatchPipeline::for_import(),
            |_| {},
        )
        .await;

    assert_eq!(report.coins.len(), 1);
    assert_eq!(report.coins[0].country, "United States");
    assert_eq!(db.run(|d| d.coins().count()).await.unwrap(), 3);
}

#[tokio::test]
async fn builder_opens_in_memory_catalog() {
    let db = AsyncNumisma::builder().in_memory(true).build().await.unwrap();
    assert_eq!(db.run(|d| d.coins().count()).await.unwrap(), 0);
    db.close().await.unwrap();
}
