//! Prediction log persistence.
//!
//! One row per served prediction; batch items are written in a single
//! transaction. There are no update operations.

use chrono::{DateTime, Utc};
use hpp_core::temporal::format_timestamp;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use super::window_start;
use crate::middleware::metrics::PredictionKind;

/// A served prediction.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    /// Prediction id (`{uuid}` or `{batch_id}_{index}`).
    pub id: String,
    /// When the prediction was made.
    pub timestamp: DateTime<Utc>,
    /// Registry version that produced it.
    pub model_version: String,
    /// The validated input, as echoed to the client.
    pub input_features: serde_json::Value,
    /// Predicted value in units of $100,000.
    pub prediction: f64,
    /// Time spent in the model, in milliseconds.
    pub latency_ms: f64,
    /// Which endpoint served it.
    pub source: PredictionKind,
}

/// Prediction aggregates over a time window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PredictionStats {
    /// Look-back window in hours.
    pub period_hours: u32,
    /// Predictions logged in the window.
    pub total_predictions: i64,
    /// Of which from `POST /predict`.
    pub single_predictions: i64,
    /// Of which from `POST /predict/batch`.
    pub batch_predictions: i64,
    /// Mean predicted value.
    pub mean_prediction: Option<f64>,
    /// Population standard deviation of predicted values.
    pub std_prediction: Option<f64>,
    /// Smallest predicted value.
    pub min_prediction: Option<f64>,
    /// Largest predicted value.
    pub max_prediction: Option<f64>,
    /// Mean model latency in milliseconds.
    pub avg_latency_ms: Option<f64>,
    /// Breakdown per model version, busiest first.
    pub by_model_version: Vec<VersionStats>,
}

/// Per-version prediction counts.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct VersionStats {
    /// Registry version.
    pub model_version: String,
    /// Predictions served by it.
    pub count: i64,
    /// Mean predicted value.
    pub mean_prediction: f64,
}

#[derive(sqlx::FromRow)]
struct AggregateRow {
    total: i64,
    single: i64,
    batch: i64,
    mean: Option<f64>,
    mean_sq: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    latency: Option<f64>,
}

/// Insert one prediction.
pub async fn insert(pool: &SqlitePool, record: &PredictionRecord) -> Result<(), sqlx::Error> {
    insert_many(pool, std::slice::from_ref(record)).await
}

/// Insert a batch of predictions atomically.
pub async fn insert_many(pool: &SqlitePool, records: &[PredictionRecord]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for record in records {
        sqlx::query(
            "INSERT INTO predictions (id, timestamp, model_version, input_features,
             prediction, latency_ms, source)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(format_timestamp(record.timestamp))
        .bind(&record.model_version)
        .bind(record.input_features.to_string())
        .bind(record.prediction)
        .bind(record.latency_ms)
        .bind(record.source.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

/// Aggregate predictions from the last `hours` hours.
pub async fn stats(pool: &SqlitePool, hours: u32) -> Result<PredictionStats, sqlx::Error> {
    let since = window_start(hours);

    let row = sqlx::query_as::<_, AggregateRow>(
        "SELECT COUNT(*) AS total,
         COALESCE(SUM(CASE WHEN source = 'single' THEN 1 ELSE 0 END), 0) AS single,
         COALESCE(SUM(CASE WHEN source = 'batch' THEN 1 ELSE 0 END), 0) AS batch,
         AVG(prediction) AS mean,
         AVG(prediction * prediction) AS mean_sq,
         MIN(prediction) AS min,
         MAX(prediction) AS max,
         AVG(latency_ms) AS latency
         FROM predictions WHERE timestamp >= ?",
    )
    .bind(&since)
    .fetch_one(pool)
    .await?;

    let by_model_version = sqlx::query_as::<_, VersionStats>(
        "SELECT model_version, COUNT(*) AS count, AVG(prediction) AS mean_prediction
         FROM predictions WHERE timestamp >= ?
         GROUP BY model_version
         ORDER BY count DESC, model_version",
    )
    .bind(&since)
    .fetch_all(pool)
    .await?;

    let std_prediction = match (row.mean, row.mean_sq) {
        (Some(mean), Some(mean_sq)) => Some((mean_sq - mean * mean).max(0.0).sqrt()),
        _ => None,
    };

    Ok(PredictionStats {
        period_hours: hours,
        total_predictions: row.total,
        single_predictions: row.single,
        batch_predictions: row.batch,
        mean_prediction: row.mean,
        std_prediction,
        min_prediction: row.min,
        max_prediction: row.max,
        avg_latency_ms: row.latency,
        by_model_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_pool;

    fn record(id: &str, version: &str, prediction: f64, source: PredictionKind) -> PredictionRecord {
        PredictionRecord {
            id: id.to_string(),
            timestamp: Utc::now(),
            model_version: version.to_string(),
            input_features: serde_json::json!({"MedInc": 8.3252}),
            prediction,
            latency_ms: 0.5,
            source,
        }
    }

    #[tokio::test]
    async fn empty_log_has_zero_counts() {
        let (_dir, pool) = temp_pool().await;
        let stats = stats(&pool, 24).await.unwrap();
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.mean_prediction, None);
        assert_eq!(stats.std_prediction, None);
        assert!(stats.by_model_version.is_empty());
    }

    #[tokio::test]
    async fn stats_split_by_source_and_version() {
        let (_dir, pool) = temp_pool().await;
        insert(&pool, &record("a", "1", 1.0, PredictionKind::Single)).await.unwrap();
        insert_many(
            &pool,
            &[
                record("b_0", "2", 2.0, PredictionKind::Batch),
                record("b_1", "2", 3.0, PredictionKind::Batch),
            ],
        )
        .await
        .unwrap();

        let stats = stats(&pool, 1).await.unwrap();
        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.single_predictions, 1);
        assert_eq!(stats.batch_predictions, 2);
        assert_eq!(stats.min_prediction, Some(1.0));
        assert_eq!(stats.max_prediction, Some(3.0));
        assert!((stats.mean_prediction.unwrap() - 2.0).abs() < 1e-12);
        assert!((stats.std_prediction.unwrap() - (2.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(stats.by_model_version[0].model_version, "2");
        assert_eq!(stats.by_model_version[0].count, 2);
        assert_eq!(stats.by_model_version[1].model_version, "1");
    }

    #[tokio::test]
    async fn old_rows_fall_outside_window() {
        let (_dir, pool) = temp_pool().await;
        let mut old = record("old", "1", 4.0, PredictionKind::Single);
        old.timestamp = Utc::now() - chrono::TimeDelta::hours(3);
        insert(&pool, &old).await.unwrap();
        insert(&pool, &record("new", "1", 1.0, PredictionKind::Single)).await.unwrap();

        assert_eq!(stats(&pool, 1).await.unwrap().total_predictions, 1);
        assert_eq!(stats(&pool, 4).await.unwrap().total_predictions, 2);
    }

    #[tokio::test]
    async fn duplicate_batch_rolls_back() {
        let (_dir, pool) = temp_pool().await;
        let result = insert_many(
            &pool,
            &[
                record("dup", "1", 1.0, PredictionKind::Batch),
                record("dup", "1", 2.0, PredictionKind::Batch),
            ],
        )
        .await;
        assert!(result.is_err());
        assert_eq!(stats(&pool, 1).await.unwrap().total_predictions, 0);
    }
}
