//! HTTP request log persistence.

use chrono::{DateTime, Utc};
use hpp_core::temporal::format_timestamp;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use super::window_start;

/// How many endpoints the summary breaks out.
const TOP_ENDPOINTS: i64 = 10;

/// One handled HTTP request.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// When the request arrived.
    pub timestamp: DateTime<Utc>,
    /// HTTP method.
    pub method: String,
    /// Route template or normalized path.
    pub path: String,
    /// Response status.
    pub status: u16,
    /// Time to produce the response, in milliseconds.
    pub response_time_ms: f64,
}

/// Request aggregates over a time window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestSummary {
    /// Look-back window in hours.
    pub period_hours: u32,
    /// Requests logged in the window.
    pub total_requests: i64,
    /// Responses with status 400 or above.
    pub error_requests: i64,
    /// `error_requests / total_requests`, 0 when there were none.
    pub error_rate: f64,
    /// Mean response time.
    pub avg_response_time_ms: Option<f64>,
    /// 95th percentile response time (nearest rank).
    pub p95_response_time_ms: Option<f64>,
    /// Slowest response.
    pub max_response_time_ms: Option<f64>,
    /// Busiest endpoints first.
    pub by_endpoint: Vec<EndpointStats>,
}

/// Per-endpoint request counts.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct EndpointStats {
    /// HTTP method.
    pub method: String,
    /// Route template or normalized path.
    pub path: String,
    /// Requests in the window.
    pub count: i64,
    /// Of which errors.
    pub error_count: i64,
    /// Mean response time.
    pub avg_response_time_ms: f64,
}

#[derive(sqlx::FromRow)]
struct AggregateRow {
    total: i64,
    errors: i64,
    avg_ms: Option<f64>,
    max_ms: Option<f64>,
}

/// Insert one request.
pub async fn insert(pool: &SqlitePool, record: &RequestRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO requests (timestamp, method, path, status, response_time_ms)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(format_timestamp(record.timestamp))
    .bind(&record.method)
    .bind(&record.path)
    .bind(i64::from(record.status))
    .bind(record.response_time_ms)
    .execute(pool)
    .await?;

    Ok(())
}

/// Aggregate requests from the last `hours` hours.
pub async fn summary(pool: &SqlitePool, hours: u32) -> Result<RequestSummary, sqlx::Error> {
    let since = window_start(hours);

    let row = sqlx::query_as::<_, AggregateRow>(
        "SELECT COUNT(*) AS total,
         COALESCE(SUM(CASE WHEN status >= 400 THEN 1 ELSE 0 END), 0) AS errors,
         AVG(response_time_ms) AS avg_ms,
         MAX(response_time_ms) AS max_ms
         FROM requests WHERE timestamp >= ?",
    )
    .bind(&since)
    .fetch_one(pool)
    .await?;

    let p95_response_time_ms = if row.total > 0 {
        let rank = ((row.total as f64) * 0.95).ceil() as i64;
        sqlx::query_scalar::<_, f64>(
            "SELECT response_time_ms FROM requests WHERE timestamp >= ?
             ORDER BY response_time_ms LIMIT 1 OFFSET ?",
        )
        .bind(&since)
        .bind((rank - 1).max(0))
        .fetch_optional(pool)
        .await?
    } else {
        None
    };

    let by_endpoint = sqlx::query_as::<_, EndpointStats>(
        "SELECT method, path, COUNT(*) AS count,
         COALESCE(SUM(CASE WHEN status >= 400 THEN 1 ELSE 0 END), 0) AS error_count,
         AVG(response_time_ms) AS avg_response_time_ms
         FROM requests WHERE timestamp >= ?
         GROUP BY method, path
         ORDER BY count DESC, path
         LIMIT ?",
    )
    .bind(&since)
    .bind(TOP_ENDPOINTS)
    .fetch_all(pool)
    .await?;

    let error_rate = if row.total > 0 {
        row.errors as f64 / row.total as f64
    } else {
        0.0
    };

    Ok(RequestSummary {
        period_hours: hours,
        total_requests: row.total,
        error_requests: row.errors,
        error_rate,
        avg_response_time_ms: row.avg_ms,
        p95_response_time_ms,
        max_response_time_ms: row.max_ms,
        by_endpoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_pool;

    fn request(path: &str, status: u16, ms: f64) -> RequestRecord {
        RequestRecord {
            timestamp: Utc::now(),
            method: "POST".to_string(),
            path: path.to_string(),
            status,
            response_time_ms: ms,
        }
    }

    #[tokio::test]
    async fn empty_log_summary() {
        let (_dir, pool) = temp_pool().await;
        let summary = summary(&pool, 24).await.unwrap();
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.error_rate, 0.0);
        assert_eq!(summary.p95_response_time_ms, None);
        assert!(summary.by_endpoint.is_empty());
    }

    #[tokio::test]
    async fn summary_counts_errors_and_percentile() {
        let (_dir, pool) = temp_pool().await;
        for i in 1..=20 {
            let status = if i % 5 == 0 { 422 } else { 200 };
            insert(&pool, &request("/predict", status, f64::from(i))).await.unwrap();
        }
        insert(&pool, &request("/predict/batch", 200, 100.0)).await.unwrap();

        let summary = summary(&pool, 1).await.unwrap();
        assert_eq!(summary.total_requests, 21);
        assert_eq!(summary.error_requests, 4);
        assert!((summary.error_rate - 4.0 / 21.0).abs() < 1e-12);
        assert_eq!(summary.max_response_time_ms, Some(100.0));
        // ceil(21 * 0.95) = 20th smallest
        assert_eq!(summary.p95_response_time_ms, Some(20.0));
        assert_eq!(summary.by_endpoint[0].path, "/predict");
        assert_eq!(summary.by_endpoint[0].count, 20);
        assert_eq!(summary.by_endpoint[0].error_count, 4);
    }
}
