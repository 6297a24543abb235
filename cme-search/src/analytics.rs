//! In-memory search analytics: a retained, pruned log of `AnalyticsRecord`
//! plus an aggregation query over it.

use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::types::{AnalyticsAggregate, AnalyticsRecord};

pub struct Analytics {
    records: Mutex<Vec<AnalyticsRecord>>,
    retention_days: u32,
}

impl Analytics {
    pub fn new(retention_days: u32) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            retention_days,
        }
    }

    pub fn record(&self, record: AnalyticsRecord) {
        let mut records = self.records.lock().expect("analytics mutex poisoned");
        records.push(record);
        let cutoff = Utc::now() - Duration::days(self.retention_days as i64);
        records.retain(|r| r.recorded_at >= cutoff);
    }

    pub fn aggregate(&self) -> AnalyticsAggregate {
        let records = self.records.lock().expect("analytics mutex poisoned");
        if records.is_empty() {
            return AnalyticsAggregate::default();
        }

        let total_searches = records.len() as u64;
        let mut latencies: Vec<u64> = records.iter().map(|r| r.elapsed_ms).collect();
        latencies.sort_unstable();

        let mean_latency_ms = latencies.iter().sum::<u64>() as f64 / total_searches as f64;
        let p95_index = ((latencies.len() as f64 * 0.95).ceil() as usize)
            .saturating_sub(1)
            .min(latencies.len() - 1);
        let p95_latency_ms = latencies[p95_index] as f64;

        let cache_hits = records.iter().filter(|r| r.cache_hit).count();
        let cache_hit_rate = cache_hits as f64 / total_searches as f64;

        let mean_results =
            records.iter().map(|r| r.results_count).sum::<usize>() as f64 / total_searches as f64;

        let mut strategy_usage: std::collections::HashMap<&'static str, u64> =
            std::collections::HashMap::new();
        for record in records.iter() {
            for strategy in &record.strategies_used {
                *strategy_usage.entry(strategy.as_str()).or_insert(0) += 1;
            }
        }
        let mut strategy_usage: Vec<(String, u64)> =
            strategy_usage.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        strategy_usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut query_counts: std::collections::HashMap<&str, u64> = std::collections::HashMap::new();
        for record in records.iter() {
            *query_counts.entry(record.query_shape.as_str()).or_insert(0) += 1;
        }
        let mut top_queries: Vec<(String, u64)> =
            query_counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        top_queries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_queries.truncate(10);

        AnalyticsAggregate {
            total_searches,
            mean_latency_ms,
            p95_latency_ms,
            cache_hit_rate,
            mean_results,
            strategy_usage,
            top_queries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyKind;

    #[test]
    fn aggregate_computes_rates_over_recorded_searches() {
        let analytics = Analytics::new(30);
        analytics.record(AnalyticsRecord {
            query_id: "q1".into(),
            strategies_used: vec![StrategyKind::FullText],
            elapsed_ms: 10,
            results_count: 5,
            cache_hit: false,
            query_shape: "text:rust".into(),
            recorded_at: Utc::now(),
        });
        analytics.record(AnalyticsRecord {
            query_id: "q2".into(),
            strategies_used: vec![StrategyKind::FullText, StrategyKind::Vector],
            elapsed_ms: 20,
            results_count: 3,
            cache_hit: true,
            query_shape: "text:rust".into(),
            recorded_at: Utc::now(),
        });

        let agg = analytics.aggregate();
        assert_eq!(agg.total_searches, 2);
        assert!((agg.mean_latency_ms - 15.0).abs() < 1e-9);
        assert!((agg.cache_hit_rate - 0.5).abs() < 1e-9);
        assert_eq!(agg.top_queries[0].0, "text:rust");
        assert_eq!(agg.top_queries[0].1, 2);
    }
}
