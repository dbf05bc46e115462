//! 性能指标收集模块
//!
//! 收集查询、翻译与图写入指标，并导出为 Prometheus 文本格式

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 系统全局指标
#[derive(Debug)]
pub struct Metrics {
    /// 查询统计
    query_stats: QueryStats,
    /// 翻译统计
    translation_stats: TranslationStats,
    /// 图操作统计
    graph_stats: GraphStats,
    /// 启动时间
    start_time: Instant,
}

/// 查询统计
#[derive(Debug)]
struct QueryStats {
    /// 总查询数
    total_queries: AtomicU64,
    /// 成功查询数
    success_queries: AtomicU64,
    /// 失败查询数
    failed_queries: AtomicU64,
    /// 查询总耗时（微秒）
    total_duration_us: AtomicU64,
    /// 慢查询数（>1s）
    slow_queries: AtomicU64,
    /// 返回行数
    rows_returned: AtomicU64,
}

/// 翻译统计
#[derive(Debug)]
struct TranslationStats {
    /// 翻译次数
    translations: AtomicU64,
    /// EXPLAIN 查询数
    explain_queries: AtomicU64,
    /// 翻译失败数（解析错误、非法步骤等）
    translation_errors: AtomicU64,
}

/// 图操作统计
#[derive(Debug)]
struct GraphStats {
    /// 顶点插入数
    vertices_inserted: AtomicU64,
    /// 边插入数
    edges_inserted: AtomicU64,
    /// 元素删除数
    elements_dropped: AtomicU64,
}

/// 可导出的指标快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    // 查询指标
    pub total_queries: u64,
    pub success_queries: u64,
    pub failed_queries: u64,
    pub avg_query_duration_ms: f64,
    pub slow_queries: u64,
    pub rows_returned: u64,
    pub qps: f64,

    // 翻译指标
    pub translations: u64,
    pub explain_queries: u64,
    pub translation_errors: u64,

    // 图操作指标
    pub vertices_inserted: u64,
    pub edges_inserted: u64,
    pub elements_dropped: u64,

    // 系统指标
    pub uptime_seconds: u64,
}

/// Prometheus 格式指标
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    pub content: String,
}

impl Metrics {
    /// 创建新的指标收集器
    pub fn new() -> Self {
        Self {
            query_stats: QueryStats {
                total_queries: AtomicU64::new(0),
                success_queries: AtomicU64::new(0),
                failed_queries: AtomicU64::new(0),
                total_duration_us: AtomicU64::new(0),
                slow_queries: AtomicU64::new(0),
                rows_returned: AtomicU64::new(0),
            },
            translation_stats: TranslationStats {
                translations: AtomicU64::new(0),
                explain_queries: AtomicU64::new(0),
                translation_errors: AtomicU64::new(0),
            },
            graph_stats: GraphStats {
                vertices_inserted: AtomicU64::new(0),
                edges_inserted: AtomicU64::new(0),
                elements_dropped: AtomicU64::new(0),
            },
            start_time: Instant::now(),
        }
    }

    /// 记录查询开始
    pub fn record_query_start(&self) -> QueryTimer {
        self.query_stats.total_queries.fetch_add(1, Ordering::Relaxed);
        QueryTimer::new()
    }

    /// 记录查询完成
    pub fn record_query_complete(&self, timer: QueryTimer, success: bool) {
        let duration = timer.elapsed();

        if success {
            self.query_stats.success_queries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.query_stats.failed_queries.fetch_add(1, Ordering::Relaxed);
        }

        self.query_stats
            .total_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        // 慢查询：超过1秒
        if duration.as_secs() >= 1 {
            self.query_stats.slow_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 记录返回行数
    pub fn record_rows(&self, rows: usize) {
        self.query_stats
            .rows_returned
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    /// 记录一次翻译
    pub fn record_translation(&self) {
        self.translation_stats.translations.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录 EXPLAIN 查询
    pub fn record_explain(&self) {
        self.translation_stats
            .explain_queries
            .fetch_add(1, Ordering::Relaxed);
    }

    /// 记录翻译失败
    pub fn record_translation_error(&self) {
        self.translation_stats
            .translation_errors
            .fetch_add(1, Ordering::Relaxed);
    }

    /// 记录顶点插入
    pub fn record_vertex_insert(&self) {
        self.graph_stats.vertices_inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录边插入
    pub fn record_edge_insert(&self) {
        self.graph_stats.edges_inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录元素删除
    pub fn record_drop(&self) {
        self.graph_stats.elements_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_queries = self.query_stats.total_queries.load(Ordering::Relaxed);
        let success_queries = self.query_stats.success_queries.load(Ordering::Relaxed);
        let failed_queries = self.query_stats.failed_queries.load(Ordering::Relaxed);
        let total_duration_us = self.query_stats.total_duration_us.load(Ordering::Relaxed);
        let slow_queries = self.query_stats.slow_queries.load(Ordering::Relaxed);

        let uptime = self.start_time.elapsed().as_secs();

        let avg_query_duration_ms = if total_queries > 0 {
            (total_duration_us as f64) / (total_queries as f64) / 1000.0
        } else {
            0.0
        };

        let qps = if uptime > 0 {
            (total_queries as f64) / (uptime as f64)
        } else {
            0.0
        };

        MetricsSnapshot {
            total_queries,
            success_queries,
            failed_queries,
            avg_query_duration_ms,
            slow_queries,
            rows_returned: self.query_stats.rows_returned.load(Ordering::Relaxed),
            qps,
            translations: self.translation_stats.translations.load(Ordering::Relaxed),
            explain_queries: self.translation_stats.explain_queries.load(Ordering::Relaxed),
            translation_errors: self
                .translation_stats
                .translation_errors
                .load(Ordering::Relaxed),
            vertices_inserted: self.graph_stats.vertices_inserted.load(Ordering::Relaxed),
            edges_inserted: self.graph_stats.edges_inserted.load(Ordering::Relaxed),
            elements_dropped: self.graph_stats.elements_dropped.load(Ordering::Relaxed),
            uptime_seconds: uptime,
        }
    }

    /// 导出为 Prometheus 格式
    pub fn to_prometheus(&self) -> PrometheusMetrics {
        let snapshot = self.snapshot();

        let mut content = String::new();
        let mut metric = |name: &str, help: &str, kind: &str, value: String| {
            content.push_str(&format!("# HELP cyphergraph_{} {}\n", name, help));
            content.push_str(&format!("# TYPE cyphergraph_{} {}\n", name, kind));
            content.push_str(&format!("cyphergraph_{} {}\n", name, value));
        };

        // 查询指标
        metric("queries_total", "Total number of queries", "counter", snapshot.total_queries.to_string());
        metric("queries_success_total", "Number of successful queries", "counter", snapshot.success_queries.to_string());
        metric("queries_failed_total", "Number of failed queries", "counter", snapshot.failed_queries.to_string());
        metric("query_duration_avg_ms", "Average query duration in milliseconds", "gauge", format!("{:.2}", snapshot.avg_query_duration_ms));
        metric("slow_queries_total", "Number of slow queries (>1s)", "counter", snapshot.slow_queries.to_string());
        metric("rows_returned_total", "Total result rows returned", "counter", snapshot.rows_returned.to_string());
        metric("qps", "Queries per second", "gauge", format!("{:.2}", snapshot.qps));

        // 翻译指标
        metric("translations_total", "Total Cypher to Gremlin translations", "counter", snapshot.translations.to_string());
        metric("explain_queries_total", "Number of EXPLAIN queries", "counter", snapshot.explain_queries.to_string());
        metric("translation_errors_total", "Number of failed translations", "counter", snapshot.translation_errors.to_string());

        // 图操作指标
        metric("vertices_inserted_total", "Total vertices inserted", "counter", snapshot.vertices_inserted.to_string());
        metric("edges_inserted_total", "Total edges inserted", "counter", snapshot.edges_inserted.to_string());
        metric("elements_dropped_total", "Total elements dropped", "counter", snapshot.elements_dropped.to_string());

        // 系统指标
        metric("uptime_seconds", "System uptime in seconds", "counter", snapshot.uptime_seconds.to_string());

        PrometheusMetrics { content }
    }

    /// 重置所有指标
    pub fn reset(&self) {
        self.query_stats.total_queries.store(0, Ordering::Relaxed);
        self.query_stats.success_queries.store(0, Ordering::Relaxed);
        self.query_stats.failed_queries.store(0, Ordering::Relaxed);
        self.query_stats.total_duration_us.store(0, Ordering::Relaxed);
        self.query_stats.slow_queries.store(0, Ordering::Relaxed);
        self.query_stats.rows_returned.store(0, Ordering::Relaxed);

        self.translation_stats.translations.store(0, Ordering::Relaxed);
        self.translation_stats.explain_queries.store(0, Ordering::Relaxed);
        self.translation_stats.translation_errors.store(0, Ordering::Relaxed);

        self.graph_stats.vertices_inserted.store(0, Ordering::Relaxed);
        self.graph_stats.edges_inserted.store(0, Ordering::Relaxed);
        self.graph_stats.elements_dropped.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 查询计时器
pub struct QueryTimer {
    start: Instant,
}

impl QueryTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// 全局指标实例
static METRICS: once_cell::sync::Lazy<Arc<Metrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(Metrics::new()));

/// 获取全局指标实例
pub fn global_metrics() -> Arc<Metrics> {
    METRICS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot() {
        let metrics = Metrics::new();

        let timer = metrics.record_query_start();
        std::thread::sleep(Duration::from_millis(10));
        metrics.record_query_complete(timer, true);

        metrics.record_explain();
        metrics.record_translation();
        metrics.record_vertex_insert();
        metrics.record_rows(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_queries, 1);
        assert_eq!(snapshot.success_queries, 1);
        assert_eq!(snapshot.explain_queries, 1);
        assert_eq!(snapshot.rows_returned, 3);
        assert!(snapshot.avg_query_duration_ms >= 10.0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_query_start();
        metrics.record_translation();

        let prom = metrics.to_prometheus();
        assert!(prom.content.contains("cyphergraph_queries_total 1"));
        assert!(prom.content.contains("cyphergraph_translations_total 1"));
        assert!(prom.content.contains("# TYPE cyphergraph_qps gauge"));
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_edge_insert();
        metrics.record_drop();
        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.edges_inserted, 0);
        assert_eq!(snapshot.elements_dropped, 0);
    }
}
