//! Serving metrics and periodic summaries for the prediction service.

use crate::types::{GradeClass, PredictionResult, Target};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for request handling
pub struct ServingMetrics {
    /// Successful GPA predictions
    pub gpa_predictions: AtomicU64,
    /// Successful grade class predictions
    pub grade_class_predictions: AtomicU64,
    /// Client-caused rejections
    pub rejections: AtomicU64,
    /// Per-request model failures
    pub internal_errors: AtomicU64,
    /// Rejections by reason code
    rejections_by_code: RwLock<HashMap<String, u64>>,
    /// Handling times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Predicted grade classes by code
    grade_classes: RwLock<[u64; 5]>,
    /// Running sum of predicted GPA values
    gpa_sum: RwLock<f64>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServingMetrics {
    pub fn new() -> Self {
        Self {
            gpa_predictions: AtomicU64::new(0),
            grade_class_predictions: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            rejections_by_code: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            grade_classes: RwLock::new([0; 5]),
            gpa_sum: RwLock::new(0.0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, result: &PredictionResult) {
        self.record_time(processing_time);

        match result {
            PredictionResult::Gpa(gpa) => {
                self.gpa_predictions.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut sum) = self.gpa_sum.write() {
                    *sum += gpa;
                }
            }
            PredictionResult::GradeClass(class) => {
                self.grade_class_predictions.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut classes) = self.grade_classes.write() {
                    classes[class.code() as usize] += 1;
                }
            }
        }
    }

    /// Record a rejected request
    pub fn record_rejection(&self, processing_time: Duration, code: &str) {
        self.record_time(processing_time);
        self.rejections.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_code) = self.rejections_by_code.write() {
            *by_code.entry(code.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a request that failed inside the service
    pub fn record_internal_error(&self, processing_time: Duration) {
        self.record_time(processing_time);
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Total requests seen, successful or not
    pub fn total_requests(&self) -> u64 {
        self.gpa_predictions.load(Ordering::Relaxed)
            + self.grade_class_predictions.load(Ordering::Relaxed)
            + self.rejections.load(Ordering::Relaxed)
            + self.internal_errors.load(Ordering::Relaxed)
    }

    pub fn predictions_for(&self, target: Target) -> u64 {
        match target {
            Target::Gpa => self.gpa_predictions.load(Ordering::Relaxed),
            Target::GradeClass => self.grade_class_predictions.load(Ordering::Relaxed),
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Mean of all predicted GPA values
    pub fn mean_gpa(&self) -> Option<f64> {
        let count = self.gpa_predictions.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        self.gpa_sum.read().ok().map(|sum| *sum / count as f64)
    }

    pub fn get_grade_class_distribution(&self) -> [u64; 5] {
        self.grade_classes.read().map(|c| *c).unwrap_or_default()
    }

    pub fn get_rejections_by_code(&self) -> HashMap<String, u64> {
        self.rejections_by_code
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_requests() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let total = self.total_requests();
        let rejections = self.rejections.load(Ordering::Relaxed);
        let internal = self.internal_errors.load(Ordering::Relaxed);
        let rejection_rate = if total > 0 {
            (rejections as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let processing = self.get_processing_stats();

        info!("=== Prediction service summary ===");
        info!(
            "Requests: {:>8}  |  Throughput: {:>6.1} req/s",
            total,
            self.get_throughput()
        );
        info!(
            "GPA: {:>8}  |  Grade class: {:>8}",
            self.predictions_for(Target::Gpa),
            self.predictions_for(Target::GradeClass)
        );
        info!(
            "Rejected: {:>8} ({:>5.1}%)  |  Internal errors: {:>6}",
            rejections, rejection_rate, internal
        );
        info!(
            "Latency (us): mean={} p50={} p95={} p99={} max={}",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us, processing.max_us
        );
        if let Some(mean) = self.mean_gpa() {
            info!("Mean predicted GPA: {:.3}", mean);
        }

        let classes = self.get_grade_class_distribution();
        let class_total: u64 = classes.iter().sum();
        if class_total > 0 {
            for (class, count) in GradeClass::ALL.iter().zip(classes) {
                let pct = (count as f64 / class_total as f64) * 100.0;
                info!("  grade {}: {:>6} ({:>5.1}%)", class, count, pct);
            }
        }

        for (code, count) in &self.get_rejections_by_code() {
            info!("  rejected {:<22}: {:>6}", code, count);
        }
    }
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that logs periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServingMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServingMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ServingMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), &PredictionResult::Gpa(3.0));
        metrics.record_prediction(Duration::from_micros(300), &PredictionResult::Gpa(2.0));
        metrics.record_prediction(
            Duration::from_micros(200),
            &PredictionResult::GradeClass(GradeClass::D),
        );
        metrics.record_rejection(Duration::from_micros(50), "missing_field");
        metrics.record_rejection(Duration::from_micros(50), "missing_field");
        metrics.record_internal_error(Duration::from_micros(80));

        assert_eq!(metrics.total_requests(), 6);
        assert_eq!(metrics.predictions_for(Target::Gpa), 2);
        assert_eq!(metrics.mean_gpa(), Some(2.5));
        assert_eq!(metrics.get_grade_class_distribution(), [0, 0, 0, 1, 0]);
        assert_eq!(metrics.get_rejections_by_code()["missing_field"], 2);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 6);
        assert_eq!(stats.max_us, 300);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = ServingMetrics::new();
        assert_eq!(metrics.mean_gpa(), None);
        assert_eq!(metrics.get_processing_stats().count, 0);
    }
}
