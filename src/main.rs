//! Student Predictor - Main Entry Point
//!
//! Loads the fitted artifacts, then answers GPA and grade class prediction
//! requests over NATS request/reply. Requests are handled in parallel.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use student_predictor::{
    config::{AppConfig, LoggingConfig},
    consumer::{RequestConsumer, Route},
    metrics::{MetricsReporter, ServingMetrics},
    producer::ReplyProducer,
    service::{PredictionService, Reply},
    FEATURE_COUNT,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config.logging)?;
    info!("Starting student predictor");
    info!(
        artifacts_dir = %config.artifacts.dir,
        strict_validation = config.validation.strict,
        "Configuration loaded successfully"
    );

    // Startup phase: any artifact failure aborts the process
    let service = Arc::new(
        PredictionService::load(&config).context("Failed to load prediction artifacts")?,
    );
    info!(features = FEATURE_COUNT, "Prediction service ready");

    // Initialize metrics
    let metrics = Arc::new(ServingMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats);
    let producer = ReplyProducer::new(client.clone());

    // Parallel processing configuration
    let num_workers = config.serving.workers.max(1);
    info!(
        workers = num_workers,
        subjects = ?consumer.subjects().collect::<Vec<_>>(),
        "Starting request loop"
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));
    let handled_count = Arc::new(AtomicU64::new(0));

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let mut requests = consumer.subscribe().await?;

    loop {
        // Acquire permit (limits concurrent tasks)
        let Some(permit) = acquire_worker(&semaphore, shutdown_signal()).await? else {
            info!("Shutdown signal received");
            break;
        };

        let (route, message) = tokio::select! {
            next = requests.next() => match next {
                Some(item) => item,
                None => break,
            },
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let service = service.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let handled_count = handled_count.clone();

        tokio::spawn(async move {
            let request_id = uuid::Uuid::new_v4();
            let start_time = Instant::now();

            let Some(reply_to) = message.reply.clone() else {
                warn!(%request_id, subject = %message.subject, "Request without reply subject dropped");
                drop(permit);
                return;
            };

            let reply = match route {
                Route::Health => Reply::Health(service.health()),
                Route::Predict(target) => {
                    let result = service.handle_payload(target, &message.payload);
                    let processing_time = start_time.elapsed();

                    match &result {
                        Ok(prediction) => {
                            metrics.record_prediction(processing_time, prediction);
                            debug!(
                                %request_id,
                                target = %target,
                                prediction = ?prediction,
                                processing_time_us = processing_time.as_micros(),
                                "Prediction served"
                            );
                        }
                        Err(e) if e.is_rejection() => {
                            metrics.record_rejection(processing_time, e.code());
                            info!(
                                %request_id,
                                target = %target,
                                reason = e.code(),
                                error = %e,
                                "Request rejected"
                            );
                        }
                        Err(e) => {
                            metrics.record_internal_error(processing_time);
                            error!(
                                %request_id,
                                target = %target,
                                error = %e,
                                "Prediction failed"
                            );
                        }
                    }
                    Reply::from(&result)
                }
            };

            if let Err(e) = producer.reply(reply_to, &reply).await {
                error!(%request_id, error = %e, "Failed to publish reply");
            }

            let count = handled_count.fetch_add(1, Ordering::Relaxed) + 1;

            // Log progress every 1000 requests
            if count % 1000 == 0 {
                let stats = metrics.get_processing_stats();
                info!(
                    handled = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = stats.mean_us,
                    "Processing milestone"
                );
            }

            // Release permit when done
            drop(permit);
        });
    }

    // Print final summary
    info!("Student predictor shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Wait for a free worker slot; `None` when `shutdown` resolves first
async fn acquire_worker(
    semaphore: &Arc<Semaphore>,
    shutdown: impl Future<Output = ()>,
) -> Result<Option<OwnedSemaphorePermit>> {
    tokio::select! {
        permit = semaphore.clone().acquire_owned() => {
            Ok(Some(permit.context("Worker semaphore closed")?))
        }
        _ = shutdown => Ok(None),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("student_predictor={}", logging.level))
            .with_context(|| format!("Invalid log level {:?}", logging.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}
