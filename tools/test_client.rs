//! Test Prediction Client
//!
//! Sends generated student records to the prediction service over NATS
//! request/reply and logs each reply.

use rand::Rng;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Kind of record to send
#[derive(Debug, Clone, Copy)]
enum RecordKind {
    Valid,
    Labelled,
    MissingField,
    OutOfDomain,
}

/// Student record generator for testing
struct RecordGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RecordGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a random record with numeric codes
    fn generate_valid(&mut self) -> Map<String, Value> {
        let record = json!({
            "Age": self.rng.gen_range(15..=18),
            "Gender": self.rng.gen_range(0..=1),
            "Ethnicity": self.rng.gen_range(0..=3),
            "ParentalEducation": self.rng.gen_range(0..=4),
            "StudyTimeWeekly": (self.rng.gen_range(0.0..20.0_f64) * 100.0).round() / 100.0,
            "Absences": self.rng.gen_range(0..=29),
            "Tutoring": self.rng.gen_range(0..=1),
            "ParentalSupport": self.rng.gen_range(0..=4),
            "Extracurricular": self.rng.gen_range(0..=1),
            "Sports": self.rng.gen_range(0..=1),
            "Music": self.rng.gen_range(0..=1),
            "Volunteering": self.rng.gen_range(0..=1),
        });
        match record {
            Value::Object(map) => map,
            _ => unreachable!("json! object literal"),
        }
    }

    /// Generate a record using category labels and numeric strings
    fn generate_labelled(&mut self) -> Map<String, Value> {
        let mut record = self.generate_valid();
        record.insert(
            "Gender".into(),
            json!(self.random_choice(&["Male", "Female"])),
        );
        record.insert(
            "ParentalSupport".into(),
            json!(self.random_choice(&["None", "Low", "Moderate", "High", "Very High"])),
        );
        record.insert(
            "StudyTimeWeekly".into(),
            json!(format!("{:.1}", self.rng.gen_range(0.0..20.0_f64))),
        );
        record
    }

    fn generate(&mut self, kind: RecordKind) -> Map<String, Value> {
        match kind {
            RecordKind::Valid => self.generate_valid(),
            RecordKind::Labelled => self.generate_labelled(),
            RecordKind::MissingField => {
                let mut record = self.generate_valid();
                record.remove("Absences");
                record
            }
            RecordKind::OutOfDomain => {
                let mut record = self.generate_valid();
                record.insert("Gender".into(), json!(2));
                record
            }
        }
    }

    fn random_kind(&mut self, invalid_rate: f64) -> RecordKind {
        if self.rng.gen_bool(invalid_rate) {
            if self.rng.gen_bool(0.5) {
                RecordKind::MissingField
            } else {
                RecordKind::OutOfDomain
            }
        } else if self.rng.gen_bool(0.3) {
            RecordKind::Labelled
        } else {
            RecordKind::Valid
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let invalid_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        count = count,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, invalid_rate);
        }
    };

    let health = client.request("predict.health", "".into()).await?;
    info!("Health: {}", String::from_utf8_lossy(&health.payload));

    let mut generator = RecordGenerator::new();
    let mut failures = 0;

    for i in 0..count {
        let kind = generator.random_kind(invalid_rate);
        let record = generator.generate(kind);
        let payload = serde_json::to_vec(&record)?;

        let subject = if i % 2 == 0 {
            "predict.gpa"
        } else {
            "predict.gradeclass"
        };

        match client.request(subject, payload.into()).await {
            Ok(reply) => {
                info!(
                    subject,
                    kind = ?kind,
                    reply = %String::from_utf8_lossy(&reply.payload),
                    "Reply received"
                );
            }
            Err(e) => {
                failures += 1;
                warn!(subject, error = %e, "Request failed");
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Sent {} requests ({} transport failures)", count, failures);

    Ok(())
}

fn run_dry_mode(count: u64, invalid_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RecordGenerator::new();

    for i in 0..count {
        let kind = generator.random_kind(invalid_rate);
        let record = generator.generate(kind);
        info!(
            "Sample record {} ({:?}):\n{}",
            i + 1,
            kind,
            serde_json::to_string_pretty(&record)?
        );
    }

    Ok(())
}
