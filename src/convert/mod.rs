use std::fs::{self, OpenOptions};
use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::models::ConversionRecord;

const SIMULATED_SUCCESS_RATE: f64 = 0.9;
const SIMULATED_LATENCY_MS: Range<u64> = 500..1500;

/// Stand-in for the privileged converter: random latency and occasional failure.
pub struct SimulatedBackend {
    success_rate: f64,
    latency_ms: Range<u64>,
    rng: Mutex<StdRng>,
}

impl SimulatedBackend {
    pub fn new(success_rate: f64, latency_ms: Range<u64>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            latency_ms,
            rng: Mutex::new(rng),
        }
    }

    fn roll(&self) -> (Duration, bool) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let delay = if self.latency_ms.start < self.latency_ms.end {
            rng.random_range(self.latency_ms.clone())
        } else {
            self.latency_ms.start
        };
        let ok = rng.random_bool(self.success_rate);
        (Duration::from_millis(delay), ok)
    }

    async fn submit(&self, record: &ConversionRecord) -> Result<(), String> {
        let (delay, ok) = self.roll();
        debug!(
            "simulated conversion of {} ({:?}, ok={ok})",
            record.package_name, delay
        );
        tokio::time::sleep(delay).await;
        if ok {
            Ok(())
        } else {
            Err("Conversion failed".into())
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(SIMULATED_SUCCESS_RATE, SIMULATED_LATENCY_MS, None)
    }
}

/// Hands records to the host script by appending them to its queue file.
pub struct ScriptQueueBackend {
    queue_file: PathBuf,
}

impl ScriptQueueBackend {
    pub fn new(queue_file: PathBuf) -> Self {
        Self { queue_file }
    }

    /// One blocking append with no await point, so a timeout never splits a line.
    async fn submit(&self, record: &ConversionRecord) -> Result<(), String> {
        self.append_line(record)
    }

    fn append_line(&self, record: &ConversionRecord) -> Result<(), String> {
        if let Some(parent) = self.queue_file.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("unable to create queue dir: {e}"))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.queue_file)
            .map_err(|e| format!("unable to open {}: {e}", self.queue_file.display()))?;
        let line = format!("{}\n", record.to_line());
        file.write_all(line.as_bytes())
            .map_err(|e| format!("unable to queue conversion: {e}"))?;
        info!(
            "queued conversion of {} to {}",
            record.package_name,
            self.queue_file.display()
        );
        Ok(())
    }
}

pub enum ConversionBackend {
    Simulated(SimulatedBackend),
    ScriptQueue(ScriptQueueBackend),
}

impl ConversionBackend {
    async fn submit(&self, record: &ConversionRecord) -> Result<(), String> {
        match self {
            ConversionBackend::Simulated(backend) => backend.submit(record).await,
            ConversionBackend::ScriptQueue(backend) => backend.submit(record).await,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// One bounded attempt, no backoff.
    pub const fn single(timeout: Duration) -> Self {
        Self {
            attempts: 1,
            timeout,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(10),
            backoff: Duration::from_millis(500),
        }
    }
}

/// A backend plus the timeout and retry rules applied to every request.
pub struct Converter {
    backend: ConversionBackend,
    policy: RetryPolicy,
}

impl Converter {
    pub fn new(backend: ConversionBackend, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn convert(&self, record: &ConversionRecord) -> Result<(), String> {
        let attempts = self.policy.attempts.max(1);
        let mut last_err = String::new();
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.policy.timeout, self.backend.submit(record)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) => last_err = err,
                Err(_) => {
                    last_err = format!(
                        "timed out after {} ms",
                        self.policy.timeout.as_millis()
                    )
                }
            }
            if attempt < attempts {
                warn!(
                    "conversion of {} failed (attempt {attempt}/{attempts}): {last_err}; retrying",
                    record.package_name
                );
                tokio::time::sleep(self.policy.backoff).await;
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{AppRecord, ConversionMode};

    fn record() -> ConversionRecord {
        ConversionRecord::for_app(
            &AppRecord::new("Maps", "com.example.maps"),
            ConversionMode::System,
        )
    }

    fn simulated(success_rate: f64, latency_ms: Range<u64>) -> ConversionBackend {
        ConversionBackend::Simulated(SimulatedBackend::new(success_rate, latency_ms, Some(7)))
    }

    #[tokio::test]
    async fn certain_success_and_failure() {
        let ok = Converter::new(simulated(1.0, 0..1), RetryPolicy::single(Duration::from_secs(1)));
        assert!(ok.convert(&record()).await.is_ok());

        let failing = Converter::new(simulated(0.0, 0..1), RetryPolicy::single(Duration::from_secs(1)));
        assert_eq!(
            failing.convert(&record()).await.unwrap_err(),
            "Conversion failed"
        );
    }

    #[tokio::test]
    async fn slow_backend_times_out_on_every_attempt() {
        let policy = RetryPolicy {
            attempts: 2,
            timeout: Duration::from_millis(10),
            backoff: Duration::from_millis(1),
        };
        let converter = Converter::new(simulated(1.0, 200..201), policy);
        let err = converter.convert(&record()).await.unwrap_err();
        assert!(err.contains("timed out"), "{err}");
    }

    #[test]
    fn seeded_backends_roll_identically() {
        let a = SimulatedBackend::new(0.5, 500..1500, Some(42));
        let b = SimulatedBackend::new(0.5, 500..1500, Some(42));
        let rolls_a: Vec<_> = (0..8).map(|_| a.roll()).collect();
        let rolls_b: Vec<_> = (0..8).map(|_| b.roll()).collect();
        assert_eq!(rolls_a, rolls_b);
        assert!(rolls_a.iter().all(|(delay, _)| {
            (500..1500).contains(&(delay.as_millis() as u64))
        }));
    }

    #[tokio::test]
    async fn script_queue_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let queue = dir.path().join("queue").join("conversion_queue.txt");
        let converter = Converter::new(
            ConversionBackend::ScriptQueue(ScriptQueueBackend::new(queue.clone())),
            RetryPolicy::default(),
        );
        converter.convert(&record()).await.unwrap();
        converter.convert(&record()).await.unwrap();
        let contents = std::fs::read_to_string(queue).unwrap();
        assert_eq!(
            contents,
            "com.example.maps|system|Maps|\ncom.example.maps|system|Maps|\n"
        );
    }

    #[tokio::test]
    async fn expired_timeout_still_queues_a_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let queue = dir.path().join("conversion_queue.txt");
        let converter = Converter::new(
            ConversionBackend::ScriptQueue(ScriptQueueBackend::new(queue.clone())),
            RetryPolicy {
                attempts: 3,
                timeout: Duration::ZERO,
                backoff: Duration::ZERO,
            },
        );
        converter.convert(&record()).await.unwrap();
        let contents = std::fs::read_to_string(queue).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert_eq!(contents, "com.example.maps|system|Maps|\n");
    }
}
