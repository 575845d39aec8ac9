//! # Speed Probe
//!
//! Performs one small downstream transfer, measures its throughput and maps
//! it to a quality tier and a recommended fetch method. Single attempt, no
//! retry loop, always bounded by a timeout. Failures never propagate as
//! errors: they produce a result recommending the sms channel, with the
//! error attached.

use super::FetchMethod;
use crate::client::http::{HttpClient, HttpError, HttpRequest};
use crate::shared::error::SyncError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const POOR_BELOW_KBPS: f64 = 50.0;
const FAIR_BELOW_KBPS: f64 = 200.0;
const GOOD_BELOW_KBPS: f64 = 1000.0;

/// Qualitative throughput tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityTier {
    pub fn from_speed(speed_kbps: f64) -> Self {
        if speed_kbps < POOR_BELOW_KBPS {
            Self::Poor
        } else if speed_kbps < FAIR_BELOW_KBPS {
            Self::Fair
        } else if speed_kbps < GOOD_BELOW_KBPS {
            Self::Good
        } else {
            Self::Excellent
        }
    }

    pub fn recommended_method(self) -> FetchMethod {
        match self {
            Self::Poor => FetchMethod::Sms,
            Self::Fair | Self::Good | Self::Excellent => FetchMethod::Api,
        }
    }
}

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTestResult {
    #[serde(rename = "speedKBps")]
    pub speed_kbps: f64,
    pub elapsed_ms: u64,
    pub size_kb: f64,
    pub quality_tier: QualityTier,
    pub recommended_method: FetchMethod,
    #[serde(skip)]
    pub error: Option<SyncError>,
}

impl SpeedTestResult {
    /// Compute throughput for `bytes` transferred in `elapsed`
    pub fn from_transfer(bytes: usize, elapsed: Duration) -> Self {
        let size_kb = bytes as f64 / 1024.0;
        // A sub-millisecond transfer is clamped so the division stays finite.
        let seconds = elapsed.max(Duration::from_millis(1)).as_secs_f64();
        let speed_kbps = size_kb / seconds;
        let quality_tier = QualityTier::from_speed(speed_kbps);
        Self {
            speed_kbps,
            elapsed_ms: elapsed.as_millis() as u64,
            size_kb,
            quality_tier,
            recommended_method: quality_tier.recommended_method(),
            error: None,
        }
    }

    /// Result for a probe that could not complete
    pub fn failed(error: SyncError, elapsed: Duration) -> Self {
        Self {
            speed_kbps: 0.0,
            elapsed_ms: elapsed.as_millis() as u64,
            size_kb: 0.0,
            quality_tier: QualityTier::Poor,
            recommended_method: FetchMethod::Sms,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Throughput probe against a configured resource
#[derive(Clone)]
pub struct SpeedProbe {
    http: Arc<dyn HttpClient>,
    url: String,
    timeout: Duration,
}

impl SpeedProbe {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    /// Measure throughput once
    pub async fn measure(&self) -> SpeedTestResult {
        let started = Instant::now();
        let request = HttpRequest::get(&self.url, self.timeout);
        let timeout_ms = self.timeout.as_millis() as u64;

        let outcome = match tokio::time::timeout(self.timeout, self.http.send(request)).await {
            Err(_) | Ok(Err(HttpError::Timeout(_))) => Err(SyncError::ProbeTimeout { timeout_ms }),
            Ok(Err(HttpError::Transport(message))) => Err(SyncError::api_failed(None, message)),
            Ok(Ok(response)) if !response.is_success() => Err(SyncError::api_failed(
                Some(response.status),
                "speed probe resource returned an error status",
            )),
            Ok(Ok(response)) => Ok(response.body.len()),
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(bytes) => {
                let result = SpeedTestResult::from_transfer(bytes, elapsed);
                tracing::debug!(
                    speed_kbps = result.speed_kbps,
                    tier = ?result.quality_tier,
                    "Speed probe finished"
                );
                result
            }
            Err(error) => {
                tracing::warn!(error = %error, "Speed probe failed, recommending sms");
                SpeedTestResult::failed(error, elapsed)
            }
        }
    }
}

impl std::fmt::Debug for SpeedProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedProbe")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
