//! # Fetch Method Selection
//!
//! Classification is the cheap pre-filter; measurement is authoritative
//! when it is worth obtaining. A link already classified as sms-only is
//! never probed.

use super::{ConnectionInfo, FetchMethod, NetworkMonitor, SpeedProbe, SpeedTestResult};

/// Which component produced the final method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Classification,
    SpeedProbe,
}

#[derive(Debug, Clone)]
pub struct MethodSelection {
    pub method: FetchMethod,
    pub source: SelectionSource,
    pub connection: ConnectionInfo,
    pub speed_test: Option<SpeedTestResult>,
}

#[derive(Debug, Clone)]
pub struct FetchMethodSelector {
    monitor: NetworkMonitor,
    probe: SpeedProbe,
}

impl FetchMethodSelector {
    pub fn new(monitor: NetworkMonitor, probe: SpeedProbe) -> Self {
        Self { monitor, probe }
    }

    pub async fn select_method(&self) -> MethodSelection {
        let connection = self.monitor.check_connection();
        if connection.fetch_method == FetchMethod::Sms {
            tracing::debug!(status = ?connection.status(), "Classified as sms, skipping speed probe");
            return MethodSelection {
                method: FetchMethod::Sms,
                source: SelectionSource::Classification,
                connection,
                speed_test: None,
            };
        }

        let speed_test = self.probe.measure().await;
        MethodSelection {
            method: speed_test.recommended_method,
            source: SelectionSource::SpeedProbe,
            connection,
            speed_test: Some(speed_test),
        }
    }
}
