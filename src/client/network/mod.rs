//! # Network Classification
//!
//! Turns the platform's raw network snapshot into a normalized verdict:
//! is the device connected, and which fetch method (`api` or `sms`) should
//! data retrieval use.
//!
//! ## Components
//!
//! - `monitor`: current-state classification and change subscriptions
//! - `speed_probe`: throughput measurement and quality tiering
//! - `selector`: composes both into a single recommendation
//!
//! The classification itself is a pure function over [`NetworkSnapshot`];
//! any platform integration only has to publish snapshots.

pub mod monitor;
pub mod selector;
pub mod speed_probe;

pub use monitor::{NetworkMonitor, NetworkSource, NetworkSubscription, WatchNetworkSource};
pub use selector::{FetchMethodSelector, MethodSelection, SelectionSource};
pub use speed_probe::{QualityTier, SpeedProbe, SpeedTestResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Physical link type reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    Unknown,
}

/// Cellular radio generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellularGeneration {
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[serde(rename = "5g")]
    FiveG,
}

/// Channel selected for data retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    /// Direct network request
    Api,
    /// Degraded store-and-forward channel
    Sms,
}

/// Coarse status shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    /// Connected with an api-capable link
    Online,
    /// Connected, but only good enough for the sms channel
    Limited,
    Offline,
}

/// Raw platform network state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub is_connected: bool,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    pub cellular_generation: Option<CellularGeneration>,
    pub effective_type: Option<String>,
}

impl NetworkSnapshot {
    pub fn offline() -> Self {
        Self {
            is_connected: false,
            connection_type: ConnectionType::Unknown,
            cellular_generation: None,
            effective_type: None,
        }
    }

    pub fn wifi() -> Self {
        Self {
            is_connected: true,
            connection_type: ConnectionType::Wifi,
            cellular_generation: None,
            effective_type: None,
        }
    }

    pub fn ethernet() -> Self {
        Self {
            connection_type: ConnectionType::Ethernet,
            ..Self::wifi()
        }
    }

    pub fn cellular(generation: Option<CellularGeneration>, effective_type: Option<&str>) -> Self {
        Self {
            is_connected: true,
            connection_type: ConnectionType::Cellular,
            cellular_generation: generation,
            effective_type: effective_type.map(str::to_string),
        }
    }

    fn is_two_g_class(&self) -> bool {
        self.connection_type == ConnectionType::Cellular
            && (self.cellular_generation == Some(CellularGeneration::TwoG)
                || matches!(self.effective_type.as_deref(), Some("2g") | Some("slow-2g")))
    }
}

/// Classify a snapshot into a fetch method
pub fn classify(snapshot: &NetworkSnapshot) -> FetchMethod {
    if !snapshot.is_connected || snapshot.is_two_g_class() {
        return FetchMethod::Sms;
    }
    FetchMethod::Api
}

/// Normalized connection verdict, computed fresh on every call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub is_connected: bool,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    pub cellular_generation: Option<CellularGeneration>,
    pub effective_type: Option<String>,
    pub fetch_method: FetchMethod,
    pub timestamp: DateTime<Utc>,
}

impl ConnectionInfo {
    pub fn from_snapshot(snapshot: &NetworkSnapshot) -> Self {
        Self {
            is_connected: snapshot.is_connected,
            connection_type: snapshot.connection_type,
            cellular_generation: snapshot.cellular_generation,
            effective_type: snapshot.effective_type.clone(),
            fetch_method: classify(snapshot),
            timestamp: Utc::now(),
        }
    }

    /// Connected and able to use the api channel
    pub fn is_api_capable(&self) -> bool {
        self.is_connected && self.fetch_method == FetchMethod::Api
    }

    pub fn status(&self) -> NetworkStatus {
        match (self.is_connected, self.fetch_method) {
            (false, _) => NetworkStatus::Offline,
            (true, FetchMethod::Api) => NetworkStatus::Online,
            (true, FetchMethod::Sms) => NetworkStatus::Limited,
        }
    }
}
