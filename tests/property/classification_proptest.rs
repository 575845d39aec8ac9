//! Property-based tests for connection classification

use healthsync::client::network::{
    classify, CellularGeneration, ConnectionInfo, ConnectionType, FetchMethod, NetworkSnapshot,
    NetworkStatus,
};
use proptest::prelude::*;

fn connection_type() -> impl Strategy<Value = ConnectionType> {
    prop_oneof![
        Just(ConnectionType::Wifi),
        Just(ConnectionType::Cellular),
        Just(ConnectionType::Ethernet),
        Just(ConnectionType::Unknown),
    ]
}

fn generation() -> impl Strategy<Value = Option<CellularGeneration>> {
    prop_oneof![
        Just(None),
        Just(Some(CellularGeneration::TwoG)),
        Just(Some(CellularGeneration::ThreeG)),
        Just(Some(CellularGeneration::FourG)),
        Just(Some(CellularGeneration::FiveG)),
    ]
}

fn effective_type() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("slow-2g".to_string())),
        Just(Some("2g".to_string())),
        Just(Some("3g".to_string())),
        Just(Some("4g".to_string())),
    ]
}

fn snapshot() -> impl Strategy<Value = NetworkSnapshot> {
    (any::<bool>(), connection_type(), generation(), effective_type()).prop_map(
        |(is_connected, connection_type, cellular_generation, effective_type)| NetworkSnapshot {
            is_connected,
            connection_type,
            cellular_generation,
            effective_type,
        },
    )
}

proptest! {
    #[test]
    fn test_disconnected_is_always_sms(mut s in snapshot()) {
        s.is_connected = false;
        let info = ConnectionInfo::from_snapshot(&s);
        prop_assert_eq!(info.fetch_method, FetchMethod::Sms);
        prop_assert_eq!(info.status(), NetworkStatus::Offline);
    }

    #[test]
    fn test_two_g_cellular_is_sms_regardless_of_connection(
        is_connected in any::<bool>(),
        two_g_generation in any::<bool>(),
        generation in generation(),
        slow in prop_oneof![Just("2g"), Just("slow-2g")],
    ) {
        let s = if two_g_generation {
            NetworkSnapshot {
                is_connected,
                ..NetworkSnapshot::cellular(Some(CellularGeneration::TwoG), None)
            }
        } else {
            NetworkSnapshot {
                is_connected,
                ..NetworkSnapshot::cellular(generation, Some(slow))
            }
        };
        prop_assert_eq!(classify(&s), FetchMethod::Sms);
    }

    #[test]
    fn test_api_only_when_connected(s in snapshot()) {
        let info = ConnectionInfo::from_snapshot(&s);
        if info.fetch_method == FetchMethod::Api {
            prop_assert!(s.is_connected);
            prop_assert_eq!(info.status(), NetworkStatus::Online);
        }
    }

    #[test]
    fn test_wired_and_wifi_links_use_api(
        wired in any::<bool>(),
        generation in generation(),
        effective_type in effective_type(),
    ) {
        let s = NetworkSnapshot {
            connection_type: if wired { ConnectionType::Ethernet } else { ConnectionType::Wifi },
            cellular_generation: generation,
            effective_type,
            ..NetworkSnapshot::wifi()
        };
        prop_assert_eq!(classify(&s), FetchMethod::Api);
    }
}
