//! Property-based tests for speed tiering

use healthsync::client::network::{FetchMethod, QualityTier, SpeedTestResult};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #[test]
    fn test_slow_links_recommend_sms(speed in 0.0f64..50.0) {
        prop_assert_eq!(QualityTier::from_speed(speed), QualityTier::Poor);
        prop_assert_eq!(QualityTier::from_speed(speed).recommended_method(), FetchMethod::Sms);
    }

    #[test]
    fn test_usable_links_recommend_api(speed in 50.0f64..1_000_000.0) {
        prop_assert_eq!(QualityTier::from_speed(speed).recommended_method(), FetchMethod::Api);
    }

    #[test]
    fn test_transfer_result_is_consistent(bytes in 0usize..4_000_000, millis in 1u64..60_000) {
        let result = SpeedTestResult::from_transfer(bytes, Duration::from_millis(millis));

        prop_assert!(result.speed_kbps.is_finite());
        prop_assert_eq!(result.quality_tier, QualityTier::from_speed(result.speed_kbps));
        prop_assert_eq!(
            result.recommended_method == FetchMethod::Sms,
            result.speed_kbps < 50.0
        );
        prop_assert!(result.is_success());
    }

    #[test]
    fn test_tiers_are_monotonic(a in 0.0f64..5000.0, b in 0.0f64..5000.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(QualityTier::from_speed(low)) <= rank(QualityTier::from_speed(high)));
    }
}

fn rank(tier: QualityTier) -> u8 {
    match tier {
        QualityTier::Poor => 0,
        QualityTier::Fair => 1,
        QualityTier::Good => 2,
        QualityTier::Excellent => 3,
    }
}
