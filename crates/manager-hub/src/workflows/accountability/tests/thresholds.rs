use crate::workflows::accountability::settings::Settings;
use crate::workflows::accountability::thresholds::{
    detect_thresholds, SeverityTier, Threshold, ThresholdTable, FALLBACK_CONSEQUENCE,
};

fn table() -> ThresholdTable {
    Settings::standard().thresholds
}

#[test]
fn detects_every_threshold_in_the_half_open_interval() {
    assert_eq!(detect_thresholds(&table(), 4.0, 7.0), vec![5.0, 6.0]);
    assert_eq!(detect_thresholds(&table(), 8.0, 16.0), vec![9.0, 12.0, 15.0]);
}

#[test]
fn landing_exactly_on_a_threshold_counts_but_starting_on_one_does_not() {
    assert_eq!(detect_thresholds(&table(), 3.0, 5.0), vec![5.0]);
    assert_eq!(detect_thresholds(&table(), 5.0, 5.5), Vec::<f64>::new());
}

#[test]
fn decreases_and_flat_totals_never_alert() {
    assert!(detect_thresholds(&table(), 9.0, 2.0).is_empty());
    assert!(detect_thresholds(&table(), 6.0, 6.0).is_empty());
}

#[test]
fn recrossing_after_expiry_alerts_again() {
    let first = detect_thresholds(&table(), 1.0, 3.0);
    let after_drop = detect_thresholds(&table(), 3.0, 1.0);
    let second = detect_thresholds(&table(), 1.0, 3.0);

    assert_eq!(first, vec![2.0, 3.0]);
    assert!(after_drop.is_empty());
    assert_eq!(second, first);
}

#[test]
fn negative_starting_totals_still_detect_upward_crossings() {
    assert_eq!(detect_thresholds(&table(), -6.0, 2.0), vec![2.0]);
}

#[test]
fn table_sorts_entries_and_drops_non_numeric_values() {
    let table = ThresholdTable::new(vec![
        Threshold {
            threshold: 12.0,
            consequence: "Suspension".to_string(),
        },
        Threshold {
            threshold: f64::NAN,
            consequence: "Broken row".to_string(),
        },
        Threshold {
            threshold: 3.0,
            consequence: String::new(),
        },
    ]);

    assert_eq!(table.values(), vec![3.0, 12.0]);
    assert_eq!(table.consequence_or_fallback(3.0), FALLBACK_CONSEQUENCE);
    assert_eq!(table.consequence_or_fallback(12.0), "Suspension");
    assert_eq!(table.consequence_for(7.0), None);
}

#[test]
fn deserializes_from_a_plain_list() {
    let table: ThresholdTable = serde_json::from_str(
        r#"[{"threshold": 9, "consequence": "Final"}, {"threshold": 2, "consequence": "Coach"}]"#,
    )
    .expect("table parses");

    assert_eq!(table.values(), vec![2.0, 9.0]);
}

#[test]
fn highest_reached_tracks_current_standing() {
    let table = table();
    assert_eq!(
        table.highest_reached(7.0).map(|entry| entry.threshold),
        Some(6.0)
    );
    assert!(table.highest_reached(1.0).is_none());
}

#[test]
fn severity_tier_follows_the_highest_crossing() {
    assert_eq!(
        SeverityTier::from_crossed(&[5.0, 6.0]),
        SeverityTier::Informational
    );
    assert_eq!(
        SeverityTier::from_crossed(&[6.0, 9.0]),
        SeverityTier::FinalWarning
    );
    assert_eq!(
        SeverityTier::from_crossed(&[9.0, 12.0, 15.0]),
        SeverityTier::Termination
    );
    assert!(!SeverityTier::Informational.is_high_priority());
    assert!(SeverityTier::FinalWarning.is_high_priority());
}
