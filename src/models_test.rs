use super::*;
use serde_json::json;

#[test]
fn case_type_parse_loose_ignores_case_and_whitespace() {
    assert_eq!(CaseType::parse_loose("happy"), Some(CaseType::Happy));
    assert_eq!(CaseType::parse_loose("  Negative "), Some(CaseType::Negative));
    assert_eq!(CaseType::parse_loose("EDGE"), Some(CaseType::Edge));
    assert_eq!(CaseType::parse_loose("sad"), None);
    assert_eq!(CaseType::parse_loose(""), None);
}

#[test]
fn test_case_uses_type_key_and_camel_case() {
    let case = TestCase {
        id: "TC_1".into(),
        kind: CaseType::Edge,
        title: "Expired coupon".into(),
        steps: vec!["Enter EXPIRED10".into()],
        expected: "Rejected".into(),
        sample_payload: Map::new(),
    };
    let value = serde_json::to_value(&case).unwrap();
    assert_eq!(value["type"], "edge");
    assert!(value.get("samplePayload").is_some());
    assert!(value.get("kind").is_none());
}

#[test]
fn test_case_sample_payload_defaults_to_empty() {
    let case: TestCase = serde_json::from_value(json!({
        "id": "TC_2",
        "type": "happy",
        "title": "Valid coupon",
        "steps": ["Enter SAVE10"],
        "expected": "Discount applied"
    }))
    .unwrap();
    assert!(case.sample_payload.is_empty());
}

#[test]
fn test_case_rejects_unknown_type() {
    let result = serde_json::from_value::<TestCase>(json!({
        "id": "TC_3",
        "type": "smoke",
        "title": "t",
        "steps": ["s"],
        "expected": "e"
    }));
    assert!(result.is_err());
}

#[test]
fn suite_serializes_timestamps_as_rfc3339() {
    let suite = TestSuite {
        id: Uuid::nil(),
        project_id: Uuid::nil(),
        feature_id: None,
        name: "Apply coupon".into(),
        feature_name: "Apply coupon".into(),
        description: "d".into(),
        created_at: OffsetDateTime::UNIX_EPOCH,
        test_cases: Vec::new(),
        last_feedback_score: None,
        last_feedback_summary: None,
        last_reviewed_at: None,
    };
    let value = serde_json::to_value(&suite).unwrap();
    assert_eq!(value["createdAt"], "1970-01-01T00:00:00Z");
    assert!(value["lastReviewedAt"].is_null());
    assert_eq!(value["featureName"], "Apply coupon");
}

#[test]
fn feedback_stamp_copies_score_and_summary() {
    let result = FeedbackResult {
        score: 72.0,
        summary: "Decent".into(),
        missing_areas: vec![],
        suggestions: vec![],
        suggested_test_cases: vec![],
    };
    let stamp = result.stamp(OffsetDateTime::UNIX_EPOCH);
    assert!((stamp.score - 72.0).abs() < f64::EPSILON);
    assert_eq!(stamp.summary, "Decent");
    assert_eq!(stamp.reviewed_at, OffsetDateTime::UNIX_EPOCH);
}
