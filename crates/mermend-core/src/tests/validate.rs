use crate::*;
use serde_json::json;

fn reason(text: &str) -> Option<String> {
    validate(text).reason
}

#[test]
fn defects_are_reported_in_check_order() {
    assert_eq!(reason("graph").as_deref(), Some("too short"));
    assert_eq!(reason("hello world, nothing to see").as_deref(), Some("unrecognized type"));
    assert_eq!(reason("graph TD\nA[Start --> B").as_deref(), Some("unbalanced brackets"));
    assert_eq!(reason("graph TD\nA[\"Start] --> B").as_deref(), Some("unbalanced quotes"));
    assert_eq!(
        reason("graph TD\nsubgraph S\nA --> B").as_deref(),
        Some("mismatched block start/end (1 vs 0)")
    );
}

#[test]
fn end_lines_only_count_where_blocks_exist() {
    assert!(validate("block-beta\ncolumns 3\nblock:group1:2\n  a b\nend\nc").is_valid);
    assert_eq!(
        reason("block-beta\ncolumns 3\nblock:group1:2\n  a b").as_deref(),
        Some("mismatched block start/end (1 vs 0)")
    );
    assert!(validate("mindmap\n  root((Plan))\n    start\n    end").is_valid);
}

#[test]
fn defect_is_kept_alongside_the_reason() {
    let verdict = validate("sequenceDiagram\nA->>B: hi\nend");
    assert!(!verdict.is_valid);
    assert_eq!(
        verdict.defect,
        Some(Defect::MismatchedBlocks { open: 0, close: 1 })
    );
}

#[test]
fn sound_diagrams_pass() {
    assert_eq!(validate("%% title\ngraph TD\nA --> B"), ValidationVerdict::valid());
    assert!(validate("sequenceDiagram\nloop every minute\nA->>B: ping\nend").is_valid);
    assert!(validate("erDiagram\nCUSTOMER ||--o{ ORDER : places").is_valid);
}

#[test]
fn minimum_length_is_configurable() {
    let options = RepairOptions {
        min_length: 3,
        ..RepairOptions::default()
    };
    assert!(crate::validate::validate("pie", &options).is_valid);
    assert!(!validate("pie").is_valid);
}

#[test]
fn verdict_serializes_without_defect() {
    assert_eq!(
        serde_json::to_value(validate("graph")).unwrap(),
        json!({ "isValid": false, "reason": "too short" })
    );
    assert_eq!(
        serde_json::to_value(validate("graph TD\nA --> B")).unwrap(),
        json!({ "isValid": true })
    );
}
