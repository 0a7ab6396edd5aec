use crate::*;
use serde_json::json;

#[test]
fn partial_json_keeps_defaults() {
    let opts = RepairOptions::from_json_str(r#"{ "labelMergeSpan": 2 }"#).unwrap();
    assert_eq!(opts.label_merge_span, 2);
    assert_eq!(opts.min_length, 10);
    assert_eq!(opts.max_passes, 8);
    assert_eq!(opts.fence_languages, vec!["mermaid".to_string()]);
    assert_eq!(opts.naming, NamingMode::Positional);
}

#[test]
fn invalid_json_is_reported() {
    let err = RepairOptions::from_json_str("{ nope").unwrap_err();
    assert!(matches!(err, Error::InvalidOptionsJson { .. }));
    assert!(err.to_string().starts_with("Invalid repair options JSON"));
}

#[test]
fn out_of_range_values_are_rejected() {
    let err = RepairOptions::default()
        .with_overrides(&json!({ "maxPasses": 0 }))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid repair option `maxPasses`: must be at least 1"
    );

    let err = RepairOptions::from_json_str(r#"{ "lineBreak": "a\nb" }"#).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidOption {
            option: "lineBreak",
            ..
        }
    ));

    let opts = RepairOptions {
        max_rule_iterations: 0,
        ..RepairOptions::default()
    };
    assert!(Repairer::with_options(opts).is_err());
}

#[test]
fn overrides_layer_over_existing_options() {
    let repairer = Repairer::new()
        .with_overrides(&json!({ "naming": "headings", "fenceLanguages": ["mmd"] }))
        .unwrap();
    assert_eq!(repairer.options().naming, NamingMode::Headings);
    assert_eq!(repairer.options().fence_languages, vec!["mmd".to_string()]);
    assert_eq!(repairer.options().line_break, "<br/>");
}

#[test]
fn options_serialize_camel_case() {
    let value = serde_json::to_value(RepairOptions::default()).unwrap();
    assert_eq!(value["minLength"], json!(10));
    assert_eq!(value["stripListMarkers"], json!(true));
    assert_eq!(value["naming"], json!("positional"));
}
