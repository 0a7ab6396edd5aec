use crate::extract::{compact_token, kebab_slug, split_blocks};
use crate::*;
use serde_json::json;

#[test]
fn noise_yields_an_empty_set() {
    assert!(parse_diagrams("").is_empty());
    assert!(parse_diagrams("just some prose").is_empty());
    assert!(parse_diagrams("```python\nprint('hello world')\n```").is_empty());
}

#[test]
fn two_fences_are_named_positionally() {
    let text = "Intro text.\n\n```mermaid\ngraph TD\n    A --> B\n```\n\nSome prose in between.\n\n```mermaid\nsequenceDiagram\n    Alice->>Bob: Hello\n```\n";
    let set = parse_diagrams(text);
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["diagram1", "diagram2"]);
    assert_eq!(set.get("diagram1"), Some("graph TD\n    A --> B"));
    assert_eq!(set.get("diagram2"), Some("sequenceDiagram\n    Alice->>Bob: Hello"));

    let first = set.diagram("diagram1").unwrap();
    assert_eq!(first.kind, Some(DiagramKind::Flowchart));
    assert!(first.verdict.is_valid);
}

#[test]
fn fenced_blocks_are_repaired() {
    let text = "```mermaid\nsequenceDiagram\n1. participant Client\n2. participant API\n3. API-->>Client: 401 Unauthorized\n```";
    let set = parse_diagrams(text);
    assert_eq!(
        set.get("diagram1"),
        Some("sequenceDiagram\nparticipant Client\nparticipant API\nAPI-->>Client: \"401 Unauthorized\"")
    );
}

#[test]
fn short_blocks_are_dropped() {
    let text = "```mermaid\ngraph TD\n    A --> B\n```\n\n```mermaid\npie\n```\n";
    let set = parse_diagrams(text);
    assert_eq!(set.len(), 1);
    assert!(set.get("diagram1").is_some());
}

#[test]
fn unterminated_fence_runs_to_end() {
    let set = parse_diagrams("Here:\n```mermaid\ngraph TD\nA-->B");
    assert_eq!(set.get("diagram1"), Some("graph TD\nA --> B"));
}

#[test]
fn keyword_tagged_fence_gets_its_header() {
    let set = parse_diagrams("~~~sequenceDiagram\nAlice->>Bob: Hello there\n~~~\n");
    assert_eq!(
        set.get("diagram1"),
        Some("sequenceDiagram\nAlice->>Bob: Hello there")
    );
    assert_eq!(set.diagram("diagram1").unwrap().kind, Some(DiagramKind::Sequence));
}

#[test]
fn raw_blocks_take_names_from_headings_and_comments() {
    let text = "## Login Flow\n\ngraph TD\nA --> B\n\n## Data\n\nsequenceDiagram\nAlice->>Bob: Hi there\n";
    let set = parse_diagrams(text);
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["loginflow", "data"]);
    assert_eq!(set.get("loginflow"), Some("graph TD\nA --> B"));
    assert_eq!(set.get("data"), Some("sequenceDiagram\nAlice->>Bob: Hi there"));

    let set = parse_diagrams("graph TD\n%% Checkout process\nA --> B");
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["checkoutprocess"]);
}

#[test]
fn raw_split_ignores_headers_inside_code_fences() {
    let text = "```python\ngraph TD = build()\n```\n\ngraph LR\nA --> B\n";
    let blocks = split_blocks(text, &RepairOptions::default());
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text, "graph LR\nA --> B");
    assert_eq!(&text[blocks[0].span.clone()], "graph LR\nA --> B");

    let set = parse_diagrams(text);
    assert_eq!(set.get("diagram1"), Some("graph LR\nA --> B"));
}

#[test]
fn glued_diagrams_are_split_apart() {
    let text = "graph TD\nsubgraph S\nA --> B\nendsequenceDiagram\nAlice->>Bob: Hello";
    let blocks = split_blocks(text, &RepairOptions::default());
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].kind, Some(DiagramKind::Flowchart));
    assert_eq!(blocks[1].kind, Some(DiagramKind::Sequence));
    assert!(blocks[0].text.ends_with("end"));

    let set = parse_diagrams(text);
    assert_eq!(set.len(), 2);
    assert_eq!(set.get("diagram1"), Some("graph TD\nsubgraph S\nA --> B\nend"));
}

#[test]
fn keyword_node_ids_do_not_start_new_diagrams() {
    let text = "graph TD\nsubgraph Phase\nrequirement --> design\ndesign --> build\nend";
    let set = parse_diagrams(text);
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["diagram1"]);
    assert_eq!(set.get("diagram1"), Some(text));

    let text = "graph TD\nsubgraph Phase\ntimeline\nend\n\ntimeline\n    title History\n    2024 : Launch";
    let blocks = split_blocks(text, &RepairOptions::default());
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].kind, Some(DiagramKind::Timeline));
}

#[test]
fn colliding_names_get_suffixes() {
    let text = "# Flow\n\n```mermaid\ngraph TD\nA --> B\n```\n\n```mermaid\ngraph LR\nC --> D\n```\n";
    let repairer = Repairer::new()
        .with_overrides(&json!({ "naming": "headings" }))
        .unwrap();
    let set = repairer.parse_diagrams(text);
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["flow", "flow-2"]);
}

#[test]
fn heading_naming_falls_back_to_positions() {
    let text = "```mermaid\ngraph TD\nA --> B\n```\n\n## 2. User Login Flow\n\n```mermaid\ngraph LR\nC --> D\n```\n";
    let repairer = Repairer::new()
        .with_overrides(&json!({ "naming": "headings" }))
        .unwrap();
    let set = repairer.parse_diagrams(text);
    assert_eq!(
        set.names().collect::<Vec<_>>(),
        vec!["diagram1", "user-login-flow"]
    );
}

#[test]
fn whole_input_fallback_when_no_block_survives() {
    let text = "```mermaid\ngraph\n```\nA-->B and a longer tail";
    let set = parse_diagrams(text);
    assert_eq!(set.len(), 1);
    let only = set.get("diagram1").unwrap();
    assert!(only.starts_with("graph\n"));
    assert!(!only.contains("```"));
}

#[test]
fn name_helpers() {
    assert_eq!(compact_token("User Login Flow!"), "userloginflow");
    assert_eq!(kebab_slug("1. User  Login / Flow"), "user-login-flow");
    assert_eq!(kebab_slug("Überblick"), "überblick");
}

#[test]
fn fix_in_place_keeps_surrounding_text() {
    let text = "Look:\n```mermaid\ngraph TD\nA-->B\n```\nDone.";
    let fixed = extract_and_fix(text);
    assert_eq!(fixed.content, "Look:\n```mermaid\ngraph TD\nA --> B\n```\nDone.");
    assert_eq!(fixed.diagrams.len(), 1);

    let fixed = extract_and_fix("```mermaid\ngraph TD\nA-->B");
    assert_eq!(fixed.content, "```mermaid\ngraph TD\nA --> B\n```\n");

    let fixed = extract_and_fix("Intro\n\ngraph TD\nA-->B\n");
    assert_eq!(fixed.content, "Intro\n\ngraph TD\nA --> B\n");

    let fixed = extract_and_fix("nothing here");
    assert_eq!(fixed.content, "nothing here");
    assert!(fixed.diagrams.is_empty());
}

#[test]
fn set_serializes_in_source_order() {
    let set = parse_diagrams("```mermaid\ngraph TD\n    A --> B\n```");
    assert_eq!(
        serde_json::to_value(&set).unwrap(),
        json!({
            "diagram1": {
                "kind": "flowchart",
                "text": "graph TD\n    A --> B",
                "verdict": { "isValid": true }
            }
        })
    );
    let map = set.into_text_map();
    assert_eq!(map.get("diagram1").map(String::as_str), Some("graph TD\n    A --> B"));
}
