use crate::catalog::*;

#[test]
fn directional_headers_need_a_direction_or_a_bare_line() {
    let m = match_header_at("graph TD\nA-->B").unwrap();
    assert_eq!(m.kind(), DiagramKind::Flowchart);
    assert_eq!(m.len, "graph TD".len());

    assert_eq!(match_header_at("graph").unwrap().len, 5);
    assert_eq!(match_header_at("flowchart LR;").unwrap().len, "flowchart LR".len());
    assert!(match_header_at("graph theory is fun").is_none());
    assert!(match_header_at("graphTD").is_none());
}

#[test]
fn keyword_must_end_at_whitespace() {
    assert!(match_header_at("sequenceDiagramX").is_none());
    assert_eq!(
        match_header_at("sequenceDiagram\n").map(|m| m.kind()),
        Some(DiagramKind::Sequence)
    );
    assert_eq!(
        match_header_at("stateDiagram-v2").map(|m| m.kind()),
        Some(DiagramKind::State)
    );
    assert_eq!(
        match_header_at("flowchart-elk TB").map(|m| m.kind()),
        Some(DiagramKind::Flowchart)
    );
    assert_eq!(
        match_header_at("gitGraph LR:").map(|m| m.kind()),
        Some(DiagramKind::GitGraph)
    );
}

#[test]
fn header_line_ignores_indentation() {
    assert_eq!(
        match_header_line("   erDiagram").map(|m| m.kind()),
        Some(DiagramKind::Er)
    );
    assert_eq!(detect_kind("prose\n  classDiagram\n"), Some(DiagramKind::Class));
    assert_eq!(detect_kind("no header here"), None);
}

#[test]
fn families_and_block_markers() {
    assert_eq!(DiagramKind::Sequence.family(), DiagramFamily::MessageExchange);
    assert_eq!(DiagramKind::Gantt.family(), DiagramFamily::Other);
    assert_eq!(DiagramFamily::of(None), DiagramFamily::Unknown);

    assert_eq!(block_opener("  loop Every minute", DiagramFamily::MessageExchange), Some("loop"));
    assert_eq!(block_opener("  loop Every minute", DiagramFamily::Flow), None);
    assert_eq!(block_opener("subgraph A", DiagramFamily::Unknown), Some("subgraph"));
    assert_eq!(block_opener("loopy", DiagramFamily::MessageExchange), None);
    assert!(is_block_end("   end  "));
    assert!(!is_block_end("end A"));

    let text = "sequenceDiagram\nloop x\nalt y\nend\nend\nend";
    assert_eq!(block_balance(text, DiagramFamily::MessageExchange), (2, 3));
}

#[test]
fn kind_names() {
    assert_eq!(DiagramKind::Er.as_str(), "er");
    assert_eq!(DiagramKind::GitGraph.as_str(), "gitGraph");
    assert_eq!(
        serde_json::to_value(DiagramKind::QuadrantChart).unwrap(),
        serde_json::json!("quadrantChart")
    );
}

#[test]
fn plain_word_keywords_followed_by_a_statement_are_node_ids() {
    assert!(match_header_at("requirement --> design").is_none());
    assert!(match_header_at("timeline --> build").is_none());
    assert!(match_header_at("journey : map it").is_none());
    assert!(match_header_at("gantt [Plan]").is_none());
    assert_eq!(
        match_header_at("timeline\n    title History").map(|m| m.kind()),
        Some(DiagramKind::Timeline)
    );
    assert_eq!(
        match_header_at("pie title Pets").map(|m| m.kind()),
        Some(DiagramKind::Pie)
    );
    assert_eq!(
        match_header_at("stateDiagram-v2 [*] --> Idle").map(|m| m.kind()),
        Some(DiagramKind::State)
    );
}

#[test]
fn block_grids_close_groups_with_end() {
    assert_eq!(DiagramKind::Block.family(), DiagramFamily::Block);
    assert_eq!(block_opener("block:group1:2", DiagramFamily::Block), Some("block"));
    assert_eq!(block_opener("  block", DiagramFamily::Block), Some("block"));
    assert_eq!(block_opener("block-beta", DiagramFamily::Block), None);
    assert_eq!(block_opener("block:group1", DiagramFamily::Flow), None);
    assert!(DiagramFamily::Block.has_blocks());
    assert!(!DiagramFamily::Other.has_blocks());
}

#[test]
fn scanner_ignores_bare_keywords_inside_open_blocks() {
    let mut scanner = HeaderScanner::new();
    let lines = [
        "graph TD",
        "subgraph Phase",
        "timeline",
        "end",
        "sequenceDiagram",
        "loop retry",
        "graph LR",
    ];
    let kinds: Vec<Option<DiagramKind>> = lines
        .iter()
        .map(|line| scanner.line(line, match_header_line(line)).map(|m| m.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            Some(DiagramKind::Flowchart),
            None,
            None,
            None,
            Some(DiagramKind::Sequence),
            None,
            Some(DiagramKind::Flowchart),
        ]
    );
}
