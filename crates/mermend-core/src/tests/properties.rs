use crate::catalog::{self, DiagramFamily};
use crate::*;
use proptest::prelude::*;

const MESSY: &[&str] = &[
    "graph TD; A-->B; B-->C",
    "graph TD\nA[Validate user\ncredentials] --> B",
    "graph TD\nA[Validate user]\ncredentials] --> B",
    "graph TD\nsubgraph User Services\nA-->B",
    "graph TD\nA[Start\nB --> C\nend\nend",
    "\u{feff}flowchart LR\r\n1. A-->B\r\n2. B-->C\r\n",
    "sequenceDiagram participant A participant B A->>B: Hello there B-->>A: Hi",
    "sequenceDiagram\n1. participant Client\n2. participant API\n3. API-->>Client: 401 Unauthorized",
    "sequenceDiagram\n    loop Every minute\n        A->>B: ping",
    "erDiagram\nCUSTOMER { string name PK string email }",
    "erDiagram CUSTOMER ||--o{ ORDER : places ORDER ||--|{ LINE : contains",
    "classDiagram\nclass User {\n    + foo ( a:int,b : str ) : bool\n    +name : String\n}",
    "stateDiagram-v2 [*] --> Still Still --> Moving : push Moving --> [*]",
    "graph TD\nsubgraph A\nX-->Y\nendclassDiagram\nclass Foo",
    "graph TD\nA[Grüße\nB --> C",
    "graph TD\nA`Code Commit` --> B[`Build`]",
    "erDiagram\nCUSTOMER ||--o{ ORDER : \"places\nORDER ||--|{ LINE : line items",
];

const GARBAGE: &[&str] = &[
    "",
    "\n\n\n",
    "end end end",
    "}}}}{{{{",
    "subgraph",
    "```",
    "\u{feff}",
    "graph TD\n\"\"\"",
    "erDiagram\nA {",
    "erDiagram\nA {\nB {\n}",
    "classDiagram\nclass X {",
    "sequenceDiagram\nend\nend\nloop",
    "graph TD\nA -->\n-->\n-->",
    "graph TD\n[[[[(((({{{{",
    "stateDiagram\n-->:::",
    "ü[é\n(ß]",
    "erDiagram\n\"\n\"\n:",
    "graph TD\n``\n`",
];

/// Fragments of diagram syntax, glued together at random.
const TOKENS: &[&str] = &[
    "graph TD",
    "flowchart LR",
    "sequenceDiagram",
    "erDiagram",
    "classDiagram",
    "stateDiagram-v2",
    "block-beta",
    "timeline",
    "requirement",
    "subgraph",
    "end",
    "loop",
    "alt",
    "else",
    "break",
    "box",
    "Note over A",
    "participant",
    "A",
    "B",
    "x y",
    "-->",
    "->>",
    "-->>",
    "||--o{",
    ":",
    ";",
    "[",
    "]",
    "(",
    ")",
    "{",
    "}",
    "\"",
    "`",
    "|",
    "<br/>",
    "1.",
    "-",
    "%%",
    "A-->B",
    "A[Label",
    "text]",
    "block:g",
    "ü",
];

fn token_soup() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        (
            prop::sample::select(TOKENS),
            prop_oneof![Just(" "), Just(""), Just("\n")],
        ),
        0..40,
    )
    .prop_map(|parts| {
        parts
            .into_iter()
            .map(|(token, sep)| format!("{token}{sep}"))
            .collect::<String>()
    })
}

const FLOW_LINES: &[&str] = &[
    "subgraph S",
    "subgraph T[Team]",
    "end",
    "  end",
    "A --> B",
    "C[Label]",
];

const PATHOLOGICAL: &[&str] = &[
    "[",
    "(",
    "\"",
    "`",
    "graph TD\n",
    "graph TD; A-->B; ",
    "end\n",
    "subgraph S\n",
    "loop\n",
    "A-->",
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn normalize_is_idempotent(text in token_soup()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn repair_is_idempotent(text in token_soup()) {
        let once = repair(&text);
        prop_assert_eq!(repair(&once), once);
    }

    #[test]
    fn valid_verdict_means_balanced_brackets(text in token_soup()) {
        let out = repair(&text);
        if validate(&out).is_valid {
            prop_assert_eq!(out.matches('[').count(), out.matches(']').count());
        }
    }

    #[test]
    fn normalize_never_leaves_orphaned_ends(
        lines in proptest::collection::vec(prop::sample::select(FLOW_LINES), 0..16)
    ) {
        let text = format!("graph TD\n{}", lines.join("\n"));
        let out = normalize(&text);
        let (open, close) = catalog::block_balance(&out, DiagramFamily::Flow);
        prop_assert!(close <= open, "{}", out);
    }

    #[test]
    fn extraction_never_panics(text in token_soup()) {
        let _ = has_diagram_content(&text);
        let _ = parse_diagrams(&text);
        let _ = extract_and_fix(&text);
        let _ = validate(&text);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn repeated_fragments_terminate(
        fragment in prop::sample::select(PATHOLOGICAL),
        count in 1usize..2_000,
    ) {
        let _ = repair(&fragment.repeat(count));
    }
}

#[test]
fn token_soup_that_once_kept_growing_is_stable() {
    let text = "erDiagram Bend] ; -erDiagram ] \n Note over AstateDiagram-v2A{ (graph TD Note over Ax y-->alt[sequenceDiagram }[";
    let once = repair(text);
    assert_eq!(repair(&once), once);
}

#[test]
fn messy_examples_are_stable() {
    for input in MESSY {
        let once = repair(input);
        assert_eq!(repair(&once), once, "input: {input:?}");
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "input: {input:?}");
    }
}

#[test]
fn repaired_diagrams_validate() {
    for input in MESSY {
        let repaired = repair(input);
        let verdict = validate(&repaired);
        assert!(verdict.is_valid, "input: {input:?}\n{repaired}\n{verdict:?}");
    }
}

#[test]
fn garbage_never_panics() {
    for input in GARBAGE {
        let _ = repair(input);
        let _ = validate(input);
        let _ = parse_diagrams(input);
        let _ = extract_and_fix(input);
    }
}

#[test]
fn label_brackets_end_up_balanced() {
    for input in ["graph TD\nA[Start\nB --> C", "graph TD\nA[One[Two\nC --> D"] {
        let out = repair(input);
        assert_eq!(out.matches('[').count(), out.matches(']').count(), "{out}");
    }
}

#[test]
fn pathological_inputs_terminate() {
    let brackets = "[".repeat(100_000);
    let out = repair(&brackets);
    assert_eq!(out.matches(']').count(), 100_000);

    let headers = "graph TD\n".repeat(12_500);
    let out = repair(&headers);
    assert_eq!(out.lines().count(), 12_500);

    let long_line = format!("graph TD; {}", "A-->B; ".repeat(5_000));
    let out = repair(&long_line);
    assert_eq!(out.lines().count(), 5_001);
}

#[test]
fn prose_is_not_diagram_content() {
    for input in [
        "",
        "   \n\t",
        "I drew a graph of the data yesterday.",
        "graph theory is a branch of mathematics",
        "The flowchart below shows the process.",
        "```rust\nfn main() {}\n```",
        "```\nplain text\n```",
    ] {
        assert!(!has_diagram_content(input), "{input:?}");
        assert!(parse_diagrams(input).is_empty(), "{input:?}");
    }
}
