use crate::specialize::{
    close_open_subgraphs, quote_message_labels, reformat_entity_blocks, repair_relationship_labels,
};
use crate::*;

#[test]
fn message_text_with_punctuation_is_quoted() {
    assert_eq!(
        quote_message_labels("API-->>Client: 401 Unauthorized"),
        Some("API-->>Client: \"401 Unauthorized\"".to_string())
    );
    assert_eq!(
        quote_message_labels("    A->>B: say \"hi\" (now)"),
        Some("    A->>B: \"say 'hi' (now)\"".to_string())
    );
    assert_eq!(quote_message_labels("A->>B: \"call f(x)\""), None);
    assert_eq!(quote_message_labels("A->>B: plain words"), None);
}

#[test]
fn participant_aliases_and_notes_are_quoted() {
    assert_eq!(
        repair("sequenceDiagram\nparticipant A as Alice Smith\nparticipant B as \"Bob\"\nA->>B: hi"),
        "sequenceDiagram\nparticipant A as \"Alice Smith\"\nparticipant B as \"Bob\"\nA->>B: hi"
    );
    assert_eq!(
        repair("sequenceDiagram\nNote over A,B: two words\nNote right of A: single\nA->>B: hi"),
        "sequenceDiagram\nNote over A,B: \"two words\"\nNote right of A: single\nA->>B: hi"
    );
}

#[test]
fn open_groups_are_closed_at_their_indentation() {
    assert_eq!(
        repair("sequenceDiagram\n    loop Every minute\n        A->>B: ping"),
        "sequenceDiagram\n    loop Every minute\n        A->>B: ping\n    end"
    );
    assert_eq!(
        repair("sequenceDiagram\nalt ok\n    loop retry\n        A->>B: again"),
        "sequenceDiagram\nalt ok\n    loop retry\n        A->>B: again\n    end\nend"
    );
}

#[test]
fn single_line_entity_block_is_expanded() {
    assert_eq!(
        repair("erDiagram\nCUSTOMER { string name PK string email }"),
        "erDiagram\nCUSTOMER {\n    string name PK\n    string email\n}"
    );
}

#[test]
fn comma_separated_attributes_get_their_own_lines() {
    assert_eq!(
        repair("erDiagram\nORDER {\n    int id PK, string note\n}"),
        "erDiagram\nORDER {\n    int id PK\n    string note\n}"
    );
}

#[test]
fn well_formed_entities_are_left_alone() {
    let text = "erDiagram\nCUSTOMER ||--o{ ORDER : places\nCUSTOMER {\n    string name\n    string id PK, FK\n}";
    assert_eq!(reformat_entity_blocks(text), None);
    assert_eq!(repair(text), text);
}

#[test]
fn broken_relationship_labels_are_requoted() {
    assert_eq!(
        repair("erDiagram\nCUSTOMER ||--o{ ORDER : \"places\nORDER ||--|{ LINE : \"\"contains\"\"\n\"\nLINE }|--|| PRODUCT : refers to"),
        "erDiagram\nCUSTOMER ||--o{ ORDER : \"places\"\nORDER ||--|{ LINE : \"contains\"\nLINE }|--|| PRODUCT : \"refers to\""
    );
    assert_eq!(repair_relationship_labels("CUSTOMER ||--o{ ORDER : places"), None);
    assert_eq!(repair_relationship_labels("CUSTOMER ||--o{ ORDER : \"places\""), None);
    assert_eq!(repair_relationship_labels("CUSTOMER ||--o{ ORDER"), None);
}

#[test]
fn class_body_members_are_canonicalized() {
    assert_eq!(
        repair("classDiagram\nclass User {\n    + foo ( a:int,b : str ) : bool\n    +name : String\n    - int id\n}"),
        "classDiagram\nclass User {\n    +foo(a:int, b : str) bool\n    +String name\n    -int id\n}"
    );
}

#[test]
fn class_member_lines_are_canonicalized() {
    assert_eq!(
        repair("classDiagram\nUser : +name : String\nUser : +login() bool"),
        "classDiagram\nUser : +String name\nUser : +login() bool"
    );
}

#[test]
fn state_transition_labels_are_quoted() {
    assert_eq!(
        repair("stateDiagram-v2\n[*] --> Idle\nIdle --> Busy : user clicks\nBusy --> Idle : done"),
        "stateDiagram-v2\n[*] --> Idle\nIdle --> Busy : \"user clicks\"\nBusy --> Idle : done"
    );
}

#[test]
fn open_subgraphs_are_closed() {
    assert_eq!(
        repair("graph TD\n    subgraph api[API]\n        A --> B"),
        "graph TD\n    subgraph api[API]\n        A --> B\n    end"
    );
    assert_eq!(
        close_open_subgraphs("graph TD\nsubgraph S\nA --> B\n\n"),
        Some("graph TD\nsubgraph S\nA --> B\nend\n\n".to_string())
    );
}

#[test]
fn each_segment_is_specialized_on_its_own() {
    assert_eq!(
        repair("graph TD\nsubgraph S\nA --> B\nsequenceDiagram\nloop x\nA->>B: hi"),
        "graph TD\nsubgraph S\nA --> B\nend\n\nsequenceDiagram\nloop x\nA->>B: hi\nend"
    );
}

#[test]
fn other_kinds_pass_through() {
    let text = "pie title Pets\n\"Dogs\" : 386\n\"Cats\" : 85";
    assert_eq!(repair(text), text);
}
