use super::close_open_blocks;
use crate::catalog::DiagramFamily;

/// Appends `end` for every `subgraph` left open.
pub fn close_open_subgraphs(text: &str) -> Option<String> {
    close_open_blocks(text, DiagramFamily::Flow)
}
