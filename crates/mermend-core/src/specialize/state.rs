use std::sync::OnceLock;

use regex::Regex;

use super::{is_quoted, quote};
use crate::normalize::changed;

fn transition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)(\S+)\s*-->\s*([^\s:]+)\s*:\s*(.+?)\s*$").expect("valid regex")
    })
}

/// `Idle --> Busy : user clicks` becomes `Idle --> Busy : "user clicks"`.
pub fn quote_transition_labels(text: &str) -> Option<String> {
    let out = text
        .split('\n')
        .map(|line| {
            let Some(caps) = transition_re().captures(line) else {
                return line.to_string();
            };
            let label = &caps[4];
            if is_quoted(label) || !label.contains(char::is_whitespace) {
                return line.to_string();
            }
            format!("{}{} --> {} : {}", &caps[1], &caps[2], &caps[3], quote(label))
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}
