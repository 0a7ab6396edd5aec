use std::sync::OnceLock;

use regex::Regex;

use crate::normalize::{changed, indent_of};

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+\-#~])?\s*([\w$]+)\s*\(\s*([^)]*?)\s*\)\s*([$*])?\s*(?::\s*)?([^\s$*]+)?\s*([$*])?$")
            .expect("valid regex")
    })
}

fn colon_attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+\-#~])?\s*([\w$]+)\s*:\s*([\w~<>\[\]]+)\s*([$*])?$").expect("valid regex")
    })
}

fn typed_attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+\-#~])?\s*([\w~<>\[\]]+)\s+([\w$]+)\s*([$*])?$").expect("valid regex")
    })
}

fn member_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*[\w~<>-]+\s*:\s*)(\S.*)$").expect("valid regex"))
}

fn class_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*class\s+\S.*\{\s*$").expect("valid regex"))
}

/// Canonical form of one class member.
///
/// Methods become `vis name(params) Return` and typed attributes `vis Type name`; anything
/// that is not recognizably one of the two is returned unchanged.
pub(crate) fn normalize_member(member: &str) -> String {
    let member = member.trim();
    if let Some(caps) = method_re().captures(member) {
        let vis = caps.get(1).map_or("", |m| m.as_str());
        let params = caps[3]
            .split(',')
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let classifier = caps
            .get(4)
            .or_else(|| caps.get(6))
            .map_or("", |m| m.as_str());
        let mut out = format!("{vis}{}({params})", &caps[2]);
        if let Some(ret) = caps.get(5) {
            out.push(' ');
            out.push_str(ret.as_str());
        }
        out.push_str(classifier);
        return out;
    }
    if let Some(caps) = colon_attribute_re().captures(member) {
        let vis = caps.get(1).map_or("", |m| m.as_str());
        let classifier = caps.get(4).map_or("", |m| m.as_str());
        return format!("{vis}{} {}{classifier}", &caps[3], &caps[2]);
    }
    if let Some(caps) = typed_attribute_re().captures(member) {
        let vis = caps.get(1).map_or("", |m| m.as_str());
        let classifier = caps.get(4).map_or("", |m| m.as_str());
        return format!("{vis}{} {}{classifier}", &caps[2], &caps[3]);
    }
    member.to_string()
}

/// Normalizes members inside `class X { ... }` bodies and on `X : member` lines.
pub fn normalize_class_members(text: &str) -> Option<String> {
    let mut in_body = false;
    let out = text
        .split('\n')
        .map(|line| {
            if in_body {
                if line.trim() == "}" {
                    in_body = false;
                    return line.to_string();
                }
                if line.trim().is_empty() || line.trim_start().starts_with("%%") {
                    return line.to_string();
                }
                return format!("{}{}", indent_of(line), normalize_member(line));
            }
            if class_open_re().is_match(line) {
                in_body = true;
                return line.to_string();
            }
            match member_line_re().captures(line) {
                Some(caps) => format!("{}{}", &caps[1], normalize_member(&caps[2])),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    changed(text, out)
}
