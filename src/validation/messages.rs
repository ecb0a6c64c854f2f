//! Human-readable rewrites of raw schema violations.
//!
//! Each raw violation carries a keyword location (which schema rule failed),
//! a terse machine message, and an instance location (which value failed).
//! [`format_violation`] dispatches on the final keyword segment and returns
//! the sentence a user should read. Every function here is pure.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ActionKind;

// ============================================================================
// ACTION SELECTION
// ============================================================================

/// "a, b, ..., or z" over every action name, in canonical order.
pub static ACTION_LIST: Lazy<String> = Lazy::new(|| {
    let names: Vec<&str> = ActionKind::ALL.iter().map(ActionKind::as_str).collect();
    match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, or {}", rest.join(", "), last),
        Some((last, _)) => last.to_string(),
        None => String::new(),
    }
});

pub fn no_action_message() -> String {
    format!(
        "Step has no action. Each step must have exactly ONE of: {}.",
        *ACTION_LIST
    )
}

pub fn multiple_actions_message() -> String {
    format!(
        "Step has multiple actions. Only ONE action is allowed per step. Choose either: {}.",
        *ACTION_LIST
    )
}

pub fn ambiguous_action_message() -> String {
    format!("Step must have exactly one action ({}).", *ACTION_LIST)
}

// ============================================================================
// FIXED SENTENCES
// ============================================================================

pub const MISSING_REQUIRED_FIELD: &str = "Missing required field";
pub const UNKNOWN_FIELD: &str = "Unknown field found. Check for typos or unsupported fields";
pub const INVALID_FORMAT: &str = "Invalid format. Check the value syntax";
pub const INVALID_FILE_MODE: &str =
    "Invalid file mode. Must be in octal format: '0' followed by 3 octal digits (e.g., '0644', '0755')";
pub const INVALID_FILE_STATE: &str = "Invalid file state. Must be one of: 'file', 'directory', 'absent', 'touch', 'link', 'hardlink', or 'perms'";
pub const INVALID_SHELL_FORMAT: &str = "Invalid shell command format";
pub const INVALID_PATH_FORMAT: &str = "Invalid path format. Check for proper file path syntax";
pub const INVALID_DURATION: &str =
    "Invalid duration. Use a number followed by a unit: ns, us, ms, s, m, or h (e.g., '30s', '5m')";
pub const TOO_FEW_ITEMS: &str = "List must have at least the minimum number of items";
pub const TOO_MANY_ITEMS: &str = "List has too many items. Reduce the number of items";
pub const DUPLICATE_ITEMS: &str = "List contains duplicate items. Each item must be unique";

// ============================================================================
// DISPATCH
// ============================================================================

/// Formats one raw violation. Returns an empty string for `oneOf`, whose
/// message is decided from the shape of the whole step instead.
pub fn format_violation(keyword_location: &str, message: &str, instance_location: &str) -> String {
    match keyword_of(keyword_location) {
        "required" => format_required_error(message),
        "additionalProperties" => format_additional_properties_error(message),
        "type" => format_type_error(message),
        "enum" => format_enum_error(message, instance_location),
        "pattern" => format_pattern_error(message, instance_location),
        "oneOf" => String::new(),
        "minLength" => format_min_length_error(message),
        "maxLength" => format_max_length_error(message),
        "minimum" => format_minimum_error(message),
        "maximum" => format_maximum_error(message),
        "format" => format_format_error(message),
        "minItems" => TOO_FEW_ITEMS.to_string(),
        "maxItems" => TOO_MANY_ITEMS.to_string(),
        "uniqueItems" => DUPLICATE_ITEMS.to_string(),
        _ => capitalize(message),
    }
}

/// The last segment of a keyword location.
pub fn keyword_of(keyword_location: &str) -> &str {
    keyword_location.rsplit('/').next().unwrap_or_default()
}

// ============================================================================
// PER-KEYWORD FORMATTERS
// ============================================================================

pub fn format_required_error(message: &str) -> String {
    let Some(field) = quoted_name(message) else {
        return MISSING_REQUIRED_FIELD.to_string();
    };
    match field {
        "src" => "Missing required field 'src'. Template needs a source file path (e.g., src: ./template.j2)".to_string(),
        "dest" => "Missing required field 'dest'. Template needs a destination path (e.g., dest: /etc/config.conf)".to_string(),
        "path" => "Missing required field 'path'. File action needs a file or directory path (e.g., path: /tmp/myfile)".to_string(),
        "shell" => "Missing required field 'shell'. Provide a shell command to execute".to_string(),
        "template" => "Missing required field 'template'. Provide template configuration with src and dest".to_string(),
        "file" => "Missing required field 'file'. Provide file configuration with path".to_string(),
        other => format!("Missing required field '{other}'. This field must be specified"),
    }
}

pub fn format_additional_properties_error(message: &str) -> String {
    let Some(field) = quoted_name(message) else {
        return UNKNOWN_FIELD.to_string();
    };
    match suggestion_for(&field.to_lowercase()) {
        Some(hint) => format!("Unknown field '{field}'. {hint}"),
        None => format!("Unknown field '{field}'. Check spelling or remove this field"),
    }
}

fn suggestion_for(field: &str) -> Option<&'static str> {
    let hint = match field {
        "command" | "cmd" | "run" | "execute" => "Did you mean 'shell'?",
        "source" => "Did you mean 'src'?",
        "destination" | "target" | "output" => "Did you mean 'dest'?",
        "directory" | "folder" => "Did you mean 'state: directory' under 'file'?",
        "condition" | "if" => "Did you mean 'when'?",
        "sudo" => "Did you mean 'become'?",
        "root" => "Did you mean 'become: true'?",
        "tag" => "Did you mean 'tags'?",
        "loop" => "Did you mean 'with_items' or 'with_filetree'?",
        "foreach" => "Did you mean 'with_items'?",
        "var" | "variables" | "variable" => "Did you mean 'vars'?",
        _ => return None,
    };
    Some(hint)
}

pub fn format_type_error(message: &str) -> String {
    if message.contains("expected string") {
        let sentence = if message.contains("got number") {
            "Expected text value, but got a number. Wrap it in quotes (e.g., \"123\" instead of 123)"
        } else if message.contains("got boolean") {
            "Expected text value, but got true/false. Wrap it in quotes if intended as text"
        } else if message.contains("got object") {
            "Expected text value, but got an object/map. Check field structure"
        } else if message.contains("got array") {
            "Expected text value, but got a list. Check field structure"
        } else {
            "Expected text value (string), but got a different type"
        };
        return sentence.to_string();
    }
    if message.contains("expected boolean") {
        return "Expected true or false (boolean), not text or number".to_string();
    }
    if message.contains("expected object") {
        return "Expected an object with fields (like 'path:', 'state:'), but got a simple value"
            .to_string();
    }
    if message.contains("expected array") {
        return "Expected a list of items, but got a single value".to_string();
    }
    if message.contains("expected number") || message.contains("expected integer") {
        return "Expected a number, but got text or another type".to_string();
    }
    message.replacen("expected", "Expected", 1)
}

pub fn format_enum_error(message: &str, instance_location: &str) -> String {
    if instance_location.contains("/file/state") {
        return INVALID_FILE_STATE.to_string();
    }
    message.replacen("value must be one of", "Invalid value. Must be one of", 1)
}

pub fn format_pattern_error(message: &str, instance_location: &str) -> String {
    if instance_location.contains("/mode") {
        return INVALID_FILE_MODE.to_string();
    }
    if instance_location.ends_with("/timeout") || instance_location.ends_with("/retry_delay") {
        return INVALID_DURATION.to_string();
    }
    if instance_location.contains("/shell") {
        return INVALID_SHELL_FORMAT.to_string();
    }
    if ["/path", "/src", "/dest"]
        .iter()
        .any(|field| instance_location.contains(field))
    {
        return INVALID_PATH_FORMAT.to_string();
    }
    if message.contains("does not match pattern") {
        return INVALID_FORMAT.to_string();
    }
    message.to_string()
}

pub fn format_format_error(message: &str) -> String {
    let sentence = if message.contains("email") {
        "Invalid email format. Must be like: user@example.com"
    } else if message.contains("uri") || message.contains("url") {
        "Invalid URL format. Must be like: https://example.com/path"
    } else if message.contains("date") {
        "Invalid date format. Check date syntax"
    } else if message.contains("time") {
        "Invalid time format. Check time syntax"
    } else if message.contains("ipv4") {
        "Invalid IPv4 address. Must be like: 192.168.1.1"
    } else if message.contains("ipv6") {
        "Invalid IPv6 address format"
    } else if message.contains("hostname") {
        "Invalid hostname. Must be like: example.com"
    } else {
        INVALID_FORMAT
    };
    sentence.to_string()
}

pub fn format_min_length_error(message: &str) -> String {
    match bound_of(message) {
        Some(limit) => format!("Value is too short. Must be at least {limit} characters"),
        None => "Value is too short. Increase the length".to_string(),
    }
}

pub fn format_max_length_error(message: &str) -> String {
    match bound_of(message) {
        Some(limit) => format!("Value is too long. Must be at most {limit} characters"),
        None => "Value is too long. Reduce the length".to_string(),
    }
}

pub fn format_minimum_error(message: &str) -> String {
    match bound_of(message) {
        Some(limit) => format!("Value is too small. Must be at least {limit}"),
        None => "Value is too small. Increase the number".to_string(),
    }
}

pub fn format_maximum_error(message: &str) -> String {
    match bound_of(message) {
        Some(limit) => format!("Value is too large. Must be at most {limit}"),
        None => "Value is too large. Reduce the number".to_string(),
    }
}

// ============================================================================
// HELPERS
// ============================================================================

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).unwrap());

static BOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"must be [<>]=? ?(-?[0-9][0-9.eE+-]*)").unwrap());

/// The first single- or double-quoted name in `message`.
fn quoted_name(message: &str) -> Option<&str> {
    let captures = QUOTED.captures(message)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str())
}

/// The numeric bound from a `must be >= N` style message.
fn bound_of(message: &str) -> Option<&str> {
    BOUND
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches([',', '.']))
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_list() {
        assert!(ACTION_LIST.starts_with("shell, template, file, file_replace, copy,"));
        assert!(ACTION_LIST.ends_with("repo_search, or repo_tree"));
    }

    #[test]
    fn test_canonical_union_sentences() {
        assert_eq!(
            no_action_message(),
            "Step has no action. Each step must have exactly ONE of: shell, template, file, file_replace, copy, service, assert, preset, print, include, include_vars, vars, repo_search, or repo_tree."
        );
        assert_eq!(
            multiple_actions_message(),
            "Step has multiple actions. Only ONE action is allowed per step. Choose either: shell, template, file, file_replace, copy, service, assert, preset, print, include, include_vars, vars, repo_search, or repo_tree."
        );
        assert!(ambiguous_action_message().starts_with("Step must have exactly one action (shell,"));
    }

    #[test]
    fn test_keyword_of() {
        assert_eq!(keyword_of("/items/properties/file/properties/mode/pattern"), "pattern");
        assert_eq!(keyword_of("required"), "required");
        assert_eq!(keyword_of(""), "");
    }

    #[test]
    fn test_dispatch_one_of_is_empty() {
        assert_eq!(format_violation("/items/oneOf", "anything", "/0"), "");
    }

    #[test]
    fn test_dispatch_default_capitalizes() {
        assert_eq!(format_violation("/items/const", "value is wrong", "/0"), "Value is wrong");
    }
}
