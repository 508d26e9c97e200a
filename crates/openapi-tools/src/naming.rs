//! Tool naming.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound on generated tool names.
pub const MAX_TOOL_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NameStyle {
    /// `getUsers`, `get-users` and `GetUsers` all become `get_users`.
    #[default]
    Snake,
    /// Keep the `operationId`, replacing characters outside `[A-Za-z0-9_-]`.
    OperationId,
}

impl NameStyle {
    /// Base tool name for an operation (before duplicate suffixes).
    #[must_use]
    pub fn tool_name(self, operation_id: Option<&str>, method: &str, path: &str) -> String {
        let base = operation_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| canonical_name(method, path), str::to_string);

        let styled = match self {
            NameStyle::Snake => to_snake_case(&base),
            NameStyle::OperationId => sanitize_identifier(&base),
        };

        if styled.is_empty() {
            canonical_name(method, path)
        } else {
            styled
        }
    }
}

/// `get /users/{id}` -> `get_users_id`.
#[must_use]
pub fn canonical_name(method: &str, path: &str) -> String {
    let raw = format!("{}_{}", method.to_ascii_lowercase(), path);
    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    finish(name)
}

#[must_use]
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            // `fooBar` and `HTTPStatus` both split before the word-starting capital.
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    finish(out)
}

#[must_use]
pub fn sanitize_identifier(input: &str) -> String {
    let out: String = input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut out = out.trim_matches('_').to_string();
    out.truncate(MAX_TOOL_NAME_LEN);
    out
}

/// Trim separators and cap the length. Input is ASCII by construction.
fn finish(name: String) -> String {
    let mut name = name.trim_matches('_').to_string();
    if name.len() > MAX_TOOL_NAME_LEN {
        name.truncate(MAX_TOOL_NAME_LEN);
        name = name.trim_end_matches('_').to_string();
    }
    name
}

/// Reserve `base`, or the first free `base_N`. `base` is shortened so the suffixed name stays
/// within [`MAX_TOOL_NAME_LEN`].
pub fn reserve_unique(names: &mut HashSet<String>, base: &str) -> String {
    if names.insert(base.to_string()) {
        return base.to_string();
    }
    let mut counter = 1usize;
    loop {
        let suffix = format!("_{counter}");
        let mut keep = base.len().min(MAX_TOOL_NAME_LEN.saturating_sub(suffix.len()));
        while !base.is_char_boundary(keep) {
            keep -= 1;
        }
        let candidate = format!("{}{suffix}", &base[..keep]);
        if names.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_from_paths() {
        assert_eq!(canonical_name("GET", "/users/{id}"), "get_users_id");
        assert_eq!(
            canonical_name("post", "/channels/commercial"),
            "post_channels_commercial"
        );
        assert_eq!(canonical_name("get", "/"), "get");
    }

    #[test]
    fn snake_case_variants() {
        assert_eq!(to_snake_case("getUsers"), "get_users");
        assert_eq!(to_snake_case("get-users"), "get_users");
        assert_eq!(to_snake_case("GetChannelInformation"), "get_channel_information");
        assert_eq!(to_snake_case("getHTTPStatus"), "get_http_status");
        assert_eq!(to_snake_case("get_users"), "get_users");
        assert_eq!(to_snake_case("v2Users"), "v2_users");
        assert_eq!(to_snake_case("--odd  name--"), "odd_name");
    }

    #[test]
    fn style_selects_naming() {
        assert_eq!(
            NameStyle::Snake.tool_name(Some("get-streams"), "get", "/streams"),
            "get_streams"
        );
        assert_eq!(
            NameStyle::OperationId.tool_name(Some("get-streams"), "get", "/streams"),
            "get-streams"
        );
        assert_eq!(
            NameStyle::OperationId.tool_name(Some("list users!"), "get", "/users"),
            "list_users"
        );
        assert_eq!(
            NameStyle::Snake.tool_name(None, "get", "/users/{userId}"),
            "get_users_user_id"
        );
        assert_eq!(NameStyle::Snake.tool_name(Some("  "), "get", "/x"), "get_x");
    }

    #[test]
    fn names_are_capped() {
        let long = "a".repeat(100);
        assert_eq!(to_snake_case(&long).len(), MAX_TOOL_NAME_LEN);
        assert_eq!(canonical_name("get", &format!("/{long}")).len(), MAX_TOOL_NAME_LEN);
    }

    #[test]
    fn duplicates_get_suffixes() {
        let mut names = HashSet::new();
        assert_eq!(reserve_unique(&mut names, "get_users"), "get_users");
        assert_eq!(reserve_unique(&mut names, "get_users"), "get_users_1");
        assert_eq!(reserve_unique(&mut names, "get_users"), "get_users_2");
    }

    #[test]
    fn suffixed_names_stay_within_the_cap() {
        let base = "b".repeat(MAX_TOOL_NAME_LEN);
        let mut names = HashSet::new();
        assert_eq!(reserve_unique(&mut names, &base), base);

        let first = reserve_unique(&mut names, &base);
        assert_eq!(first.len(), MAX_TOOL_NAME_LEN);
        assert!(first.ends_with("_1"));

        for _ in 0..9 {
            reserve_unique(&mut names, &base);
        }
        let eleventh = reserve_unique(&mut names, &base);
        assert_eq!(eleventh.len(), MAX_TOOL_NAME_LEN);
        assert!(eleventh.ends_with("_11"));
    }
}
