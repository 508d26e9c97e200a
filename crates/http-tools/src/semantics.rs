//! HTTP method semantics → MCP `ToolAnnotations`.

use reqwest::Method;
use rmcp::model::ToolAnnotations;

/// RFC 9110-style properties of an HTTP method. `None` means "do not guess".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSemantics {
    pub read_only: Option<bool>,
    pub destructive: Option<bool>,
    pub idempotent: Option<bool>,
}

impl MethodSemantics {
    #[must_use]
    pub fn of(method: &Method) -> Self {
        let (read_only, destructive, idempotent) = match *method {
            Method::GET | Method::HEAD | Method::OPTIONS => (Some(true), Some(false), Some(true)),
            Method::POST => (Some(false), Some(false), Some(false)),
            Method::PUT | Method::DELETE => (Some(false), Some(true), Some(true)),
            // PATCH may or may not be idempotent.
            Method::PATCH => (Some(false), Some(true), None),
            _ => (None, None, None),
        };
        Self {
            read_only,
            destructive,
            idempotent,
        }
    }

    /// Build annotations. HTTP tools always interact with an external system, so
    /// `openWorldHint` is set for every method.
    #[must_use]
    pub fn annotations(self, title: Option<String>) -> ToolAnnotations {
        ToolAnnotations {
            title,
            read_only_hint: self.read_only,
            destructive_hint: self.destructive,
            idempotent_hint: self.idempotent,
            open_world_hint: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_method_is_open_world() {
        let custom: Method = "PROPFIND".parse().expect("valid method token");
        for m in [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            custom,
        ] {
            assert_eq!(MethodSemantics::of(&m).annotations(None).open_world_hint, Some(true));
        }
    }

    #[test]
    fn get_is_readonly_and_delete_is_destructive() {
        let get = MethodSemantics::of(&Method::GET);
        assert_eq!(get.read_only, Some(true));
        assert_eq!(get.idempotent, Some(true));

        let delete = MethodSemantics::of(&Method::DELETE);
        assert_eq!(delete.read_only, Some(false));
        assert_eq!(delete.destructive, Some(true));
    }

    #[test]
    fn patch_and_unknown_methods_leave_hints_unset() {
        assert_eq!(MethodSemantics::of(&Method::PATCH).idempotent, None);

        let custom: Method = "PROPFIND".parse().expect("valid method token");
        let a = MethodSemantics::of(&custom).annotations(None);
        assert_eq!(a.read_only_hint, None);
        assert_eq!(a.destructive_hint, None);
        assert_eq!(a.idempotent_hint, None);
    }

    #[test]
    fn title_is_carried_through() {
        let a = MethodSemantics::of(&Method::POST).annotations(Some("Ban".to_string()));
        assert_eq!(a.title.as_deref(), Some("Ban"));
    }
}
