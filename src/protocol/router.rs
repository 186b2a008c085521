//! Request routing
//!
//! Resolves a request target the way a browser would resolve a link
//! against `http://localhost`, then matches the single entity route.

use url::Url;

use crate::error::ProtocolError;

/// Path of the only route the server exposes
pub const ENTITY_ROUTE: &str = "/file";

/// Query parameter carrying the entity name
pub const FILENAME_PARAM: &str = "filename";

const BASE_URL: &str = "http://localhost";

/// A matched route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The entity route; `filename` is the first decoded `filename` pair
    Entity { filename: Option<String> },
}

pub fn route(target: &str) -> Result<Route, ProtocolError> {
    let base = Url::parse(BASE_URL)
        .map_err(|e| ProtocolError::Malformed(format!("bad base url: {}", e)))?;
    let url = base
        .join(target)
        .map_err(|e| ProtocolError::Malformed(format!("bad request target {:?}: {}", target, e)))?;

    if url.path() != ENTITY_ROUTE {
        return Err(ProtocolError::RouteNotFound(url.path().to_string()));
    }

    let filename = url
        .query_pairs()
        .find(|(key, _)| key == FILENAME_PARAM)
        .map(|(_, value)| value.into_owned());

    Ok(Route::Entity { filename })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filename(target: &str) -> Option<String> {
        match route(target).unwrap() {
            Route::Entity { filename } => filename,
        }
    }

    #[test]
    fn extracts_filename() {
        assert_eq!(filename("/file?filename=notes.txt").as_deref(), Some("notes.txt"));
    }

    #[test]
    fn decodes_query_values() {
        assert_eq!(
            filename("/file?filename=..%2F..%2Fetc%2Fpasswd").as_deref(),
            Some("../../etc/passwd")
        );
        assert_eq!(filename("/file?filename=a+b%20c.txt").as_deref(), Some("a b c.txt"));
    }

    #[test]
    fn first_filename_wins() {
        assert_eq!(
            filename("/file?x=1&filename=first&filename=second").as_deref(),
            Some("first")
        );
    }

    #[test]
    fn missing_and_empty_filename() {
        assert_eq!(filename("/file"), None);
        assert_eq!(filename("/file?other=1"), None);
        assert_eq!(filename("/file?filename=").as_deref(), Some(""));
    }

    #[test]
    fn dot_segments_in_path_are_resolved() {
        assert_eq!(filename("/a/../file?filename=x").as_deref(), Some("x"));
    }

    #[test]
    fn absolute_form_target() {
        assert_eq!(
            filename("http://example.com/file?filename=x").as_deref(),
            Some("x")
        );
    }

    #[test]
    fn other_paths_are_not_found() {
        for target in ["/", "/files", "/file/", "/file/x", "/FILE", "*"] {
            assert!(
                matches!(route(target), Err(ProtocolError::RouteNotFound(_))),
                "{target} should not route"
            );
        }
    }
}
