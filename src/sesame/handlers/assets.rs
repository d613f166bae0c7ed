//! Static file fallback.
//!
//! Any path not claimed by another route is looked up under the static root.
//! A leading `/static/` is stripped first, so `/static/app.css` and `/app.css`
//! name the same file.
//! Directory paths resolve to the `index.html` inside them. Paths are decoded
//! and normalized before touching the filesystem, and the final file must still
//! live under the canonical root, so `..` segments and symlinks cannot reach
//! outside it.

use crate::sesame::error::ApiError;
use anyhow::Context;
use axum::{
    body::Body,
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tokio::fs;
use tracing::{debug, instrument, warn};

pub const INDEX_FILE: &str = "index.html";
pub const STATIC_PREFIX: &str = "/static";

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a raw request path onto a file under the root.
    ///
    /// # Errors
    /// Returns [`ApiError::NotFound`] for missing files and for paths that
    /// escape the root, and [`ApiError::Internal`] if the root itself cannot
    /// be resolved.
    pub async fn resolve(&self, request_path: &str) -> Result<PathBuf, ApiError> {
        let decoded = urlencoding::decode(request_path).map_err(|_| ApiError::NotFound)?;

        let Some(relative) = normalize(&decoded) else {
            warn!(path = %request_path, "Rejected path outside the static root");

            return Err(ApiError::NotFound);
        };

        let mut candidate = self.root.join(relative);
        if decoded.ends_with('/') || fs::metadata(&candidate).await.is_ok_and(|m| m.is_dir()) {
            candidate.push(INDEX_FILE);
        }

        let root = fs::canonicalize(&self.root).await.with_context(|| {
            format!("failed to resolve static root {}", self.root.display())
        })?;

        let resolved = fs::canonicalize(&candidate).await.map_err(|e| {
            debug!("{}: {e}", candidate.display());

            ApiError::NotFound
        })?;

        if !resolved.starts_with(&root) {
            warn!(path = %request_path, "Rejected path resolving outside the static root");

            return Err(ApiError::NotFound);
        }

        if fs::metadata(&resolved).await.is_ok_and(|m| m.is_dir()) {
            return Err(ApiError::NotFound);
        }

        Ok(resolved)
    }
}

/// Normalize a decoded request path into a relative path.
///
/// `.` segments are dropped and `..` pops the previous segment. Returns `None`
/// if the path would climb above the root or contains a segment that is not a
/// plain file name on this platform.
fn normalize(path: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            _ => {
                if segment.contains(['\\', '\0'])
                    || !matches!(
                        Path::new(segment).components().next(),
                        Some(Component::Normal(_))
                    )
                {
                    return None;
                }
                segments.push(segment);
            }
        }
    }

    Some(segments.iter().collect())
}

/// `/static/<rest>` becomes `/<rest>`; any other path is returned as is.
fn strip_static_prefix(path: &str) -> &str {
    path.strip_prefix(STATIC_PREFIX)
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(path)
}

// fallback handler for everything that is not an API route
#[instrument(skip(files))]
pub async fn serve(
    files: Extension<Arc<StaticFiles>>,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::MethodNotAllowed);
    }

    let path = files.resolve(strip_static_prefix(uri.path())).await?;

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        let contents = fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        Body::from(contents)
    };

    debug!("Serving {}", path.display());

    Ok((StatusCode::OK, [(CONTENT_TYPE, content_type)], body).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        dir
    }

    #[test]
    fn normalize_drops_dots() {
        assert_eq!(normalize("/a/./b/"), Some(PathBuf::from("a/b")));
        assert_eq!(normalize("/a/../b"), Some(PathBuf::from("b")));
        assert_eq!(normalize("/"), Some(PathBuf::new()));
    }

    #[test]
    fn normalize_rejects_escape() {
        assert_eq!(normalize("/.."), None);
        assert_eq!(normalize("/a/../../etc/passwd"), None);
        assert_eq!(normalize("/a\\..\\b"), None);
        assert_eq!(normalize("/a\0b"), None);
    }

    #[test]
    fn static_prefix_is_stripped_only_as_a_segment() {
        assert_eq!(strip_static_prefix("/static/app.css"), "/app.css");
        assert_eq!(strip_static_prefix("/static/"), "/");
        assert_eq!(strip_static_prefix("/static"), "/static");
        assert_eq!(strip_static_prefix("/staticky/app.css"), "/staticky/app.css");
        assert_eq!(strip_static_prefix("/docs/static/a"), "/docs/static/a");
    }

    #[tokio::test]
    async fn resolve_directory_to_index() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path());
        let root = std::fs::canonicalize(dir.path()).unwrap();

        assert_eq!(files.resolve("/").await.unwrap(), root.join("index.html"));
        assert_eq!(
            files.resolve("/docs").await.unwrap(),
            root.join("docs").join("index.html")
        );
        assert_eq!(
            files.resolve("/docs/").await.unwrap(),
            root.join("docs").join("index.html")
        );
        assert_eq!(files.resolve("/app.js").await.unwrap(), root.join("app.js"));
    }

    #[tokio::test]
    async fn resolve_missing_is_not_found() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path());

        assert!(matches!(
            files.resolve("/nope.txt").await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            files.resolve("/empty/").await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn resolve_rejects_traversal() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("public");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("index.html"), "ok").unwrap();
        let files = StaticFiles::new(&root);

        for path in ["/../secret.txt", "/%2e%2e/secret.txt", "/..%2fsecret.txt"] {
            assert!(
                matches!(files.resolve(path).await, Err(ApiError::NotFound)),
                "{path} escaped the root"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_rejects_symlink_out_of_root() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("public");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), root.join("link.txt"))
            .unwrap();
        let files = StaticFiles::new(&root);

        assert!(matches!(
            files.resolve("/link.txt").await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn missing_root_is_internal() {
        let files = StaticFiles::new("/definitely/not/a/real/static/root");
        assert!(matches!(
            files.resolve("/index.html").await,
            Err(ApiError::Internal(_))
        ));
    }
}
