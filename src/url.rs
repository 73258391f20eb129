//! Classification of repository URLs.

use url::Url;

use crate::error::{Error, Result};

/// How a repository URL given by the user is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlType {
    /// A path relative to the toplevel directory of the superproject.
    LocalRelative,
    LocalAbsolute,
    Remote,
}

/// Classify `url`.
///
/// `http*`, `git*` and `ssh*` URLs are remote. Any other `scheme://` form is
/// not supported yet. Everything else is a local path.
pub fn url_type(url: &str) -> Result<UrlType> {
    if url.is_empty() {
        return Err(Error::invalid_argument("The URL is empty!"));
    }

    if url.starts_with("http") || url.starts_with("git") || url.starts_with("ssh") {
        return Ok(UrlType::Remote);
    }

    if url.contains("://") {
        let scheme = Url::parse(url)
            .map(|parsed| parsed.scheme().to_string())
            .unwrap_or_else(|_| url.split("://").next().unwrap_or_default().to_string());
        return Err(Error::not_implemented_yet(format!(
            "The URL '{}' with scheme '{}' is not implemented yet",
            url, scheme
        )));
    }

    if url.starts_with('/') {
        return Ok(UrlType::LocalAbsolute);
    }

    Ok(UrlType::LocalRelative)
}

/// Derive a directory name from a repository URL.
///
/// `…/foo/.git/`, `…/foo.git/` and `…/foo` all become `foo`.
pub fn name_from_repository_url(url: &str) -> Result<String> {
    if url.is_empty() {
        return Err(Error::invalid_argument("The URL is empty!"));
    }

    let url = url.trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    let url = url.trim_end_matches('/');
    Ok(url.rsplit('/').next().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_type_remote() {
        assert_eq!(url_type("https://example.com/a.git").unwrap(), UrlType::Remote);
        assert_eq!(url_type("http://example.com/a").unwrap(), UrlType::Remote);
        assert_eq!(url_type("git@github.com:a/b.git").unwrap(), UrlType::Remote);
        assert_eq!(url_type("ssh://host/a").unwrap(), UrlType::Remote);
    }

    #[test]
    fn test_url_type_local() {
        assert_eq!(url_type("/abs/path").unwrap(), UrlType::LocalAbsolute);
        assert_eq!(url_type("../subproject").unwrap(), UrlType::LocalRelative);
        assert_eq!(url_type("sub").unwrap(), UrlType::LocalRelative);
    }

    #[test]
    fn test_url_type_errors() {
        assert!(matches!(
            url_type(""),
            Err(Error::InvalidArgument { .. })
        ));
        let err = url_type("file:///tmp/repo").unwrap_err();
        assert!(matches!(err, Error::NotImplementedYet { .. }));
        assert!(err.to_string().contains("file"));
    }

    #[test]
    fn test_name_from_repository_url() {
        assert_eq!(name_from_repository_url("https://host/bla/foo/.git/").unwrap(), "foo");
        assert_eq!(name_from_repository_url("https://host/bla/foo.git/").unwrap(), "foo");
        assert_eq!(name_from_repository_url("https://host/bla/foo").unwrap(), "foo");
        assert_eq!(name_from_repository_url("../foo/").unwrap(), "foo");
        assert_eq!(name_from_repository_url("foo").unwrap(), "foo");
        assert!(name_from_repository_url("").is_err());
    }
}
