//! Namespaces — the tenant partitions every cache decision is scoped to.

use thiserror::Error;

use crate::context::Context;

/// Errors raised while resolving the calling namespace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("no namespace in request context")]
    Missing,
}

/// A tenant partition.
///
/// `path` is the namespace's hierarchical segment in canonical form: no
/// leading `/`, exactly one trailing `/`, and empty for the root namespace.
/// Prepending it to a request path yields the mount-table lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    id: String,
    path: String,
}

impl Namespace {
    pub const ROOT_ID: &'static str = "root";

    pub fn new(id: impl Into<String>, path: impl AsRef<str>) -> Self {
        Self {
            id: id.into(),
            path: canonicalize(path.as_ref()),
        }
    }

    /// The root namespace, whose path is empty.
    pub fn root() -> Self {
        Self::new(Self::ROOT_ID, "")
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Prefixes a namespace-relative `path` with this namespace's path.
    pub fn adjust(&self, path: &str) -> String {
        format!("{}{}", self.path, path.trim_start_matches('/'))
    }
}

fn canonicalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Resolves the namespace the request runs in.
pub fn from_context(ctx: &Context) -> Result<&Namespace, NamespaceError> {
    ctx.extensions()
        .get::<Namespace>()
        .ok_or(NamespaceError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_canonicalized() {
        assert_eq!(Namespace::new("a", "/team/a").path(), "team/a/");
        assert_eq!(Namespace::new("a", "team/a//").path(), "team/a/");
        assert_eq!(Namespace::new("r", "/").path(), "");
        assert!(Namespace::root().is_root());
    }

    #[test]
    fn adjust_prefixes_namespace_path() {
        let ns = Namespace::new("a", "team");
        assert_eq!(ns.adjust("/secret/app"), "team/secret/app");
        assert_eq!(Namespace::root().adjust("secret/app"), "secret/app");
    }

    #[test]
    fn missing_namespace_is_an_error() {
        assert_eq!(from_context(&Context::new()), Err(NamespaceError::Missing));
        let ctx = Context::with_namespace(Namespace::root());
        assert_eq!(from_context(&ctx).map(Namespace::id), Ok("root"));
    }
}
