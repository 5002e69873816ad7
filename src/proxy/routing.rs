//! Ordered prefix routing with path rewriting.
//!
//! A [`RouteTable`] holds [`ProxyRoute`] rules evaluated top-down; the
//! first rule whose prefix matches the request path wins. The table
//! always ends with a catch-all (`/` → `/`) so every path resolves.
//! Prefixes match on segment boundaries: `/route` matches `/route` and
//! `/route/v1/...` but not `/routes`.

use std::str::FromStr;

use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    pub prefix: String,
    pub rewrite: String,
}

impl ProxyRoute {
    #[must_use]
    pub fn new(prefix: impl Into<String>, rewrite: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            rewrite: rewrite.into(),
        }
    }

    #[must_use]
    pub fn catch_all() -> Self {
        Self::new("/", "/")
    }

    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.prefix == "/" && self.rewrite == "/"
    }

    /// Returns the part of `path` after the prefix, or `None` if the
    /// prefix does not match on a segment boundary.
    fn remainder<'p>(&self, path: &'p str) -> Option<&'p str> {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(prefix)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Rewrite `path` if this route matches it.
    #[must_use]
    pub fn rewrite_path(&self, path: &str) -> Option<String> {
        let rest = self.remainder(path)?;
        let target = self.rewrite.trim_end_matches('/');
        let rewritten = format!("{target}{rest}");
        if rewritten.is_empty() {
            Some("/".into())
        } else {
            Some(rewritten)
        }
    }
}

impl FromStr for ProxyRoute {
    type Err = GatewayError;

    /// Parses `PREFIX=TARGET`, e.g. `/v1=/route/v1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, rewrite) = s
            .split_once('=')
            .ok_or_else(|| GatewayError::InvalidRewrite(s.to_string()))?;
        let (prefix, rewrite) = (prefix.trim(), rewrite.trim());
        if !prefix.starts_with('/') || !rewrite.starts_with('/') {
            return Err(GatewayError::InvalidRewrite(s.to_string()));
        }
        Ok(Self::new(prefix, rewrite))
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<ProxyRoute>,
}

impl RouteTable {
    /// Builds a table from rules in priority order, appending the
    /// catch-all when the last rule is not one already.
    #[must_use]
    pub fn new(mut routes: Vec<ProxyRoute>) -> Self {
        if !routes.last().is_some_and(ProxyRoute::is_catch_all) {
            routes.push(ProxyRoute::catch_all());
        }
        Self { routes }
    }

    #[must_use]
    pub fn routes(&self) -> &[ProxyRoute] {
        &self.routes
    }

    /// Index of the matching route and the rewritten backend path.
    #[must_use]
    pub fn resolve(&self, path: &str) -> (usize, String) {
        self.routes
            .iter()
            .enumerate()
            .find_map(|(idx, route)| route.rewrite_path(path).map(|p| (idx, p)))
            // The trailing catch-all matches every path; this only guards
            // against a non-absolute request path.
            .unwrap_or_else(|| (self.routes.len() - 1, path.to_string()))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
