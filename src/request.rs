use std::collections::BTreeMap;

use reqwest::Method;
use url::Url;

use crate::AuthParams;

/// Method, path and query filters of one API call.
///
/// Query keys are unique; setting a key twice keeps the last value. The
/// client signs a copy per attempt and never mutates the caller's value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    /// `GET {path}`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `GET {path}/{id}`, e.g. a single character by id.
    pub fn item(path: &str, id: impl std::fmt::Display) -> Self {
        Self::get(format!("{}/{id}", path.trim_end_matches('/')))
    }

    /// `GET {path}/{id}/{related}`, e.g. the comics of a character.
    pub fn related(path: &str, id: impl std::fmt::Display, related: &str) -> Self {
        Self::get(format!(
            "{}/{id}/{}",
            path.trim_end_matches('/'),
            related.trim_matches('/')
        ))
    }

    /// Adds or replaces a query filter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn limit(self, limit: u32) -> Self {
        self.query("limit", limit)
    }

    #[must_use]
    pub fn offset(self, offset: u32) -> Self {
        self.query("offset", offset)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Returns a copy carrying `auth`.
    ///
    /// Authentication keys win over caller filters with the same name.
    pub fn signed(&self, auth: &AuthParams) -> Self {
        let mut signed = self.clone();
        for (key, value) in auth.pairs() {
            signed.query.insert(key.to_owned(), value.to_owned());
        }
        signed
    }

    /// Resolves the descriptor against `base`, keeping any path prefix the
    /// base URL carries.
    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        let prefix = base.path().trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        url.set_path(&format!("{prefix}/{path}"));
        url.set_query(None);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        url
    }
}
