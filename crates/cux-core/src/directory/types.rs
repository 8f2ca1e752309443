//! Types shared by the directory trait and its implementations.

use std::collections::BTreeMap;

/// One "list users" call.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Continuation token from the previous page, if any.
    pub token: Option<String>,
    /// Requested page size; the service caps this at 60.
    pub page_size: i32,
}

/// One page of results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<UserRecord>,
    /// Absent once the listing is exhausted. Implementations normalize an
    /// empty-string token to `None` before it gets here.
    pub next_token: Option<String>,
}

/// A user record as two namespaces: root-level fields (enabled flag,
/// status, timestamps) and the nested attribute list (sub, email,
/// custom:*). The projector looks both up but keeps them distinct so
/// root-level entries win name collisions.
#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub fields: BTreeMap<String, serde_json::Value>,
    pub attributes: Vec<(String, String)>,
}

impl UserRecord {
    /// Attribute-list value for `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Listing mode, fixed at construction.
#[derive(Debug, Clone)]
pub enum ListMode {
    /// Plain pool listing, optionally narrowed by a Cognito filter expression.
    All { filter: Option<String> },
    /// Users in a single named group.
    Group { group_name: String },
}
