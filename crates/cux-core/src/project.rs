//! Projects heterogeneous user records onto a fixed CSV column list,
//! and discovers the column list by sampling when asked to export
//! everything.

use serde_json::Value;

use crate::directory::{Page, PageRequest, UserDirectory, UserRecord, PAGE_SIZE_MAX};
use crate::retry::{run_with_retry, RetryObserver, RetryPolicy};

/// Attributes commonly present in Cognito User Pools; the baseline for
/// discovery when sampling finds nothing (or fails).
pub const COMMON_ATTRIBUTES: &[&str] = &[
    "sub",
    "username",
    "email",
    "email_verified",
    "phone_number",
    "phone_number_verified",
    "name",
    "given_name",
    "family_name",
    "middle_name",
    "nickname",
    "preferred_username",
    "profile",
    "picture",
    "website",
    "gender",
    "birthdate",
    "zoneinfo",
    "locale",
    "address",
    "updated_at",
    "cognito:mfa_enabled",
    "cognito:username",
    "cognito:roles",
    "cognito:groups",
    "custom:tenant_id",
    "UserCreateDate",
    "UserLastModifiedDate",
    "Enabled",
    "UserStatus",
];

/// Records sampled from the first page during discovery.
const DISCOVERY_SAMPLE: usize = 5;

/// Project one record onto the wanted columns, in order.
///
/// Root-level fields win over same-named entries in the nested attribute
/// list; a name present in neither projects to the empty string so every
/// wanted column always appears in the output.
pub fn project(record: &UserRecord, wanted: &[String]) -> Vec<String> {
    wanted
        .iter()
        .map(|name| match record.fields.get(name) {
            Some(value) => render(value),
            None => record.attribute(name).unwrap_or_default().to_string(),
        })
        .collect()
}

/// Canonical textual form for a projected value. Objects and arrays
/// serialize as JSON (serde_json keeps object keys sorted); strings are
/// unquoted; booleans are `true`/`false`; null is empty.
fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Discover the column set by sampling the first page of the listing:
/// the union of root-level field names and nested attribute names across
/// the first few records, merged with [`COMMON_ATTRIBUTES`] and sorted.
///
/// An empty pool or a failed sample falls back to the baseline list,
/// with the failure surfaced as a warning only.
pub async fn discover_attributes<D: UserDirectory>(
    directory: &D,
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
    page_size: i32,
) -> Vec<String> {
    let req = PageRequest {
        token: None,
        page_size: page_size.clamp(1, PAGE_SIZE_MAX),
    };
    match run_with_retry(policy, observer, || directory.list_page(&req)).await {
        Ok(page) => columns_from_sample(&page),
        Err(e) => {
            tracing::warn!(
                "attribute discovery failed ({}); using common attributes list",
                e
            );
            baseline()
        }
    }
}

fn columns_from_sample(page: &Page) -> Vec<String> {
    if page.records.is_empty() {
        tracing::info!("no users found in the pool; using common attributes list");
        return baseline();
    }

    let mut names: std::collections::BTreeSet<String> =
        COMMON_ATTRIBUTES.iter().map(|s| s.to_string()).collect();
    for record in page.records.iter().take(DISCOVERY_SAMPLE) {
        names.extend(record.fields.keys().cloned());
        names.extend(record.attributes.iter().map(|(n, _)| n.clone()));
    }
    names.into_iter().collect()
}

fn baseline() -> Vec<String> {
    COMMON_ATTRIBUTES.iter().map(|s| s.to_string()).collect()
}
