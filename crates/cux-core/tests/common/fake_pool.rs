//! Scripted in-memory user pool for export tests. Continuation tokens
//! are stringified record offsets; throttling and fatal failures can be
//! injected at a given offset.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cux_core::directory::{Page, PageRequest, UserDirectory, UserRecord};
use cux_core::retry::ServiceError;
use serde_json::json;

pub fn user(i: usize) -> UserRecord {
    let mut record = UserRecord::default();
    record
        .fields
        .insert("Username".to_string(), json!(format!("user{i:05}")));
    record.fields.insert("Enabled".to_string(), json!(true));
    record.attributes.push(("sub".to_string(), format!("sub-{i:05}")));
    record
        .attributes
        .push(("email".to_string(), format!("user{i:05}@example.com")));
    record
}

pub struct FakePool {
    users: Vec<UserRecord>,
    /// offset -> throttling errors to serve before that page succeeds
    throttles: Mutex<HashMap<usize, u32>>,
    /// offset that always fails fatally
    fatal_at: Option<usize>,
    pub calls: AtomicU32,
}

impl FakePool {
    pub fn with_users(n: usize) -> Self {
        Self {
            users: (0..n).map(user).collect(),
            throttles: Mutex::new(HashMap::new()),
            fatal_at: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn fatal_at(mut self, offset: usize) -> Self {
        self.fatal_at = Some(offset);
        self
    }

    pub fn throttle_at(self, offset: usize, times: u32) -> Self {
        self.throttles.lock().unwrap().insert(offset, times);
        self
    }
}

#[async_trait]
impl UserDirectory for FakePool {
    async fn list_page(&self, req: &PageRequest) -> Result<Page, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let offset: usize = match req.token.as_deref() {
            Some(t) => t.parse().expect("numeric fake token"),
            None => 0,
        };

        if let Some(left) = self.throttles.lock().unwrap().get_mut(&offset) {
            if *left > 0 {
                *left -= 1;
                return Err(ServiceError::new("ThrottlingException", "rate exceeded"));
            }
        }
        if self.fatal_at == Some(offset) {
            return Err(ServiceError::new("InternalErrorException", "injected failure"));
        }

        let end = (offset + req.page_size as usize).min(self.users.len());
        let next_token = (end < self.users.len()).then(|| end.to_string());
        Ok(Page {
            records: self.users[offset..end].to_vec(),
            next_token,
        })
    }
}
