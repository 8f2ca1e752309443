//! User directory listing: trait seam, Cognito client, and the pager
//! that drives pagination through the retry layer.

mod cognito;
mod pager;
mod types;

pub use cognito::{aws_sdk_config, CognitoDirectory};
pub use pager::{Pager, PAGE_COOLDOWN, PAGE_SIZE_MAX};
pub use types::{ListMode, Page, PageRequest, UserRecord};

use crate::retry::ServiceError;
use async_trait::async_trait;

/// Remote user-directory service, one page at a time.
///
/// Implementations are constructed in exactly one listing mode (plain or
/// group-scoped); the mode never varies per call.
#[async_trait]
pub trait UserDirectory {
    async fn list_page(&self, req: &PageRequest) -> Result<Page, ServiceError>;
}
