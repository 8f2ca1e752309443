//! Cognito-backed implementation of the user directory.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::types::UserType;
use aws_sdk_cognitoidentityprovider::Client;
use serde_json::{json, Value};

use super::types::{ListMode, Page, PageRequest, UserRecord};
use super::UserDirectory;
use crate::retry::ServiceError;

/// Load the shared AWS SDK config for the given region and optional
/// named profile. Both the Cognito and S3 clients are built from it.
pub async fn aws_sdk_config(region: &str, profile: Option<&str>) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

/// User directory over the Cognito IDP API, fixed to one listing mode.
pub struct CognitoDirectory {
    client: Client,
    user_pool_id: String,
    mode: ListMode,
}

impl CognitoDirectory {
    pub fn new(config: &SdkConfig, user_pool_id: impl Into<String>, mode: ListMode) -> Self {
        Self {
            client: Client::new(config),
            user_pool_id: user_pool_id.into(),
            mode,
        }
    }
}

#[async_trait]
impl UserDirectory for CognitoDirectory {
    async fn list_page(&self, req: &PageRequest) -> Result<Page, ServiceError> {
        match &self.mode {
            ListMode::All { filter } => {
                let out = self
                    .client
                    .list_users()
                    .user_pool_id(&self.user_pool_id)
                    .limit(req.page_size)
                    .set_pagination_token(req.token.clone())
                    .set_filter(filter.clone())
                    .send()
                    .await
                    .map_err(to_service_error)?;
                Ok(Page {
                    records: out.users().iter().map(record_from_user).collect(),
                    next_token: normalize_token(out.pagination_token()),
                })
            }
            ListMode::Group { group_name } => {
                let out = self
                    .client
                    .list_users_in_group()
                    .user_pool_id(&self.user_pool_id)
                    .group_name(group_name)
                    .limit(req.page_size)
                    .set_next_token(req.token.clone())
                    .send()
                    .await
                    .map_err(to_service_error)?;
                Ok(Page {
                    records: out.users().iter().map(record_from_user).collect(),
                    next_token: normalize_token(out.next_token()),
                })
            }
        }
    }
}

/// Empty-string tokens mean the same as absent ones.
fn normalize_token(token: Option<&str>) -> Option<String> {
    token.filter(|t| !t.is_empty()).map(str::to_string)
}

fn to_service_error<E, R>(err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err.code().unwrap_or("TransportError").to_string();
    let message = match err.message() {
        Some(m) => m.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };
    ServiceError::new(code, message)
}

/// Flatten an SDK user into the root-fields / attribute-list record the
/// projector consumes. Timestamps render as RFC 3339, the enabled flag
/// as a JSON bool, MFA options as a structured value.
fn record_from_user(user: &UserType) -> UserRecord {
    let mut fields = BTreeMap::new();
    if let Some(name) = user.username() {
        fields.insert("Username".to_string(), json!(name));
    }
    fields.insert("Enabled".to_string(), json!(user.enabled()));
    if let Some(status) = user.user_status() {
        fields.insert("UserStatus".to_string(), json!(status.as_str()));
    }
    if let Some(created) = user.user_create_date() {
        fields.insert("UserCreateDate".to_string(), json!(created.to_string()));
    }
    if let Some(modified) = user.user_last_modified_date() {
        fields.insert("UserLastModifiedDate".to_string(), json!(modified.to_string()));
    }
    if !user.mfa_options().is_empty() {
        let options: Vec<Value> = user
            .mfa_options()
            .iter()
            .map(|o| {
                json!({
                    "AttributeName": o.attribute_name(),
                    "DeliveryMedium": o.delivery_medium().map(|m| m.as_str()),
                })
            })
            .collect();
        fields.insert("MFAOptions".to_string(), Value::Array(options));
    }

    let attributes = user
        .attributes()
        .iter()
        .map(|a| (a.name().to_string(), a.value().unwrap_or_default().to_string()))
        .collect();

    UserRecord { fields, attributes }
}
