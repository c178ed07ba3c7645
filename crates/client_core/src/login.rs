//! Entry screen: display name validation, server list and availability
//! check, ending in a navigation to the chat screen.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::DisplayName,
    protocol::{ServerSummary, UsernameCheckResponse},
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{config::DEFAULT_SERVER_URL, identity::USERNAME_QUERY_KEY, navigation::Navigation};

pub const MAX_USERNAME_CHARS: usize = 20;
pub const FORBIDDEN_USERNAME_CHARS: [char; 3] = ['@', '<', '>'];
pub const FALLBACK_SERVER_NAME: &str = "默认服务器";

const SERVERS_PATH: &str = "/api/servers";
const CHECK_USERNAME_PATH: &str = "/api/check_username";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("请输入昵称")]
    Empty,
    #[error("昵称不能超过20个字符")]
    TooLong,
    #[error("昵称不能包含特殊字符")]
    ForbiddenCharacter,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    InvalidUsername(#[from] UsernameError),
    #[error("该昵称已被使用")]
    UsernameTaken,
    #[error("登录失败，请稍后重试")]
    Request(#[from] reqwest::Error),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
}

/// Trims and checks a display name typed on the entry screen.
pub fn validate_username(raw: &str) -> Result<DisplayName, UsernameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(UsernameError::Empty);
    }
    if name.chars().count() > MAX_USERNAME_CHARS {
        return Err(UsernameError::TooLong);
    }
    if name.contains(&FORBIDDEN_USERNAME_CHARS[..]) {
        return Err(UsernameError::ForbiddenCharacter);
    }
    Ok(DisplayName::new(name))
}

pub fn default_server() -> ServerSummary {
    ServerSummary {
        name: FALLBACK_SERVER_NAME.to_string(),
        url: DEFAULT_SERVER_URL.to_string(),
    }
}

pub fn fallback_servers() -> Vec<ServerSummary> {
    vec![default_server()]
}

/// REST endpoints the entry screen talks to.
#[async_trait]
pub trait LoginApi: Send + Sync {
    async fn list_servers(&self) -> Result<Vec<ServerSummary>, LoginError>;
    async fn username_exists(&self, username: &DisplayName) -> Result<bool, LoginError>;
}

#[derive(Debug, Clone)]
pub struct HttpLoginApi {
    http: Client,
    base_url: Url,
}

impl HttpLoginApi {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, LoginError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }
}

#[async_trait]
impl LoginApi for HttpLoginApi {
    async fn list_servers(&self) -> Result<Vec<ServerSummary>, LoginError> {
        let servers = self
            .http
            .get(self.base_url.join(SERVERS_PATH)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(servers)
    }

    async fn username_exists(&self, username: &DisplayName) -> Result<bool, LoginError> {
        let response: UsernameCheckResponse = self
            .http
            .get(self.base_url.join(CHECK_USERNAME_PATH)?)
            .query(&[(USERNAME_QUERY_KEY, username.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.exists)
    }
}

pub struct LoginClient {
    api: Arc<dyn LoginApi>,
}

impl LoginClient {
    pub fn new(api: Arc<dyn LoginApi>) -> Self {
        Self { api }
    }

    /// Never fails: any error degrades to the single fallback server. The
    /// first entry is the default selection.
    pub async fn fetch_servers(&self) -> Vec<ServerSummary> {
        match self.api.list_servers().await {
            Ok(servers) => servers,
            Err(err) => {
                warn!("failed to load server list, using fallback: {err}");
                fallback_servers()
            }
        }
    }

    pub async fn check_username(&self, username: &DisplayName) -> Result<bool, LoginError> {
        self.api.username_exists(username).await
    }

    pub async fn login(&self, raw: &str) -> Result<Navigation, LoginError> {
        let username = validate_username(raw)?;
        if self.check_username(&username).await? {
            return Err(LoginError::UsernameTaken);
        }
        info!(username = %username, "display name accepted");
        Ok(Navigation::Chat { username })
    }
}

#[cfg(test)]
#[path = "tests/login_tests.rs"]
mod tests;
