use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use shared::{
    domain::Repo,
    error::{ApiError, ErrorCode},
    protocol::{ErrorResponse, RepoResponse},
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{settings::ClientSettings, RepoService};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("invalid api base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("github responded {status} for {url}: {}", .error.message)]
    Status {
        status: u16,
        url: String,
        error: ApiError,
    },
    #[error("failed to decode repository payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl GithubError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Status { error, .. } => Some(error.code),
            _ => None,
        }
    }
}

/// `RepoService` backed by the GitHub REST API.
pub struct GithubRepoService {
    http: Client,
    api_base_url: Url,
    auth_token: Option<String>,
}

impl GithubRepoService {
    pub fn new(api_base_url: &str) -> std::result::Result<Self, GithubError> {
        Self::from_settings(&ClientSettings {
            api_base_url: api_base_url.to_string(),
            ..ClientSettings::default()
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> std::result::Result<Self, GithubError> {
        let api_base_url = Url::parse(&settings.api_base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GithubError::InvalidBaseUrl(settings.api_base_url.clone()))?;
        let http = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout())
            .build()
            .map_err(GithubError::Client)?;
        Ok(Self {
            http,
            api_base_url,
            auth_token: settings.auth_token.clone(),
        })
    }

    fn repo_url(&self, owner: &str, name: &str) -> std::result::Result<Url, GithubError> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GithubError::InvalidBaseUrl(self.api_base_url.to_string()))?
            .pop_if_empty()
            .extend(["repos", owner, name]);
        Ok(url)
    }

    pub async fn fetch_repo(&self, owner: &str, name: &str) -> std::result::Result<Repo, GithubError> {
        let url = self.repo_url(owner, name)?;
        let url_text = url.to_string();
        debug!(url = %url_text, "github: requesting repository");

        let mut request = self
            .http
            .get(url)
            .header(header::ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| GithubError::Transport {
            url: url_text.clone(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(status_error(url_text, response).await);
        }

        let body: RepoResponse = response.json().await.map_err(|source| GithubError::Decode {
            url: url_text.clone(),
            source,
        })?;
        let repo = Repo::from(body);
        info!(
            repo = %repo.full_name,
            stars = repo.stars,
            "github: repository loaded"
        );
        Ok(repo)
    }
}

async fn status_error(url: String, response: Response) -> GithubError {
    let status = response.status();
    let rate_limit_exhausted = response
        .headers()
        .get(RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    let code = ErrorCode::from_status(status.as_u16(), rate_limit_exhausted);
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => canonical_reason(status),
    };

    GithubError::Status {
        status: status.as_u16(),
        url,
        error: ApiError::new(code, message),
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[async_trait]
impl RepoService for GithubRepoService {
    async fn load_repo(&self, owner: &str, name: &str) -> Result<Repo> {
        Ok(self.fetch_repo(owner, name).await?)
    }
}

#[cfg(test)]
#[path = "tests/github_repo_service_tests.rs"]
mod tests;
