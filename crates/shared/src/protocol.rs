//! GitHub REST payloads as they appear on the wire.

use serde::{Deserialize, Serialize};

use crate::domain::{Owner, Repo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerResponse {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Subset of `GET /repos/{owner}/{repo}`. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoResponse {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: OwnerResponse,
    #[serde(default)]
    pub stargazers_count: u64,
}

/// Body GitHub returns alongside non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
}

impl From<OwnerResponse> for Owner {
    fn from(value: OwnerResponse) -> Self {
        Self {
            login: value.login,
            avatar_url: value.avatar_url,
            html_url: value.html_url,
        }
    }
}

impl From<RepoResponse> for Repo {
    fn from(value: RepoResponse) -> Self {
        Self {
            name: value.name,
            full_name: value.full_name,
            description: value.description,
            owner: value.owner.into(),
            stars: value.stargazers_count,
        }
    }
}
