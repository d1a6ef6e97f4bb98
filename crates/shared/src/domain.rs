use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a repository by `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parses `owner/name`. Both halves must be non-empty.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

impl Owner {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            avatar_url: None,
            html_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub owner: Owner,
    pub stars: u64,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, stars: u64) -> Self {
        let owner = Owner::new(owner);
        let name = name.into();
        Self {
            full_name: format!("{}/{}", owner.login, name),
            name,
            description: None,
            owner,
            stars,
        }
    }

    pub fn id(&self) -> RepoId {
        RepoId::new(self.owner.login.clone(), self.name.clone())
    }
}
