use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::Repo;
use tracing::warn;

mod github_repo_service;
pub mod repo_view;
pub mod settings;

pub use github_repo_service::{GithubError, GithubRepoService};
pub use repo_view::{FetchFailure, RepoResource, RepoViewController, RepoViewState, UiAction};
pub use settings::{load_settings, ClientSettings, ReloadPolicy};

/// Data-access seam for repository details.
///
/// Implementations must tolerate having the returned future dropped at any
/// await point; that is how the view controller cancels a fetch.
#[async_trait]
pub trait RepoService: Send + Sync {
    async fn load_repo(&self, owner: &str, name: &str) -> Result<Repo>;
}

pub struct MissingRepoService;

#[async_trait]
impl RepoService for MissingRepoService {
    async fn load_repo(&self, owner: &str, name: &str) -> Result<Repo> {
        Err(anyhow!(
            "repository service is unavailable (requested {owner}/{name})"
        ))
    }
}

/// Opaque token identifying the host surface a navigation starts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UiContext(pub String);

impl UiContext {
    pub fn new(screen: impl Into<String>) -> Self {
        Self(screen.into())
    }
}

pub trait NavigationController: Send + Sync {
    fn navigate_to_user(&self, context: &UiContext, login: &str);
}

pub struct MissingNavigationController;

impl NavigationController for MissingNavigationController {
    fn navigate_to_user(&self, context: &UiContext, login: &str) {
        warn!(
            screen = %context.0,
            login,
            "navigation controller is unavailable; dropping navigation"
        );
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
