//! View-state controller for the repository detail screen.
//!
//! State is published as whole `RepoViewState` snapshots on a `watch`
//! channel, so late subscribers always see the latest value. Navigation
//! intents go out on a `broadcast` channel and are only delivered to
//! receivers that exist when they are emitted.

use std::{collections::HashMap, fmt, sync::Arc};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use shared::{
    domain::{Repo, RepoId},
    Resource,
};
use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
    task::AbortHandle,
};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tracing::{debug, info, warn};

use crate::{
    settings::{ClientSettings, ReloadPolicy},
    NavigationController, RepoService, UiContext,
};

/// A failed fetch. The service's error is kept as-is; it is only shared so
/// that state snapshots stay cheap to clone.
#[derive(Clone)]
pub struct FetchFailure(Arc<anyhow::Error>);

impl FetchFailure {
    pub fn new(cause: anyhow::Error) -> Self {
        Self(Arc::new(cause))
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.0
    }

    pub fn message(&self) -> String {
        format!("{:#}", self.0)
    }
}

impl fmt::Debug for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FetchFailure").field(&self.message()).finish()
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl PartialEq for FetchFailure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.message() == other.message()
    }
}

impl From<anyhow::Error> for FetchFailure {
    fn from(cause: anyhow::Error) -> Self {
        Self::new(cause)
    }
}

pub type RepoResource = Resource<Repo, FetchFailure>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoViewState {
    /// Fetch target, `None` until `init`.
    pub repo_id: Option<RepoId>,
    pub repo: RepoResource,
}

/// One-shot command for the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    NavigateToUser { login: String },
}

type FetchId = u64;

struct ControllerState {
    repo_id: Option<RepoId>,
    disposed: bool,
    next_fetch: FetchId,
    inflight: HashMap<FetchId, AbortHandle>,
}

struct Shared {
    view: watch::Sender<RepoViewState>,
    inner: Mutex<ControllerState>,
}

impl Shared {
    /// Applies a fetch outcome unless the fetch was cancelled or the
    /// controller disposed in the meantime. Runs under the state lock so it
    /// cannot interleave with `reload` or `dispose`.
    fn complete(&self, fetch_id: FetchId, target: &RepoId, outcome: Result<Repo>) {
        let mut inner = self.inner.lock();
        if inner.disposed || inner.inflight.remove(&fetch_id).is_none() {
            debug!(fetch_id, "repo view: dropping completion of cancelled fetch");
            return;
        }
        if inner.repo_id.as_ref() != Some(target) {
            warn!(
                fetch_id,
                fetched = %target,
                current = ?inner.repo_id.as_ref().map(RepoId::to_string),
                "repo view: superseded fetch completed last; publishing result for previous target"
            );
        }

        let resource = match outcome {
            Ok(repo) => {
                info!(fetch_id, repo = %repo.full_name, "repo view: fetch succeeded");
                Resource::Success(repo)
            }
            Err(error) => {
                let message = format!("{error:#}");
                warn!(fetch_id, error = %message, "repo view: fetch failed");
                Resource::Error(FetchFailure::new(error))
            }
        };
        self.view.send_modify(|state| state.repo = resource);
    }
}

/// Holds the repository screen's state and mediates between the
/// repository service, the navigation controller and the host UI.
///
/// Fetches are spawned on the runtime captured at construction, so commands
/// may be issued from threads outside it. Dropping the controller disposes it.
pub struct RepoViewController {
    runtime: Handle,
    repository: Arc<dyn RepoService>,
    navigation: Arc<dyn NavigationController>,
    reload_policy: ReloadPolicy,
    ui_actions: broadcast::Sender<UiAction>,
    shared: Arc<Shared>,
}

impl RepoViewController {
    /// Binds to the current Tokio runtime; fails outside one.
    pub fn new(
        repository: Arc<dyn RepoService>,
        navigation: Arc<dyn NavigationController>,
    ) -> Result<Self> {
        Self::with_settings(repository, navigation, &ClientSettings::default())
    }

    /// Binds to the current Tokio runtime; fails outside one.
    pub fn with_settings(
        repository: Arc<dyn RepoService>,
        navigation: Arc<dyn NavigationController>,
        settings: &ClientSettings,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("repo view controller must be created inside a Tokio runtime or given a runtime handle")?;
        Ok(Self::with_runtime(repository, navigation, settings, runtime))
    }

    pub fn with_runtime(
        repository: Arc<dyn RepoService>,
        navigation: Arc<dyn NavigationController>,
        settings: &ClientSettings,
        runtime: Handle,
    ) -> Self {
        let (view, _) = watch::channel(RepoViewState::default());
        let (ui_actions, _) = broadcast::channel(settings.action_buffer.max(1));
        Self {
            runtime,
            repository,
            navigation,
            reload_policy: settings.reload_policy,
            ui_actions,
            shared: Arc::new(Shared {
                view,
                inner: Mutex::new(ControllerState {
                    repo_id: None,
                    disposed: false,
                    next_fetch: 0,
                    inflight: HashMap::new(),
                }),
            }),
        }
    }

    pub fn state(&self) -> RepoViewState {
        self.shared.view.borrow().clone()
    }

    /// Receiver that starts at the current snapshot.
    pub fn subscribe_state(&self) -> watch::Receiver<RepoViewState> {
        self.shared.view.subscribe()
    }

    /// Stream that yields the current snapshot first, then every change.
    pub fn state_stream(&self) -> WatchStream<RepoViewState> {
        WatchStream::new(self.shared.view.subscribe())
    }

    pub fn subscribe_ui_actions(&self) -> broadcast::Receiver<UiAction> {
        self.ui_actions.subscribe()
    }

    pub fn ui_action_stream(&self) -> BroadcastStream<UiAction> {
        BroadcastStream::new(self.ui_actions.subscribe())
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.inner.lock().disposed
    }

    /// Number of fetches started and not yet completed or cancelled.
    pub fn inflight_fetches(&self) -> usize {
        self.shared.inner.lock().inflight.len()
    }

    /// Sets the fetch target and reloads. Calling it again retargets.
    pub fn init(&self, repo_id: RepoId) {
        let mut inner = self.shared.inner.lock();
        if inner.disposed {
            debug!(repo = %repo_id, "repo view: init after dispose ignored");
            return;
        }
        inner.repo_id = Some(repo_id);
        self.start_fetch(&mut inner);
    }

    /// Publishes `Loading`, then fetches the current target in the background.
    pub fn reload(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.disposed {
            debug!("repo view: reload after dispose ignored");
            return;
        }
        self.start_fetch(&mut inner);
    }

    fn start_fetch(&self, inner: &mut ControllerState) {
        let Some(repo_id) = inner.repo_id.clone() else {
            warn!("repo view: reload requested before init; nothing to fetch");
            return;
        };

        if self.reload_policy == ReloadPolicy::CancelPrevious {
            for (fetch_id, handle) in inner.inflight.drain() {
                debug!(fetch_id, "repo view: cancelling superseded fetch");
                handle.abort();
            }
        }

        let fetch_id = inner.next_fetch;
        inner.next_fetch += 1;
        info!(fetch_id, repo = %repo_id, "repo view: loading repository");

        let repository = Arc::clone(&self.repository);
        let shared = Arc::clone(&self.shared);
        let target = repo_id.clone();
        let task = self.runtime.spawn(async move {
            let outcome = repository.load_repo(&target.owner, &target.name).await;
            shared.complete(fetch_id, &target, outcome);
        });
        // `complete` needs the state lock the caller holds, so the task can
        // neither finish before it is registered nor before `Loading` is out.
        inner.inflight.insert(fetch_id, task.abort_handle());

        self.shared.view.send_modify(|state| {
            state.repo_id = Some(repo_id);
            state.repo = Resource::Loading;
        });
    }

    pub fn retry(&self) {
        self.reload();
    }

    /// Emits a navigation action for `login` without touching the view state.
    pub fn open_user_detail(&self, login: impl Into<String>) {
        if self.is_disposed() {
            debug!("repo view: open_user_detail after dispose ignored");
            return;
        }
        let login = login.into();
        debug!(login = %login, "repo view: emitting navigate-to-user action");
        if self
            .ui_actions
            .send(UiAction::NavigateToUser { login })
            .is_err()
        {
            debug!("repo view: no ui action subscribers; action dropped");
        }
    }

    /// Performs `action` through the navigation controller.
    pub fn dispatch_action(&self, action: &UiAction, context: &UiContext) {
        match action {
            UiAction::NavigateToUser { login } => {
                info!(screen = %context.0, login = %login, "repo view: navigating to user");
                self.navigation.navigate_to_user(context, login);
            }
        }
    }

    /// Aborts every outstanding fetch. No completion mutates state once this
    /// returns, and later commands are ignored.
    pub fn dispose(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        let cancelled = inner.inflight.len();
        for (_, handle) in inner.inflight.drain() {
            handle.abort();
        }
        info!(cancelled, "repo view: disposed");
    }
}

impl Drop for RepoViewController {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "tests/repo_view_tests.rs"]
mod tests;
