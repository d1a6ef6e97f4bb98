use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    load_settings, GithubRepoService, NavigationController, RepoViewController, RepoViewState,
    UiContext,
};
use futures::StreamExt;
use shared::{domain::RepoId, Resource};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Load a GitHub repository and print its details")]
struct Args {
    /// Repository as `owner/name`.
    repo: String,
    /// Settings file; defaults to `repo_viewer.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_base_url: Option<String>,
    /// Retry this many times after a failed load.
    #[arg(long, default_value_t = 0)]
    retries: u32,
    /// Navigate to this user once the repository is loaded.
    #[arg(long, conflicts_with = "open_owner")]
    open_user: Option<String>,
    /// Navigate to the repository owner once loaded.
    #[arg(long)]
    open_owner: bool,
}

struct PrintingNavigator;

impl NavigationController for PrintingNavigator {
    fn navigate_to_user(&self, context: &UiContext, login: &str) {
        println!("[{}] open user {login}: https://github.com/{login}", context.0);
    }
}

fn print_state(state: &RepoViewState) {
    let target = state
        .repo_id
        .as_ref()
        .map(RepoId::to_string)
        .unwrap_or_else(|| "-".to_string());
    match &state.repo {
        Resource::Empty => println!("{target}: idle"),
        Resource::Loading => println!("{target}: loading..."),
        Resource::Success(repo) => {
            println!("{}  ★ {}", repo.full_name, repo.stars);
            if let Some(description) = &repo.description {
                println!("  {description}");
            }
            println!("  owner: {}", repo.owner.login);
        }
        Resource::Error(failure) => println!("{target}: failed: {failure}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let repo_id = RepoId::parse(&args.repo)
        .with_context(|| format!("expected owner/name, got '{}'", args.repo))?;
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_base_url) = args.api_base_url {
        settings.api_base_url = api_base_url;
    }

    let service = Arc::new(
        GithubRepoService::from_settings(&settings).context("failed to build github client")?,
    );
    let controller =
        RepoViewController::with_settings(service, Arc::new(PrintingNavigator), &settings)?;
    let mut states = controller.state_stream();
    let mut actions = controller.subscribe_ui_actions();
    let context = UiContext::new("repo_detail");

    controller.init(repo_id.clone());

    let mut retries_left = args.retries;
    let finished = loop {
        let Some(state) = states.next().await else {
            bail!("view state closed before {repo_id} finished loading");
        };
        print_state(&state);
        match &state.repo {
            Resource::Error(_) if retries_left > 0 => {
                retries_left -= 1;
                info!(repo = %repo_id, retries_left, "retrying repository load");
                controller.retry();
            }
            Resource::Success(_) | Resource::Error(_) => break state,
            Resource::Empty | Resource::Loading => {}
        }
    };

    if let Resource::Success(repo) = &finished.repo {
        let login = match (&args.open_user, args.open_owner) {
            (Some(login), _) => Some(login.clone()),
            (None, true) => Some(repo.owner.login.clone()),
            (None, false) => None,
        };
        if let Some(login) = login {
            controller.open_user_detail(login);
            let action = actions.recv().await.context("ui action stream closed")?;
            controller.dispatch_action(&action, &context);
        }
    }

    controller.dispose();

    if let Resource::Error(failure) = finished.repo {
        bail!("failed to load {repo_id}: {failure}");
    }
    Ok(())
}
