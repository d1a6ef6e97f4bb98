use super::*;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;
use shared::domain::RepoId;
use tokio::net::TcpListener;

use crate::{MissingNavigationController, RepoViewController};

async fn handle_repo(
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> HttpResponse {
    match (owner.as_str(), name.as_str()) {
        ("octocat", "Hello-World") => Json(json!({
            "id": 1296269,
            "name": "Hello-World",
            "full_name": "octocat/Hello-World",
            "description": "My first repository on GitHub!",
            "owner": {
                "login": "octocat",
                "avatar_url": "https://avatars.example/u/583231",
                "html_url": "https://github.com/octocat"
            },
            "stargazers_count": 42,
            "watchers_count": 42
        }))
        .into_response(),
        ("octocat", "private") => {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer ghp_test");
            if authorized {
                Json(json!({
                    "name": "private",
                    "full_name": "octocat/private",
                    "owner": { "login": "octocat" },
                    "stargazers_count": 1
                }))
                .into_response()
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Requires authentication" })),
                )
                    .into_response()
            }
        }
        ("octocat", "limited") => (
            StatusCode::FORBIDDEN,
            [("x-ratelimit-remaining", "0")],
            Json(json!({ "message": "API rate limit exceeded" })),
        )
            .into_response(),
        ("octocat", "garbled") => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })),
        )
            .into_response(),
    }
}

async fn spawn_github_server() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/repos/:owner/:name", get(handle_repo))
        .route("/api/v3/repos/:owner/:name", get(handle_repo));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[test]
fn repo_url_appends_to_base_path() {
    let service = GithubRepoService::new("https://ghe.example/api/v3/").expect("service");
    assert_eq!(
        service.repo_url("octocat", "Hello-World").expect("url").as_str(),
        "https://ghe.example/api/v3/repos/octocat/Hello-World"
    );

    let service = GithubRepoService::new("https://api.github.com").expect("service");
    assert_eq!(
        service.repo_url("octocat", "Hello-World").expect("url").as_str(),
        "https://api.github.com/repos/octocat/Hello-World"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    assert!(matches!(
        GithubRepoService::new("not a url"),
        Err(GithubError::InvalidBaseUrl(_))
    ));
    assert!(matches!(
        GithubRepoService::new("mailto:octocat@example.com"),
        Err(GithubError::InvalidBaseUrl(_))
    ));
}

#[tokio::test]
async fn fetch_repo_maps_github_payload() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = GithubRepoService::new(&base_url).expect("service");

    let repo = service
        .fetch_repo("octocat", "Hello-World")
        .await
        .expect("repo");

    assert_eq!(repo.name, "Hello-World");
    assert_eq!(repo.full_name, "octocat/Hello-World");
    assert_eq!(repo.stars, 42);
    assert_eq!(repo.owner.login, "octocat");
    assert_eq!(
        repo.description.as_deref(),
        Some("My first repository on GitHub!")
    );
}

#[tokio::test]
async fn fetch_repo_honours_base_path_prefix() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = GithubRepoService::new(&format!("{base_url}/api/v3")).expect("service");

    let repo = service
        .fetch_repo("octocat", "Hello-World")
        .await
        .expect("repo");
    assert_eq!(repo.stars, 42);
}

#[tokio::test]
async fn not_found_carries_github_message() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = GithubRepoService::new(&base_url).expect("service");

    let err = service
        .fetch_repo("octocat", "missing")
        .await
        .expect_err("404");

    match &err {
        GithubError::Status { status, error, .. } => {
            assert_eq!(*status, 404);
            assert_eq!(error.code, ErrorCode::NotFound);
            assert_eq!(error.message, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.code(), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn exhausted_rate_limit_is_reported_as_rate_limited() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = GithubRepoService::new(&base_url).expect("service");

    let err = service
        .fetch_repo("octocat", "limited")
        .await
        .expect_err("403");
    assert_eq!(err.code(), Some(ErrorCode::RateLimited));
    assert!(err.to_string().contains("API rate limit exceeded"));
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = GithubRepoService::new(&base_url).expect("service");

    let err = service
        .fetch_repo("octocat", "garbled")
        .await
        .expect_err("garbled body");
    assert!(matches!(err, GithubError::Decode { .. }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = GithubRepoService::from_settings(&ClientSettings {
        api_base_url: format!("http://{addr}"),
        request_timeout_secs: 5,
        ..ClientSettings::default()
    })
    .expect("service");

    let err = service
        .fetch_repo("octocat", "Hello-World")
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, GithubError::Transport { .. }), "got {err:?}");
}

#[tokio::test]
async fn auth_token_is_sent_as_bearer() {
    let base_url = spawn_github_server().await.expect("spawn server");

    let anonymous = GithubRepoService::new(&base_url).expect("service");
    let err = anonymous
        .fetch_repo("octocat", "private")
        .await
        .expect_err("401");
    assert_eq!(err.code(), Some(ErrorCode::Unauthorized));

    let authenticated = GithubRepoService::from_settings(&ClientSettings {
        api_base_url: base_url,
        auth_token: Some("ghp_test".to_string()),
        ..ClientSettings::default()
    })
    .expect("service");
    let repo = authenticated
        .fetch_repo("octocat", "private")
        .await
        .expect("repo");
    assert_eq!(repo.full_name, "octocat/private");
}

#[tokio::test]
async fn load_repo_keeps_github_error_downcastable() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = GithubRepoService::new(&base_url).expect("service");

    let err = service
        .load_repo("octocat", "missing")
        .await
        .expect_err("404");
    let github = err.downcast_ref::<GithubError>().expect("github error");
    assert_eq!(github.code(), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn controller_loads_repository_through_github_service() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = Arc::new(GithubRepoService::new(&base_url).expect("service"));
    let controller = RepoViewController::new(service, Arc::new(MissingNavigationController))
        .expect("inside runtime");
    let mut rx = controller.subscribe_state();

    controller.init(RepoId::new("octocat", "Hello-World"));
    assert!(controller.state().repo.is_loading());

    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| state.repo.is_terminal()),
    )
    .await
    .expect("fetch finished in time")
    .expect("sender alive")
    .clone();

    let repo = state.repo.value().expect("success");
    assert_eq!(repo.stars, 42);
    assert_eq!(repo.id(), RepoId::new("octocat", "Hello-World"));
}

#[tokio::test]
async fn controller_surfaces_github_failure_as_error_state() {
    let base_url = spawn_github_server().await.expect("spawn server");
    let service = Arc::new(GithubRepoService::new(&base_url).expect("service"));
    let controller = RepoViewController::new(service, Arc::new(MissingNavigationController))
        .expect("inside runtime");
    let mut rx = controller.subscribe_state();

    controller.init(RepoId::new("octocat", "missing"));

    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| state.repo.is_terminal()),
    )
    .await
    .expect("fetch finished in time")
    .expect("sender alive")
    .clone();

    let failure = state.repo.error().expect("error state");
    assert!(failure.message().contains("Not Found"), "got {failure}");
    assert!(failure.cause().downcast_ref::<GithubError>().is_some());
}
