use apkman_cli::{
    client::{ApiClient, RequestBody},
    error::ClientError,
};
use apkman_core::{
    api::{FileId, ProjectId, ProjectUpdateBody},
    models::projects::Project,
};
use reqwest::Method;

mod common;

fn client(server: &common::MockServer, token: Option<&str>) -> ApiClient {
    let mut api = ApiClient::new(server.url.clone()).unwrap();
    api.set_token(token.map(|x| x.to_string()));
    api
}

#[tokio::test]
async fn login_returns_token_and_user() {
    let server = common::spawn().await;
    let api = client(&server, None);

    let response = api.login("alice", "wonderland").await.unwrap();

    assert_eq!(response.access_token, common::USER_TOKEN);
    assert_eq!(response.token_type, "bearer");
    assert_eq!(response.user, common::alice());
}

#[tokio::test]
async fn missing_token_surfaces_framework_detail() {
    let server = common::spawn().await;
    let api = client(&server, None);

    let err = api.list_projects().await.unwrap_err();

    assert!(matches!(&err, ClientError::Api(message) if message == "Not authenticated"));
}

#[tokio::test]
async fn validation_details_are_joined() {
    let server = common::spawn().await;
    let api = client(&server, Some(common::ADMIN_TOKEN));

    let err = api
        .request_empty(Method::POST, "/validation", RequestBody::Empty)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "field required; value is not a valid email"
    );
}

#[tokio::test]
async fn non_json_body_is_a_malformed_response() {
    let server = common::spawn().await;
    let api = client(&server, Some(common::ADMIN_TOKEN));

    let err = api
        .request::<Vec<Project>>(Method::GET, "/broken", RequestBody::Empty)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MalformedResponse(_)));
    assert_eq!(err.to_string(), "Invalid server response");
}

#[tokio::test]
async fn envelope_error_wins_over_status() {
    let server = common::spawn().await;
    let api = client(&server, Some(common::ADMIN_TOKEN));

    let err = api.delete_project(ProjectId(99)).await.unwrap_err();

    assert_eq!(err.to_string(), "Not found");
}

#[tokio::test]
async fn update_only_sends_given_fields() {
    let server = common::spawn().await;
    let api = client(&server, Some(common::ADMIN_TOKEN));

    let project = api
        .update_project(
            ProjectId(1),
            &ProjectUpdateBody {
                name: Some("Launcher 2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(project.name, "Launcher 2");
    assert_eq!(project.description.as_deref(), Some("Home screen"));
}

#[tokio::test]
async fn download_writes_attachment_into_directory() {
    let server = common::spawn().await;
    let api = client(&server, Some(common::ADMIN_TOKEN));
    let dir = tempfile::tempdir().unwrap();

    let path = api.download(FileId(100), dir.path(), false).await.unwrap();

    assert_eq!(path, dir.path().join("launcher-1.0.0.apk"));
    assert_eq!(std::fs::read(&path).unwrap().len(), 2048);
}

#[tokio::test]
async fn download_never_overwrites_an_existing_file() {
    let server = common::spawn().await;
    let api = client(&server, Some(common::ADMIN_TOKEN));
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("launcher-1.0.0.apk");
    std::fs::write(&existing, b"keep me").unwrap();

    let first = api.download(FileId(100), dir.path(), false).await.unwrap();
    let second = api.download(FileId(100), dir.path(), false).await.unwrap();

    assert_eq!(first, dir.path().join("launcher-1.0.0 (1).apk"));
    assert_eq!(second, dir.path().join("launcher-1.0.0 (2).apk"));
    assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");
    assert_eq!(std::fs::read(&second).unwrap().len(), 2048);
}

#[tokio::test]
async fn download_of_missing_file_reports_server_error() {
    let server = common::spawn().await;
    let api = client(&server, Some(common::ADMIN_TOKEN));
    let dir = tempfile::tempdir().unwrap();

    let err = api.download(FileId(5), dir.path(), false).await.unwrap_err();

    assert_eq!(err.to_string(), "Not found");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn download_link_carries_token() {
    let server = common::spawn().await;

    assert!(matches!(
        client(&server, None).download_link(FileId(3)),
        Err(ClientError::NotLoggedIn)
    ));
    assert_eq!(
        client(&server, Some("abc")).download_link(FileId(3)).unwrap(),
        format!("{}/files/3/download?token=abc", server.url)
    );
}
