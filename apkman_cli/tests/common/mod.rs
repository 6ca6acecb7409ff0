#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use apkman_core::{
    api::{FileId, ProjectId, UserId, VersionId},
    models::{
        dashboard::DashboardStats, files::ApkFile, projects::Project, users::User,
        versions::Version,
    },
    Role, Timestamp,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};

pub const ADMIN_TOKEN: &str = "token-admin";
pub const USER_TOKEN: &str = "token-alice";

#[derive(Debug)]
pub enum MockError {
    Unauthorized,
    NotFound,
    Rejected(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        match self {
            MockError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Not authenticated" })),
            )
                .into_response(),
            MockError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": "Not found" })),
            )
                .into_response(),
            MockError::Rejected(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response(),
        }
    }
}

type MockResult = Result<Json<Value>, MockError>;
type SharedState = Arc<Mutex<MockState>>;

pub struct MockState {
    pub projects: Vec<Project>,
    pub versions: Vec<Version>,
    pub files: Vec<ApkFile>,
    pub users: Vec<User>,
    pub assignments: HashMap<UserId, Vec<ProjectId>>,
    /// Received uploads as (filename, size).
    pub uploads: Vec<(String, usize)>,
    /// `METHOD /path` of every request, in order.
    pub requests: Vec<String>,
    pub fail_deletes: bool,
    pub fail_uploads: bool,
    next_id: i64,
}

fn timestamp(value: &str) -> Timestamp {
    Timestamp::parse(value).unwrap()
}

pub fn admin() -> User {
    User {
        id: UserId(1),
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
        created_at: Some(timestamp("2024-01-01T08:00:00")),
    }
}

pub fn alice() -> User {
    User {
        id: UserId(2),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        role: Role::User,
        created_at: Some(timestamp("2024-02-01T08:00:00")),
    }
}

impl MockState {
    fn seeded() -> Self {
        MockState {
            projects: vec![
                Project {
                    id: ProjectId(1),
                    name: "Launcher".to_string(),
                    description: Some("Home screen".to_string()),
                    version_count: 1,
                    created_at: timestamp("2024-03-01T10:00:00"),
                },
                Project {
                    id: ProjectId(2),
                    name: "Camera".to_string(),
                    description: None,
                    version_count: 0,
                    created_at: timestamp("2024-03-02T10:00:00"),
                },
            ],
            versions: vec![Version {
                id: VersionId(10),
                version_string: "1.0.0".to_string(),
                file_count: 1,
                project_id: Some(ProjectId(1)),
                created_at: Some(timestamp("2024-03-03T10:00:00")),
            }],
            files: vec![ApkFile {
                id: FileId(100),
                filename: "launcher-1.0.0.apk".to_string(),
                file_size: 2048,
                uploaded_at: timestamp("2024-03-04T10:00:00"),
                uploader_name: Some("admin".to_string()),
                version_id: Some(VersionId(10)),
                uploaded_by: Some(UserId(1)),
            }],
            users: vec![admin(), alice()],
            assignments: HashMap::from([(UserId(2), vec![ProjectId(2)])]),
            uploads: vec![],
            requests: vec![],
            fail_deletes: false,
            fail_uploads: false,
            next_id: 1000,
        }
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn saw(&self, request: &str) -> bool {
        self.requests.iter().any(|x| x == request)
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests.iter().filter(|x| *x == request).count()
    }
}

pub struct MockServer {
    pub url: String,
    pub state: SharedState,
}

impl MockServer {
    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

/// Starts the mock API on a random local port. `url` already ends in `/api`.
pub async fn spawn() -> MockServer {
    let state = Arc::new(Mutex::new(MockState::seeded()));
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/:project_id",
            put(update_project).delete(delete_project),
        )
        .route(
            "/api/projects/:project_id/versions",
            get(list_versions).post(create_version),
        )
        .route("/api/versions/:version_id/files", get(list_files))
        .route("/api/versions/:version_id/upload", post(upload_file))
        .route("/api/files/:file_id", delete(delete_file))
        .route("/api/files/:file_id/download", get(download_file))
        .route("/api/users", get(list_users))
        .route("/api/users/:user_id", delete(delete_user))
        .route("/api/users/:user_id/password", patch(change_password))
        .route(
            "/api/users/:user_id/projects",
            get(user_projects).put(assign_projects),
        )
        .route("/api/broken", get(|| async { "<html>oops</html>" }))
        .route(
            "/api/validation",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "detail": [
                        { "loc": ["body", "name"], "msg": "field required" },
                        { "loc": ["body", "email"], "msg": "value is not a valid email" }
                    ] })),
                )
            }),
        )
        .layer(DefaultBodyLimit::disable())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        url: format!("http://{}/api", addr),
        state,
    }
}

fn success(data: impl serde::Serialize) -> MockResult {
    Ok(Json(json!({ "success": true, "data": data })))
}

fn authorize(state: &SharedState, headers: &HeaderMap, request: String) -> Result<(), MockError> {
    state.lock().unwrap().requests.push(request);
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|x| x.to_str().ok())
        .and_then(|x| x.strip_prefix("Bearer "))
        .ok_or(MockError::Unauthorized)?;
    if token == ADMIN_TOKEN || token == USER_TOKEN {
        Ok(())
    } else {
        Err(MockError::Unauthorized)
    }
}

async fn login(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    state
        .lock()
        .unwrap()
        .requests
        .push("POST /auth/login".to_string());
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let (token, user) = match (username, password) {
        ("admin", "secret") => (ADMIN_TOKEN, admin()),
        ("alice", "wonderland") => (USER_TOKEN, alice()),
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Incorrect username or password" })),
            )
                .into_response()
        }
    };
    Json(json!({
        "success": true,
        "data": { "access_token": token, "token_type": "bearer", "user": user }
    }))
    .into_response()
}

async fn register(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> MockResult {
    authorize(&state, &headers, "POST /auth/register".to_string())?;
    let mut state = state.lock().unwrap();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    if state.users.iter().any(|x| x.username == username) {
        return Err(MockError::Rejected("Username already registered".to_string()));
    }
    let user = User {
        id: UserId(state.next_id()),
        username,
        email: body["email"].as_str().unwrap_or_default().to_string(),
        role: if body["role"] == "ADMIN" {
            Role::Admin
        } else {
            Role::User
        },
        created_at: None,
    };
    state.users.push(user.clone());
    success(user)
}

async fn dashboard_stats(State(state): State<SharedState>, headers: HeaderMap) -> MockResult {
    authorize(&state, &headers, "GET /dashboard/stats".to_string())?;
    let state = state.lock().unwrap();
    success(DashboardStats {
        total_projects: state.projects.len() as u64,
        total_versions: state.versions.len() as u64,
        total_files: state.files.len() as u64,
        total_storage_bytes: state.files.iter().map(|x| x.file_size).sum(),
        total_storage_mb: None,
        download_trends: None,
        recent_downloads: None,
    })
}

async fn list_projects(State(state): State<SharedState>, headers: HeaderMap) -> MockResult {
    authorize(&state, &headers, "GET /projects".to_string())?;
    let state = state.lock().unwrap();
    success(&state.projects)
}

async fn create_project(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> MockResult {
    authorize(&state, &headers, "POST /projects".to_string())?;
    let mut state = state.lock().unwrap();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if name.is_empty() {
        return Err(MockError::Rejected("Project name is required".to_string()));
    }
    let project = Project {
        id: ProjectId(state.next_id()),
        name,
        description: body["description"].as_str().map(|x| x.to_string()),
        version_count: 0,
        created_at: timestamp("2024-04-01T10:00:00"),
    };
    state.projects.push(project.clone());
    success(project)
}

async fn update_project(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(project_id): Path<i64>,
    Json(body): Json<Value>,
) -> MockResult {
    authorize(&state, &headers, format!("PUT /projects/{}", project_id))?;
    let mut state = state.lock().unwrap();
    let project = state
        .projects
        .iter_mut()
        .find(|x| x.id == ProjectId(project_id))
        .ok_or(MockError::NotFound)?;
    if let Some(name) = body["name"].as_str() {
        project.name = name.to_string();
    }
    if let Some(description) = body["description"].as_str() {
        project.description = Some(description.to_string());
    }
    success(project.clone())
}

async fn delete_project(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(project_id): Path<i64>,
) -> MockResult {
    authorize(&state, &headers, format!("DELETE /projects/{}", project_id))?;
    let mut state = state.lock().unwrap();
    if state.fail_deletes {
        return Err(MockError::Rejected("Project is locked".to_string()));
    }
    let before = state.projects.len();
    state.projects.retain(|x| x.id != ProjectId(project_id));
    if state.projects.len() == before {
        return Err(MockError::NotFound);
    }
    success(json!({ "message": "Project deleted" }))
}

async fn list_versions(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(project_id): Path<i64>,
) -> MockResult {
    authorize(&state, &headers, format!("GET /projects/{}/versions", project_id))?;
    let state = state.lock().unwrap();
    let versions = state
        .versions
        .iter()
        .filter(|x| x.project_id == Some(ProjectId(project_id)))
        .cloned()
        .collect::<Vec<Version>>();
    success(versions)
}

async fn create_version(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(project_id): Path<i64>,
    Json(body): Json<Value>,
) -> MockResult {
    authorize(&state, &headers, format!("POST /projects/{}/versions", project_id))?;
    let mut state = state.lock().unwrap();
    let version = Version {
        id: VersionId(state.next_id()),
        version_string: body["version_string"].as_str().unwrap_or_default().to_string(),
        file_count: 0,
        project_id: Some(ProjectId(project_id)),
        created_at: None,
    };
    state.versions.push(version.clone());
    success(version)
}

async fn list_files(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(version_id): Path<i64>,
) -> MockResult {
    authorize(&state, &headers, format!("GET /versions/{}/files", version_id))?;
    let state = state.lock().unwrap();
    let files = state
        .files
        .iter()
        .filter(|x| x.version_id == Some(VersionId(version_id)))
        .cloned()
        .collect::<Vec<ApkFile>>();
    success(files)
}

async fn upload_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(version_id): Path<i64>,
    mut multipart: Multipart,
) -> MockResult {
    authorize(&state, &headers, format!("POST /versions/{}/upload", version_id))?;
    let mut received = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|x| MockError::Rejected(x.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|x| MockError::Rejected(x.to_string()))?;
        received = Some((filename, data.len()));
    }
    let (filename, size) = received.ok_or(MockError::Rejected("No file".to_string()))?;

    let mut state = state.lock().unwrap();
    if state.fail_uploads {
        return Err(MockError::Rejected("Storage quota exceeded".to_string()));
    }
    state.uploads.push((filename.clone(), size));
    let file = ApkFile {
        id: FileId(state.next_id()),
        filename,
        file_size: size as u64,
        uploaded_at: timestamp("2024-04-02T10:00:00"),
        uploader_name: Some("admin".to_string()),
        version_id: Some(VersionId(version_id)),
        uploaded_by: Some(UserId(1)),
    };
    state.files.push(file.clone());
    success(file)
}

async fn delete_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(file_id): Path<i64>,
) -> MockResult {
    authorize(&state, &headers, format!("DELETE /files/{}", file_id))?;
    let mut state = state.lock().unwrap();
    if state.fail_deletes {
        return Err(MockError::Rejected("File is in use".to_string()));
    }
    let before = state.files.len();
    state.files.retain(|x| x.id != FileId(file_id));
    if state.files.len() == before {
        return Err(MockError::NotFound);
    }
    success(json!({ "message": "File deleted" }))
}

async fn download_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(file_id): Path<i64>,
) -> Result<Response, MockError> {
    authorize(&state, &headers, format!("GET /files/{}/download", file_id))?;
    let state = state.lock().unwrap();
    let file = state
        .files
        .iter()
        .find(|x| x.id == FileId(file_id))
        .ok_or(MockError::NotFound)?;
    let disposition = format!("attachment; filename=\"../{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/vnd.android.package-archive".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        vec![7u8; file.file_size as usize],
    )
        .into_response())
}

async fn list_users(State(state): State<SharedState>, headers: HeaderMap) -> MockResult {
    authorize(&state, &headers, "GET /users".to_string())?;
    let state = state.lock().unwrap();
    success(&state.users)
}

async fn delete_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> MockResult {
    authorize(&state, &headers, format!("DELETE /users/{}", user_id))?;
    let mut state = state.lock().unwrap();
    if state.fail_deletes {
        return Err(MockError::Rejected("Cannot delete user".to_string()));
    }
    state.users.retain(|x| x.id != UserId(user_id));
    success(json!({ "message": "User deleted" }))
}

async fn change_password(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> MockResult {
    authorize(&state, &headers, format!("PATCH /users/{}/password", user_id))?;
    if body["password"].as_str().map(|x| x.len()).unwrap_or(0) < 6 {
        return Err(MockError::Rejected("Password too short".to_string()));
    }
    success(json!({ "message": "Password updated" }))
}

async fn user_projects(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> MockResult {
    authorize(&state, &headers, format!("GET /users/{}/projects", user_id))?;
    let state = state.lock().unwrap();
    success(
        state
            .assignments
            .get(&UserId(user_id))
            .cloned()
            .unwrap_or_default(),
    )
}

async fn assign_projects(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> MockResult {
    authorize(&state, &headers, format!("PUT /users/{}/projects", user_id))?;
    let project_ids = body["project_ids"]
        .as_array()
        .map(|x| x.iter().filter_map(|id| id.as_i64()).map(ProjectId).collect())
        .unwrap_or_default();
    state
        .lock()
        .unwrap()
        .assignments
        .insert(UserId(user_id), project_ids);
    success(json!({ "message": "Projects assigned" }))
}
