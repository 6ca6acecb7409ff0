use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use apkman_core::{
    api::{
        Envelope, FileId, LoginBody, LoginResponse, PasswordUpdateBody, ProjectAssignBody,
        ProjectCreateBody, ProjectId, ProjectUpdateBody, RegisterBody, Reply, UserId,
        VersionCreateBody, VersionId,
    },
    models::{
        dashboard::DashboardStats, files::ApkFile, projects::Project, users::User,
        versions::Version,
    },
};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use reqwest::{
    header::{HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION},
    multipart::{Form, Part},
    Body, Client, Method, RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::AsyncWriteExt;

use crate::{
    error::{ClientError, ClientResult},
    upload::{ProgressTracker, SelectedApk},
};

const REQUEST_FAILED: &str = "Request failed";
const UPLOAD_FAILED: &str = "Upload failed";
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
const APK_MIME: &str = "application/vnd.android.package-archive";

pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Form),
}

impl RequestBody {
    pub fn json<B: Serialize>(body: &B) -> ClientResult<Self> {
        serde_json::to_value(body)
            .map(RequestBody::Json)
            .map_err(ClientError::MalformedResponse)
    }
}

/// REST client for the APK manager API. Holds the bearer token of the
/// current session, if any.
pub struct ApiClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(api_url: impl Into<String>) -> ClientResult<Self> {
        Ok(ApiClient {
            http: Client::builder().build()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        match &self.token {
            Some(token) => {
                let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ClientError::Api("Stored token is not a valid header".to_string()))?;
                auth_value.set_sensitive(true);
                Ok(builder.header(AUTHORIZATION, auth_value))
            }
            None => Ok(builder),
        }
    }

    async fn send<T>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        fallback: &str,
    ) -> ClientResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        debug!("{} {}", method, path);
        let builder = self.authorize(self.http.request(method, self.url(path)))?;
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };
        let response = builder.send().await?;
        let ok = response.status().is_success();
        let bytes = response.bytes().await?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(ClientError::MalformedResponse)?;
        match envelope.into_reply(ok, fallback) {
            Reply::Success(data) => Ok(data),
            Reply::Failure(message) => Err(ClientError::Api(message)),
        }
    }

    /// Sends a request whose envelope must carry a payload.
    pub async fn request<T>(&self, method: Method, path: &str, body: RequestBody) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.send(method, path, body, REQUEST_FAILED)
            .await?
            .ok_or_else(|| ClientError::Api("Response carried no data".to_string()))
    }

    /// Sends a request whose payload, if any, is ignored.
    pub async fn request_empty(&self, method: Method, path: &str, body: RequestBody) -> ClientResult<()> {
        self.send::<serde_json::Value>(method, path, body, REQUEST_FAILED)
            .await
            .map(|_| ())
    }

    /// Uploads `apk` as the multipart field `file`, reporting whole
    /// percentages of the body handed to the transport. 100 is reported
    /// at the latest once the server accepted the file.
    pub async fn upload<F>(&self, path: &str, apk: &SelectedApk, on_progress: F) -> ClientResult<ApkFile>
    where
        F: FnMut(u8) + Send + 'static,
    {
        let data = tokio::fs::read(&apk.path).await?;
        let total = data.len() as u64;
        let tracker = Arc::new(Mutex::new(ProgressTracker::new(total, on_progress)));
        if let Ok(mut tracker) = tracker.lock() {
            tracker.start();
        }

        let chunks = data
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(|x| x.to_vec())
            .collect::<Vec<Vec<u8>>>();
        let stream_tracker = tracker.clone();
        let stream = futures_util::stream::iter(chunks).map(move |chunk| {
            if let Ok(mut tracker) = stream_tracker.lock() {
                tracker.advance(chunk.len() as u64);
            }
            Ok::<Vec<u8>, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(apk.filename.clone())
            .mime_str(APK_MIME)?;
        let form = Form::new().part("file", part);

        let file = self
            .send::<ApkFile>(Method::POST, path, RequestBody::Multipart(form), UPLOAD_FAILED)
            .await?
            .ok_or_else(|| ClientError::Api(UPLOAD_FAILED.to_string()))?;
        if let Ok(mut tracker) = tracker.lock() {
            tracker.finish();
        }
        Ok(file)
    }

    /// Streams a file download into `directory`, showing a progress bar.
    /// An existing file is never overwritten; the name gets a ` (n)` suffix
    /// instead. Returns the written path.
    pub async fn download<P>(&self, file_id: FileId, directory: P, show_progress: bool) -> ClientResult<PathBuf>
    where
        P: AsRef<Path>,
    {
        let path = format!("/files/{}/download", file_id);
        debug!("GET {}", path);
        let response = self
            .authorize(self.http.get(self.url(&path)))?
            .send()
            .await?;
        if !response.status().is_success() {
            let bytes = response.bytes().await.unwrap_or_default();
            let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes)
                .ok()
                .and_then(|x| match x.into_reply(false, "Download failed") {
                    Reply::Failure(message) => Some(message),
                    Reply::Success(_) => None,
                })
                .unwrap_or("Download failed".to_string());
            return Err(ClientError::Api(message));
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|x| x.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or(format!("file_{}.apk", file_id));
        tokio::fs::create_dir_all(directory.as_ref()).await?;
        let (target, mut file) = create_unused(directory.as_ref(), &filename).await?;

        let bar = match (show_progress, response.content_length()) {
            (false, _) => ProgressBar::hidden(),
            (true, Some(size)) => {
                let bar = ProgressBar::new(size);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:.cyan/blue}] {bytes}/{total_bytes}",
                ) {
                    bar.set_style(style.progress_chars("#>-"));
                }
                bar
            }
            (true, None) => ProgressBar::new_spinner(),
        };

        let mut bar_progress: u64 = 0;
        let mut file_stream = response.bytes_stream();
        while let Some(chunk) = file_stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            bar_progress += chunk.len() as u64;
            bar.set_position(bar_progress);
        }
        file.flush().await?;
        bar.finish_and_clear();

        Ok(target)
    }

    /// Shareable link that authenticates through the `token` query parameter.
    pub fn download_link(&self, file_id: FileId) -> ClientResult<String> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(format!(
            "{}/files/{}/download?token={}",
            self.api_url, file_id, token
        ))
    }

    // Auth
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let body = LoginBody {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.request(Method::POST, "/auth/login", RequestBody::json(&body)?)
            .await
    }

    pub async fn register(&self, body: &RegisterBody) -> ClientResult<User> {
        self.request(Method::POST, "/auth/register", RequestBody::json(body)?)
            .await
    }

    // Dashboard
    pub async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
        self.request(Method::GET, "/dashboard/stats", RequestBody::Empty)
            .await
    }

    // Projects
    pub async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.request(Method::GET, "/projects", RequestBody::Empty).await
    }

    pub async fn create_project(&self, body: &ProjectCreateBody) -> ClientResult<Project> {
        self.request(Method::POST, "/projects", RequestBody::json(body)?)
            .await
    }

    pub async fn update_project(&self, id: ProjectId, body: &ProjectUpdateBody) -> ClientResult<Project> {
        self.request(
            Method::PUT,
            &format!("/projects/{}", id),
            RequestBody::json(body)?,
        )
        .await
    }

    pub async fn delete_project(&self, id: ProjectId) -> ClientResult<()> {
        self.request_empty(Method::DELETE, &format!("/projects/{}", id), RequestBody::Empty)
            .await
    }

    // Versions
    pub async fn list_versions(&self, project: ProjectId) -> ClientResult<Vec<Version>> {
        self.request(
            Method::GET,
            &format!("/projects/{}/versions", project),
            RequestBody::Empty,
        )
        .await
    }

    pub async fn create_version(&self, project: ProjectId, version_string: &str) -> ClientResult<Version> {
        let body = VersionCreateBody {
            version_string: version_string.to_string(),
        };
        self.request(
            Method::POST,
            &format!("/projects/{}/versions", project),
            RequestBody::json(&body)?,
        )
        .await
    }

    // Files
    pub async fn list_files(&self, version: VersionId) -> ClientResult<Vec<ApkFile>> {
        self.request(
            Method::GET,
            &format!("/versions/{}/files", version),
            RequestBody::Empty,
        )
        .await
    }

    pub async fn upload_apk<F>(&self, version: VersionId, apk: &SelectedApk, on_progress: F) -> ClientResult<ApkFile>
    where
        F: FnMut(u8) + Send + 'static,
    {
        self.upload(&format!("/versions/{}/upload", version), apk, on_progress)
            .await
    }

    pub async fn delete_file(&self, id: FileId) -> ClientResult<()> {
        self.request_empty(Method::DELETE, &format!("/files/{}", id), RequestBody::Empty)
            .await
    }

    // Users
    pub async fn list_users(&self) -> ClientResult<Vec<User>> {
        self.request(Method::GET, "/users", RequestBody::Empty).await
    }

    pub async fn delete_user(&self, id: UserId) -> ClientResult<()> {
        self.request_empty(Method::DELETE, &format!("/users/{}", id), RequestBody::Empty)
            .await
    }

    pub async fn change_password(&self, id: UserId, password: &str) -> ClientResult<()> {
        let body = PasswordUpdateBody {
            password: password.to_string(),
        };
        self.request_empty(
            Method::PATCH,
            &format!("/users/{}/password", id),
            RequestBody::json(&body)?,
        )
        .await
    }

    pub async fn user_projects(&self, id: UserId) -> ClientResult<Vec<ProjectId>> {
        self.request(
            Method::GET,
            &format!("/users/{}/projects", id),
            RequestBody::Empty,
        )
        .await
    }

    pub async fn assign_user_projects(&self, id: UserId, project_ids: Vec<ProjectId>) -> ClientResult<()> {
        self.request_empty(
            Method::PUT,
            &format!("/users/{}/projects", id),
            RequestBody::json(&ProjectAssignBody { project_ids })?,
        )
        .await
    }
}

/// Extracts the file name from a `Content-Disposition` header value,
/// keeping only the last path component.
pub fn attachment_filename(disposition: &str) -> Option<String> {
    let start = disposition.find("filename=")? + "filename=".len();
    let value = disposition[start..].trim_start_matches('"');
    let value = value.split('"').next()?.trim();
    let value = value.split(';').next()?.trim();
    let name = Path::new(value).file_name()?.to_string_lossy().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// `launcher.apk` becomes `launcher (n).apk`.
fn numbered(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", filename, n),
    }
}

/// Creates `filename` in `directory`, numbering the name until it does not
/// collide with an existing file.
async fn create_unused(directory: &Path, filename: &str) -> ClientResult<(PathBuf, tokio::fs::File)> {
    let mut n = 0;
    loop {
        let target = match n {
            0 => directory.join(filename),
            n => directory.join(numbered(filename, n)),
        };
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => return Ok((target, file)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(err) => return Err(err.into()),
        }
    }
}
