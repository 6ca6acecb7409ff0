use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use apkman_core::{
    api::{FileId, ProjectCreateBody, ProjectId, ProjectUpdateBody, RegisterBody, UserId, VersionId},
    models::{
        dashboard::DashboardStats, files::ApkFile, projects::Project, users::User,
        versions::Version,
    },
};
use log::{debug, info, warn};

use crate::{
    client::ApiClient,
    error::{ClientError, ClientResult},
    session::{KeyValueStore, Session, SessionStore},
    ui::{
        guard::{RequestGuard, Ticket},
        modal::{ClickTarget, ModalId, Modals},
        page::{Page, Screen},
        toast::{ToastKind, Toasts},
        tree::ProjectTree,
        Listing,
    },
    upload::{select_apk, SelectedApk},
};

#[derive(Debug, Default)]
pub struct UploadState {
    pub version: Option<VersionId>,
    pub selected: Option<SelectedApk>,
    /// Last reported percentage while an upload is shown.
    pub progress: Option<u8>,
}

#[derive(Debug)]
pub struct Assignment {
    pub user: UserId,
    pub username: String,
    pub choices: Listing<(Project, bool)>,
}

/// Application context: the session, the API client and every piece of
/// view state. Handlers report failures as toasts (or the inline login
/// error) and also return them so callers can set an exit status.
pub struct Console<S> {
    api: ApiClient,
    sessions: SessionStore<S>,
    session: Option<Session>,
    screen: Screen,
    page: Page,
    login_error: Option<String>,
    guard: RequestGuard,
    pub stats: Option<DashboardStats>,
    pub recent_projects: Listing<Project>,
    pub tree: ProjectTree,
    pub users: Listing<User>,
    pub toasts: Toasts,
    pub modals: Modals,
    pub upload: UploadState,
    pub assignment: Option<Assignment>,
}

impl<S: KeyValueStore> Console<S> {
    pub fn new(api: ApiClient, store: S) -> Self {
        Console {
            api,
            sessions: SessionStore::new(store),
            session: None,
            screen: Screen::Login,
            page: Page::Dashboard,
            login_error: None,
            guard: RequestGuard::default(),
            stats: None,
            recent_projects: Listing::Loading,
            tree: ProjectTree::default(),
            users: Listing::Loading,
            toasts: Toasts::default(),
            modals: Modals::default(),
            upload: UploadState::default(),
            assignment: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.session.as_ref().map(|x| x.is_admin()).unwrap_or(false)
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &S {
        self.sessions.inner()
    }

    fn notify(&mut self, kind: ToastKind, title: &str, message: &str) {
        self.toasts.push(kind, title, message, Instant::now());
    }

    fn fail<T>(&mut self, title: &str, err: ClientError) -> ClientResult<T> {
        warn!("{}: {}", title, err);
        self.notify(ToastKind::Error, title, &err.to_string());
        Err(err)
    }

    /// Dismisses the dialog on top as an overlay click would, dropping
    /// whatever it was editing.
    pub fn cancel_modal(&mut self) -> Option<ModalId> {
        let id = self.modals.top()?;
        self.modals.click(id, ClickTarget::Overlay);
        match id {
            ModalId::Upload => self.upload = UploadState::default(),
            ModalId::AssignProjects => self.assignment = None,
            _ => {}
        }
        debug!("Closed {} dialog", id.title());
        Some(id)
    }

    // Auth

    /// Picks up a persisted session without loading any page.
    pub fn restore(&mut self) -> bool {
        match self.sessions.load() {
            Some(session) => {
                debug!("Restored session for {}", session.user.username);
                self.api.set_token(Some(session.token.clone()));
                self.session = Some(session);
                self.screen = Screen::App;
                true
            }
            None => false,
        }
    }

    /// Restores a persisted session and opens the dashboard if there is one.
    pub async fn boot(&mut self) -> bool {
        if self.restore() {
            self.init_app().await;
            true
        } else {
            false
        }
    }

    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<()> {
        self.login_error = None;
        let result = match self.api.login(username.trim(), password).await {
            Ok(response) => {
                let session = Session {
                    token: response.access_token,
                    user: response.user,
                };
                self.sessions.save(&session).map(|_| session)
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(session) => {
                info!("Signed in as {}", session.user.username);
                self.api.set_token(Some(session.token.clone()));
                self.session = Some(session);
                self.init_app().await;
                Ok(())
            }
            Err(err) => {
                self.login_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        self.sessions.clear()?;
        self.api.set_token(None);
        self.session = None;
        self.screen = Screen::Login;
        self.guard.advance();
        self.stats = None;
        self.recent_projects = Listing::Loading;
        self.tree = ProjectTree::default();
        self.users = Listing::Loading;
        self.upload = UploadState::default();
        self.assignment = None;
        Ok(())
    }

    async fn init_app(&mut self) {
        self.screen = Screen::App;
        self.navigate(Page::Dashboard).await;
    }

    // Navigation

    /// Shows `page` and reloads its data.
    pub async fn navigate(&mut self, page: Page) {
        self.page = page;
        self.guard.advance();
        self.reload().await;
    }

    pub async fn reload(&mut self) {
        match self.page {
            Page::Dashboard => self.load_dashboard().await,
            Page::Projects => self.load_projects().await,
            Page::Users => self.load_users().await,
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.guard.issue()
    }

    async fn refresh_dashboard(&mut self) {
        if self.page == Page::Dashboard {
            self.load_dashboard().await;
        }
    }

    // Dashboard

    pub async fn load_dashboard(&mut self) {
        let ticket = self.guard.issue();
        let result = self.fetch_dashboard().await;
        self.apply_dashboard(ticket, result);
    }

    async fn fetch_dashboard(&self) -> ClientResult<(DashboardStats, Vec<Project>)> {
        let stats = self.api.dashboard_stats().await?;
        let projects = self.api.list_projects().await?;
        Ok((stats, projects))
    }

    pub fn apply_dashboard(
        &mut self,
        ticket: Ticket,
        result: ClientResult<(DashboardStats, Vec<Project>)>,
    ) -> bool {
        if !self.guard.is_current(ticket) {
            debug!("Discarding stale dashboard response");
            return false;
        }
        match result {
            Ok((stats, projects)) => {
                self.stats = Some(stats);
                self.recent_projects = Listing::Loaded(projects);
            }
            Err(err) => {
                let _ = self.fail::<()>("Error", err);
            }
        }
        true
    }

    // Projects tree

    pub async fn load_projects(&mut self) {
        self.tree.set_loading();
        let ticket = self.guard.issue();
        let result = self.api.list_projects().await;
        self.apply_projects(ticket, result);
    }

    pub fn apply_projects(&mut self, ticket: Ticket, result: ClientResult<Vec<Project>>) -> bool {
        if !self.guard.is_current(ticket) {
            debug!("Discarding stale project list");
            return false;
        }
        if let Err(err) = &result {
            warn!("Loading projects failed: {}", err);
            self.notify(ToastKind::Error, "Error", &err.to_string());
        }
        self.tree.set_projects(result);
        true
    }

    pub async fn toggle_project(&mut self, id: ProjectId) {
        match self.tree.toggle_project(id) {
            Some(true) => self.load_versions(id).await,
            Some(false) => {}
            None => warn!("Project #{} is not in the tree", id),
        }
    }

    pub async fn load_versions(&mut self, id: ProjectId) {
        let ticket = self.guard.issue();
        let result = self.api.list_versions(id).await;
        self.apply_versions(ticket, id, result);
    }

    pub fn apply_versions(&mut self, ticket: Ticket, id: ProjectId, result: ClientResult<Vec<Version>>) -> bool {
        if !self.guard.is_current(ticket) {
            debug!("Discarding stale versions of project #{}", id);
            return false;
        }
        self.tree.set_versions(id, result);
        true
    }

    pub async fn toggle_version(&mut self, id: VersionId) {
        match self.tree.toggle_version(id) {
            Some(true) => self.load_files(id).await,
            Some(false) => {}
            None => warn!("Version #{} is not in the tree", id),
        }
    }

    pub async fn load_files(&mut self, id: VersionId) {
        let ticket = self.guard.issue();
        let result = self.api.list_files(id).await;
        self.apply_files(ticket, id, result);
    }

    pub fn apply_files(&mut self, ticket: Ticket, id: VersionId, result: ClientResult<Vec<ApkFile>>) -> bool {
        if !self.guard.is_current(ticket) {
            debug!("Discarding stale files of version #{}", id);
            return false;
        }
        self.tree.set_files(id, result);
        true
    }

    /// Fetches the files of one version without touching the tree.
    pub async fn list_files(&mut self, id: VersionId) -> ClientResult<Vec<ApkFile>> {
        match self.api.list_files(id).await {
            Ok(files) => Ok(files),
            Err(err) => self.fail("Error", err),
        }
    }

    /// Expands every project and version, fetching all levels.
    pub async fn expand_all(&mut self) {
        let projects = self
            .tree
            .projects
            .items()
            .iter()
            .filter(|x| !x.expanded)
            .map(|x| x.project.id)
            .collect::<Vec<ProjectId>>();
        for id in projects {
            self.toggle_project(id).await;
        }
        let versions = self
            .tree
            .projects
            .items()
            .iter()
            .flat_map(|x| x.versions.items().iter())
            .filter(|x| !x.expanded)
            .map(|x| x.version.id)
            .collect::<Vec<VersionId>>();
        for id in versions {
            self.toggle_version(id).await;
        }
    }

    fn project_label(&self, id: ProjectId) -> String {
        self.tree
            .project(id)
            .map(|x| x.project.name.clone())
            .unwrap_or(format!("#{}", id))
    }

    pub fn open_create_project(&mut self) {
        self.modals.open(ModalId::CreateProject);
    }

    pub async fn submit_create_project(&mut self, name: &str, description: &str) -> ClientResult<Project> {
        let body = ProjectCreateBody {
            name: name.trim().to_string(),
            description: Some(description.trim().to_string()).filter(|x| !x.is_empty()),
        };
        match self.api.create_project(&body).await {
            Ok(project) => {
                self.modals.close(ModalId::CreateProject);
                self.notify(
                    ToastKind::Success,
                    "Success",
                    &format!("Project \"{}\" created", body.name),
                );
                self.load_projects().await;
                self.refresh_dashboard().await;
                Ok(project)
            }
            Err(err) => self.fail("Error", err),
        }
    }

    pub fn open_edit_project(&mut self) {
        self.modals.open(ModalId::EditProject);
    }

    pub async fn submit_update_project(&mut self, id: ProjectId, name: Option<&str>, description: Option<&str>) -> ClientResult<Project> {
        let body = ProjectUpdateBody {
            name: name.map(|x| x.trim().to_string()).filter(|x| !x.is_empty()),
            description: description.map(|x| x.trim().to_string()),
        };
        match self.api.update_project(id, &body).await {
            Ok(project) => {
                self.modals.close(ModalId::EditProject);
                self.notify(
                    ToastKind::Success,
                    "Success",
                    &format!("Project \"{}\" updated", project.name),
                );
                self.load_projects().await;
                Ok(project)
            }
            Err(err) => self.fail("Error", err),
        }
    }

    /// Deletes a project once the caller confirmed it. Its row goes away
    /// only after the server agreed.
    pub async fn delete_project(&mut self, id: ProjectId) -> ClientResult<()> {
        let name = self.project_label(id);
        match self.api.delete_project(id).await {
            Ok(()) => {
                self.tree.remove_project(id);
                self.notify(
                    ToastKind::Success,
                    "Deleted",
                    &format!("Project \"{}\" deleted", name),
                );
                self.load_projects().await;
                self.refresh_dashboard().await;
                Ok(())
            }
            Err(err) => self.fail("Error", err),
        }
    }

    // Versions

    pub fn open_create_version(&mut self) {
        self.modals.open(ModalId::CreateVersion);
    }

    pub async fn submit_create_version(&mut self, project: ProjectId, version_string: &str) -> ClientResult<Version> {
        let version_string = version_string.trim();
        match self.api.create_version(project, version_string).await {
            Ok(version) => {
                self.modals.close(ModalId::CreateVersion);
                self.notify(
                    ToastKind::Success,
                    "Success",
                    &format!("Version \"{}\" created", version_string),
                );
                if self.tree.is_project_expanded(project) {
                    self.load_versions(project).await;
                }
                self.refresh_dashboard().await;
                Ok(version)
            }
            Err(err) => self.fail("Error", err),
        }
    }

    // Upload

    pub fn open_upload(&mut self, version: VersionId) {
        self.upload = UploadState {
            version: Some(version),
            selected: None,
            progress: None,
        };
        self.modals.open(ModalId::Upload);
    }

    /// Picks the file to upload. Anything but `.apk` is refused here,
    /// before the network is involved.
    pub fn select_file<P>(&mut self, path: P) -> ClientResult<&SelectedApk>
    where
        P: AsRef<Path>,
    {
        match select_apk(path) {
            Ok(selected) => Ok(&*self.upload.selected.insert(selected)),
            Err(err) => {
                self.upload.selected = None;
                self.fail("Invalid File", err)
            }
        }
    }

    pub fn clear_file_selection(&mut self) {
        self.upload.selected = None;
    }

    /// Uploads the selected file. Does nothing without a selection.
    pub async fn submit_upload<F>(&mut self, on_progress: F) -> ClientResult<Option<ApkFile>>
    where
        F: FnMut(u8) + Send + 'static,
    {
        let (Some(version), Some(selected)) = (self.upload.version, self.upload.selected.clone()) else {
            return Ok(None);
        };
        self.upload.progress = Some(0);
        info!("Uploading {} to version #{}...", selected.filename, version);
        match self.api.upload_apk(version, &selected, on_progress).await {
            Ok(file) => {
                self.upload.progress = Some(100);
                self.upload.selected = None;
                self.modals.close(ModalId::Upload);
                self.notify(
                    ToastKind::Success,
                    "Upload Successful",
                    &format!("{} uploaded", selected.filename),
                );
                if self.tree.is_version_expanded(version) {
                    self.load_files(version).await;
                }
                self.refresh_dashboard().await;
                Ok(Some(file))
            }
            Err(err) => {
                self.upload.progress = None;
                self.clear_file_selection();
                self.fail("Upload Failed", err)
            }
        }
    }

    // Files

    pub async fn delete_file(&mut self, id: FileId) -> ClientResult<()> {
        let filename = self
            .tree
            .projects
            .items()
            .iter()
            .flat_map(|x| x.versions.items().iter())
            .flat_map(|x| x.files.items().iter())
            .find(|x| x.id == id)
            .map(|x| x.filename.clone())
            .unwrap_or(format!("File #{}", id));
        match self.api.delete_file(id).await {
            Ok(()) => {
                self.tree.remove_file(id);
                self.notify(ToastKind::Success, "Deleted", &format!("{} deleted", filename));
                self.refresh_dashboard().await;
                Ok(())
            }
            Err(err) => self.fail("Error", err),
        }
    }

    pub async fn download_file<P>(&mut self, id: FileId, directory: P, show_progress: bool) -> ClientResult<PathBuf>
    where
        P: AsRef<Path>,
    {
        match self.api.download(id, directory, show_progress).await {
            Ok(path) => {
                self.notify(
                    ToastKind::Success,
                    "Downloaded",
                    &path.to_string_lossy(),
                );
                Ok(path)
            }
            Err(err) => self.fail("Download Failed", err),
        }
    }

    pub fn download_link(&mut self, id: FileId) -> ClientResult<String> {
        match self.api.download_link(id) {
            Ok(link) => Ok(link),
            Err(err) => self.fail("Error", err),
        }
    }

    // Users

    pub async fn load_users(&mut self) {
        self.users = Listing::Loading;
        let ticket = self.guard.issue();
        let result = self.api.list_users().await;
        self.apply_users(ticket, result);
    }

    pub fn apply_users(&mut self, ticket: Ticket, result: ClientResult<Vec<User>>) -> bool {
        if !self.guard.is_current(ticket) {
            debug!("Discarding stale user list");
            return false;
        }
        if let Err(err) = &result {
            warn!("Loading users failed: {}", err);
            self.notify(ToastKind::Error, "Error", &err.to_string());
        }
        self.users = Listing::from_result(result);
        true
    }

    pub fn open_register(&mut self) {
        self.modals.open(ModalId::Register);
    }

    pub async fn submit_register(&mut self, body: RegisterBody) -> ClientResult<User> {
        let body = RegisterBody {
            username: body.username.trim().to_string(),
            email: body.email.trim().to_string(),
            ..body
        };
        match self.api.register(&body).await {
            Ok(user) => {
                self.modals.close(ModalId::Register);
                self.notify(
                    ToastKind::Success,
                    "User Created",
                    &format!("{} has been added", body.username),
                );
                if self.page == Page::Users {
                    self.load_users().await;
                }
                Ok(user)
            }
            Err(err) => self.fail("Error", err),
        }
    }

    /// Name of a user for messages, loading the user list if needed.
    /// Falls back to `#id` when the user is unknown.
    pub async fn username_of(&mut self, id: UserId) -> String {
        if !matches!(self.users, Listing::Loaded(_)) {
            self.load_users().await;
        }
        self.users
            .items()
            .iter()
            .find(|x| x.id == id)
            .map(|x| x.username.clone())
            .unwrap_or(format!("#{}", id))
    }

    pub async fn delete_user(&mut self, id: UserId) -> ClientResult<()> {
        let username = self.username_of(id).await;
        match self.api.delete_user(id).await {
            Ok(()) => {
                if let Some(users) = self.users.items_mut() {
                    users.retain(|x| x.id != id);
                }
                self.notify(
                    ToastKind::Success,
                    "Deleted",
                    &format!("User \"{}\" has been deleted", username),
                );
                Ok(())
            }
            Err(err) => self.fail("Error", err),
        }
    }

    pub fn open_change_password(&mut self) {
        self.modals.open(ModalId::ChangePassword);
    }

    pub async fn submit_change_password(&mut self, id: UserId, password: &str) -> ClientResult<()> {
        match self.api.change_password(id, password).await {
            Ok(()) => {
                self.modals.close(ModalId::ChangePassword);
                self.notify(ToastKind::Success, "Success", "Password updated successfully");
                Ok(())
            }
            Err(err) => self.fail("Error", err),
        }
    }

    /// Opens the assignment dialog and loads every project with a flag for
    /// the ones `user` can already access.
    pub async fn open_assign_projects(&mut self, user: UserId, username: &str) -> ClientResult<()> {
        self.assignment = Some(Assignment {
            user,
            username: username.to_string(),
            choices: Listing::Loading,
        });
        self.modals.open(ModalId::AssignProjects);

        match self.fetch_assignments(user).await {
            Ok(choices) => {
                if let Some(assignment) = self.assignment.as_mut().filter(|x| x.user == user) {
                    assignment.choices = Listing::Loaded(choices);
                }
                Ok(())
            }
            Err(err) => {
                if let Some(assignment) = self.assignment.as_mut().filter(|x| x.user == user) {
                    assignment.choices = Listing::Failed(err.to_string());
                }
                self.fail("Error loading projects", err)
            }
        }
    }

    async fn fetch_assignments(&self, user: UserId) -> ClientResult<Vec<(Project, bool)>> {
        let projects = self.api.list_projects().await?;
        let assigned = self.api.user_projects(user).await?;
        Ok(projects
            .into_iter()
            .map(|x| {
                let checked = assigned.contains(&x.id);
                (x, checked)
            })
            .collect())
    }

    pub async fn submit_assign_projects(&mut self, user: UserId, project_ids: Vec<ProjectId>) -> ClientResult<()> {
        match self.api.assign_user_projects(user, project_ids).await {
            Ok(()) => {
                self.modals.close(ModalId::AssignProjects);
                self.assignment = None;
                self.notify(ToastKind::Success, "Success", "Projects assigned successfully");
                Ok(())
            }
            Err(err) => self.fail("Error", err),
        }
    }
}
