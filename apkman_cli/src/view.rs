//! Text rendering of console state.

use std::fmt::Write;

use apkman_core::{
    api::UserId,
    models::{
        dashboard::{DashboardStats, DownloadTrend, RecentDownload},
        files::ApkFile,
        projects::Project,
        users::User,
    },
    Role, Timestamp,
};
use colored::Colorize;

use crate::ui::{
    page::Page,
    toast::{Toast, ToastKind},
    tree::{ProjectNode, ProjectTree, VersionNode},
    Listing,
};

/// Number of projects listed on the dashboard.
pub const RECENT_PROJECTS: usize = 6;
const CHART_WIDTH: u64 = 40;

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// `Mar 5, 2024`
pub fn format_date(timestamp: &Timestamp) -> String {
    timestamp.0.format("%b %-d, %Y").to_string()
}

fn plural(count: u32, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

pub fn render_toast(toast: &Toast) -> String {
    let title = match toast.kind {
        ToastKind::Success => format!("✔ {}", toast.title).green(),
        ToastKind::Error => format!("✖ {}", toast.title).bright_red(),
        ToastKind::Info => format!("ℹ {}", toast.title).blue(),
    };
    match &toast.message {
        Some(message) => format!("{} {}", title.bold(), message),
        None => title.bold().to_string(),
    }
}

pub fn render_login(error: Option<&str>) -> String {
    let mut out = format!("{}\n", "APK Manager: sign in".bold());
    if let Some(error) = error {
        let _ = writeln!(out, "{}", error.bright_red());
    }
    out
}

pub fn render_header(user: &User, page: Page) -> String {
    let initial = user
        .username
        .chars()
        .next()
        .map(|x| x.to_uppercase().to_string())
        .unwrap_or_default();
    let nav = [Page::Dashboard, Page::Projects, Page::Users]
        .iter()
        .filter(|x| **x != Page::Users || user.is_admin())
        .map(|x| {
            if *x == page {
                format!("[{}]", x.title()).cyan().bold().to_string()
            } else {
                x.title().to_string()
            }
        })
        .collect::<Vec<String>>()
        .join("  ");
    format!(
        "({}) {} {}  |  {}\n{}\n",
        initial,
        user.username.bold(),
        role_tag(user.role),
        nav,
        page.title().bold().underline()
    )
}

fn role_tag(role: Role) -> String {
    let tag = format!("[{}]", role);
    match role {
        Role::Admin => tag.purple().to_string(),
        Role::User => tag.dimmed().to_string(),
    }
}

pub fn render_dashboard(stats: Option<&DashboardStats>, recent: &Listing<Project>, admin: bool) -> String {
    let mut out = String::new();
    match stats {
        Some(stats) => {
            let _ = writeln!(
                out,
                "Projects {}   Versions {}   Files {}   Storage {}",
                stats.total_projects.to_string().bold(),
                stats.total_versions.to_string().bold(),
                stats.total_files.to_string().bold(),
                format_bytes(stats.total_storage_bytes).bold()
            );
        }
        None => {
            let _ = writeln!(out, "{}", "Loading statistics...".dimmed());
        }
    }

    let _ = writeln!(out, "\n{}", "Recent projects".bold());
    out.push_str(&render_recent_projects(recent, admin));

    if let Some(trends) = stats.and_then(|x| x.download_trends.as_ref()) {
        let _ = writeln!(out, "\n{}", "Downloads".bold());
        out.push_str(&render_download_trends(trends));
    }
    if let Some(downloads) = stats.and_then(|x| x.recent_downloads.as_ref()) {
        let _ = writeln!(out, "\n{}", "Recent downloads".bold());
        out.push_str(&render_recent_downloads(downloads));
    }
    out
}

fn render_recent_projects(recent: &Listing<Project>, admin: bool) -> String {
    match recent {
        Listing::Loading => format!("  {}\n", "Loading...".dimmed()),
        Listing::Failed(_) => String::new(),
        Listing::Loaded(projects) if projects.is_empty() => {
            if admin {
                format!(
                    "  No projects yet. {}\n",
                    "Create one → apkman projects create <name>".dimmed()
                )
            } else {
                "  No projects yet.\n".to_string()
            }
        }
        Listing::Loaded(projects) => projects
            .iter()
            .take(RECENT_PROJECTS)
            .map(|x| {
                format!(
                    "  {} - {}  {}  {}\n",
                    x.name.bold(),
                    x.description.as_deref().unwrap_or("No description"),
                    plural(x.version_count, "version").cyan(),
                    format_date(&x.created_at).dimmed()
                )
            })
            .collect(),
    }
}

/// One bar per day, scaled to the busiest day.
pub fn render_download_trends(trends: &[DownloadTrend]) -> String {
    let peak = trends.iter().map(|x| x.count).max().unwrap_or(0).max(1);
    trends
        .iter()
        .map(|x| {
            let width = (x.count * CHART_WIDTH + peak - 1) / peak;
            format!(
                "  {} {} {}\n",
                x.date.dimmed(),
                "█".repeat(width as usize).cyan(),
                x.count
            )
        })
        .collect()
}

pub fn render_recent_downloads(downloads: &[RecentDownload]) -> String {
    if downloads.is_empty() {
        return format!("  {}\n", "No recent downloads.".italic().dimmed());
    }
    downloads
        .iter()
        .map(|x| {
            format!(
                "  {:<16} {}  {}\n",
                x.ip_address,
                x.filename.bold(),
                format_date(&x.downloaded_at).dimmed()
            )
        })
        .collect()
}

pub fn render_tree(tree: &ProjectTree, admin: bool) -> String {
    match &tree.projects {
        Listing::Loading => format!("{}\n", "Loading projects...".dimmed()),
        Listing::Failed(_) => String::new(),
        Listing::Loaded(projects) if projects.is_empty() => {
            if admin {
                format!(
                    "No projects yet  {}\n",
                    "Create First Project → apkman projects create <name>".dimmed()
                )
            } else {
                "No projects yet\n".to_string()
            }
        }
        Listing::Loaded(projects) => projects
            .iter()
            .map(|x| render_project_node(x, admin))
            .collect(),
    }
}

fn render_project_node(node: &ProjectNode, admin: bool) -> String {
    let project = &node.project;
    let marker = if node.expanded { "▾" } else { "▸" };
    let mut out = format!(
        "{} {} {}  {}",
        marker,
        format!("#{}", project.id).dimmed(),
        project.name.bold(),
        format!("{} ver", project.version_count).cyan()
    );
    if admin {
        out.push_str(&format!("  {}", "[add version] [delete]".dimmed()));
    }
    out.push('\n');
    if let Some(description) = &project.description {
        let _ = writeln!(out, "    {}", description.dimmed());
    }
    if !node.expanded {
        return out;
    }
    match &node.versions {
        Listing::Loading => {
            let _ = writeln!(out, "    {}", "Loading versions...".dimmed());
        }
        Listing::Failed(_) => {
            let _ = writeln!(out, "    {}", "Failed to load versions".bright_red());
        }
        Listing::Loaded(versions) if versions.is_empty() => {
            let _ = writeln!(
                out,
                "    No versions yet{}",
                if admin { "  [add version]" } else { "" }
            );
        }
        Listing::Loaded(versions) => {
            for version in versions {
                out.push_str(&render_version_node(version, admin));
            }
        }
    }
    out
}

fn render_version_node(node: &VersionNode, admin: bool) -> String {
    let version = &node.version;
    let marker = if node.expanded { "▾" } else { "▸" };
    let mut out = format!(
        "    {} {} {}  {}",
        marker,
        format!("#{}", version.id).dimmed(),
        format!("v{}", version.version_string).cyan(),
        plural(version.file_count, "file").dimmed()
    );
    if admin {
        out.push_str(&format!("  {}", "[upload]".dimmed()));
    }
    out.push('\n');
    if !node.expanded {
        return out;
    }
    match &node.files {
        Listing::Loading => {
            let _ = writeln!(out, "        {}", "Loading files...".dimmed());
        }
        Listing::Failed(_) => {
            let _ = writeln!(out, "        {}", "Failed to load files".bright_red());
        }
        Listing::Loaded(files) if files.is_empty() => {
            let _ = writeln!(
                out,
                "        No APK files uploaded{}",
                if admin { "  [upload]" } else { "" }
            );
        }
        Listing::Loaded(files) => {
            for file in files {
                let _ = writeln!(out, "        {}", render_file_row(file, admin));
            }
        }
    }
    out
}

pub fn render_file_row(file: &ApkFile, admin: bool) -> String {
    let mut meta = format!(
        "{} · {}",
        format_bytes(file.file_size),
        format_date(&file.uploaded_at)
    );
    if let Some(uploader) = &file.uploader_name {
        meta.push_str(&format!(" · by {}", uploader));
    }
    let actions = if admin {
        "[link] [download] [delete]"
    } else {
        "[link] [download]"
    };
    format!(
        "{} {}  {}  {}",
        format!("#{}", file.id).dimmed(),
        file.filename.bold(),
        meta.dimmed(),
        actions.dimmed()
    )
}

pub fn render_users(users: &Listing<User>, current: UserId) -> String {
    match users {
        Listing::Loading => format!("{}\n", "Loading users...".dimmed()),
        Listing::Failed(message) => {
            format!("{}\n", format!("Failed to load users: {}", message).bright_red())
        }
        Listing::Loaded(users) if users.is_empty() => "No users found.\n".to_string(),
        Listing::Loaded(users) => users
            .iter()
            .map(|x| {
                let actions = if x.id == current {
                    "[projects] [password] (You)"
                } else {
                    "[projects] [password] [delete]"
                };
                format!(
                    "{} {:<20} {:<28} {}  {}  {}\n",
                    format!("#{}", x.id).dimmed(),
                    x.username.bold(),
                    x.email,
                    role_tag(x.role),
                    x.created_at.as_ref().map(format_date).unwrap_or_default().dimmed(),
                    actions.dimmed()
                )
            })
            .collect(),
    }
}

pub fn render_assignments(username: &str, choices: &[(Project, bool)]) -> String {
    let mut out = format!("Projects assigned to {}\n", username.bold());
    if choices.is_empty() {
        let _ = writeln!(out, "  {}", "No projects available.".italic().dimmed());
        return out;
    }
    for (project, assigned) in choices {
        let _ = writeln!(
            out,
            "  [{}] {} {}",
            if *assigned { "x" } else { " " },
            format!("#{}", project.id).dimmed(),
            project.name.bold()
        );
    }
    out
}
