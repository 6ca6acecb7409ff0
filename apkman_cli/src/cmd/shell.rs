use std::{path::PathBuf, process::ExitCode, time::Instant};

use apkman_core::api::{FileId, ProjectId, VersionId};
use clap::Args;
use colored::Colorize;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{print_toasts, AppConsole};
use crate::{
    console::Console,
    session::KeyValueStore,
    ui::page::{Page, Screen},
    view,
};

const HELP: &str = "\
login <username> <password>   sign in
logout                        sign out
nav <dashboard|projects|users>
expand <project>              expand or collapse a project
open <version>                expand or collapse a version
new-project <name> [description...]
new-version <project> <version>
upload <version> <path>       upload an .apk
rm-file <file> --yes          delete a file
rm-project <project> --yes    delete a project
link <file>                   print a download link
download <file> [directory]
cancel                        close the open dialog
dismiss                       clear notifications
show                          redraw the page with open dialogs and notifications
quit";

/// Interactive console
#[derive(Args, Debug)]
pub struct ShellCommand {}

#[derive(Debug, PartialEq)]
pub enum ShellInput {
    Help,
    Login { username: String, password: String },
    Logout,
    Navigate(Page),
    ToggleProject(ProjectId),
    ToggleVersion(VersionId),
    CreateProject { name: String, description: String },
    CreateVersion { project: ProjectId, version: String },
    Upload { version: VersionId, path: PathBuf },
    DeleteFile { id: FileId, confirmed: bool },
    DeleteProject { id: ProjectId, confirmed: bool },
    Link(FileId),
    Download { id: FileId, directory: PathBuf },
    Cancel,
    Dismiss,
    Show,
    Quit,
}

impl ShellInput {
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let args = words.collect::<Vec<&str>>();
        let confirmed = args.iter().any(|x| *x == "--yes" || *x == "-y");
        let input = match (command, args.as_slice()) {
            ("help" | "?", _) => ShellInput::Help,
            ("login", [username, password]) => ShellInput::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            ("logout", []) => ShellInput::Logout,
            ("nav", [page]) => ShellInput::Navigate(
                Page::parse(page).ok_or_else(|| format!("unknown page: {}", page))?,
            ),
            ("expand", [id]) => ShellInput::ToggleProject(parse_id(id)?),
            ("open", [id]) => ShellInput::ToggleVersion(parse_id(id)?),
            ("new-project", [name, description @ ..]) => ShellInput::CreateProject {
                name: name.to_string(),
                description: description.join(" "),
            },
            ("new-version", [project, version]) => ShellInput::CreateVersion {
                project: parse_id(project)?,
                version: version.to_string(),
            },
            ("upload", [version, path]) => ShellInput::Upload {
                version: parse_id(version)?,
                path: PathBuf::from(path),
            },
            ("rm-file", [id, ..]) => ShellInput::DeleteFile {
                id: parse_id(id)?,
                confirmed,
            },
            ("rm-project", [id, ..]) => ShellInput::DeleteProject {
                id: parse_id(id)?,
                confirmed,
            },
            ("link", [id]) => ShellInput::Link(parse_id(id)?),
            ("download", [id]) => ShellInput::Download {
                id: parse_id(id)?,
                directory: PathBuf::from("."),
            },
            ("download", [id, directory]) => ShellInput::Download {
                id: parse_id(id)?,
                directory: PathBuf::from(directory),
            },
            ("cancel", []) => ShellInput::Cancel,
            ("dismiss", []) => ShellInput::Dismiss,
            ("show", []) => ShellInput::Show,
            ("quit" | "exit", []) => ShellInput::Quit,
            _ => return Err(format!("cannot understand `{}`, try `help`", line.trim())),
        };
        Ok(Some(input))
    }
}

fn parse_id<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .trim_start_matches('#')
        .parse()
        .map_err(|_| format!("not an id: {}", value))
}

/// Renders whatever the console currently shows.
pub fn render_screen<S: KeyValueStore>(console: &Console<S>) -> String {
    let session = match (console.screen(), console.session()) {
        (Screen::App, Some(session)) => session,
        _ => return view::render_login(console.login_error()),
    };
    let mut out = view::render_header(&session.user, console.page());
    out.push_str(&match console.page() {
        Page::Dashboard => view::render_dashboard(
            console.stats.as_ref(),
            &console.recent_projects,
            console.is_admin(),
        ),
        Page::Projects => view::render_tree(&console.tree, console.is_admin()),
        Page::Users => view::render_users(&console.users, session.user.id),
    });
    out
}

/// The open dialog and the notifications that are not on their way out.
pub fn render_overlay<S: KeyValueStore>(console: &Console<S>) -> String {
    let mut out = String::new();
    if let Some(modal) = console.modals.top() {
        out.push_str(&format!(
            "{} {} (`cancel` to close)\n",
            "Open dialog:".dimmed(),
            modal.title().bold()
        ));
    }
    for toast in console.toasts.visible().filter(|x| !x.is_removing()) {
        out.push_str(&view::render_toast(toast));
        out.push('\n');
    }
    out
}

impl ShellCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        info!(
            "{}",
            format!("APK Manager console v{}", env!("CARGO_PKG_VERSION")).bold()
        );
        console.boot().await;
        print!("{}", render_screen(console));
        print_toasts(console);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{} ", ">".cyan());
            std::io::Write::flush(&mut std::io::stdout())?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            console.toasts.tick(Instant::now());
            let input = match ShellInput::parse(&line) {
                Ok(Some(input)) => input,
                Ok(None) => continue,
                Err(message) => {
                    println!("{}", message.yellow());
                    continue;
                }
            };
            if input == ShellInput::Quit {
                break;
            }
            handle(console, input).await;
            print_toasts(console);
        }
        Ok(ExitCode::SUCCESS)
    }
}

async fn handle(console: &mut AppConsole, input: ShellInput) {
    if console.screen() == Screen::Login
        && !matches!(input, ShellInput::Login { .. } | ShellInput::Help)
    {
        println!("{}", "Sign in first: login <username> <password>".yellow());
        return;
    }
    match input {
        ShellInput::Help => println!("{}", HELP),
        ShellInput::Login { username, password } => {
            let _ = console.login(&username, &password).await;
            print!("{}", render_screen(console));
        }
        ShellInput::Logout => {
            let _ = console.logout();
            print!("{}", render_screen(console));
        }
        ShellInput::Navigate(page) => {
            console.navigate(page).await;
            print!("{}", render_screen(console));
        }
        ShellInput::ToggleProject(id) => {
            if console.page() != Page::Projects {
                console.navigate(Page::Projects).await;
            }
            console.toggle_project(id).await;
            print!("{}", render_screen(console));
        }
        ShellInput::ToggleVersion(id) => {
            console.toggle_version(id).await;
            print!("{}", render_screen(console));
        }
        ShellInput::CreateProject { name, description } => {
            console.open_create_project();
            let _ = console.submit_create_project(&name, &description).await;
        }
        ShellInput::CreateVersion { project, version } => {
            console.open_create_version();
            let _ = console.submit_create_version(project, &version).await;
        }
        ShellInput::Upload { version, path } => {
            console.open_upload(version);
            if console.select_file(&path).is_ok() {
                let _ = console
                    .submit_upload(|percent| {
                        print!("\r{} {:>3}%", "uploading".dimmed(), percent);
                        let _ = std::io::Write::flush(&mut std::io::stdout());
                    })
                    .await;
                println!();
            }
        }
        ShellInput::DeleteFile { id, confirmed } => {
            if confirmed {
                let _ = console.delete_file(id).await;
            } else {
                println!("Add --yes to delete file #{}", id);
            }
        }
        ShellInput::DeleteProject { id, confirmed } => {
            if confirmed {
                let _ = console.delete_project(id).await;
            } else {
                println!("Add --yes to delete project #{} and ALL its data", id);
            }
        }
        ShellInput::Link(id) => {
            if let Ok(link) = console.download_link(id) {
                println!("{}", link);
            }
        }
        ShellInput::Download { id, directory } => {
            let _ = console.download_file(id, directory, true).await;
        }
        ShellInput::Cancel => match console.cancel_modal() {
            Some(modal) => println!("{} closed", modal.title()),
            None => println!("No dialog is open"),
        },
        ShellInput::Dismiss => console.toasts.dismiss_all(Instant::now()),
        ShellInput::Show => {
            print!("{}", render_screen(console));
            print!("{}", render_overlay(console));
        }
        ShellInput::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::MemoryStore,
        ui::{modal::ModalId, toast::ToastKind},
    };

    #[test]
    fn parses_navigation_and_tree_commands() {
        assert_eq!(
            ShellInput::parse("nav Projects").unwrap(),
            Some(ShellInput::Navigate(Page::Projects))
        );
        assert_eq!(
            ShellInput::parse("expand #4").unwrap(),
            Some(ShellInput::ToggleProject(ProjectId(4)))
        );
        assert_eq!(
            ShellInput::parse("open 9").unwrap(),
            Some(ShellInput::ToggleVersion(VersionId(9)))
        );
        assert_eq!(ShellInput::parse("   ").unwrap(), None);
    }

    #[test]
    fn deletions_need_explicit_confirmation() {
        assert_eq!(
            ShellInput::parse("rm-file 3").unwrap(),
            Some(ShellInput::DeleteFile {
                id: FileId(3),
                confirmed: false
            })
        );
        assert_eq!(
            ShellInput::parse("rm-project 3 --yes").unwrap(),
            Some(ShellInput::DeleteProject {
                id: ProjectId(3),
                confirmed: true
            })
        );
    }

    #[test]
    fn multi_word_descriptions_are_joined() {
        assert_eq!(
            ShellInput::parse("new-project Launcher the home screen").unwrap(),
            Some(ShellInput::CreateProject {
                name: "Launcher".to_string(),
                description: "the home screen".to_string()
            })
        );
    }

    #[test]
    fn overlay_shows_top_dialog_and_live_notifications() {
        colored::control::set_override(false);
        let api = crate::client::ApiClient::new("http://localhost:8000/api").unwrap();
        let mut console = Console::new(api, MemoryStore::default());
        assert_eq!(render_overlay(&console), "");

        console.modals.open(ModalId::CreateProject);
        let now = Instant::now();
        let gone = console.toasts.push(ToastKind::Error, "Error", "old failure", now);
        console.toasts.push(ToastKind::Error, "Error", "name taken", now);
        console.toasts.dismiss(gone, now);

        let overlay = render_overlay(&console);
        assert!(overlay.contains("Open dialog: New Project"));
        assert!(overlay.contains("name taken"));
        assert!(!overlay.contains("old failure"));

        assert_eq!(ShellInput::parse("cancel").unwrap(), Some(ShellInput::Cancel));
        assert_eq!(console.cancel_modal(), Some(ModalId::CreateProject));
        assert!(!render_overlay(&console).contains("Open dialog"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(ShellInput::parse("nav settings").is_err());
        assert!(ShellInput::parse("expand abc").is_err());
        assert!(ShellInput::parse("fly away").is_err());
    }
}
