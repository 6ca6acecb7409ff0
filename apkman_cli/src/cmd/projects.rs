use std::process::ExitCode;

use apkman_core::api::ProjectId;
use clap::{Args, Subcommand};

use super::{confirm, finish, print_toasts, require_login, AppConsole};
use crate::{
    ui::{page::Page, Listing},
    view,
};

/// Browse and manage projects
#[derive(Args, Debug)]
pub struct ProjectsCommand {
    #[command(subcommand)]
    action: ProjectsAction,
}

#[derive(Subcommand, Debug)]
enum ProjectsAction {
    /// Show the project tree
    List {
        /// Expand every project and version
        #[arg(short = 'e', long)]
        expand: bool,
    },
    /// Create a project
    Create {
        name: String,
        #[arg(short = 'd', long, default_value = "")]
        description: String,
    },
    /// Rename a project or change its description
    Update {
        id: ProjectId,
        #[arg(short = 'n', long)]
        name: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    /// Delete a project with all its versions and files
    Delete {
        id: ProjectId,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

impl ProjectsCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        if let Err(code) = require_login(console) {
            return Ok(code);
        }
        match &self.action {
            ProjectsAction::List { expand } => {
                console.navigate(Page::Projects).await;
                if *expand {
                    console.expand_all().await;
                }
                print!("{}", view::render_tree(&console.tree, console.is_admin()));
                print_toasts(console);
                Ok(match console.tree.projects {
                    Listing::Failed(_) => ExitCode::FAILURE,
                    _ => ExitCode::SUCCESS,
                })
            }
            ProjectsAction::Create { name, description } => {
                console.open_create_project();
                let result = console.submit_create_project(name, description).await;
                if result.is_ok() {
                    print!("{}", view::render_tree(&console.tree, console.is_admin()));
                }
                Ok(finish(console, result))
            }
            ProjectsAction::Update {
                id,
                name,
                description,
            } => {
                console.open_edit_project();
                let result = console
                    .submit_update_project(*id, name.as_deref(), description.as_deref())
                    .await;
                Ok(finish(console, result))
            }
            ProjectsAction::Delete { id, yes } => {
                console.load_projects().await;
                let name = console
                    .tree
                    .project(*id)
                    .map(|x| x.project.name.clone())
                    .unwrap_or(format!("#{}", id));
                if !confirm(
                    &format!(
                        "Delete project \"{}\" and ALL its data? This cannot be undone.",
                        name
                    ),
                    *yes,
                )? {
                    return Ok(ExitCode::SUCCESS);
                }
                let result = console.delete_project(*id).await;
                Ok(finish(console, result))
            }
        }
    }
}
