use std::process::ExitCode;

use apkman_core::api::ProjectId;
use clap::{Args, Subcommand};

use super::{finish, print_toasts, require_login, AppConsole};
use crate::{ui::Listing, view};

/// List and create project versions
#[derive(Args, Debug)]
pub struct VersionsCommand {
    #[command(subcommand)]
    action: VersionsAction,
}

#[derive(Subcommand, Debug)]
enum VersionsAction {
    /// Show a project with its versions
    List { project: ProjectId },
    /// Add a version to a project
    Create {
        project: ProjectId,
        version_string: String,
    },
}

impl VersionsCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        if let Err(code) = require_login(console) {
            return Ok(code);
        }
        match &self.action {
            VersionsAction::List { project } => {
                console.load_projects().await;
                console.toggle_project(*project).await;
                let status = match console.tree.project(*project) {
                    Some(node) => {
                        print!(
                            "{}",
                            view::render_tree(
                                &crate::ui::tree::ProjectTree {
                                    projects: Listing::Loaded(vec![node.clone()]),
                                },
                                console.is_admin()
                            )
                        );
                        match node.versions {
                            Listing::Failed(_) => ExitCode::FAILURE,
                            _ => ExitCode::SUCCESS,
                        }
                    }
                    None => {
                        println!("Project #{} not found", project);
                        ExitCode::FAILURE
                    }
                };
                print_toasts(console);
                Ok(status)
            }
            VersionsAction::Create {
                project,
                version_string,
            } => {
                console.open_create_version();
                let result = console.submit_create_version(*project, version_string).await;
                if let Ok(version) = &result {
                    println!("Created version #{} (v{})", version.id, version.version_string);
                }
                Ok(finish(console, result))
            }
        }
    }
}
