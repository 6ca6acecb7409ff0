use std::process::ExitCode;

use apkman_core::{
    api::{ProjectId, RegisterBody, UserId},
    Role,
};
use clap::{Args, Subcommand, ValueEnum};

use super::{confirm, finish, print_toasts, require_login, secret_or_prompt, AppConsole};
use crate::{
    ui::{page::Page, Listing},
    view,
};

/// Manage user accounts (admin)
#[derive(Args, Debug)]
pub struct UsersCommand {
    #[command(subcommand)]
    action: UsersAction,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::User => Role::User,
        }
    }
}

#[derive(Subcommand, Debug)]
enum UsersAction {
    /// Show every account
    List,
    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(short = 'r', long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
        /// Password, asked for when omitted
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Delete an account
    Delete {
        id: UserId,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Set a new password for an account
    Passwd {
        id: UserId,
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Show which projects an account can access
    Projects { id: UserId },
    /// Replace the projects an account can access
    Assign {
        id: UserId,
        projects: Vec<ProjectId>,
    },
}

impl UsersCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        if let Err(code) = require_login(console) {
            return Ok(code);
        }
        let current = match console.session() {
            Some(session) => session.user.id,
            None => return Ok(ExitCode::FAILURE),
        };
        match &self.action {
            UsersAction::List => {
                console.navigate(Page::Users).await;
                print!("{}", view::render_users(&console.users, current));
                print_toasts(console);
                Ok(match console.users {
                    Listing::Failed(_) => ExitCode::FAILURE,
                    _ => ExitCode::SUCCESS,
                })
            }
            UsersAction::Register {
                username,
                email,
                role,
                password,
            } => {
                let password = secret_or_prompt(password.clone(), "Password: ")?;
                console.open_register();
                let result = console
                    .submit_register(RegisterBody {
                        username: username.clone(),
                        email: email.clone(),
                        password,
                        role: (*role).into(),
                    })
                    .await;
                Ok(finish(console, result))
            }
            UsersAction::Delete { id, yes } => {
                let username = console.username_of(*id).await;
                if !confirm(
                    &format!(
                        "Are you sure you want to delete user \"{}\"? This action cannot be undone.",
                        username
                    ),
                    *yes,
                )? {
                    return Ok(ExitCode::SUCCESS);
                }
                let result = console.delete_user(*id).await;
                Ok(finish(console, result))
            }
            UsersAction::Passwd { id, password } => {
                let password = secret_or_prompt(password.clone(), "New password: ")?;
                console.open_change_password();
                let result = console.submit_change_password(*id, &password).await;
                Ok(finish(console, result))
            }
            UsersAction::Projects { id } => {
                let username = console.username_of(*id).await;
                let result = console.open_assign_projects(*id, &username).await;
                if let Some(assignment) = &console.assignment {
                    print!(
                        "{}",
                        view::render_assignments(&assignment.username, assignment.choices.items())
                    );
                }
                Ok(finish(console, result))
            }
            UsersAction::Assign { id, projects } => {
                let result = console.submit_assign_projects(*id, projects.clone()).await;
                Ok(finish(console, result))
            }
        }
    }
}
