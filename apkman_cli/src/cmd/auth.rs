use std::process::ExitCode;

use clap::Args;
use colored::Colorize;
use log::info;

use super::{finish, print_toasts, prompt, require_login, secret_or_prompt, AppConsole};
use crate::view;

/// Sign in and remember the session
#[derive(Args, Debug)]
pub struct LoginCommand {
    /// Account name, asked for when omitted
    username: Option<String>,

    /// Password (falls back to APKMAN_PASSWORD, then a prompt)
    #[arg(short = 'p', long)]
    password: Option<String>,
}

impl LoginCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        let username = match self.username.take() {
            Some(username) => username,
            None => prompt("Username: ")?,
        };
        let password = secret_or_prompt(
            self.password
                .take()
                .or_else(|| std::env::var("APKMAN_PASSWORD").ok()),
            "Password: ",
        )?;

        if console.login(&username, &password).await.is_err() {
            print!("{}", view::render_login(console.login_error()));
            return Ok(ExitCode::FAILURE);
        }
        if let Some(session) = console.session() {
            println!("{}", view::render_header(&session.user, console.page()));
        }
        println!(
            "{}",
            view::render_dashboard(
                console.stats.as_ref(),
                &console.recent_projects,
                console.is_admin()
            )
        );
        print_toasts(console);
        Ok(ExitCode::SUCCESS)
    }
}

/// Forget the stored session
#[derive(Args, Debug)]
pub struct LogoutCommand {}

impl LogoutCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        console.restore();
        let result = console.logout();
        if result.is_ok() {
            info!("{}", "Signed out.".green());
        }
        Ok(finish(console, result))
    }
}

/// Show the signed-in account
#[derive(Args, Debug)]
pub struct WhoamiCommand {}

impl WhoamiCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        if let Err(code) = require_login(console) {
            return Ok(code);
        }
        if let Some(session) = console.session() {
            println!(
                "{} <{}> {}",
                session.user.username.bold(),
                session.user.email,
                session.user.role.to_string().cyan()
            );
            println!("API: {}", console.api().api_url());
        }
        Ok(ExitCode::SUCCESS)
    }
}
