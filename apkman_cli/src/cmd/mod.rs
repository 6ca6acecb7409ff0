use std::{
    io::{BufRead, Write},
    process::ExitCode,
};

use colored::Colorize;
use log::error;

use crate::{
    console::Console,
    error::{ClientError, ClientResult},
    session::{FileStore, KeyValueStore},
    view,
};

pub mod auth;
pub mod dashboard;
pub mod files;
pub mod projects;
pub mod shell;
pub mod users;
pub mod versions;

pub type AppConsole = Console<FileStore>;

/// Prints toasts raised since the last call.
pub fn print_toasts<S: KeyValueStore>(console: &mut Console<S>) {
    for toast in console.toasts.take_unshown() {
        println!("{}", view::render_toast(&toast));
    }
}

/// Maps a console outcome to the process status. The failure itself was
/// already shown as a toast.
pub fn finish<S: KeyValueStore, T>(console: &mut Console<S>, result: ClientResult<T>) -> ExitCode {
    print_toasts(console);
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

/// Restores the stored session or explains how to get one.
pub fn require_login<S: KeyValueStore>(console: &mut Console<S>) -> Result<(), ExitCode> {
    if console.restore() {
        return Ok(());
    }
    error!(
        "{} {}",
        ClientError::NotLoggedIn.to_string().bright_red(),
        "(run `apkman login` first)"
    );
    Err(ExitCode::FAILURE)
}

pub fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads a password from the terminal without echoing it.
pub fn prompt_secret(label: &str) -> anyhow::Result<String> {
    Ok(rpassword::prompt_password(label)?)
}

/// Uses `given` when present, otherwise asks without echo.
pub fn secret_or_prompt(given: Option<String>, label: &str) -> anyhow::Result<String> {
    match given {
        Some(secret) => Ok(secret),
        None => prompt_secret(label),
    }
}

/// Asks a yes/no question unless `assume_yes` is set.
pub fn confirm(question: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let answer = prompt(&format!("{} [y/N] ", question))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
