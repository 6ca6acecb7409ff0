use std::{path::PathBuf, process::ExitCode};

use apkman_core::api::{FileId, VersionId};
use clap::{Args, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use super::{confirm, finish, print_toasts, require_login, AppConsole};
use crate::view;

/// Upload, download and delete APK files
#[derive(Args, Debug)]
pub struct FilesCommand {
    #[command(subcommand)]
    action: FilesAction,
}

#[derive(Subcommand, Debug)]
enum FilesAction {
    /// List the files of a version
    List { version: VersionId },
    /// Upload an .apk to a version
    Upload { version: VersionId, path: PathBuf },
    /// Download a file
    Download {
        id: FileId,
        /// Directory to save into
        #[arg(short = 'o', long, default_value = ".")]
        output: PathBuf,
    },
    /// Print a shareable download link carrying the session token
    Link { id: FileId },
    /// Delete a file
    Delete {
        id: FileId,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

impl FilesCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        if let Err(code) = require_login(console) {
            return Ok(code);
        }
        match &self.action {
            FilesAction::List { version } => {
                let admin = console.is_admin();
                let result = console.list_files(*version).await;
                match &result {
                    Ok(files) if files.is_empty() => println!("No APK files uploaded"),
                    Ok(files) => {
                        for file in files.iter() {
                            println!("{}", view::render_file_row(file, admin));
                        }
                    }
                    Err(_) => {}
                }
                Ok(finish(console, result))
            }
            FilesAction::Upload { version, path } => {
                console.open_upload(*version);
                let size = match console.select_file(path) {
                    Ok(selected) => selected.size,
                    Err(_) => {
                        print_toasts(console);
                        return Ok(ExitCode::FAILURE);
                    }
                };
                println!(
                    "{} ({})",
                    path.to_string_lossy().bold(),
                    view::format_bytes(size)
                );

                let bar = ProgressBar::new(100);
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.green} [{bar:.cyan/blue}] {pos}%")?
                        .progress_chars("#>-"),
                );
                let progress = bar.clone();
                let result = console
                    .submit_upload(move |percent| progress.set_position(percent as u64))
                    .await;
                bar.finish_and_clear();
                Ok(finish(console, result))
            }
            FilesAction::Download { id, output } => {
                let result = console.download_file(*id, output, true).await;
                Ok(finish(console, result))
            }
            FilesAction::Link { id } => {
                let result = console.download_link(*id);
                if let Ok(link) = &result {
                    println!("{}", link);
                }
                Ok(finish(console, result))
            }
            FilesAction::Delete { id, yes } => {
                if !confirm(
                    &format!("Delete file #{}? This cannot be undone.", id),
                    *yes,
                )? {
                    return Ok(ExitCode::SUCCESS);
                }
                let result = console.delete_file(*id).await;
                Ok(finish(console, result))
            }
        }
    }
}
