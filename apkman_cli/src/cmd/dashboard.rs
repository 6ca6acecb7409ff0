use std::process::ExitCode;

use clap::Args;

use super::{print_toasts, require_login, AppConsole};
use crate::{ui::page::Page, view};

/// Show statistics, recent projects and download activity
#[derive(Args, Debug)]
pub struct DashboardCommand {}

impl DashboardCommand {
    pub async fn run(&mut self, console: &mut AppConsole) -> anyhow::Result<ExitCode> {
        if let Err(code) = require_login(console) {
            return Ok(code);
        }
        console.navigate(Page::Dashboard).await;
        if let Some(session) = console.session() {
            print!("{}", view::render_header(&session.user, Page::Dashboard));
        }
        let loaded = console.stats.is_some();
        print!(
            "{}",
            view::render_dashboard(
                console.stats.as_ref(),
                &console.recent_projects,
                console.is_admin()
            )
        );
        print_toasts(console);
        Ok(if loaded {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
