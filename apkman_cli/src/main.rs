use std::process::ExitCode;

use apkman_cli::{
    client::ApiClient,
    cmd::{
        auth::{LoginCommand, LogoutCommand, WhoamiCommand},
        dashboard::DashboardCommand,
        files::FilesCommand,
        projects::ProjectsCommand,
        shell::ShellCommand,
        users::UsersCommand,
        versions::VersionsCommand,
        AppConsole,
    },
    config::ConsoleConfig,
    session::FileStore,
};
use clap::{Parser, Subcommand};
use log::debug;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Server URL, overrides APKMAN_SERVER_URL and the config file
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Login(LoginCommand),
    Logout(LogoutCommand),
    Whoami(WhoamiCommand),
    Dashboard(DashboardCommand),
    Projects(ProjectsCommand),
    Versions(VersionsCommand),
    Files(FilesCommand),
    Users(UsersCommand),
    Shell(ShellCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    pretty_env_logger::init();

    let args = Args::parse();
    let config = ConsoleConfig::load()?.with_server_url(args.server);
    debug!("Using API at {}", config.api_url());

    let api = ApiClient::new(config.api_url())?;
    let store = FileStore::open(&config.session_path)?;
    let mut console = AppConsole::new(api, store);

    match args.commands {
        Commands::Login(mut cmd) => cmd.run(&mut console).await,
        Commands::Logout(mut cmd) => cmd.run(&mut console).await,
        Commands::Whoami(mut cmd) => cmd.run(&mut console).await,
        Commands::Dashboard(mut cmd) => cmd.run(&mut console).await,
        Commands::Projects(mut cmd) => cmd.run(&mut console).await,
        Commands::Versions(mut cmd) => cmd.run(&mut console).await,
        Commands::Files(mut cmd) => cmd.run(&mut console).await,
        Commands::Users(mut cmd) => cmd.run(&mut console).await,
        Commands::Shell(mut cmd) => cmd.run(&mut console).await,
    }
}
