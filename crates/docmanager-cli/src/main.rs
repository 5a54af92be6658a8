//! DocManager CLI - a command line front-end for the DocManager service.
//!
//! Every invocation behaves like a fresh page load: the stored refresh token
//! is exchanged once for a new access token before anything protected runs.
//! Sessions only survive between invocations when `login --remember` was used.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docmanager_core::auth::GuardState;
use docmanager_core::models::{Activation, Credentials, PasswordResetConfirm, Registration, User};
use docmanager_core::{
    menu_for, ApiClient, Config, GuardDecision, MenuTarget, Notice, Route, RouteGuard,
    SessionController,
};

#[derive(Parser)]
#[command(name = "docmanager", version, about = "Command line client for DocManager")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "DOCMANAGER_BACKEND_URL")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Keep the refresh token so later invocations stay signed in
        #[arg(long)]
        remember: bool,
    },
    /// Forget both tokens
    Logout,
    /// Restore the session and open a route (default: landing page)
    Open {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show the signed-in account
    Whoami,
    /// Show the navigation menu for the signed-in account
    Menu,
    /// Create a new client account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        sex: String,
        /// YYYY-MM-DD
        #[arg(long)]
        birthday: Option<String>,
    },
    /// Activate an account from the emailed link parameters
    Activate { uid: String, token: String },
    /// Request a password reset email
    ResetPassword { email: String },
    /// Set a new password from the emailed reset link parameters
    ResetPasswordConfirm { uid: String, token: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Everything one invocation needs: config, HTTP client, session, guard.
struct App {
    config: Config,
    api: ApiClient,
    guard: RouteGuard,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let api = ApiClient::new(&config.backend_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        let store = config.token_store()?;
        let session = Arc::new(SessionController::new(
            store,
            Arc::new(api.clone()),
            config.request_timeout(),
        ));
        let (tx, notices) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            api,
            guard: RouteGuard::new(session, tx),
            notices,
        })
    }

    fn session(&self) -> &Arc<SessionController> {
        self.guard.session()
    }

    /// Print pending notices the way a toast would show them
    fn flush_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            eprintln!("* {}", notice.message());
        }
    }

    async fn open(&mut self, route: Route) -> GuardDecision {
        let cancel = CancellationToken::new();
        let decision = self.guard.start(route, &cancel).await;
        self.flush_notices();
        decision
    }

    /// Restore the session for a command that needs one
    async fn require_session(&mut self) -> Result<()> {
        let cancel = CancellationToken::new();
        let state = self.guard.resolve(&cancel).await;
        let decision = self.guard.evaluate(Route::Dashboard);
        self.flush_notices();
        match (state, decision) {
            (GuardState::Authenticated, GuardDecision::Allow(_)) => Ok(()),
            _ => anyhow::bail!("Not signed in. Run `docmanager login --remember` first."),
        }
    }

    async fn current_user(&self) -> Result<User> {
        let token = self.session().access_token();
        self.api
            .current_user(&token)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
    }
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_password(label: &str) -> Result<String> {
    rpassword::prompt_password(format!("{}: ", label)).context("Failed to read password")
}

fn print_decision(decision: GuardDecision) {
    match decision {
        GuardDecision::Allow(route) => println!("Showing {}", route),
        GuardDecision::Pending(route) => println!("Session not resolved yet, staying off {}", route),
        GuardDecision::Redirect(route) => println!("Redirected to {}", route),
    }
}

fn print_menu(authenticated: bool, user: Option<&User>) {
    if let Some(user) = user {
        println!("{}: {}", user.role.as_str().to_uppercase(), user.last_name);
    }
    for section in menu_for(authenticated, user.map(|u| u.role)) {
        if let Some(title) = section.title {
            println!("\n{}", title);
        }
        for item in section.items {
            match item.target {
                MenuTarget::Route(route) => println!("  {:<28} {}", item.label, route),
                MenuTarget::Logout => println!("  {:<28} (docmanager logout)", item.label),
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(backend) = cli.backend {
        config.backend_url = backend;
    }
    debug!(backend = %config.backend_url, storage = ?config.token_storage, "Configuration loaded");

    let mut app = App::new(config)?;

    match cli.command {
        Command::Login { email, remember } => {
            let email = match email.or_else(|| app.config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email")?,
            };
            let password = prompt_password("Password")?;

            if !app.session().login(&Credentials::new(&email, password), remember).await {
                anyhow::bail!("Invalid login");
            }
            app.config.last_email = Some(email);
            app.config.save()?;

            match app.current_user().await {
                Ok(user) => println!("Signed in as {} ({})", user.display_name(), user.role),
                Err(e) => println!("Signed in (profile unavailable: {})", e),
            }
            if !remember {
                println!("Session will not be kept; use --remember to stay signed in.");
            }
        }
        Command::Logout => {
            let (decision, result) = app.guard.logout();
            print_decision(decision);
            app.flush_notices();
            result.context("Signed out, but stored tokens could not be fully erased")?;
        }
        Command::Open { path } => {
            let route = Route::from_path(&path)
                .ok_or_else(|| anyhow::anyhow!("Unknown route '{}'", path))?;
            let decision = app.open(route).await;
            print_decision(decision);
        }
        Command::Whoami => {
            app.require_session().await?;
            let user = app.current_user().await?;
            println!("{} <{}>", user.display_name(), user.email);
            println!("Role: {}", user.role);
        }
        Command::Menu => {
            app.require_session().await?;
            let user = app.current_user().await.ok();
            print_menu(true, user.as_ref());
        }
        Command::Register {
            email,
            first_name,
            last_name,
            sex,
            birthday,
        } => {
            let password = prompt_password("Password")?;
            let confirm_password = prompt_password("Confirm password")?;
            let registration = Registration {
                email,
                password,
                confirm_password,
                sex,
                birthday,
                first_name,
                last_name,
            };
            app.api
                .register(&registration)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Registered. Check your email for the activation link.");
        }
        Command::Activate { uid, token } => {
            app.api
                .activate(&Activation { uid, token })
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Account activated. You can now log in.");
        }
        Command::ResetPassword { email } => {
            app.api
                .reset_password(&email)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("If the account exists, a reset link was sent to {}.", email);
        }
        Command::ResetPasswordConfirm { uid, token } => {
            let new_password = prompt_password("New password")?;
            app.api
                .reset_password_confirm(&PasswordResetConfirm {
                    uid,
                    token,
                    new_password,
                })
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Password updated.");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing();
    info!("DocManager CLI starting");

    let result = run(cli).await;

    if let Err(ref e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_open_defaults_to_landing() {
        let cli = Cli::try_parse_from(["docmanager", "open"]).unwrap();
        match cli.command {
            Command::Open { path } => assert_eq!(Route::from_path(&path), Some(Route::Landing)),
            _ => panic!("expected open"),
        }
    }

    #[test]
    fn test_backend_flag_wins_over_env() {
        // Single test touching the variable, so no other test races it
        std::env::set_var("DOCMANAGER_BACKEND_URL", "http://from-env:8000/");
        let from_env = Cli::try_parse_from(["docmanager", "whoami"]).unwrap();
        let from_flag =
            Cli::try_parse_from(["docmanager", "--backend", "http://flag:8000/", "whoami"]).unwrap();
        std::env::remove_var("DOCMANAGER_BACKEND_URL");

        assert_eq!(from_env.backend.as_deref(), Some("http://from-env:8000/"));
        assert_eq!(from_flag.backend.as_deref(), Some("http://flag:8000/"));
    }

    #[test]
    fn test_parse_login_flags() {
        let cli = Cli::try_parse_from([
            "docmanager",
            "--backend",
            "http://127.0.0.1:8000/",
            "login",
            "--email",
            "a@b.com",
            "--remember",
        ])
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("http://127.0.0.1:8000/"));
        match cli.command {
            Command::Login { email, remember } => {
                assert_eq!(email.as_deref(), Some("a@b.com"));
                assert!(remember);
            }
            _ => panic!("expected login"),
        }
    }
}
