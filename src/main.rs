//! reinet binary entry point: serves a small demo application.

use std::process::ExitCode;

use reinet::cli::{self, Args};
use reinet::config::Config;
use reinet::server;
use reinet::{logging, App, RequestContext};
use tracing::{debug, error, info};

fn hello(id: String) -> String {
    format!("Hello, {id}")
}

/// Count requests made with the caller's session.
fn visits(ctx: &mut RequestContext) -> reinet::Result<String> {
    let session = ctx.session()?;
    let count = session.get::<u64>("visits")?.unwrap_or(0) + 1;
    session.set("visits", count)?;
    Ok(format!("Visits this session: {count}"))
}

fn logout(ctx: &mut RequestContext) -> reinet::Result<()> {
    ctx.destroy_session()?;
    ctx.redirect("/visits")
}

fn build_app(config: &Config) -> Result<App, Box<dyn std::error::Error>> {
    let mut app = App::with_sessions(&config.to_session_config()?)?;
    app.set_max_body_bytes(config.server.max_body_bytes);

    app.get("/:id([0-9]+)", hello)?
        .get("/visits", visits)?
        .post("/logout", logout)?;

    app.before(|ctx: &mut RequestContext| {
        debug!(method = %ctx.method(), path = ctx.path(), "dispatching");
    });

    Ok(app)
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&args)?;

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging was already initialized");
    }

    info!("reinet v{}", env!("CARGO_PKG_VERSION"));

    let server_config = config.to_server_config()?;
    let app = build_app(&config)?;
    info!(
        cookie = app.sessions().cookie_name(),
        lifetime_secs = app.sessions().max_lifetime().as_secs(),
        "sessions configured"
    );

    server::serve(server_config, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run 'reinet --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "reinet failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
