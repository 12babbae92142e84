use anyhow::{Context, Result};
use clap::Parser;
use gdbridge_bridge::security::resolve_loopback_bind_addr;
use gdbridge_bridge::{local_bridge_state, serve, GODOT_BIN_ENV};
use gdbridge_protocol::{BRIDGE_PORT_ENV, DEFAULT_BRIDGE_PORT, PROJECT_ROOT_ENV};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gdbridge")]
#[command(about = "Loopback HTTP bridge between an agent and a Godot project", long_about = None)]
#[command(version)]
struct Cli {
    /// Godot project directory (the one containing project.godot)
    #[arg(long, env = PROJECT_ROOT_ENV, default_value = ".")]
    project: PathBuf,

    /// Port to listen on
    #[arg(long, env = BRIDGE_PORT_ENV, default_value_t = DEFAULT_BRIDGE_PORT)]
    port: u16,

    /// Bind address; must be loopback
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Godot executable used to run scenes and check scripts
    #[arg(long, env = GODOT_BIN_ENV)]
    godot_bin: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let project_root = cli
        .project
        .canonicalize()
        .with_context(|| format!("Project directory not found: {}", cli.project.display()))?;
    if !project_root.join("project.godot").is_file() {
        log::warn!("No project.godot in {}", project_root.display());
    }

    let addr = resolve_loopback_bind_addr(&cli.bind, cli.port).await?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!(
        "Serving bridge for {} on http://{}",
        project_root.display(),
        listener.local_addr()?
    );

    let state = Arc::new(local_bridge_state(project_root, cli.godot_bin));
    serve(listener, state, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    })
    .await?;
    Ok(())
}
