//! Rooted Filesystem MCP - read-only filesystem server over stdio
//!
//! `rooted-fs-mcp` with no arguments serves the current directory.
//! `rooted-fs-mcp install` registers the server with a desktop host.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use rooted_fs_mcp::installer::{self, InstallOptions};
use rooted_fs_mcp::{load_config, RootedFsServer};

#[derive(Parser)]
#[command(name = "rooted-fs-mcp", version)]
#[command(about = "Read-only filesystem MCP server confined to one root directory")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,

    /// Increase verbosity (-v debug, -vv trace). Default is info.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct ServeArgs {
    /// Root directory (default: current working directory)
    #[arg(long, env = "ROOTED_FS_ROOT", global = true)]
    root: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "ROOTED_FS_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (the default)
    Serve,
    /// Register this server in a desktop host's MCP config
    Install {
        /// Key under `mcpServers`
        #[arg(long, default_value = "filesystem")]
        name: String,
        /// Host config file (default: the platform's Claude Desktop config)
        #[arg(long)]
        config_path: Option<PathBuf>,
        /// Print the resulting entry without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    mcp_common::init_tracing("rooted_fs_mcp", cli.verbose)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.serve).await,
        Commands::Install {
            name,
            config_path,
            dry_run,
        } => install(name, config_path, cli.serve.root, dry_run),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().context("reading current directory")?,
    };
    let config = load_config(args.config.as_deref())?;
    let server = RootedFsServer::new(&root, config)?;

    tracing::info!("Starting rooted_fs_mcp MCP Server");
    mcp_common::serve_stdio(server).await?;
    tracing::info!("Server shutting down");
    Ok(())
}

fn install(
    name: String,
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let root = root
        .map(|root| root.canonicalize().with_context(|| format!("resolving {}", root.display())))
        .transpose()?;
    let options = InstallOptions {
        name,
        config_path,
        root,
        command: std::env::current_exe().context("locating this executable")?,
        dry_run,
    };

    let report = installer::install(&options)?;
    let action = match (dry_run, report.created) {
        (true, _) => "Would write",
        (false, true) => "Created",
        (false, false) => "Updated",
    };
    println!("{} {}", action, report.config_path.display());
    println!("{}", serde_json::to_string_pretty(&report.entry)?);
    if report.replaced {
        println!("(replaced existing `{}` entry)", options.name);
    }
    println!("Restart the host application to pick up the new server.");
    Ok(())
}
