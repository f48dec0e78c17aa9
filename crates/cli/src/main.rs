mod render;

use clap::{Args, Parser, Subcommand};
use lib::surface::{Surface, SurfaceContext, SurfaceKind};
use lib::upload::SelectedFile;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Document chat, team workspaces and agent goals against a RAG backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct SurfaceArgs {
    /// Config file path (default: RAGDESK_CONFIG_PATH or ~/.ragdesk/config.json)
    #[arg(long, short, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Backend base URL (default: RAGDESK_BACKEND_URL, config, or http://localhost:5000)
    #[arg(long, value_name = "URL")]
    backend: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: RAGDESK_CONFIG_PATH or ~/.ragdesk/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with your own PDFs in a fixed personal workspace.
    Solo(SurfaceArgs),

    /// Create or join a shared workspace, then chat and upload together.
    Team(SurfaceArgs),

    /// Give the agent a goal and read its run log.
    Agent(SurfaceArgs),

    /// Upload documents and spreadsheets and ask questions across them.
    Reader(SurfaceArgs),

    /// Print the knowledge graph of a workspace.
    Graph {
        /// Workspace id (default: the reader workspace from config)
        #[arg(long, short, value_name = "ID")]
        workspace: Option<String>,

        #[command(flatten)]
        args: SurfaceArgs,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let run = |kind: SurfaceKind, args: SurfaceArgs| async move {
        if let Err(e) = run_surface(kind, args).await {
            log::error!("{} failed: {}", kind.as_str(), e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Version) => {
            println!("ragdesk {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Solo(args)) => run(SurfaceKind::Solo, args).await,
        Some(Commands::Team(args)) => run(SurfaceKind::Team, args).await,
        Some(Commands::Agent(args)) => run(SurfaceKind::Agent, args).await,
        Some(Commands::Reader(args)) => run(SurfaceKind::Reader, args).await,
        Some(Commands::Graph { workspace, args }) => {
            if let Err(e) = run_graph(workspace, args).await {
                log::error!("graph failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let written = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", written.display());
    Ok(())
}

fn gateway_for(
    config: &lib::config::Config,
    backend: Option<String>,
) -> Arc<lib::gateway::HttpGateway> {
    let url = backend.unwrap_or_else(|| lib::config::resolve_backend_url(config));
    Arc::new(lib::gateway::HttpGateway::new(Some(url)))
}

async fn run_graph(workspace: Option<String>, args: SurfaceArgs) -> anyhow::Result<()> {
    use lib::gateway::Gateway;

    let (config, _) = lib::config::load_config(args.config)?;
    let gateway = gateway_for(&config, args.backend);
    let workspace = workspace.unwrap_or_else(|| config.workspaces.reader.clone());
    log::info!("requesting knowledge graph for {} from {}", workspace, gateway.base_url());
    let graph = gateway.generate_knowledge_graph(&workspace).await?;
    render::print_graph(&graph);
    Ok(())
}

async fn run_surface(kind: SurfaceKind, args: SurfaceArgs) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, path) = lib::config::load_config(args.config)?;
    log::debug!("loaded config from {}", path.display());
    let gateway = gateway_for(&config, args.backend);
    let base_url = gateway.base_url().to_string();
    let surface = Surface::of_kind(kind, SurfaceContext::from_config(kind, &config), gateway);
    println!("ragdesk {} ({})", surface.kind().as_str(), base_url);
    if surface.is_gated() {
        println!("/create <name> or /join <invite link> to start");
    }

    let mut printer = render::FeedPrinter::default();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (input, ""),
        };
        let refused = match command {
            "/upload" => upload(&surface, rest).await,
            "/create" => surface
                .create_workspace(&mut rest.to_string())
                .await
                .err(),
            "/join" => surface.join_workspace(&mut rest.to_string()).await.err(),
            "/files" => {
                list_files(&surface).await;
                None
            }
            "/graph" => {
                match surface.knowledge_graph().await {
                    Ok(graph) => render::print_graph(&graph),
                    Err(e) => eprintln!("graph: {}", e),
                }
                None
            }
            c if c.starts_with('/') => {
                eprintln!("unknown command {}", c);
                None
            }
            _ => surface.send_message(&mut input.to_string()).await.err(),
        };
        printer.flush(surface.feed()).await;
        if let Some(reason) = refused {
            eprintln!("{}", reason);
        }
    }

    Ok(())
}

async fn upload(surface: &Surface, paths: &str) -> Option<lib::error::Rejection> {
    let mut selected = Vec::new();
    for p in paths.split_whitespace() {
        match SelectedFile::from_path(std::path::Path::new(p)).await {
            Ok(f) => selected.push(f),
            Err(e) => eprintln!("cannot read {}: {}", p, e),
        }
    }
    match surface.upload(selected).await {
        Ok(report) => {
            log::info!(
                "upload finished: {} processed, {} failed, {} rejected",
                report.processed.len(),
                report.failed.len(),
                report.rejected.len()
            );
            None
        }
        Err(e) => Some(e),
    }
}

async fn list_files(surface: &Surface) {
    if let Some(state) = surface.gate_state().await {
        println!("{}", render::gate_line(&state));
    }
    let files = surface.files().snapshot().await;
    if files.is_empty() {
        println!("(no files)");
    }
    for f in &files {
        println!("{}", render::file_line(f));
    }
}
