use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use modshelf::commands::{self, AddTarget, InitOptions};
use modshelf::pack::meta::PackLoader;
use modshelf::registry::{ModrinthClient, ProjectId, VersionId};
use modshelf::runtime::RealRuntime;

/// modshelf - Modrinth modpack manager
///
/// Keeps a pack definition in version control, downloads mods into a shared
/// cache, and deploys them into launcher instances as symlinks.
#[derive(Parser, Debug)]
#[command(author, version = env!("MODSHELF_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pack directory (defaults to the current directory)
    #[arg(long = "pack-dir", value_name = "PATH", global = true)]
    pub pack_dir: Option<PathBuf>,

    /// Mod cache directory (defaults to the platform cache directory)
    #[arg(
        long = "cache-dir",
        env = "MODSHELF_CACHE_DIR",
        value_name = "PATH",
        global = true
    )]
    pub cache_dir: Option<PathBuf>,

    /// Registry API URL (defaults to https://api.modrinth.com/v2)
    #[arg(
        long = "api-url",
        env = "MODSHELF_API_URL",
        value_name = "URL",
        global = true
    )]
    pub api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Initialise a new modpack
    Init(InitArgs),

    /// Add a new mod and its dependencies
    Add(AddArgs),

    /// Download all mods in the index
    Download,

    /// Update all mods and dependencies in the index
    Update,

    /// List indexed mods
    List,

    /// Pin a mod to its currently installed version
    Pin(PinArgs),

    /// Deploy the pack into a game directory or launcher instance
    Deploy(DeployArgs),
}

#[derive(clap::Args, Debug)]
struct InitArgs {
    /// Pack name
    #[arg(long)]
    name: String,

    /// Minecraft version the pack targets
    #[arg(long = "game-version", value_name = "VERSION")]
    game_version: String,

    /// Mod loader: legacyforge, fabric, quilt, or neoforge
    #[arg(long, value_parser = parse_loader)]
    loader: PackLoader,

    /// Loader version to pin
    #[arg(long = "loader-version", value_name = "VERSION")]
    loader_version: Option<String>,

    /// Allow Fabric mods on forge-family loaders via the Sinytra shim
    #[arg(long = "sinytra-compat", default_value_t = false)]
    sinytra_compat: bool,
}

#[derive(clap::Args, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true).multiple(false)))]
struct AddArgs {
    /// Add a mod by searching for the given query
    #[arg(short = 's', long, group = "source")]
    search: Option<String>,

    /// Add a mod by project ID
    #[arg(short = 'p', long = "project-id", group = "source")]
    project_id: Option<String>,

    /// Add a mod by exact version ID
    #[arg(short = 'V', long = "version-id", group = "source")]
    version_id: Option<String>,

    /// Pick the Nth entry from an ambiguous search result list
    #[arg(long, value_name = "N")]
    select: Option<usize>,
}

#[derive(clap::Args, Debug)]
struct PinArgs {
    /// The mod name or project ID to pin
    #[arg(value_name = "MOD", required = true, num_args = 1..)]
    mod_name: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct DeployArgs {
    /// The Prism Launcher instance to deploy to
    #[arg(short = 'i', long, conflicts_with = "directory")]
    instance: Option<String>,

    /// The directory to deploy to
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,
}

fn parse_loader(value: &str) -> Result<PackLoader, String> {
    match value.to_ascii_lowercase().as_str() {
        "legacyforge" | "forge" => Ok(PackLoader::LegacyForge),
        "fabric" => Ok(PackLoader::Fabric),
        "quilt" => Ok(PackLoader::Quilt),
        "neoforge" => Ok(PackLoader::NeoForge),
        other => Err(format!(
            "unknown loader '{}' (expected legacyforge, fabric, quilt, or neoforge)",
            other
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    let pack_dir = match cli.pack_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    if let Commands::Init(args) = cli.command {
        return commands::init(
            &runtime,
            &pack_dir,
            InitOptions {
                name: args.name,
                game_version: args.game_version,
                loader: args.loader,
                loader_version: args.loader_version,
                sinytra_compat: args.sinytra_compat,
            },
        );
    }

    let cache_dir = commands::resolve_cache_dir(&runtime, cli.cache_dir)?;

    match cli.command {
        Commands::Init(_) => unreachable!(),
        Commands::Add(args) => {
            let target = if let Some(query) = args.search {
                AddTarget::Search {
                    query,
                    select: args.select,
                }
            } else if let Some(project_id) = args.project_id {
                AddTarget::Project(ProjectId::new(project_id))
            } else if let Some(version_id) = args.version_id {
                AddTarget::Version(VersionId::new(version_id))
            } else {
                unreachable!("clap enforces exactly one source")
            };

            let client = ModrinthClient::new(cli.api_url)?;
            commands::add(&runtime, &client, &pack_dir, &cache_dir, target).await?
        }
        Commands::Download => {
            let client = ModrinthClient::new(cli.api_url)?;
            commands::download(&runtime, &client, &pack_dir, &cache_dir).await?
        }
        Commands::Update => {
            let client = ModrinthClient::new(cli.api_url)?;
            commands::update(&runtime, &client, &pack_dir, &cache_dir).await?
        }
        Commands::List => commands::list(&runtime, &pack_dir)?,
        Commands::Pin(args) => {
            commands::pin(&runtime, &pack_dir, &args.mod_name.join(" "))?
        }
        Commands::Deploy(args) => commands::deploy(
            &runtime,
            &pack_dir,
            &cache_dir,
            args.instance,
            args.directory,
        )?,
    }
    Ok(())
}
