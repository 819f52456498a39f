use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qbit::{Config, Qbit, Transfer};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect and organize transfers on a qBittorrent Web UI.")]
struct Cli {
    /// TOML file with connection settings; flags override its values.
    #[arg(short, long, env = "QBIT_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the Web UI, e.g. http://localhost:8080
    #[arg(long, env = "QBIT_URL")]
    url: Option<String>,

    /// Web API username
    #[arg(long, env = "QBIT_USER")]
    user: Option<String>,

    /// Web API password
    #[arg(long, env = "QBIT_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Maximum tracing verbosity to enable: error|warn|info|debug|trace
    #[arg(long, default_value_t = LevelFilter::WARN, value_parser = clap::value_parser!(LevelFilter))]
    level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List transfers
    Transfers {
        /// Only show transfers in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// List categories and their save paths
    Categories,
    /// Move transfers into a category ("" removes it)
    SetCategory {
        category: String,
        #[arg(required = true)]
        hashes: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.level);

    let config = load_config(&cli)?;
    debug!(?config, "Loaded configuration");

    let qbit = Qbit::new(config).await.context("logging in to qBittorrent")?;

    match cli.command {
        Command::Transfers { category } => {
            let transfers = qbit.transfers().await?;
            for transfer in transfers
                .iter()
                .filter(|t| category.as_ref().is_none_or(|c| t.category == *c))
            {
                println!("{}", transfer_line(transfer));
            }
        }
        Command::Categories => {
            for (name, category) in qbit.categories().await? {
                println!("{name}\t{}", category.save_path);
            }
        }
        Command::SetCategory { category, hashes } => {
            qbit.set_torrent_category(&category, &hashes).await?;
            info!(%category, count = hashes.len(), "Category set");
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading config file {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(url) = &cli.url {
        config.url.clone_from(url);
    }
    if let Some(user) = &cli.user {
        config.user.clone_from(user);
    }
    if let Some(pass) = &cli.pass {
        config.pass.clone_from(pass);
    }

    anyhow::ensure!(
        !config.url.is_empty(),
        "no Web UI URL given (use --url, QBIT_URL or a config file)"
    );

    Ok(config)
}

fn transfer_line(transfer: &Transfer) -> String {
    format!(
        "{}\t{:>5.1}%\t{}\t{}\t{}",
        transfer.hash,
        transfer.progress * 100.0,
        transfer.state(),
        transfer.category,
        transfer.name
    )
}

fn init_tracing(level: LevelFilter) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
