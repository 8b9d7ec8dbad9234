use anyhow::{bail, Context};
use clap::Parser;
use putsync::{sync, Client, Rule, RuleSet, SyncConfig, DEFAULT_API_URL};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "putsync")]
#[command(about = "Downloads files from put.io based on SRC pattern and DST folder", long_about = None)]
#[command(version)]
struct Args {
    /// Remote source pattern (e.g. "TV/" or "/Movies/.+")
    src: String,

    /// Local destination folder (must exist)
    dst: PathBuf,

    /// Additional rules, tried in order after SRC/DST
    #[arg(long = "rule", value_name = "SRC=DST")]
    rules: Vec<Rule>,

    /// Don't actually download, just print what would happen
    #[arg(long)]
    dry_run: bool,

    /// Delete files on put.io after confirmed successful download
    #[arg(long)]
    delete_after: bool,

    /// put.io OAuth token
    #[arg(long, env = "PUTIO_TOKEN", hide_env_values = true)]
    token: String,

    /// put.io API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// File to append log messages to
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(args: &Args) -> anyhow::Result<()> {
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("putsync={}", log_level)));

    match &args.logfile {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    if !args.dst.is_dir() {
        bail!("Destination {} is not an existing folder", args.dst.display());
    }

    let dst = args
        .dst
        .to_str()
        .context("destination path is not valid UTF-8")?;
    let mut rules = RuleSet::new(vec![Rule::new(&args.src, dst)?]);
    for rule in &args.rules {
        rules.push(rule.clone());
    }

    info!(
        "🚀 PutSync will {}, using first matching put.io paths:",
        if args.dry_run {
            "check what to download"
        } else {
            "download"
        }
    );
    for rule in rules.iter() {
        info!("    {}", rule);
    }

    let config = SyncConfig {
        api_url: args.api_url.clone(),
        dry_run: args.dry_run,
        delete_after_download: args.delete_after,
        show_progress: !args.no_progress && atty::is(atty::Stream::Stderr),
        ..SyncConfig::default()
    };
    let client = Client::with_base_url(&config.api_url, args.token.as_str())?;

    let summary = sync(&client, &rules, &config).await?;
    if summary.failures > 0 {
        bail!("{} item(s) failed to download", summary.failures);
    }
    Ok(())
}
