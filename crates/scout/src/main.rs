use anyhow::Context;
use clap::{Parser, Subcommand};
use scout_common::{Config, SelectorBook};
use scout_engine::browser::Browser;
use scout_engine::config::{ConfigError, ConfigLoader};
use scout_engine::flow::{FlowController, FlowTarget};
use scout_engine::gate::StdioGate;
use scout_engine::report::RunReport;
use scout_engine::store::{SelectorStore, StoreError};
use scout_wd::WdBrowser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "scout", version, about = "Voucher storefront selector scout")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (defaults to ./config/config.json, then
    /// ~/.scout/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Selector book location
    #[arg(long, default_value = "config/selectors.json")]
    selectors: PathBuf,

    /// WebDriver endpoint (overrides the config)
    #[arg(long)]
    driver_url: Option<String>,

    /// Run the browser visibly instead of headless
    #[arg(long)]
    visible: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Discover product-page selectors only; no cart, no login
    Probe,
    /// Drive through the login modal and stop before credentials
    Login,
    /// The full purchase flow, gated on OTP and payment confirmation
    Flow,
}

impl Mode {
    fn target(&self) -> FlowTarget {
        match self {
            Mode::Probe => FlowTarget::Product,
            Mode::Login => FlowTarget::Login,
            Mode::Flow => FlowTarget::Full,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs to stderr; stdout carries the run report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = load_config(&args).await?;
    let store = SelectorStore::new(&args.selectors);
    let mut book = load_book(&store).await?;

    let driver_url = args
        .driver_url
        .clone()
        .unwrap_or_else(|| config.scout.webdriver_url.clone());
    let mut browser = WdBrowser::new(driver_url, !args.visible);
    browser
        .launch()
        .await
        .context("failed to launch browser session")?;

    let controller = FlowController::new(config, book.clone(), args.mode.target());
    let mut gate = StdioGate::new();
    let mut report = RunReport::new();

    // Ctrl-C drops the flow mid-step; findings gathered so far are in
    // the report and still get persisted below.
    let outcome = tokio::select! {
        res = controller.run(&mut browser, &mut gate, &mut report) => Some(res),
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; keeping findings gathered so far");
            None
        }
    };

    if let Err(e) = browser.close().await {
        warn!(error = %e, "failed to close browser session");
    }

    let found = report.findings().len();
    if found > 0 {
        book.merge(report.findings());
        store
            .persist(&book)
            .await
            .with_context(|| format!("failed to persist selector book to {}", store.path().display()))?;
        info!(count = found, path = %store.path().display(), "selector book updated");
    }

    println!("{}", report.render());

    match outcome {
        Some(Ok(status)) => {
            info!(%status, "run finished");
            Ok(())
        }
        Some(Err(e)) => Err(anyhow::Error::new(e).context("flow failed")),
        None => anyhow::bail!("interrupted"),
    }
}

async fn load_config(args: &Args) -> anyhow::Result<Config> {
    let loaded = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await,
        None => ConfigLoader::load_default().await,
    };
    match loaded {
        Ok(config) => Ok(config),
        // No config means discovery-only: scout with defaults.
        Err(ConfigError::Missing(path)) => {
            warn!(path = %path.display(), "no config found, running selector discovery only");
            Ok(Config::default())
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to load config")),
    }
}

async fn load_book(store: &SelectorStore) -> anyhow::Result<SelectorBook> {
    match store.load().await {
        Ok(book) => Ok(book),
        Err(StoreError::ConfigMissing(path)) => {
            info!(path = %path.display(), "no selector book yet, starting empty");
            Ok(SelectorBook::new())
        }
        // A corrupt book must not be silently overwritten.
        Err(e) => Err(anyhow::Error::new(e).context("failed to load selector book")),
    }
}
