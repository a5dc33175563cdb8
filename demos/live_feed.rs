use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use proposal_feed::{DisplayConfig, FeedConfig, FeedRunner, Frame, PageView};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEFAULT_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";
const DEFAULT_LOG_DIRECTIVE: &str = "warn";

#[tokio::main]
async fn main() -> Result<()> {
    proposal_feed::init_tracing_with_default(DEFAULT_LOG_DIRECTIVE);

    let config = DemoArgs::from_env()?.to_feed_config()?;
    let spinner = build_spinner();
    spinner.println(format!(
        "Watching governor {} via {}",
        config.governor_address(),
        config.rpc_url()
    ));

    let runner = FeedRunner::new(config)?;
    let frames = runner.subscribe();
    let printer = spawn_frame_printer(frames, spinner.clone());

    let result = runner.run_until_ctrl_c().await;
    printer.abort();
    spinner.finish_and_clear();
    result
}

fn build_spinner() -> ProgressBar {
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout_with_hz(12));
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn spawn_frame_printer(mut frames: watch::Receiver<Frame>, bar: ProgressBar) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let frame = frames.borrow_and_update().clone();
            match frame {
                Frame::Loading => bar.set_message("loading proposals..."),
                Frame::Error { message } => bar.set_message(format!("error: {message}")),
                Frame::Page(view) => {
                    bar.set_message(view.page_indicator().unwrap_or_default());
                    print_page(&bar, &view);
                }
            }
            if frames.changed().await.is_err() {
                break;
            }
        }
    })
}

fn print_page(bar: &ProgressBar, view: &PageView) {
    bar.println(format!("== {} ==", view.header));
    if view.entries.is_empty() {
        bar.println("  (no proposals)");
    }
    for entry in &view.entries {
        bar.println(format!("  {}  [{}]", entry.heading(), entry.status_label));
        bar.println(format!("    {}", entry.title));
        let quorum = entry
            .quorum_marker
            .map(|marker| format!(" · quorum at {marker:.0}%"))
            .unwrap_or_default();
        bar.println(format!(
            "    {} ({:.0}% for){quorum}",
            entry.vote_summary(),
            entry.shares.for_percent
        ));
    }
}

struct DemoArgs {
    rpc_url: String,
    rpc_user: Option<String>,
    rpc_password: Option<String>,
    api_base_url: Option<String>,
    max_proposals: usize,
    proposals_per_page: usize,
    update_interval_secs: u64,
    cycle_interval_secs: u64,
    show_proposer: bool,
}

impl DemoArgs {
    fn from_env() -> Result<Self> {
        let defaults = DisplayConfig::default();
        Ok(Self {
            rpc_url: read_env_or_default("PROPOSAL_FEED_RPC_URL", DEFAULT_RPC_URL),
            rpc_user: env::var("PROPOSAL_FEED_RPC_USER").ok(),
            rpc_password: env::var("PROPOSAL_FEED_RPC_PASSWORD").ok(),
            api_base_url: env::var("PROPOSAL_FEED_API_URL").ok(),
            max_proposals: parse_env_with_default(
                "PROPOSAL_FEED_MAX_PROPOSALS",
                defaults.max_proposals,
            )?,
            proposals_per_page: parse_env_with_default(
                "PROPOSAL_FEED_PER_PAGE",
                defaults.proposals_per_page,
            )?,
            update_interval_secs: parse_env_with_default(
                "PROPOSAL_FEED_UPDATE_SECS",
                defaults.update_interval.as_secs(),
            )?,
            cycle_interval_secs: parse_env_with_default(
                "PROPOSAL_FEED_CYCLE_SECS",
                defaults.cycle_interval.as_secs(),
            )?,
            show_proposer: parse_env_with_default(
                "PROPOSAL_FEED_SHOW_PROPOSER",
                defaults.show_proposer,
            )?,
        })
    }

    fn to_feed_config(&self) -> Result<FeedConfig> {
        let display = DisplayConfig {
            max_proposals: self.max_proposals,
            proposals_per_page: self.proposals_per_page,
            min_proposals_per_page: DisplayConfig::default()
                .min_proposals_per_page
                .min(self.proposals_per_page),
            update_interval: Duration::from_secs(self.update_interval_secs),
            cycle_interval: Duration::from_secs(self.cycle_interval_secs),
            show_proposer: self.show_proposer,
            ..DisplayConfig::default()
        };

        let mut builder = FeedConfig::builder().rpc_url(&self.rpc_url).display(display);
        if let Some(user) = &self.rpc_user {
            builder = builder.rpc_user(user);
        }
        if let Some(password) = &self.rpc_password {
            builder = builder.rpc_password(password);
        }
        if let Some(url) = &self.api_base_url {
            builder = builder.api_base_url(url);
        }
        builder.build()
    }
}

fn read_env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_owned(),
    }
}

fn parse_env_with_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("failed to parse {key}='{value}'")),
        _ => Ok(default),
    }
}
