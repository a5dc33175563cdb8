use crate::pipeline::record::DEFAULT_REQUEST_TIMEOUT;
use crate::pipeline::walker::{DEFAULT_WALK_PACING, DEFAULT_WALK_SLACK};
use crate::rpc::options::{DEFAULT_ENS_REGISTRY_ADDRESS, DEFAULT_GOVERNOR_ADDRESS};
use crate::rpc::retry::{RetryPolicy, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INITIAL_DELAY};
use crate::runtime::telemetry;
use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.nouns.biz";
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_DISPLAY_MAX_PROPOSALS: usize = 15;
pub const DEFAULT_PROPOSALS_PER_PAGE: usize = 5;
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MIN_PROPOSALS_PER_PAGE: usize = 2;
pub const DEFAULT_ANIMATION_SPEED: Duration = Duration::from_secs(2);
pub const DEFAULT_HEADER: &str = "Recent Nouns Proposals";

/// Runtime configuration for the proposal feed: where records come from and
/// how hard to try.
///
/// All instances must be constructed via [`FeedConfig::builder`] or [`FeedConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    rpc_url: String,
    rpc_user: Option<String>,
    rpc_password: Option<String>,
    api_base_url: String,
    governor_address: Address,
    ens_registry_address: Address,
    request_timeout: Duration,
    rpc_timeout: Duration,
    retry_attempts: usize,
    retry_initial_delay: Duration,
    walk_slack: usize,
    walk_pacing: Duration,
    metrics_interval: Duration,
    display: DisplayConfig,
}

pub struct FeedConfigParams {
    pub rpc_url: String,
    pub rpc_user: Option<String>,
    pub rpc_password: Option<String>,
    pub api_base_url: String,
    pub governor_address: Address,
    pub ens_registry_address: Address,
    pub request_timeout: Duration,
    pub rpc_timeout: Duration,
    pub retry_attempts: usize,
    pub retry_initial_delay: Duration,
    pub walk_slack: usize,
    pub walk_pacing: Duration,
    pub metrics_interval: Duration,
    pub display: DisplayConfig,
}

impl FeedConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> FeedConfigBuilder {
        FeedConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: FeedConfigParams) -> Result<Self> {
        let FeedConfigParams {
            rpc_url,
            rpc_user,
            rpc_password,
            api_base_url,
            governor_address,
            ens_registry_address,
            request_timeout,
            rpc_timeout,
            retry_attempts,
            retry_initial_delay,
            walk_slack,
            walk_pacing,
            metrics_interval,
            display,
        } = params;

        let config = Self {
            rpc_url: trimmed_string(rpc_url),
            rpc_user: rpc_user.map(trimmed_string).filter(|user| !user.is_empty()),
            rpc_password: rpc_password.filter(|password| !password.is_empty()),
            api_base_url: trimmed_string(api_base_url)
                .trim_end_matches('/')
                .to_owned(),
            governor_address,
            ens_registry_address,
            request_timeout,
            rpc_timeout,
            retry_attempts,
            retry_initial_delay,
            walk_slack,
            walk_pacing,
            metrics_interval,
            display,
        };

        config.validate()?;
        Ok(config)
    }

    /// Full JSON-RPC URL (including scheme) of the chain node.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Basic-auth credentials for the chain node, when configured.
    pub fn rpc_credentials(&self) -> Option<(&str, &str)> {
        match (&self.rpc_user, &self.rpc_password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }

    /// Base URL of the proposal REST API, without a trailing slash.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn governor_address(&self) -> Address {
        self.governor_address
    }

    pub fn ens_registry_address(&self) -> Address {
        self.ens_registry_address
    }

    /// Bound on a single proposal record request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Per-call timeout applied to the JSON-RPC client.
    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    pub fn retry_attempts(&self) -> usize {
        self.retry_attempts
    }

    pub fn retry_initial_delay(&self) -> Duration {
        self.retry_initial_delay
    }

    /// Retry policy shared by the high-water mark and name lookups.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_initial_delay)
    }

    /// Extra identifiers the walk may try beyond the requested count.
    pub fn walk_slack(&self) -> usize {
        self.walk_slack
    }

    /// Pause between consecutive record lookups.
    pub fn walk_pacing(&self) -> Duration {
        self.walk_pacing
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.rpc_url, "rpc_url")?;
        validate_url(&self.api_base_url, "api_base_url")?;

        match (&self.rpc_user, &self.rpc_password) {
            (Some(_), None) => bail!("rpc_password is required when rpc_user is set"),
            (None, Some(_)) => bail!("rpc_user is required when rpc_password is set"),
            _ => {}
        }

        if self.governor_address.is_zero() {
            bail!("governor_address cannot be the zero address");
        }

        if self.ens_registry_address.is_zero() {
            bail!("ens_registry_address cannot be the zero address");
        }

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.rpc_timeout.is_zero() {
            bail!("rpc_timeout must be greater than 0");
        }

        if self.retry_attempts == 0 {
            bail!("retry_attempts must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        self.display.validate()
    }
}

#[derive(Debug, Default, Clone)]
pub struct FeedConfigBuilder {
    rpc_url: Option<String>,
    rpc_user: Option<String>,
    rpc_password: Option<String>,
    api_base_url: Option<String>,
    governor_address: Option<String>,
    ens_registry_address: Option<String>,
    request_timeout: Option<Duration>,
    rpc_timeout: Option<Duration>,
    retry_attempts: Option<usize>,
    retry_initial_delay: Option<Duration>,
    walk_slack: Option<usize>,
    walk_pacing: Option<Duration>,
    metrics_interval: Option<Duration>,
    display: Option<DisplayConfig>,
}

impl FeedConfigBuilder {
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn rpc_user(mut self, user: impl Into<String>) -> Self {
        self.rpc_user = Some(user.into());
        self
    }

    pub fn rpc_password(mut self, password: impl Into<String>) -> Self {
        self.rpc_password = Some(password.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn governor_address(mut self, address: impl Into<String>) -> Self {
        self.governor_address = Some(address.into());
        self
    }

    pub fn ens_registry_address(mut self, address: impl Into<String>) -> Self {
        self.ens_registry_address = Some(address.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = Some(timeout);
        self
    }

    pub fn retry_attempts(mut self, attempts: usize) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    pub fn retry_initial_delay(mut self, delay: Duration) -> Self {
        self.retry_initial_delay = Some(delay);
        self
    }

    pub fn walk_slack(mut self, slack: usize) -> Self {
        self.walk_slack = Some(slack);
        self
    }

    pub fn walk_pacing(mut self, pacing: Duration) -> Self {
        self.walk_pacing = Some(pacing);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn display(mut self, display: DisplayConfig) -> Self {
        self.display = Some(display);
        self
    }

    pub fn build(self) -> Result<FeedConfig> {
        let params = FeedConfigParams {
            rpc_url: self.rpc_url.context("rpc_url is required")?,
            rpc_user: self.rpc_user,
            rpc_password: self.rpc_password,
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned()),
            governor_address: parse_address(
                self.governor_address.as_deref(),
                DEFAULT_GOVERNOR_ADDRESS,
                "governor_address",
            )?,
            ens_registry_address: parse_address(
                self.ens_registry_address.as_deref(),
                DEFAULT_ENS_REGISTRY_ADDRESS,
                "ens_registry_address",
            )?,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            rpc_timeout: self
                .rpc_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS)),
            retry_attempts: self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            retry_initial_delay: self
                .retry_initial_delay
                .unwrap_or(DEFAULT_RETRY_INITIAL_DELAY),
            walk_slack: self.walk_slack.unwrap_or(DEFAULT_WALK_SLACK),
            walk_pacing: self.walk_pacing.unwrap_or(DEFAULT_WALK_PACING),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
            display: self.display.unwrap_or_default(),
        };

        FeedConfig::new(params)
    }
}

/// What the presentation side asks for and how it pages the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Period between fetch cycles.
    pub update_interval: Duration,
    /// Target record count sent with every fetch request.
    pub max_proposals: usize,
    /// Configured page size before adaptive adjustment.
    pub proposals_per_page: usize,
    /// Period between page advances while cycling.
    pub cycle_interval: Duration,
    /// Lower bound on the adaptive page size.
    pub min_proposals_per_page: usize,
    pub show_proposer: bool,
    /// Transition hint handed to the presentation layer.
    pub animation_speed: Duration,
    pub header: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            max_proposals: DEFAULT_DISPLAY_MAX_PROPOSALS,
            proposals_per_page: DEFAULT_PROPOSALS_PER_PAGE,
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            min_proposals_per_page: DEFAULT_MIN_PROPOSALS_PER_PAGE,
            show_proposer: true,
            animation_speed: DEFAULT_ANIMATION_SPEED,
            header: DEFAULT_HEADER.to_owned(),
        }
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.update_interval.is_zero() {
            bail!("update_interval must be greater than 0");
        }

        if self.cycle_interval.is_zero() {
            bail!("cycle_interval must be greater than 0");
        }

        if self.max_proposals == 0 {
            bail!("max_proposals must be greater than 0");
        }

        if self.proposals_per_page == 0 {
            bail!("proposals_per_page must be greater than 0");
        }

        if self.min_proposals_per_page == 0 {
            bail!("min_proposals_per_page must be greater than 0");
        }

        if self.min_proposals_per_page > self.proposals_per_page {
            bail!(
                "min_proposals_per_page ({}) cannot exceed proposals_per_page ({})",
                self.min_proposals_per_page,
                self.proposals_per_page
            );
        }

        Ok(())
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn parse_address(raw: Option<&str>, default: &str, field: &str) -> Result<Address> {
    let raw = raw.map(str::trim).unwrap_or(default);
    Address::from_str(raw).with_context(|| format!("{field} {raw:?} is not a valid address"))
}

fn validate_url(url: &str, field: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{field} must start with http:// or https://");
    }
    Ok(())
}
