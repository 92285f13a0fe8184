// # snapmond - Snapshot Monitor Daemon
//
// This is a thin integration layer. All reconciliation logic lives in
// snapmon-core; this binary only wires it up.
//
// The snapmond daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering backends (lister, state store, notifier)
// 4. Running the monitor once or on a `rate(...)` schedule
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Targets
// - `SNAPMON_REGIONS`: Comma-separated regions to monitor (required)
// - `SNAPMON_STATUSES`: Comma-separated statuses that alert (default: available,failed)
// - `SNAPMON_SNAPSHOT_AGE_DAYS`: Ignore snapshots older than this (default: 7)
// - `SNAPMON_RETENTION_DAYS`: Lifetime of persisted state (default: age days)
//
// ### Scheduling
// - `SNAPMON_RUN_MODE`: `once` or `scheduled` (default: scheduled)
// - `SNAPMON_SCHEDULE`: `rate(N minutes|hours|days)` (default: rate(10 minutes))
// - `SNAPMON_RUN_TIMEOUT_SECS`: Deadline for one run (default: 300)
//
// ### Backends
// - `SNAPMON_LISTER_TYPE`: Snapshot lister (rds)
// - `SNAPMON_NOTIFIER_TYPE`: Notifier (sns, webhook, log)
// - `SNAPMON_TOPIC`: SNS topic ARN (required for sns)
// - `SNAPMON_WEBHOOK_URL` / `SNAPMON_WEBHOOK_TOKEN`: Webhook target and bearer token
// - `SNAPMON_STATE_STORE_TYPE`: State store (dynamodb, file, memory)
// - `SNAPMON_STATE_TABLE`: DynamoDB table (required for dynamodb)
// - `SNAPMON_STATE_STORE_PATH`: State file (required for file)
// - `SNAPMON_AWS_ENDPOINT_URL`: Endpoint override for all AWS clients
//
// ### Engine
// - `SNAPMON_MAX_BATCH_SIZE`: Records per state write, 1..=25 (default: 25)
// - `SNAPMON_CONTINUE_ON_ERROR`: Keep going after a region fails (default: false)
// - `SNAPMON_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export SNAPMON_REGIONS=us-west-2,eu-west-1
// export SNAPMON_TOPIC=arn:aws:sns:us-west-2:123456789012:snapshot-status
// export SNAPMON_STATE_TABLE=rds-snapshot-state
//
// snapmond
// ```

use anyhow::{Context, Result};
use snapmon_core::config::{
    EngineConfig, FailurePolicy, MonitorConfig, NotifierConfig, StateStoreConfig,
};
use snapmon_core::registry::{BackendRegistry, register_builtin};
use snapmon_core::{RunReport, SnapshotMonitor};
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Topic label used when the notifier does not address an SNS topic
const DEFAULT_TOPIC_LABEL: &str = "rds-snapshot-status";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown (or a successful one-shot run)
/// - 1: Configuration or startup error
/// - 2: Runtime error (a run failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapmonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<SnapmonExitCode> for ExitCode {
    fn from(code: SnapmonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// How the daemon schedules runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// One run, then exit
    Once,
    /// Run, sleep for the schedule interval, repeat until a shutdown signal
    Scheduled,
}

/// Application configuration
#[derive(Debug)]
struct Config {
    regions: Vec<String>,
    statuses: Vec<String>,
    snapshot_age_days: u32,
    retention_days: Option<u32>,
    schedule: String,
    run_mode: RunMode,
    run_timeout_secs: u64,
    lister_type: String,
    notifier_type: String,
    topic: Option<String>,
    webhook_url: Option<String>,
    webhook_token: Option<String>,
    state_store_type: String,
    state_table: Option<String>,
    state_store_path: Option<String>,
    aws_endpoint_url: Option<String>,
    max_batch_size: usize,
    continue_on_error: bool,
    log_level: String,
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_number<T: std::str::FromStr>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} must be a number. Got '{}': {}", name, raw, e))
        })
        .transpose()
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Load configuration from any key → value source
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let statuses = split_list(lookup("SNAPMON_STATUSES"));

        let run_mode = match lookup("SNAPMON_RUN_MODE")
            .unwrap_or_else(|| "scheduled".to_string())
            .to_lowercase()
            .as_str()
        {
            "once" => RunMode::Once,
            "scheduled" => RunMode::Scheduled,
            other => anyhow::bail!(
                "SNAPMON_RUN_MODE '{}' is not valid. Valid modes: once, scheduled",
                other
            ),
        };

        let continue_on_error = match lookup("SNAPMON_CONTINUE_ON_ERROR")
            .unwrap_or_else(|| "false".to_string())
            .to_lowercase()
            .as_str()
        {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => anyhow::bail!(
                "SNAPMON_CONTINUE_ON_ERROR must be true or false. Got: {}",
                other
            ),
        };

        Ok(Self {
            regions: split_list(lookup("SNAPMON_REGIONS")),
            statuses: if statuses.is_empty() {
                vec!["available".to_string(), "failed".to_string()]
            } else {
                statuses
            },
            snapshot_age_days: parse_number("SNAPMON_SNAPSHOT_AGE_DAYS", lookup("SNAPMON_SNAPSHOT_AGE_DAYS"))?
                .unwrap_or(7),
            retention_days: parse_number("SNAPMON_RETENTION_DAYS", lookup("SNAPMON_RETENTION_DAYS"))?,
            schedule: lookup("SNAPMON_SCHEDULE").unwrap_or_else(|| "rate(10 minutes)".to_string()),
            run_mode,
            run_timeout_secs: parse_number("SNAPMON_RUN_TIMEOUT_SECS", lookup("SNAPMON_RUN_TIMEOUT_SECS"))?
                .unwrap_or(300),
            lister_type: lookup("SNAPMON_LISTER_TYPE").unwrap_or_else(|| "rds".to_string()),
            notifier_type: lookup("SNAPMON_NOTIFIER_TYPE").unwrap_or_else(|| "sns".to_string()),
            topic: lookup("SNAPMON_TOPIC"),
            webhook_url: lookup("SNAPMON_WEBHOOK_URL"),
            webhook_token: lookup("SNAPMON_WEBHOOK_TOKEN"),
            state_store_type: lookup("SNAPMON_STATE_STORE_TYPE")
                .unwrap_or_else(|| "dynamodb".to_string()),
            state_table: lookup("SNAPMON_STATE_TABLE"),
            state_store_path: lookup("SNAPMON_STATE_STORE_PATH"),
            aws_endpoint_url: lookup("SNAPMON_AWS_ENDPOINT_URL"),
            max_batch_size: parse_number("SNAPMON_MAX_BATCH_SIZE", lookup("SNAPMON_MAX_BATCH_SIZE"))?
                .unwrap_or(snapmon_core::config::DEFAULT_MAX_BATCH_SIZE),
            continue_on_error,
            log_level: lookup("SNAPMON_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks everything the environment can get wrong before any backend is
    /// created, so a misconfigured deployment exits with a config error
    /// instead of failing its first run.
    fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            anyhow::bail!(
                "SNAPMON_REGIONS must contain at least one region. \
                Set it via: export SNAPMON_REGIONS=us-west-2,eu-west-1"
            );
        }

        if self.snapshot_age_days == 0 {
            anyhow::bail!("SNAPMON_SNAPSHOT_AGE_DAYS must be at least 1");
        }
        if self.retention_days == Some(0) {
            anyhow::bail!("SNAPMON_RETENTION_DAYS must be at least 1");
        }

        parse_schedule(&self.schedule).context("SNAPMON_SCHEDULE is not valid")?;

        if !(1..=3600).contains(&self.run_timeout_secs) {
            anyhow::bail!(
                "SNAPMON_RUN_TIMEOUT_SECS must be between 1 and 3600 seconds. Got: {}",
                self.run_timeout_secs
            );
        }

        match self.notifier_type.as_str() {
            "sns" => {
                if self.topic.is_none() {
                    anyhow::bail!(
                        "SNAPMON_TOPIC is required when SNAPMON_NOTIFIER_TYPE=sns. \
                        Set it via: export SNAPMON_TOPIC=arn:aws:sns:<region>:<account>:<topic>"
                    );
                }
            }
            "webhook" => match &self.webhook_url {
                None => anyhow::bail!(
                    "SNAPMON_WEBHOOK_URL is required when SNAPMON_NOTIFIER_TYPE=webhook"
                ),
                Some(url) if !url.starts_with("https://") && !url.starts_with("http://") => {
                    anyhow::bail!(
                        "SNAPMON_WEBHOOK_URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )
                }
                Some(url) if url.starts_with("http://") => {
                    eprintln!(
                        "WARNING: SNAPMON_WEBHOOK_URL uses HTTP (not HTTPS). \
                        The digest and token are sent in clear text."
                    );
                }
                Some(_) => {}
            },
            "log" => {}
            other => anyhow::bail!(
                "SNAPMON_NOTIFIER_TYPE '{}' is not supported. \
                Supported notifiers: sns, webhook, log",
                other
            ),
        }

        match self.state_store_type.as_str() {
            "dynamodb" => {
                if self.state_table.is_none() {
                    anyhow::bail!(
                        "SNAPMON_STATE_TABLE is required when SNAPMON_STATE_STORE_TYPE=dynamodb"
                    );
                }
            }
            "file" => match &self.state_store_path {
                None => anyhow::bail!(
                    "SNAPMON_STATE_STORE_PATH is required when SNAPMON_STATE_STORE_TYPE=file. \
                    Set it via: export SNAPMON_STATE_STORE_PATH=/var/lib/snapmon/state.json"
                ),
                Some(path) => {
                    let parent = std::path::Path::new(path)
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty());
                    if let Some(parent) = parent.filter(|p| !p.exists()) {
                        anyhow::bail!(
                            "SNAPMON_STATE_STORE_PATH parent directory does not exist: {}. \
                            Create it first: sudo mkdir -p {}",
                            parent.display(),
                            parent.display()
                        );
                    }
                }
            },
            "memory" => {
                if self.run_mode == RunMode::Once {
                    eprintln!(
                        "WARNING: SNAPMON_STATE_STORE_TYPE=memory with SNAPMON_RUN_MODE=once \
                        reports every monitored snapshot as new on each invocation."
                    );
                }
            }
            other => anyhow::bail!(
                "SNAPMON_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: dynamodb, file, memory",
                other
            ),
        }

        if !(1..=snapmon_core::config::DEFAULT_MAX_BATCH_SIZE).contains(&self.max_batch_size) {
            anyhow::bail!(
                "SNAPMON_MAX_BATCH_SIZE must be between 1 and {}. Got: {}",
                snapmon_core::config::DEFAULT_MAX_BATCH_SIZE,
                self.max_batch_size
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SNAPMON_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        // Everything the core checks on its own
        self.monitor_config().validate()?;

        Ok(())
    }

    /// Build the core configuration
    fn monitor_config(&self) -> MonitorConfig {
        let notifier = match self.notifier_type.as_str() {
            "webhook" => NotifierConfig::Webhook {
                url: self.webhook_url.clone().unwrap_or_default(),
                auth_token: self.webhook_token.clone(),
            },
            "log" => NotifierConfig::Log,
            _ => NotifierConfig::Sns {
                endpoint_url: self.aws_endpoint_url.clone(),
            },
        };

        let state_store = match self.state_store_type.as_str() {
            "file" => StateStoreConfig::File {
                path: self.state_store_path.clone().unwrap_or_default(),
            },
            "memory" => StateStoreConfig::Memory,
            _ => StateStoreConfig::Dynamodb {
                table_name: self.state_table.clone().unwrap_or_default(),
                endpoint_url: self.aws_endpoint_url.clone(),
            },
        };

        let engine = EngineConfig {
            max_batch_size: self.max_batch_size,
            failure_policy: if self.continue_on_error {
                FailurePolicy::ContinueOnError
            } else {
                FailurePolicy::FailFast
            },
            ..EngineConfig::default()
        };

        let topic = self
            .topic
            .clone()
            .unwrap_or_else(|| DEFAULT_TOPIC_LABEL.to_string());

        let mut config = MonitorConfig::new(self.regions.clone(), topic)
            .with_statuses(self.statuses.clone())
            .with_snapshot_age_days(self.snapshot_age_days)
            .with_notifier(notifier)
            .with_state_store(state_store)
            .with_engine(engine);
        config.retention_days = self.retention_days;
        config.lister = self.lister_type.clone();
        config.schedule_expression = self.schedule.clone();
        config
    }
}

/// Parse a `rate(N unit)` schedule expression into an interval
///
/// Units: minute(s), hour(s), day(s). `cron(...)` expressions are not
/// supported by the built-in scheduler.
fn parse_schedule(expression: &str) -> Result<Duration> {
    let expression = expression.trim();
    let inner = expression
        .strip_prefix("rate(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unsupported schedule expression '{}'. Expected rate(N minutes|hours|days)",
                expression
            )
        })?;

    let mut parts = inner.split_whitespace();
    let (Some(value), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        anyhow::bail!("Schedule expression '{}' must look like rate(10 minutes)", expression);
    };

    let value: u64 = value
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid rate value '{}': {}", value, e))?;
    if value == 0 {
        anyhow::bail!("Rate value must be at least 1");
    }

    let unit_secs = match unit {
        "minute" | "minutes" => 60,
        "hour" | "hours" => 3600,
        "day" | "days" => 86_400,
        other => anyhow::bail!("Unsupported rate unit '{}'. Use minutes, hours or days", other),
    };

    Ok(Duration::from_secs(value * unit_secs))
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SnapmonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return SnapmonExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SnapmonExitCode::ConfigError.into();
    }

    info!("Starting snapmond daemon");
    info!(
        "Configuration loaded: {} region(s), notifier {}, state store {}",
        config.regions.len(),
        config.notifier_type,
        config.state_store_type
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SnapmonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                SnapmonExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the backends and run the monitor according to the run mode
async fn run_daemon(config: Config) -> Result<SnapmonExitCode> {
    let registry = BackendRegistry::new();
    register_builtin(&registry);

    #[cfg(feature = "aws")]
    {
        info!("Registering AWS backends (rds, dynamodb, sns)");
        snapmon_aws::register(&registry, config.aws_endpoint_url.clone());
    }

    #[cfg(feature = "webhook")]
    {
        info!("Registering webhook notifier");
        snapmon_webhook::register(&registry);
    }

    let monitor_config = config.monitor_config();
    let interval = parse_schedule(&monitor_config.schedule_expression)?;
    let run_timeout = Duration::from_secs(config.run_timeout_secs);

    let listers = registry.lister(&monitor_config.lister)?;
    let state_store = registry.create_state_store(&monitor_config.state_store).await?;
    let notifier = registry.create_notifier(&monitor_config.notifier).await?;
    info!(
        "Backends ready: lister {}, state store {}, notifier {}",
        monitor_config.lister,
        state_store.store_name(),
        notifier.notifier_name()
    );

    let (monitor, mut events) = SnapshotMonitor::new(listers, state_store, notifier, monitor_config)?;

    // Forward monitor events to the debug log
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Monitor event");
        }
    });

    // Cancelled on SIGTERM/SIGINT; every run uses a child token
    let shutdown = CancellationToken::new();
    let signal_listener = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match wait_for_shutdown_signal().await {
                Ok(signal) => {
                    info!("Received shutdown signal: {}", signal);
                    shutdown.cancel();
                }
                Err(e) => error!("Signal handling unavailable: {:#}", e),
            }
        })
    };

    let code = match config.run_mode {
        RunMode::Once => {
            let cancel = shutdown.child_token();
            let result = run_with_deadline(&monitor, &cancel, run_timeout).await;
            exit_code_for(result, shutdown.is_cancelled())
        }
        RunMode::Scheduled => {
            info!("Running every {:?}", interval);
            loop {
                let cancel = shutdown.child_token();
                let result = run_with_deadline(&monitor, &cancel, run_timeout).await;
                if exit_code_for(result, shutdown.is_cancelled()) != SnapmonExitCode::CleanShutdown {
                    warn!("Run failed; next attempt in {:?}", interval);
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            SnapmonExitCode::CleanShutdown
        }
    };

    signal_listener.abort();
    drop(monitor);
    let _ = event_logger.await;

    info!("Shutting down daemon");
    Ok(code)
}

/// Run once, cancelling the run when `timeout` elapses
///
/// The run is awaited to completion after cancellation so it can stop at
/// its next cancellation point.
async fn run_with_deadline(
    monitor: &SnapshotMonitor,
    cancel: &CancellationToken,
    timeout: Duration,
) -> snapmon_core::Result<RunReport> {
    let run = monitor.run(cancel);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::time::sleep(timeout) => {
            warn!("Run exceeded {:?}, cancelling", timeout);
            cancel.cancel();
            run.await
        }
    }
}

/// Log a run's outcome and map it to an exit code
fn exit_code_for(result: snapmon_core::Result<RunReport>, shutting_down: bool) -> SnapmonExitCode {
    match result {
        Ok(report) if report.has_failures() => {
            for (region, e) in &report.failures {
                error!("Region {} failed: {}", region, e);
            }
            SnapmonExitCode::RuntimeError
        }
        Ok(report) => {
            info!(
                "Run finished: {} region(s), {} change(s)",
                report.completed.len(),
                report.total_changes()
            );
            SnapmonExitCode::CleanShutdown
        }
        Err(e) if e.is_cancelled() && shutting_down => {
            info!("Run interrupted by shutdown: {}", e);
            SnapmonExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Run failed: {}", e);
            SnapmonExitCode::RuntimeError
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
