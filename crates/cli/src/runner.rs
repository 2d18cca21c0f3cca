// runner.rs
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

use halberd_common::{combinations, Connector, Credential, ScanJob, ScanOptions, ScanTarget};
use halberd_connector_mysql::MySqlConnector;
use halberd_engine::{Engine, MemorySink};
use halberd_target_resolver::TargetResolver;

use crate::args::ScanArgs;
use crate::output::print_results;

pub async fn run_scan(args: ScanArgs) -> Result<()> {
    info!("Starting scan...");
    info!("Targets: {}", args.targets);
    info!("Port: {}", args.port);
    info!("Protocol: {}", args.protocol);
    info!("Concurrency: {}", args.concurrency);

    let ips = TargetResolver::resolve_targets(&args.targets).await?;
    let connect_timeout = Duration::from_millis(args.connect_timeout);
    let read_timeout = Duration::from_millis(args.read_timeout);

    let targets: Vec<ScanTarget> = ips
        .iter()
        .map(|ip| {
            ScanTarget::new(ip.to_string(), args.port)
                .with_connect_timeout(connect_timeout)
                .with_read_timeout(read_timeout)
        })
        .collect();

    let credentials = assemble_credentials(&args)?;
    if credentials.is_empty() {
        anyhow::bail!(
            "No credentials specified; use --users/--passwords, the file variants, or --pair-file"
        );
    }

    info!("Resolved {} target(s)", targets.len());
    info!(
        "Credential queue: {} ({} total attempts)",
        credentials.len(),
        targets.len() * credentials.len()
    );

    let options = ScanOptions {
        max_consecutive_conn_errors: args.max_conn_errors,
        stop_on_success: !args.continue_on_success,
        max_concurrency: args.concurrency,
        rate_limit: args.rate_limit,
    };

    let mut engine = Engine::new(options.clone());
    engine.register_connector(
        "mysql",
        Arc::new(|target: ScanTarget| -> Arc<dyn Connector> {
            Arc::new(MySqlConnector::new(target))
        }),
    );

    // Ctrl-C flips the cancel flag; in-flight attempts are interrupted and
    // affected targets finish with an aborted outcome.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, aborting scan");
            let _ = cancel_tx.send(true);
        }
    });

    let job = ScanJob::new(targets, credentials).with_options(options);
    let sink = Arc::new(MemorySink::new());

    let scan_start = Instant::now();
    let summaries = engine
        .run(job, Some(args.protocol.as_str()), sink.clone(), cancel_rx)
        .await?;
    let scan_duration = scan_start.elapsed();

    let results = sink.results().await;
    print_results(&results, &summaries, &args.output_format, scan_duration)?;
    Ok(())
}

/// Build the credential queue: operator-supplied pairs first (`paired`),
/// then the cartesian product of the separate lists.
fn assemble_credentials(args: &ScanArgs) -> Result<Vec<Credential>> {
    let mut credentials = Vec::new();

    if let Some(path) = &args.pair_file {
        for line in read_list_file(path)? {
            credentials.push(parse_pair_line(&line)?);
        }
    }

    let mut users = split_list(args.users.as_deref());
    if let Some(path) = &args.user_file {
        users.extend(read_list_file(path)?);
    }
    let mut passwords = split_list(args.passwords.as_deref());
    if let Some(path) = &args.pass_file {
        passwords.extend(read_list_file(path)?);
    }
    credentials.extend(combinations(&users, &passwords));

    if let Some(realm) = &args.realm {
        credentials = credentials
            .into_iter()
            .map(|c| c.with_realm(realm.clone()))
            .collect();
    }

    Ok(credentials)
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// One entry per line; blank lines and '#' comments are skipped.
fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// "user:password" with the password allowed to contain ':'.
fn parse_pair_line(line: &str) -> Result<Credential> {
    let (user, pass) = line
        .split_once(':')
        .with_context(|| format!("Invalid pair line (expected user:password): {}", line))?;
    Ok(Credential::pair(user, pass))
}
