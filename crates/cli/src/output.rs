//! Output formatting for scan results

use anyhow::Result;
use std::time::Duration;

use halberd_common::{LoginResult, TargetSummary};

/// Print attempt results and per-target outcomes in the requested format.
pub fn print_results(
    results: &[LoginResult],
    summaries: &[TargetSummary],
    format: &str,
    scan_duration: Duration,
) -> Result<()> {
    let format = format.trim().to_lowercase();
    match format.as_str() {
        "json" | "j" => print_json(results, summaries, scan_duration)?,
        "text" | "table" | "t" | "" => print_text(results, summaries, scan_duration),
        _ => {
            eprintln!("Warning: Unknown format '{}', using text", format);
            print_text(results, summaries, scan_duration);
        }
    }
    Ok(())
}

fn print_text(results: &[LoginResult], summaries: &[TargetSummary], scan_duration: Duration) {
    if results.is_empty() {
        println!("\nNo attempts were made.\n");
        return;
    }

    println!("\n{:-<90}", "");
    println!(
        "{:<22} {:<24} {:<18} {:<24}",
        "TARGET", "CREDENTIAL", "STATUS", "PROOF"
    );
    println!("{:-<90}", "");

    let mut valid = 0;
    for result in results {
        if result.is_success() {
            valid += 1;
        }
        println!(
            "{:<22} {:<24} {:<18} {:<24}",
            result.target.to_string(),
            result.credential.to_string(),
            result.status,
            result.proof
        );
    }

    println!("{:-<90}", "");
    println!("\nTargets:");
    for summary in summaries {
        println!(
            "  {:<22} {:<12} ({} attempts, {} valid)",
            summary.target.to_string(),
            summary.outcome,
            summary.attempts,
            summary.successes
        );
    }

    println!("\nSummary:");
    println!("  Attempts: {}", results.len());
    println!("  Valid credentials: {}", valid);
    println!("  Duration: {}", format_duration(scan_duration));
    println!();
}

fn print_json(
    results: &[LoginResult],
    summaries: &[TargetSummary],
    scan_duration: Duration,
) -> Result<()> {
    use serde_json::json;

    let valid: Vec<&LoginResult> = results.iter().filter(|r| r.is_success()).collect();
    let output = json!({
        "scan_info": {
            "duration_seconds": scan_duration.as_secs_f64(),
            "duration_formatted": format_duration(scan_duration),
            "attempts": results.len(),
            "valid_credentials": valid.len(),
        },
        "results": results,
        "targets": summaries,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
