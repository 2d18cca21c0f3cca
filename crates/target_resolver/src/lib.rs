//! Target Resolver - host-list expansion for scan jobs.
//!
//! Takes a comma-separated target string and expands it into a deduplicated
//! list of IPv4 addresses. Supported token forms:
//! - single IPv4 address: "10.0.0.5"
//! - CIDR: "192.168.1.0/24"
//! - range: "192.168.1.1-192.168.1.10"
//! - hostname: "db.example.com"

use anyhow::{Context, Result};
use ipnet::Ipv4Net;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

/// CIDR expansion guard; large sweeps are almost always operator error for
/// a login scanner.
const MAX_CIDR_HOSTS: u128 = 4096;

pub struct TargetResolver;

impl TargetResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a comma-separated target string into unique IPv4 addresses.
    /// DNS lookups run inside `spawn_blocking` so the async runtime is not
    /// stalled.
    pub async fn resolve_targets(targets: &str) -> Result<Vec<IpAddr>> {
        if targets.trim().is_empty() {
            anyhow::bail!("No targets specified");
        }

        let mut seen = HashSet::new();
        let mut ips: Vec<IpAddr> = Vec::new();
        let mut hostnames: Vec<String> = Vec::new();
        let mut push = |ip: IpAddr, seen: &mut HashSet<IpAddr>, ips: &mut Vec<IpAddr>| {
            if seen.insert(ip) {
                ips.push(ip);
            }
        };

        for token in targets.split(',') {
            let t = token.trim();
            if t.is_empty() {
                continue;
            }

            if let Ok(net) = t.parse::<Ipv4Net>() {
                let prefix = net.prefix_len();
                let hosts_count = if prefix >= 32 { 1u128 } else { 1u128 << (32 - prefix) };
                let allow_large = std::env::var("HALBERD_ALLOW_LARGE_CIDR")
                    .map(|v| v == "1")
                    .unwrap_or(false);
                if hosts_count > MAX_CIDR_HOSTS && !allow_large {
                    anyhow::bail!(
                        "CIDR {} expands to {} hosts, above the limit of {}. \
                         Set HALBERD_ALLOW_LARGE_CIDR=1 to override.",
                        net,
                        hosts_count,
                        MAX_CIDR_HOSTS
                    );
                }
                for addr in net.hosts() {
                    push(IpAddr::V4(addr), &mut seen, &mut ips);
                }
                continue;
            }

            if t.contains('-') && t.chars().any(|c| c.is_ascii_digit()) {
                if let Ok(range_ips) = parse_ip_range(t) {
                    for ip in range_ips {
                        push(ip, &mut seen, &mut ips);
                    }
                    continue;
                }
            }

            if let Ok(ip) = t.parse::<IpAddr>() {
                if ip.is_ipv4() {
                    push(ip, &mut seen, &mut ips);
                }
                continue;
            }

            hostnames.push(t.to_string());
        }

        if !hostnames.is_empty() {
            let resolved: Vec<Vec<IpAddr>> = tokio::task::spawn_blocking(move || {
                hostnames
                    .into_iter()
                    .map(|h| match (h.as_str(), 0).to_socket_addrs() {
                        Ok(addrs) => addrs
                            .filter(|a| a.ip().is_ipv4())
                            .map(|a| a.ip())
                            .collect::<Vec<IpAddr>>(),
                        Err(_) => Vec::new(),
                    })
                    .collect()
            })
            .await
            .context("Blocking DNS resolution failed")?;

            for ip in resolved.into_iter().flatten() {
                push(ip, &mut seen, &mut ips);
            }
        }

        if ips.is_empty() {
            anyhow::bail!("No valid IPv4 addresses found in targets");
        }

        Ok(ips)
    }
}

fn parse_ip_range(range: &str) -> Result<Vec<IpAddr>> {
    let parts: Vec<&str> = range.split('-').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid IP range: {}", range);
    }

    let start: Ipv4Addr = parts[0]
        .parse()
        .context(format!("Invalid start IP: {}", parts[0]))?;
    let end: Ipv4Addr = parts[1]
        .parse()
        .context(format!("Invalid end IP: {}", parts[1]))?;

    let start_u32 = u32::from(start);
    let end_u32 = u32::from(end);
    if start_u32 > end_u32 {
        anyhow::bail!("Invalid IP range: start > end");
    }

    Ok((start_u32..=end_u32)
        .map(|v| IpAddr::V4(Ipv4Addr::from(v)))
        .collect())
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new()
    }
}
