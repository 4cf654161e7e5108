// Interface byte counters from `netstat -ib`

use std::collections::HashSet;

use crate::error::ProbeError;
use crate::models::NetworkCounters;

/// Sum the `Ibytes` / `Obytes` columns of `netstat -ib` across all interfaces.
///
/// Columns are located by header name. Rows with an empty `Address` column have one
/// token fewer than the header, so for short rows the column is counted from the
/// right-hand end instead. netstat repeats an interface once per address family with
/// identical counters; only the first row per interface name is counted. Loopback and
/// virtual interfaces are still included.
pub fn parse_netstat_ib(output: &str) -> Result<NetworkCounters, ProbeError> {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .map(|l| l.split_whitespace().collect())
        .ok_or_else(|| ProbeError::parse("netstat", "empty output"))?;

    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| ProbeError::parse("netstat", format!("no {name} column in header")))
    };
    let ibytes = column("Ibytes")?;
    let obytes = column("Obytes")?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut counters = NetworkCounters::default();

    for line in lines {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let Some(name) = cols.first().copied() else {
            continue;
        };
        if name == "Name" {
            continue;
        }
        let (Some(rx), Some(tx)) = (
            cell(&cols, header.len(), ibytes),
            cell(&cols, header.len(), obytes),
        ) else {
            continue;
        };
        if !seen.insert(name) {
            continue;
        }
        counters.received = counters.received.saturating_add(rx);
        counters.transmitted = counters.transmitted.saturating_add(tx);
    }

    Ok(counters)
}

fn cell(cols: &[&str], header_len: usize, index: usize) -> Option<u64> {
    let at = if cols.len() >= header_len {
        index
    } else {
        cols.len().checked_sub(header_len - index)?
    };
    cols.get(at)?.parse().ok()
}
