// Process listings: `ps` (pid, cpu%, command) and `top` / `ps rss` (pid, memory, command)

use crate::models::ProcessRow;

/// Split `"<a> <b> <rest...>"` into its first two whitespace-delimited tokens and the
/// remainder, which may itself contain spaces (application paths often do).
fn split_row(line: &str) -> Option<(&str, &str, &str)> {
    let line = line.trim();
    let (first, rest) = line.split_once(char::is_whitespace)?;
    let (second, rest) = rest.trim_start().split_once(char::is_whitespace)?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some((first, second, rest))
}

/// Parse `ps -Ao pid=,pcpu=,comm=`. A header row, if present, is skipped.
pub fn parse_ps_cpu(output: &str) -> Vec<ProcessRow> {
    output
        .lines()
        .filter_map(split_row)
        .filter_map(|(pid, cpu, command)| {
            let pid = pid.parse::<u32>().ok()?;
            let cpu = cpu.replace(',', ".").parse::<f64>().ok()?;
            Some(ProcessRow::cpu(pid, command, cpu.max(0.0)))
        })
        .collect()
}

/// Parse `ps -Ao pid=,rss=,comm=`; rss is in KiB.
pub fn parse_ps_rss(output: &str) -> Vec<ProcessRow> {
    output
        .lines()
        .filter_map(split_row)
        .filter_map(|(pid, rss, command)| {
            let pid = pid.parse::<u32>().ok()?;
            let kib = rss.parse::<u64>().ok()?;
            Some(ProcessRow::memory(Some(pid), command, kib as f64 / 1024.0))
        })
        .collect()
}

/// Parse `top -l 1 -o mem -n N -stats pid,mem,command`.
///
/// The summary block above the table (`PhysMem: 15G used (2G wired), 500M unused.` and
/// friends) is dropped, as is the `PID MEM COMMAND` header.
pub fn parse_top_memory(output: &str) -> Vec<ProcessRow> {
    output
        .lines()
        .filter(|line| !is_summary_line(line))
        .filter_map(split_row)
        .filter_map(|(pid, mem, command)| {
            let pid = pid.parse::<u32>().ok()?;
            let mb = parse_memory_mb(mem)?;
            Some(ProcessRow::memory(Some(pid), command, mb))
        })
        .collect()
}

/// Summary/header heuristic: parentheses or the words "used"/"unused" on a line
/// that does not start with a pid.
fn is_summary_line(line: &str) -> bool {
    let starts_with_pid = line
        .split_whitespace()
        .next()
        .is_some_and(|t| t.parse::<u32>().is_ok());
    if starts_with_pid {
        return false;
    }
    line.contains('(')
        || line
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|w| w == "used" || w == "unused")
}

/// Normalise a `top` memory cell to megabytes: "512M", "2048K", "1.5G", "900B".
/// Trailing `+`/`-` change markers are ignored; a bare number is taken as bytes.
pub fn parse_memory_mb(value: &str) -> Option<f64> {
    let value = value.trim().trim_end_matches(['+', '-']);
    let (number, unit) = match value.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&value[..i], Some(c.to_ascii_uppercase())),
        _ => (value, None),
    };
    let n: f64 = number.parse().ok()?;
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    let mb = match unit {
        Some('K') => n / 1024.0,
        Some('M') => n,
        Some('G') => n * 1024.0,
        Some('T') => n * 1024.0 * 1024.0,
        Some('B') | None => n / (1024.0 * 1024.0),
        Some(_) => return None,
    };
    Some(mb)
}
