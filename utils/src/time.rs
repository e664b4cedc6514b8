//! Human-readable round timings for log lines.

const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Render `secs` as its two most significant non-zero units, e.g. `1h 30m`.
///
/// Zero renders as `0s`.
pub fn format_duration(secs: u64) -> String {
    let mut rest = secs;
    let parts: Vec<String> = UNITS
        .iter()
        .filter_map(|&(unit, suffix)| {
            let count = rest / unit;
            rest %= unit;
            (count > 0).then(|| format!("{count}{suffix}"))
        })
        .take(2)
        .collect();

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Describe a round schedule given its activation delay and voting window.
pub fn describe_window(delay_secs: u64, duration_secs: u64) -> String {
    if delay_secs == 0 {
        format!("voting opens at once for {}", format_duration(duration_secs))
    } else {
        format!(
            "voting opens after {} for {}",
            format_duration(delay_secs),
            format_duration(duration_secs)
        )
    }
}
