/// Human-readable byte counts and file counts for run summaries.
///
/// All sizes are `u64` bytes. Floating point only appears when formatting.

/// Binary units, labelled with the short forms people expect (KB, not KiB).
const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count with the largest unit that keeps the value >= 1.
///
/// Values under 1 KB print as whole bytes. Gigabytes and above keep two
/// decimals because backup archives routinely land in that range.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit >= 2 {
        format!("{value:.2} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Format a count with comma thousand separators (`1234567` -> `1,234,567`).
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
