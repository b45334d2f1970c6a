//! Kubernetes-style resource quantity parsing.
//!
//! CPU quantities are bare core counts (`"2"`, `"0.5"`) or millicores
//! (`"800m"`). Memory quantities carry binary suffixes (`Ki`, `Mi`, `Gi`);
//! a bare number is taken as bytes when parsing node allocatable figures.

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parse a CPU quantity string into cores. `"800m"` is 0.8.
pub fn parse_cpu_cores(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some(milli) = s.strip_suffix('m') {
        return milli.parse::<f64>().ok().map(|v| v / 1000.0);
    }
    s.parse::<f64>().ok()
}

/// Parse a memory quantity string into bytes.
///
/// Recognises `Ki`, `Mi`, and `Gi` suffixes; a bare number is bytes.
pub fn parse_memory_bytes(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some(v) = s.strip_suffix("Ki") {
        return v.parse::<f64>().ok().map(|v| v * KIB);
    }
    if let Some(v) = s.strip_suffix("Mi") {
        return v.parse::<f64>().ok().map(|v| v * MIB);
    }
    if let Some(v) = s.strip_suffix("Gi") {
        return v.parse::<f64>().ok().map(|v| v * GIB);
    }
    s.parse::<f64>().ok()
}

/// Parse a memory quantity string into MiB, recognising only the `Mi` and
/// `Gi` suffixes. Anything else yields `None`; callers supply their own
/// fallback.
pub fn parse_memory_mib(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some(v) = s.strip_suffix("Mi") {
        return v.parse::<f64>().ok();
    }
    if let Some(v) = s.strip_suffix("Gi") {
        return v.parse::<f64>().ok().map(|v| v * 1024.0);
    }
    None
}

/// Format a MiB figure as a Kubernetes memory quantity, truncating to an
/// integer (`1536.7` becomes `"1536Mi"`).
pub fn format_memory_mib(mib: f64) -> String {
    format!("{}Mi", mib as i64)
}
