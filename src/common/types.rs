//! Shared value helpers
//!
//! Multipliers and crash points live on a cent grid (two decimals), the same
//! precision players see. Every value that enters a comparison goes through
//! [`round_cents`] so equal displays compare equal.

/// Player identifier (account id issued by the backend)
pub type PlayerId = String;

/// Smallest multiplier step
pub const CENT: f64 = 0.01;

/// Round a multiplier to the nearest cent
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a multiplier the way players see it, e.g. `2.50x`
pub fn format_multiplier(value: f64) -> String {
    format!("{:.2}x", value)
}
