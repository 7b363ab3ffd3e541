//! Liveness check.

/// Fixed success indicator printed by `health`.
pub const HEALTHY: &str = "OK";

pub fn health() -> &'static str {
    HEALTHY
}
