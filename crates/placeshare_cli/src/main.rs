//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `placeshare_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("placeshare_core ping={}", placeshare_core::ping());
    println!("placeshare_core version={}", placeshare_core::core_version());
}
