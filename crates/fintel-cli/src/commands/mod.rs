//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Statement loading, analyzer runs, and the `analyze` family of commands
//! - `reports` - Human-readable rendering of each report section

pub mod analyze;
pub mod reports;

// Re-export command functions for main.rs
pub use analyze::*;
pub use reports::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
