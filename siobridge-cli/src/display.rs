//! Terminal Output Helpers

use console::style;

/// Prints a success line.
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Prints a warning line to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Prints an informational line.
pub fn info(message: &str) {
    println!("{} {}", style("→").cyan(), message);
}

/// Prints one row of the check summary.
pub fn check_row(name: &str, passed: u64, failed: u64) {
    let total = passed + failed;
    let mark = if failed == 0 {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("  {} {:<32} {}/{}", mark, name, passed, total);
}
