//! Console reporting for the harness

use crate::runner::RunSummary;

/// Announce a test about to run
pub fn print_testing(name: &str) {
    println!("\n🔍 Testing {}...", name);
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{}", message);
}

/// Print the closing pass count
pub fn print_summary(summary: &RunSummary) {
    println!(
        "\n📊 Tests passed: {}/{}",
        summary.tests_passed, summary.tests_run
    );
}
