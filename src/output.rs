use std::io::Write;

/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// `--quiet` can suppress chatter without touching command logic. Data that
/// was explicitly asked for (`list`, `services`) bypasses it.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Stopping all tunnels...")
    fn status(&self, message: &str);

    /// Success message (e.g., "Tunnel db-dev is ready")
    fn success(&self, message: &str);

    /// Warning message (e.g., "Failed to delete relay pod")
    fn warning(&self, message: &str);

    /// Inline progress (no trailing newline). Call `finish_progress` after.
    fn progress(&self, message: &str);

    /// Finish an inline progress line with a result.
    fn finish_progress(&self, result: &str);
}

/// Standard CLI output: status to stdout, warnings to stderr.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("\x1b[33m{}\x1b[0m", message);
    }

    fn progress(&self, message: &str) {
        print!("{}", message);
        std::io::stdout().flush().ok();
    }

    fn finish_progress(&self, result: &str) {
        println!("{}", result);
    }
}

/// Suppresses everything except warnings. Used for `--quiet`.
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }
    fn progress(&self, _message: &str) {}
    fn finish_progress(&self, _result: &str) {}
}
