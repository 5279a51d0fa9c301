use std::io::Write;
use tracing::warn;

use crate::exit_codes::exit;
use crate::model::Applet;

/// Owns standard output for one invocation: command output goes straight
/// through, failures are rendered as a single `ERROR:` line.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    /// Print an informational line.
    pub fn line(&mut self, message: &str) {
        // stdout is gone; nothing left to report to
        let _ = writeln!(self.out, "{message}");
    }

    /// Report a failure and return the exit code for it. Failures outside
    /// any applet use the generic usage code.
    pub fn failure(&mut self, applet: Option<Applet>, err: &anyhow::Error) -> i32 {
        let message = format!("{err:#}");
        warn!(applet = applet.map(Applet::name), error = %message, "command failed");
        self.line(&format!("ERROR: {message}"));
        applet.map_or(exit::USAGE, Applet::exit_code)
    }

    pub fn finish(mut self) {
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_failure_renders_chain() {
        let mut reporter = Reporter::new(Vec::new());
        let err = std::fs::read("/definitely/not/here")
            .context("cannot read '/definitely/not/here'")
            .unwrap_err();
        let code = reporter.failure(Some(Applet::Cat), &err);
        assert_eq!(code, -20);
        let text = String::from_utf8(reporter.out().clone()).unwrap();
        assert!(text.starts_with("ERROR: cannot read '/definitely/not/here': "));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_failure_without_applet() {
        let mut reporter = Reporter::new(Vec::new());
        let code = reporter.failure(None, &anyhow::anyhow!("unexpected argument '-x' found"));
        assert_eq!(code, exit::USAGE);
        assert_eq!(
            String::from_utf8(reporter.out().clone()).unwrap(),
            "ERROR: unexpected argument '-x' found\n"
        );
    }
}
