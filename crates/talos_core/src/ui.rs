//! Port through which the engine talks to its operator.
//!
//! The engine never prints or prompts directly; everything user-facing
//! goes through this trait so the same rebuild logic runs under an
//! interactive terminal, a scripted command stream, or a test harness.

/// Operator-facing side of a rebuild.
pub trait RebuildUi {
    /// One line of status or diagnostics.
    fn message(&mut self, text: &str);

    /// Yes/no question. A scripted run answers from its configuration.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Numeric override prompt used in expert mode. `max == 0` means
    /// unbounded. The default implementation keeps the proposed value.
    fn ask_number(&mut self, _prompt: &str, default: u64, _max: u64) -> u64 {
        default
    }

    /// Scan progress, in sectors. Emitted every 65536 sectors.
    fn progress(&mut self, _scanned: u64, _total: u64) {}

    /// Polled together with `progress`; returning true ends the sweep
    /// with whatever was collected so far.
    fn stop_requested(&self) -> bool {
        false
    }

    /// Field-by-field comparison of the composed and current sectors.
    fn show_diff(&mut self, _newboot: &[u8; 512], _current: &[u8; 512]) {}

    /// Full dual-column hex dump, on explicit request.
    fn show_dump(&mut self, _newboot: &[u8; 512], _current: &[u8; 512]) {}
}

/// Headless implementation: messages go to the log, confirmations are
/// answered from a fixed policy, overrides keep their defaults.
pub struct SilentUi {
    pub auto_confirm: bool,
}

impl SilentUi {
    pub fn new(auto_confirm: bool) -> Self {
        Self { auto_confirm }
    }
}

impl RebuildUi for SilentUi {
    fn message(&mut self, text: &str) {
        tracing::info!("{text}");
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        tracing::info!("{prompt} -> {}", if self.auto_confirm { "yes" } else { "no" });
        self.auto_confirm
    }
}
