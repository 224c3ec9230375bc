//! Terminal implementations of the host capabilities.

use std::sync::Arc;

use inquire::Select;
use quay_core::host::{DefaultTranslator, FixedAnswer};
use quay_core::{Confirmer, Host, Notifier};

use crate::output;

/// Asks on the terminal.
///
/// A prompt that cannot be shown (no TTY, Ctrl-C) picks the last option,
/// which is always the "no" answer.
struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, title: &str, message: &str, options: &[String]) -> usize {
        output::warn(title);
        let fallback = options.len().saturating_sub(1);
        match Select::new(message, options.to_vec()).raw_prompt() {
            Ok(choice) => choice.index,
            Err(e) => {
                log::debug!("confirmation prompt unavailable: {e}");
                fallback
            }
        }
    }
}

struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify_info(&self, message: &str) {
        output::info(message);
    }

    fn notify_error(&self, message: &str) {
        output::error(message);
    }
}

/// Build the host for this run. With `assume_yes` every question is
/// answered with the first option.
pub fn terminal(assume_yes: bool) -> Host {
    let confirmer: Arc<dyn Confirmer> = if assume_yes {
        Arc::new(FixedAnswer(0))
    } else {
        Arc::new(TerminalConfirmer)
    };
    Host::new(
        confirmer,
        Arc::new(TerminalNotifier),
        Arc::new(DefaultTranslator),
    )
}
