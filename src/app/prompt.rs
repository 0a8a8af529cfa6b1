use async_trait::async_trait;
use inquire::Confirm;
use tracing::{info, warn};

use crate::session::{Prompt, progress::ProgressIndicator};

/// Asks yes/no questions on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompt;

#[async_trait(?Send)]
impl Prompt for InquirePrompt {
    async fn confirm(&self, title: &str, message: &str) -> bool {
        let answer = Confirm::new(title)
            .with_help_message(message)
            .with_default(false)
            .prompt();
        match answer {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, "Confirmation prompt failed, treating as no");
                false
            }
        }
    }
}

/// Prints progress notices to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalProgress;

impl ProgressIndicator for TerminalProgress {
    fn show(&self, message: &str) {
        info!(message, "Progress shown");
        eprintln!("{message}");
    }

    fn hide(&self) {
        info!("Progress hidden");
    }
}
