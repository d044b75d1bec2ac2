//! Command-line interface

pub mod context;
pub mod merge;
pub mod style;

use crate::cli::style::{Stylize, check, cross, spinner_style};
use anstream::println;
use async_trait::async_trait;
use indicatif::ProgressBar;
use mergeit::merge::{MergeEvent, ProgressCallback};
use std::sync::Mutex;
use std::time::Duration;

/// Progress reporter printing one line per merge event
///
/// Waits are shown as a spinner that is cleared when the next
/// observation starts.
pub struct CliProgress {
    verbose: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a reporter; `verbose` also prints every observation
    pub const fn new(verbose: bool) -> Self {
        Self {
            verbose,
            spinner: Mutex::new(None),
        }
    }

    fn clear_spinner(&self) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(spinner) = guard.take()
        {
            spinner.finish_and_clear();
        }
    }

    fn start_spinner(&self, message: String) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(previous) = guard.replace(spinner)
        {
            previous.finish_and_clear();
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_event(&self, event: &MergeEvent) {
        match event {
            MergeEvent::RetryScheduled { .. } => {
                self.start_spinner(event.to_string().muted());
                return;
            }
            MergeEvent::Observed { .. } if !self.verbose => return,
            _ => self.clear_spinner(),
        }

        match event {
            MergeEvent::FetchStarted { .. } | MergeEvent::Observed { .. } => {
                println!("{}", event.to_string().muted());
            }
            MergeEvent::UpdatingBranch { .. } => println!("🔄 {event}"),
            MergeEvent::BranchUpdated => println!("{} {}", check(), event.to_string().muted()),
            MergeEvent::Merging { .. } => println!("🔀 {event}"),
            MergeEvent::MergeAccepted { .. } => println!("{} {event}", check()),
            MergeEvent::Succeeded => println!("{} {}", check(), event.to_string().success()),
            MergeEvent::Failed(_) => println!("{} {}", cross(), event.to_string().warn()),
            MergeEvent::Cancelled => println!("{}", event.to_string().muted()),
            MergeEvent::RetryScheduled { .. } => {}
        }
    }
}
