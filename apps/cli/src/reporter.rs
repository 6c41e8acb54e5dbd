use std::{sync::Mutex, time::Duration};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use vidsearch_core::{PipelineEvent, ProgressReporter, format_duration};

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Renders one spinner per running stage and a check mark line when it ends.
#[derive(Default)]
pub struct SpinnerReporter {
    current: Mutex<Option<ProgressBar>>,
}

impl SpinnerReporter {
    fn take_spinner(&self) -> Option<ProgressBar> {
        self.current.lock().ok().and_then(|mut current| current.take())
    }
}

impl ProgressReporter for SpinnerReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                let spinner = create_spinner(&format!("{}...", stage.label()));
                if let Ok(mut current) = self.current.lock()
                    && let Some(previous) = current.replace(spinner)
                {
                    previous.finish_and_clear();
                }
            }
            PipelineEvent::StageCompleted {
                stage,
                elapsed,
                detail,
            } => {
                if let Some(spinner) = self.take_spinner() {
                    spinner.finish_and_clear();
                }
                println!(
                    "{} {} {} {}",
                    style("✓").green().bold(),
                    stage.done_label(),
                    style(detail).dim(),
                    style(format!("[{}]", format_duration(elapsed))).dim()
                );
            }
            PipelineEvent::StageSkipped { stage, reason } => {
                if let Some(spinner) = self.take_spinner() {
                    spinner.finish_and_clear();
                }
                println!(
                    "{} {} {}",
                    style("-").yellow().bold(),
                    stage.label(),
                    style(format!("(skipped: {})", reason)).dim()
                );
            }
            PipelineEvent::StageFailed { stage, error } => {
                if let Some(spinner) = self.take_spinner() {
                    spinner.finish_and_clear();
                }
                println!(
                    "{} {} {}",
                    style("✗").red().bold(),
                    stage.label(),
                    style(error).red()
                );
            }
        }
    }
}
