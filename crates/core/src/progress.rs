use std::time::Duration;

use tracing::{error, info, warn};

use crate::format::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    ProcessingWait,
    PromptContent,
    Database,
    DryRun,
}

impl Stage {
    /// Present-tense label shown while the stage runs.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Upload => "Uploading videos to Video Indexer",
            Stage::ProcessingWait => "Waiting for indexing and saving insights",
            Stage::PromptContent => "Generating prompt content",
            Stage::Database => "Embedding sections and loading the database",
            Stage::DryRun => "Probing services",
        }
    }

    pub fn done_label(&self) -> &'static str {
        match self {
            Stage::Upload => "Videos resolved",
            Stage::ProcessingWait => "Videos indexed",
            Stage::PromptContent => "Prompt content fetched",
            Stage::Database => "Database loaded",
            Stage::DryRun => "Services probed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PipelineEvent<'a> {
    StageStarted {
        stage: Stage,
    },
    StageCompleted {
        stage: Stage,
        elapsed: Duration,
        detail: &'a str,
    },
    StageSkipped {
        stage: Stage,
        reason: &'a str,
    },
    StageFailed {
        stage: Stage,
        error: &'a str,
    },
}

/// Receives stage transitions so a frontend can render them.
pub trait ProgressReporter {
    fn report(&self, event: PipelineEvent<'_>);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _event: PipelineEvent<'_>) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::StageStarted { stage } => info!("{}...", stage.label()),
            PipelineEvent::StageCompleted {
                stage,
                elapsed,
                detail,
            } => info!(
                "{}: {} [{}]",
                stage.done_label(),
                detail,
                format_duration(elapsed)
            ),
            PipelineEvent::StageSkipped { stage, reason } => {
                warn!("{} skipped: {}", stage.label(), reason)
            }
            PipelineEvent::StageFailed { stage, error } => {
                error!("{} failed: {}", stage.label(), error)
            }
        }
    }
}
