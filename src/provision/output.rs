use std::sync::Mutex;
use tracing::info;

/// Named step of the provisioning workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Connecting,
    Installing,
    UploadingArtifacts,
    BuildingCommand,
    Running,
    CleaningUp,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Connecting => "connecting",
            Phase::Installing => "installing",
            Phase::UploadingArtifacts => "uploading artifacts",
            Phase::BuildingCommand => "building command",
            Phase::Running => "running",
            Phase::CleaningUp => "cleaning up",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Observer for everything the workflow reports: progress lines, relayed
/// remote output and phase transitions.
pub trait Output: Send + Sync {
    fn output(&self, line: &str);

    fn phase(&self, _phase: Phase) {}
}

/// Forwards every line to `tracing` at info level.
#[derive(Debug, Default)]
pub struct TracingOutput;

impl Output for TracingOutput {
    fn output(&self, line: &str) {
        info!(target: "rustle_provision::output", "{}", line);
    }

    fn phase(&self, phase: Phase) {
        info!(target: "rustle_provision::output", "phase: {}", phase);
    }
}

/// Keeps lines and phases in memory, in the order they were reported.
#[derive(Debug, Default)]
pub struct BufferedOutput {
    lines: Mutex<Vec<String>>,
    phases: Mutex<Vec<Phase>>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Output for BufferedOutput {
    fn output(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }

    fn phase(&self, phase: Phase) {
        if let Ok(mut phases) = self.phases.lock() {
            phases.push(phase);
        }
    }
}
