//! Session state: the sandbox root, the transcript and the round counter

use serde::Serialize;
use tracing::debug;

use crate::planner::TranscriptEntry;
use crate::sandbox::Root;
use crate::tools::ToolContext;

/// One run of the agent for one user prompt
///
/// The transcript only grows; the first entry is always the user prompt.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    root: Root,
    transcript: Vec<TranscriptEntry>,
    iteration_count: u32,
    max_iterations: u32,
}

impl Session {
    /// Start a session seeded with the user's prompt
    pub fn start(root: Root, user_prompt: impl Into<String>, max_iterations: u32) -> Self {
        let id = uuid::Uuid::now_v7().to_string();
        debug!(%id, %root, %max_iterations, "Session::start: called");
        Self {
            id,
            root,
            transcript: vec![TranscriptEntry::user(user_prompt)],
            iteration_count: 0,
            max_iterations,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Planner rounds completed so far
    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Whether another planner round is allowed
    pub fn has_rounds_left(&self) -> bool {
        self.iteration_count < self.max_iterations
    }

    /// Tool context bound to this session's root
    pub fn tool_context(&self) -> ToolContext {
        ToolContext::new(self.root.clone(), self.id.clone())
    }

    pub(crate) fn push(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    pub(crate) fn begin_round(&mut self) -> u32 {
        self.iteration_count += 1;
        self.iteration_count
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The planner stopped calling tools; `answer` is its final text, if any
    Done { answer: Option<String>, rounds: u32 },

    /// The round limit was hit while the planner still wanted tools
    MaxIterationsReached { rounds: u32 },
}

impl SessionOutcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            SessionOutcome::Done { answer, .. } => answer.as_deref(),
            SessionOutcome::MaxIterationsReached { .. } => None,
        }
    }

    pub fn rounds(&self) -> u32 {
        match self {
            SessionOutcome::Done { rounds, .. } | SessionOutcome::MaxIterationsReached { rounds } => *rounds,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, SessionOutcome::Done { .. })
    }
}
