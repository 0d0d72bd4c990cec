//! AgentLoop - drives planner rounds and tool execution for a session
//!
//! Each round sends the full transcript to the planner, appends whatever it
//! returns, and executes any tool calls in the order issued. Tool results go
//! back into the transcript as `tool` entries so the planner sees them next
//! round. The loop ends when a round has no tool calls, or when the session
//! runs out of rounds.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::planner::{ContentBlock, PlanRequest, Planner, ToolCallRequest, TranscriptEntry};
use crate::tools::{ToolContext, ToolInvoker, ToolRegistry, ToolResult};

use super::{AgentConfig, AgentError, Session, SessionOutcome};

/// Progress notifications for a running session
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A planner round is about to start
    RoundStarted { round: u32, max_iterations: u32 },

    /// The planner produced text this round
    AgentText { text: String },

    /// A tool is about to run
    ToolCalled { name: String, arguments: Value },

    /// A tool finished
    ToolFinished { name: String, result: ToolResult },
}

/// Where the loop is within a session
#[derive(Debug)]
enum LoopState {
    AwaitingPlannerResponse,
    ProcessingToolCalls(Vec<ToolCallRequest>),
    Done(Option<String>),
    MaxIterationsReached,
}

/// Runs sessions against a planner and a tool registry
pub struct AgentLoop {
    planner: Arc<dyn Planner>,
    invoker: ToolInvoker,
    config: AgentConfig,
    events: Option<mpsc::Sender<AgentEvent>>,
}

impl AgentLoop {
    pub fn new(planner: Arc<dyn Planner>, registry: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        debug!(tool_count = registry.len(), bootstrap = config.bootstrap.len(), "AgentLoop::new: called");
        Self {
            planner,
            invoker: ToolInvoker::new(registry),
            config,
            events: None,
        }
    }

    /// Send progress events to `tx`
    pub fn with_events(mut self, tx: mpsc::Sender<AgentEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Run `session` until the planner is done or the round limit is hit
    ///
    /// Tool failures are fed back to the planner and never end the session.
    /// A planner failure does, and is returned as an error with the
    /// transcript left as it was after the last completed step.
    pub async fn run_to_completion(&self, session: &mut Session) -> Result<SessionOutcome, AgentError> {
        debug!(session_id = %session.id(), max_iterations = session.max_iterations(), "run_to_completion: called");
        let ctx = session.tool_context();

        if session.iteration_count() == 0 && session.transcript().len() == 1 {
            self.run_bootstrap(session, &ctx).await?;
        }

        let mut state = LoopState::AwaitingPlannerResponse;
        loop {
            debug!(?state, round = session.iteration_count(), "run_to_completion: state");
            state = match state {
                LoopState::AwaitingPlannerResponse => self.plan_round(session).await?,
                LoopState::ProcessingToolCalls(calls) => {
                    self.process_tool_calls(session, &ctx, &calls).await;
                    LoopState::AwaitingPlannerResponse
                }
                LoopState::Done(answer) => {
                    let rounds = session.iteration_count();
                    info!(session_id = %session.id(), rounds, has_answer = answer.is_some(), "Session done");
                    return Ok(SessionOutcome::Done { answer, rounds });
                }
                LoopState::MaxIterationsReached => {
                    let rounds = session.iteration_count();
                    warn!(session_id = %session.id(), rounds, "Max iterations reached without a final response");
                    return Ok(SessionOutcome::MaxIterationsReached { rounds });
                }
            };
        }
    }

    /// Pre-run the configured bootstrap calls as if the planner had issued them
    async fn run_bootstrap(&self, session: &mut Session, ctx: &ToolContext) -> Result<(), AgentError> {
        if self.config.bootstrap.is_empty() {
            return Ok(());
        }
        debug!(count = self.config.bootstrap.len(), "run_bootstrap: called");

        if let Some(unknown) = self
            .config
            .bootstrap
            .iter()
            .find(|call| !self.invoker.registry().has_tool(&call.tool))
        {
            return Err(AgentError::UnknownBootstrapTool {
                name: unknown.tool.clone(),
            });
        }

        let calls: Vec<ToolCallRequest> = self
            .config
            .bootstrap
            .iter()
            .enumerate()
            .map(|(i, call)| ToolCallRequest::new(format!("bootstrap-{}", i + 1), &call.tool, call.args.clone()))
            .collect();

        session.push(TranscriptEntry::agent(calls.iter().map(ContentBlock::tool_use).collect()));
        self.process_tool_calls(session, ctx, &calls).await;
        Ok(())
    }

    /// Ask the planner for one round and decide the next state
    async fn plan_round(&self, session: &mut Session) -> Result<LoopState, AgentError> {
        if !session.has_rounds_left() {
            return Ok(LoopState::MaxIterationsReached);
        }

        let round = session.begin_round();
        self.emit(AgentEvent::RoundStarted {
            round,
            max_iterations: session.max_iterations(),
        })
        .await;

        let request = PlanRequest {
            system_prompt: self.config.system_prompt.clone(),
            transcript: session.transcript().to_vec(),
            tools: self.invoker.registry().list(),
        };

        let response = self.planner.plan(request).await?;
        debug!(
            round,
            blocks = response.content.len(),
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "plan_round: planner responded"
        );

        let calls = response.tool_calls();
        let text = response.final_text();

        if !response.content.is_empty() {
            session.push(TranscriptEntry::agent(response.content));
        }

        if let Some(text) = &text {
            self.emit(AgentEvent::AgentText { text: text.clone() }).await;
        }

        if calls.is_empty() {
            Ok(LoopState::Done(text))
        } else {
            Ok(LoopState::ProcessingToolCalls(calls))
        }
    }

    /// Execute calls in order, appending one tool entry per call
    async fn process_tool_calls(&self, session: &mut Session, ctx: &ToolContext, calls: &[ToolCallRequest]) {
        debug!(call_count = calls.len(), "process_tool_calls: called");
        for call in calls {
            self.emit(AgentEvent::ToolCalled {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            })
            .await;

            let result = self.invoker.invoke(call, ctx).await;
            session.push(TranscriptEntry::tool_result(&call.id, &call.name, &result));

            self.emit(AgentEvent::ToolFinished {
                name: call.name.clone(),
                result,
            })
            .await;
        }
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::BootstrapCall;
    use crate::config::SandboxConfig;
    use crate::planner::client::mock::MockPlanner;
    use crate::planner::{PlanResponse, PlannerError, Role};
    use crate::sandbox::Root;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn text(s: &str) -> PlanResponse {
        PlanResponse::new(vec![ContentBlock::text(s)])
    }

    fn call(id: &str, name: &str, input: Value) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    fn agent(planner: Arc<MockPlanner>, config: AgentConfig) -> AgentLoop {
        let registry = Arc::new(ToolRegistry::standard(&SandboxConfig::default()));
        AgentLoop::new(planner, registry, config)
    }

    fn tool_results(session: &Session) -> Vec<(String, String, bool)> {
        session
            .transcript()
            .iter()
            .filter(|e| e.role == Role::Tool)
            .flat_map(|e| e.content.iter())
            .filter_map(|b| match b {
                ContentBlock::ToolResult {
                    name,
                    content,
                    is_error,
                    ..
                } => Some((name.clone(), content.clone(), *is_error)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_immediate_answer_is_done_in_one_round() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![text("Hello there")]));
        let agent = agent(planner.clone(), AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "hi", 20);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Done {
                answer: Some("Hello there".to_string()),
                rounds: 1
            }
        );
        assert_eq!(planner.call_count(), 1);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[1].role, Role::Agent);
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("main.py"), "print('calc')").unwrap();
        let planner = Arc::new(MockPlanner::new(vec![
            PlanResponse::new(vec![call("call_1", "get_file_content", json!({"file_path": "main.py"}))]),
            text("It prints calc."),
        ]));
        let agent = agent(planner.clone(), AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "What does main.py do?", 20);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert_eq!(outcome.answer(), Some("It prints calc."));
        assert_eq!(outcome.rounds(), 2);
        let roles: Vec<Role> = session.transcript().iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Agent, Role::Tool, Role::Agent]);
        assert_eq!(
            tool_results(&session),
            vec![("get_file_content".to_string(), "print('calc')".to_string(), false)]
        );

        // Second round sees the tool result
        let requests = planner.requests();
        assert_eq!(requests[1].transcript.len(), 3);
        assert_eq!(requests[1].tools.len(), 4);
        assert_eq!(requests[1].system_prompt, AgentConfig::default().system_prompt);
    }

    #[tokio::test]
    async fn test_calls_in_one_round_run_in_order() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![
            PlanResponse::new(vec![
                ContentBlock::text("Writing then reading"),
                call("call_1", "write_file", json!({"file_path": "out/a.txt", "content": "abc"})),
                call("call_2", "get_file_content", json!({"file_path": "out/a.txt"})),
            ]),
            text("Done"),
        ]));
        let agent = agent(planner, AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "write", 20);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert_eq!(outcome.answer(), Some("Done"));
        let results = tool_results(&session);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "write_file");
        assert_eq!(results[1], ("get_file_content".to_string(), "abc".to_string(), false));
    }

    #[tokio::test]
    async fn test_unknown_tool_until_max_iterations() {
        let temp = tempdir().unwrap();
        let unknown = || PlanResponse::new(vec![call("call_x", "delete_everything", json!({}))]);
        let planner = Arc::new(MockPlanner::new(vec![unknown(), unknown(), unknown()]));
        let agent = agent(planner.clone(), AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "go", 3);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert_eq!(outcome, SessionOutcome::MaxIterationsReached { rounds: 3 });
        assert_eq!(planner.call_count(), 3);
        let results = tool_results(&session);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, content, is_error)| {
            *is_error && content == "Error: Unknown function: delete_everything"
        }));
    }

    #[tokio::test]
    async fn test_escape_attempt_is_fed_back_and_loop_continues() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![
            PlanResponse::new(vec![call("call_1", "get_file_content", json!({"file_path": "../../etc/passwd"}))]),
            text("I cannot read that file."),
        ]));
        let agent = agent(planner, AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "read passwd", 20);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert!(outcome.is_done());
        let results = tool_results(&session);
        assert!(results[0].2);
        assert!(results[0].1.contains("outside the permitted working directory"));
    }

    #[tokio::test]
    async fn test_empty_response_is_done_without_answer() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![PlanResponse::new(vec![])]));
        let agent = agent(planner, AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "hi", 20);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert_eq!(outcome, SessionOutcome::Done { answer: None, rounds: 1 });
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_iterations_never_calls_planner() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![text("unused")]));
        let agent = agent(planner.clone(), AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "hi", 0);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert_eq!(outcome, SessionOutcome::MaxIterationsReached { rounds: 0 });
        assert_eq!(planner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_planner_failure_ends_session() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![]));
        let agent = agent(planner, AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "hi", 20);

        let err = agent.run_to_completion(&mut session).await.unwrap_err();

        assert!(matches!(err, AgentError::Planner(PlannerError::InvalidResponse(_))));
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_calls_precede_first_round() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("main.py"), "x = 1").unwrap();
        let config = AgentConfig {
            bootstrap: vec![
                BootstrapCall::new("get_files_info", json!({"directory": "."})),
                BootstrapCall::new("get_file_content", json!({"file_path": "main.py"})),
            ],
            ..AgentConfig::default()
        };
        let planner = Arc::new(MockPlanner::new(vec![text("Seen it")]));
        let agent = agent(planner.clone(), config);
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "explain", 20);

        let outcome = agent.run_to_completion(&mut session).await.unwrap();

        assert_eq!(outcome.rounds(), 1);
        let first = &planner.requests()[0];
        let roles: Vec<Role> = first.transcript.iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Agent, Role::Tool, Role::Tool]);
        match &first.transcript[1].content[0] {
            ContentBlock::ToolUse { id, name, .. } => {
                assert_eq!(id, "bootstrap-1");
                assert_eq!(name, "get_files_info");
            }
            other => panic!("Expected ToolUse, got {:?}", other),
        }
        let results = tool_results(&session);
        assert!(results[0].1.contains("main.py"));
        assert_eq!(results[1].1, "x = 1");
    }

    #[tokio::test]
    async fn test_unknown_bootstrap_tool_is_rejected() {
        let temp = tempdir().unwrap();
        let config = AgentConfig {
            bootstrap: vec![BootstrapCall::new("no_such_tool", json!({}))],
            ..AgentConfig::default()
        };
        let planner = Arc::new(MockPlanner::new(vec![text("unused")]));
        let agent = agent(planner.clone(), config);
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "hi", 20);

        let err = agent.run_to_completion(&mut session).await.unwrap_err();

        assert!(matches!(err, AgentError::UnknownBootstrapTool { ref name } if name == "no_such_tool"));
        assert_eq!(planner.call_count(), 0);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![
            PlanResponse::new(vec![call("call_1", "get_files_info", json!({}))]),
            text("Listed"),
        ]));
        let (tx, mut rx) = mpsc::channel(32);
        let agent = agent(planner, AgentConfig::default()).with_events(tx);
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "list", 20);

        agent.run_to_completion(&mut session).await.unwrap();
        drop(agent);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(events[0], AgentEvent::RoundStarted { round: 1, max_iterations: 20 }));
        assert!(matches!(&events[1], AgentEvent::ToolCalled { name, .. } if name == "get_files_info"));
        assert!(matches!(&events[2], AgentEvent::ToolFinished { result, .. } if !result.is_error()));
        assert!(matches!(events[3], AgentEvent::RoundStarted { round: 2, .. }));
        assert!(matches!(&events[4], AgentEvent::AgentText { text } if text == "Listed"));
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_argument_is_a_tool_failure() {
        let temp = tempdir().unwrap();
        let planner = Arc::new(MockPlanner::new(vec![
            PlanResponse::new(vec![call("call_1", "write_file", json!({"file_path": "a.txt"}))]),
            text("oops"),
        ]));
        let agent = agent(planner, AgentConfig::default());
        let mut session = Session::start(Root::new(temp.path()).unwrap(), "write", 20);

        agent.run_to_completion(&mut session).await.unwrap();

        let tool_entry = &session.transcript()[2];
        match &tool_entry.content[0] {
            ContentBlock::ToolResult { is_error, content, .. } => {
                assert!(is_error);
                assert!(content.starts_with("Error: Invalid argument"));
            }
            other => panic!("Expected ToolResult, got {:?}", other),
        }
        assert!(!temp.path().join("a.txt").exists());
    }
}
