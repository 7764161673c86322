//! Agent Actor: the per-identity turn loop
//!
//! Each actor runs as one tokio task that owns its [`ConversationState`]
//! outright. Signals and tool registrations reach it through a command
//! channel and are applied only between turns, so no two turns of the same
//! actor ever overlap and nothing else writes its state.
//!
//! A turn moves through three phases:
//!
//! 1. `AwaitingMessage`: wait until the inbound queue is non-empty, then
//!    fold the most recent message into the transcript as a `user` turn.
//! 2. `Deciding`: ask the completion service for a decision, bounded by the
//!    step timeout. On error or timeout the turn is abandoned; the folded
//!    message stays in the transcript and the actor keeps running.
//! 3. `Dispatching`: record the decision as an `assistant` turn, run its
//!    tool invocations, and record the aggregate result as one `user` turn.
//!
//! After every turn the state is saved and a fresh snapshot is published
//! for queries.

use crate::dispatch::ToolDispatcher;
use crate::store::{ActorRecord, StateStore};
use agora_core::completion::{CompletionRequest, CompletionService};
use agora_core::decision::Decision;
use agora_core::error::{CompletionError, RegistryResult};
use agora_core::message::InboundMessage;
use agora_core::state::{ConversationSnapshot, ConversationState};
use agora_core::tool::ToolDescriptor;
use agora_tools::ToolHandler;
use chrono::Local;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Where an actor is in its turn loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorPhase {
    AwaitingMessage,
    Deciding,
    Dispatching,
}

impl fmt::Display for ActorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActorPhase::AwaitingMessage => "awaiting_message",
            ActorPhase::Deciding => "deciding",
            ActorPhase::Dispatching => "dispatching",
        };
        f.write_str(s)
    }
}

/// Requests applied by an actor between turns
pub enum ActorCommand {
    Signal(InboundMessage),
    RegisterTool {
        descriptor: ToolDescriptor,
        handler: Option<Arc<dyn ToolHandler>>,
        reply: oneshot::Sender<RegistryResult<()>>,
    },
    Stop,
}

impl fmt::Debug for ActorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorCommand::Signal(message) => f.debug_tuple("Signal").field(message).finish(),
            ActorCommand::RegisterTool { descriptor, .. } => f
                .debug_struct("RegisterTool")
                .field("name", &descriptor.name)
                .finish_non_exhaustive(),
            ActorCommand::Stop => f.write_str("Stop"),
        }
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { tool_calls: usize },
    Abandoned { reason: String },
}

pub struct AgentActor {
    state: ConversationState,
    turns_completed: u64,
    phase: ActorPhase,
    completion: Arc<dyn CompletionService>,
    dispatcher: ToolDispatcher,
    store: Arc<dyn StateStore>,
    step_timeout: Duration,
    commands: mpsc::UnboundedReceiver<ActorCommand>,
    snapshots: watch::Sender<ConversationSnapshot>,
}

impl AgentActor {
    /// Build an actor from resumed or freshly configured state.
    ///
    /// Returns the actor with the receiving end of its snapshot channel.
    pub fn new(
        record: ActorRecord,
        completion: Arc<dyn CompletionService>,
        dispatcher: ToolDispatcher,
        store: Arc<dyn StateStore>,
        step_timeout: Duration,
        commands: mpsc::UnboundedReceiver<ActorCommand>,
    ) -> (Self, watch::Receiver<ConversationSnapshot>) {
        let (snapshots, receiver) = watch::channel(record.snapshot());
        let actor = Self {
            state: record.state,
            turns_completed: record.turns_completed,
            phase: ActorPhase::AwaitingMessage,
            completion,
            dispatcher,
            store,
            step_timeout,
            commands,
            snapshots,
        };
        (actor, receiver)
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn phase(&self) -> ActorPhase {
        self.phase
    }

    /// Run until stopped or until every command sender is dropped
    pub async fn run(mut self) {
        info!(actor = %self.state.identity, turns = self.turns_completed, "Actor started");
        self.checkpoint().await;

        'turns: loop {
            // apply whatever arrived during the previous turn
            while let Ok(command) = self.commands.try_recv() {
                if !self.apply(command).await {
                    break 'turns;
                }
            }

            if self.state.inbound.is_empty() {
                let Some(command) = self.commands.recv().await else {
                    break;
                };
                if !self.apply(command).await {
                    break;
                }
                continue;
            }

            let outcome = self.run_turn().await;
            debug!(actor = %self.state.identity, outcome = ?outcome, "Turn finished");
            self.checkpoint().await;
        }

        self.checkpoint().await;
        info!(actor = %self.state.identity, turns = self.turns_completed, "Actor stopped");
    }

    /// Apply one command; `false` means stop
    async fn apply(&mut self, command: ActorCommand) -> bool {
        match command {
            ActorCommand::Signal(message) => {
                debug!(actor = %self.state.identity, pending = self.state.inbound.len() + 1, "Signal received");
                self.state.inbound.enqueue(message);
                true
            }
            ActorCommand::RegisterTool {
                descriptor,
                handler,
                reply,
            } => {
                let name = descriptor.name.clone();
                let result = self.state.register_tool(descriptor);
                match &result {
                    Ok(()) => {
                        if let Some(handler) = handler {
                            self.dispatcher.add_handler(handler);
                        }
                        info!(actor = %self.state.identity, tool = %name, "Tool registered");
                        self.checkpoint().await;
                    }
                    Err(e) => warn!(actor = %self.state.identity, error = %e, "Tool registration rejected"),
                }
                // the caller may have given up waiting
                let _ = reply.send(result);
                true
            }
            ActorCommand::Stop => false,
        }
    }

    /// Process the most recent pending message, if any
    pub async fn run_turn(&mut self) -> Option<TurnOutcome> {
        let message = self.state.fold_latest(Local::now().naive_local())?;
        info!(
            actor = %self.state.identity,
            from = ?message.sender().map(|id| id.as_str()),
            pending = self.state.inbound.len(),
            "Processing inbound message"
        );

        self.phase = ActorPhase::Deciding;
        let decision = match self.decide().await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(actor = %self.state.identity, error = %e, "Completion failed, abandoning turn");
                self.phase = ActorPhase::AwaitingMessage;
                return Some(TurnOutcome::Abandoned {
                    reason: e.to_string(),
                });
            }
        };

        self.phase = ActorPhase::Dispatching;
        self.state.record_decision(&decision);
        let tool_calls = decision.tool_invocations().count();
        let aggregate = self.dispatcher.dispatch(&self.state, &decision).await;
        self.state.record_tool_result(&decision, aggregate);

        self.turns_completed += 1;
        self.phase = ActorPhase::AwaitingMessage;
        info!(actor = %self.state.identity, turn = self.turns_completed, tool_calls, "Turn complete");
        Some(TurnOutcome::Completed { tool_calls })
    }

    async fn decide(&self) -> Result<Decision, CompletionError> {
        let request = CompletionRequest {
            system_prompt: &self.state.system_prompt,
            transcript: &self.state.transcript,
            tools: &self.state.tools,
            force_tool_use: !self.state.tools.is_empty(),
        };
        match tokio::time::timeout(self.step_timeout, self.completion.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.step_timeout)),
        }
    }

    /// Persist the state and publish a snapshot for queries
    async fn checkpoint(&mut self) {
        let record = ActorRecord::new(self.state.clone(), self.turns_completed);
        if let Err(e) = self.store.save(&record).await {
            error!(actor = %self.state.identity, error = %e, "Failed to persist actor state");
        }
        self.snapshots.send_replace(record.snapshot());
    }
}
