//! Tool Dispatch: execute the tool invocations of one decision

use crate::reminder::{REMINDER_ACKNOWLEDGMENT, ReminderScheduler};
use agora_core::decision::{Decision, ToolInvocation};
use agora_core::identifiers::{ActorId, PersonaType, ToolName};
use agora_core::message::{PeerMessage, ReminderRequest};
use agora_core::operator::OperatorChannel;
use agora_core::state::ConversationState;
use agora_core::tool::{BuiltinTool, ToolDispatch};
use agora_mesh::PeerDelivery;
use agora_tools::{ExecutionResult, HandlerRegistry, ToolHandler, evaluate};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed acknowledgment for operator-bound tools
pub const OPERATOR_ACKNOWLEDGMENT: &str = "Your operator has been notified.";

#[derive(Debug, Deserialize)]
struct AgentMessage {
    to_id: String,
    message: String,
    #[serde(default)]
    agent_type: Option<String>,
}

/// `agent_messages` arrives either as an array or as that array JSON-encoded
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentMessages {
    List(Vec<AgentMessage>),
    Encoded(String),
}

impl AgentMessages {
    fn into_list(self) -> Result<Vec<AgentMessage>, serde_json::Error> {
        match self {
            AgentMessages::List(list) => Ok(list),
            AgentMessages::Encoded(raw) => serde_json::from_str(&raw),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendAgentsMessageInput {
    agent_messages: AgentMessages,
}

#[derive(Debug, Deserialize)]
struct SendOperatorMessageInput {
    operator_message: String,
}

#[derive(Debug, Deserialize)]
struct WaitForAssistanceInput {
    wait_message: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleReminderInput {
    time: u64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CalculatorInput {
    expression: String,
}

fn decode<T: DeserializeOwned>(tool: BuiltinTool, input: &Value) -> Result<T, String> {
    serde_json::from_value(input.clone())
        .map_err(|e| format!("Error: invalid input for {}: {e}", tool.name()))
}

/// Aggregate tool-result text of one turn
#[derive(Debug, Default)]
struct Aggregate {
    text: String,
}

impl Aggregate {
    fn push(&mut self, contribution: impl AsRef<str>) {
        let contribution = contribution.as_ref();
        if contribution.is_empty() {
            return;
        }
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(contribution);
    }
}

/// Routes each tool invocation of a decision to its effect and collects the
/// textual results.
///
/// Invocations run sequentially in reply order. Reminders are handed to the
/// scheduler and acknowledged without waiting for them to fire. Failures of
/// any single invocation become error text in the aggregate; dispatch
/// itself never fails.
pub struct ToolDispatcher {
    delivery: Arc<dyn PeerDelivery>,
    operator: Arc<dyn OperatorChannel>,
    reminders: ReminderScheduler,
    handlers: HandlerRegistry,
    tool_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(
        delivery: Arc<dyn PeerDelivery>,
        operator: Arc<dyn OperatorChannel>,
        reminders: ReminderScheduler,
        handlers: HandlerRegistry,
        tool_timeout: Duration,
    ) -> Self {
        Self {
            delivery,
            operator,
            reminders,
            handlers,
            tool_timeout,
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn add_handler(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler);
    }

    /// Execute every invocation in `decision`, returning the aggregate text
    pub async fn dispatch(&self, state: &ConversationState, decision: &Decision) -> String {
        let mut aggregate = Aggregate::default();
        for invocation in decision.tool_invocations() {
            debug!(actor = %state.identity, tool = invocation.name, id = invocation.id, "Dispatching tool");
            match invocation.dispatch() {
                Ok(ToolDispatch::Builtin(tool)) => {
                    self.dispatch_builtin(state, tool, invocation.input, &mut aggregate)
                        .await
                }
                Ok(ToolDispatch::Custom(name)) => {
                    aggregate.push(self.dispatch_custom(state, &name, &invocation).await)
                }
                Err(e) => {
                    warn!(actor = %state.identity, tool = invocation.name, error = %e, "Invalid tool name");
                    aggregate.push(unknown_tool(invocation.name));
                }
            }
        }
        aggregate.text
    }

    async fn dispatch_builtin(
        &self,
        state: &ConversationState,
        tool: BuiltinTool,
        input: &Value,
        aggregate: &mut Aggregate,
    ) {
        match tool {
            BuiltinTool::SendAgentsMessage => self.send_agents_message(state, input, aggregate).await,
            BuiltinTool::SendOperatorMessage => {
                match decode::<SendOperatorMessageInput>(tool, input) {
                    Ok(input) => {
                        self.operator.notify(&state.identity, &input.operator_message).await;
                        aggregate.push(OPERATOR_ACKNOWLEDGMENT);
                    }
                    Err(e) => aggregate.push(e),
                }
            }
            BuiltinTool::WaitForAssistance => match decode::<WaitForAssistanceInput>(tool, input) {
                Ok(input) => {
                    self.operator.notify(&state.identity, &input.wait_message).await;
                    aggregate.push(OPERATOR_ACKNOWLEDGMENT);
                }
                Err(e) => aggregate.push(e),
            },
            BuiltinTool::ScheduleReminder => match decode::<ScheduleReminderInput>(tool, input) {
                Ok(input) => {
                    let request = ReminderRequest {
                        delay_seconds: input.time,
                        body: input.message,
                        owner: state.identity.clone(),
                    };
                    match self.reminders.schedule(request).await {
                        Ok(_handle) => aggregate.push(REMINDER_ACKNOWLEDGMENT),
                        Err(e) => {
                            warn!(actor = %state.identity, error = %e, "Failed to schedule reminder");
                            aggregate.push(format!("Error: failed to schedule reminder: {e}"));
                        }
                    }
                }
                Err(e) => aggregate.push(e),
            },
            BuiltinTool::Calculator => match decode::<CalculatorInput>(tool, input) {
                Ok(input) => aggregate.push(evaluate(&input.expression)),
                Err(e) => aggregate.push(e),
            },
        }
    }

    async fn send_agents_message(
        &self,
        state: &ConversationState,
        input: &Value,
        aggregate: &mut Aggregate,
    ) {
        let entries = match decode::<SendAgentsMessageInput>(BuiltinTool::SendAgentsMessage, input)
            .and_then(|input| {
                input
                    .agent_messages
                    .into_list()
                    .map_err(|e| format!("Error: invalid agent_messages: {e}"))
            }) {
            Ok(entries) => entries,
            Err(e) => {
                aggregate.push(e);
                return;
            }
        };

        for entry in entries {
            let message = match self.peer_message(state, entry) {
                Ok(message) => message,
                Err(e) => {
                    aggregate.push(e);
                    continue;
                }
            };
            let to_id = message.to_id.clone();
            match tokio::time::timeout(self.tool_timeout, self.delivery.deliver(&message)).await {
                Ok(Ok(ack)) => aggregate.push(ack),
                Ok(Err(e)) => {
                    warn!(actor = %state.identity, to = %to_id, error = %e, "Peer delivery failed");
                    aggregate.push(format!("Error: failed to send message to agent id: {to_id}: {e}"));
                }
                Err(_) => {
                    warn!(actor = %state.identity, to = %to_id, timeout = ?self.tool_timeout, "Peer delivery timed out");
                    aggregate.push(format!(
                        "Error: sending message to agent id: {to_id} timed out after {:?}",
                        self.tool_timeout
                    ));
                }
            }
        }
    }

    fn peer_message(
        &self,
        state: &ConversationState,
        entry: AgentMessage,
    ) -> Result<PeerMessage, String> {
        let to_id = ActorId::parse(&entry.to_id)
            .map_err(|e| format!("Error: invalid agent id '{}': {e}", entry.to_id))?;
        let destination_persona_type = match entry.agent_type {
            Some(agent_type) => PersonaType::parse(&agent_type)
                .map_err(|e| format!("Error: invalid agent type '{agent_type}': {e}"))?,
            None => state
                .peer(&to_id)
                .map(|peer| peer.persona_type.clone())
                .ok_or_else(|| format!("Error: unknown agent type for agent id: {to_id}"))?,
        };
        Ok(PeerMessage {
            from_id: state.identity.actor_id.clone(),
            to_id,
            body: entry.message,
            run_id: state.identity.run_id.clone(),
            destination_persona_type,
        })
    }

    async fn dispatch_custom(
        &self,
        state: &ConversationState,
        name: &ToolName,
        invocation: &ToolInvocation<'_>,
    ) -> String {
        let handler = match self.handlers.get(name) {
            Some(handler) if state.tools.contains(name) => handler,
            _ => {
                warn!(actor = %state.identity, tool = %name, "Unknown tool requested");
                return unknown_tool(name.as_str());
            }
        };

        match tokio::time::timeout(self.tool_timeout, handler.call(invocation.input.clone())).await {
            Ok(result) => {
                info!(actor = %state.identity, tool = %name, success = result.is_success(), "Custom tool finished");
                result.into_text()
            }
            Err(_) => {
                warn!(actor = %state.identity, tool = %name, "Custom tool timed out");
                ExecutionResult::failure(format!(
                    "tool '{name}' timed out after {:?}",
                    self.tool_timeout
                ))
                .into_text()
            }
        }
    }
}

fn unknown_tool(name: &str) -> String {
    format!("Error: unknown tool '{name}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{InMemoryReminderStore, ReminderStore};
    use agora_core::host::ActorStatus;
    use agora_core::message::InboundMessage;
    use agora_core::tool::ToolDescriptor;
    use agora_mesh::{ActorDirectory, DirectoryConfig, Messenger};
    use agora_testing::fixtures::{consumer_config, decision_with_tools, identity};
    use agora_testing::{MockHost, RecordingOperator};
    use agora_tools::{FnHandler, builtin_registry};
    use serde_json::json;

    struct Fixture {
        host: MockHost,
        operator: RecordingOperator,
        reminders: Arc<InMemoryReminderStore>,
        dispatcher: ToolDispatcher,
        state: ConversationState,
    }

    fn fixture(host: MockHost) -> Fixture {
        let directory = ActorDirectory::new(
            Arc::new(host.clone()),
            DirectoryConfig {
                poll_interval: Duration::from_secs(1),
                max_polls: 3,
            },
        );
        let messenger = Messenger::new(directory);
        let operator = RecordingOperator::new();
        let reminders = Arc::new(InMemoryReminderStore::new());
        let scheduler =
            ReminderScheduler::new(messenger.clone(), reminders.clone(), 3, Duration::from_secs(1));
        let dispatcher = ToolDispatcher::new(
            Arc::new(messenger),
            Arc::new(operator.clone()),
            scheduler,
            HandlerRegistry::new(),
            Duration::from_secs(30),
        );
        let config = consumer_config("HDFCBank");
        let state = ConversationState::new(
            identity("Consumer", "Anil", "r1"),
            &config,
            builtin_registry(&config.peers),
        );
        Fixture {
            host,
            operator,
            reminders,
            dispatcher,
            state,
        }
    }

    fn issuer_handle() -> agora_core::identifiers::ActorHandle {
        identity("Issuer", "HDFCBank", "r1").handle()
    }

    #[tokio::test(start_paused = true)]
    async fn peer_message_is_delivered_and_acknowledged() {
        let host = MockHost::new().with_statuses(&issuer_handle(), vec![ActorStatus::Running]);
        let f = fixture(host);
        let decision = decision_with_tools(vec![(
            "send_agents_message",
            json!({"thinking": "ask", "agent_messages": [
                {"to_id": "HDFCBank", "message": "loan offers?", "agent_type": "Issuer"}
            ]}),
        )]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert_eq!(
            aggregate,
            "Message sent to agent id: HDFCBank. You will be invoked/notified if/when they respond.\n"
        );
        assert_eq!(
            f.host.signals_to(&issuer_handle()),
            vec![InboundMessage::peer(ActorId::parse("Anil").unwrap(), "loan offers?")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn encoded_agent_messages_fall_back_to_peer_type() {
        let host = MockHost::new().with_statuses(&issuer_handle(), vec![ActorStatus::Running]);
        let f = fixture(host);
        let decision = decision_with_tools(vec![(
            "send_agents_message",
            json!({"thinking": "ask", "agent_messages":
                "[{\"to_id\": \"HDFCBank\", \"message\": \"hi\"}]"}),
        )]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert!(aggregate.starts_with("Message sent to agent id: HDFCBank."));
        assert_eq!(f.host.signals_to(&issuer_handle()).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn undeliverable_peer_message_becomes_error_text() {
        let host = MockHost::new().with_statuses(&issuer_handle(), vec![ActorStatus::Starting]);
        let f = fixture(host);
        let decision = decision_with_tools(vec![
            (
                "send_agents_message",
                json!({"thinking": "", "agent_messages": [
                    {"to_id": "HDFCBank", "message": "hi", "agent_type": "Issuer"}
                ]}),
            ),
            ("send_operator_message", json!({"thinking": "", "operator_message": "still trying"})),
        ]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert!(aggregate.starts_with("Error: failed to send message to agent id: HDFCBank"));
        assert!(aggregate.ends_with(OPERATOR_ACKNOWLEDGMENT));
        assert_eq!(f.operator.messages(), vec!["still trying".to_string()]);
    }

    #[tokio::test]
    async fn operator_tools_notify_and_acknowledge() {
        let f = fixture(MockHost::new());
        let decision = decision_with_tools(vec![
            ("send_operator_message", json!({"thinking": "", "operator_message": "Found 2 offers"})),
            ("wait_for_assistance", json!({"thinking": "", "wait_message": "Which one?"})),
        ]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert_eq!(
            aggregate,
            format!("{OPERATOR_ACKNOWLEDGMENT}\n{OPERATOR_ACKNOWLEDGMENT}")
        );
        assert_eq!(f.operator.messages(), vec!["Found 2 offers", "Which one?"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reminder_is_acknowledged_before_it_fires() {
        let f = fixture(MockHost::new());
        let decision = decision_with_tools(vec![(
            "schedule_reminder",
            json!({"thinking": "", "time": 600, "message": "check offers"}),
        )]);

        let start = tokio::time::Instant::now();
        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert_eq!(aggregate, REMINDER_ACKNOWLEDGMENT);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(f.reminders.list().await.unwrap().len(), 1);
        assert!(f.host.signals().is_empty());
    }

    #[tokio::test]
    async fn calculator_results_are_aggregated() {
        let f = fixture(MockHost::new());
        let decision = decision_with_tools(vec![
            ("calculator", json!({"expression": "2+4"})),
            ("calculator", json!({"expression": "1/0"})),
        ]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert_eq!(aggregate, "Output of 2+4 is 6\nError: Invalid expression");
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let f = fixture(MockHost::new());
        let decision = decision_with_tools(vec![("fetch_offers", json!({}))]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert_eq!(aggregate, "Error: unknown tool 'fetch_offers'");
    }

    #[tokio::test]
    async fn registered_custom_tool_runs_its_handler() {
        let mut f = fixture(MockHost::new());
        let descriptor = ToolDescriptor::try_new("fetch_offers", "List offers", json!({"type": "object"}))
            .unwrap();
        f.state.register_tool(descriptor.clone()).unwrap();
        f.dispatcher.add_handler(Arc::new(FnHandler::new(descriptor, |input: Value| {
            ExecutionResult::success(format!("offers for {}", input["amount"]))
        })));
        let decision = decision_with_tools(vec![("fetch_offers", json!({"amount": 1000}))]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert_eq!(aggregate, "offers for 1000");
    }

    #[tokio::test]
    async fn invalid_builtin_input_becomes_error_text() {
        let f = fixture(MockHost::new());
        let decision = decision_with_tools(vec![("calculator", json!({"expr": "1+1"}))]);

        let aggregate = f.dispatcher.dispatch(&f.state, &decision).await;

        assert!(aggregate.starts_with("Error: invalid input for calculator"));
    }
}
