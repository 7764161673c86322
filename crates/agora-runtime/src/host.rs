//! In-process durable actor host
//!
//! [`LocalHost`] runs every actor as a tokio task and implements
//! [`ActorHost`] on top of them. Actor state is saved to a [`StateStore`]
//! at each quiescent point, so a host started over the same stores resumes
//! conversations where they stopped. Pending reminders live in a
//! [`ReminderStore`] and are re-armed by [`LocalHost::resume_reminders`].

use crate::actor::{ActorCommand, AgentActor};
use crate::dispatch::ToolDispatcher;
use crate::error::RuntimeResult;
use crate::reminder::{FileReminderStore, InMemoryReminderStore, ReminderScheduler, ReminderStore};
use crate::settings::RuntimeSettings;
use crate::store::{ActorRecord, FileStateStore, InMemoryStateStore, StateStore};
use agora_core::completion::CompletionService;
use agora_core::config::{ActorConfigStore, FileConfigStore, InMemoryConfigStore};
use agora_core::error::{HostError, HostResult};
use agora_core::host::{ActorHost, ActorStatus};
use agora_core::identifiers::{ActorHandle, ActorIdentity};
use agora_core::message::InboundMessage;
use agora_core::operator::{LogOperatorChannel, OperatorChannel};
use agora_core::state::{ConversationSnapshot, ConversationState};
use agora_core::tool::ToolDescriptor;
use agora_mesh::{ActorDirectory, Messenger};
use agora_tools::{HandlerRegistry, ToolHandler, builtin_registry};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct RunningActor {
    commands: mpsc::UnboundedSender<ActorCommand>,
    snapshots: watch::Receiver<ConversationSnapshot>,
    task: Option<JoinHandle<()>>,
    terminated: bool,
}

impl RunningActor {
    fn status(&self) -> ActorStatus {
        if self.terminated {
            return ActorStatus::Terminated;
        }
        match &self.task {
            Some(task) if !task.is_finished() => ActorStatus::Running,
            _ => ActorStatus::Failed,
        }
    }
}

enum Slot {
    Starting,
    Live(RunningActor),
}

impl Slot {
    fn status(&self) -> ActorStatus {
        match self {
            Slot::Starting => ActorStatus::Starting,
            Slot::Live(actor) => actor.status(),
        }
    }
}

pub struct LocalHost {
    actors: DashMap<ActorHandle, Slot>,
    completion: Arc<dyn CompletionService>,
    configs: Arc<dyn ActorConfigStore>,
    states: Arc<dyn StateStore>,
    operator: Arc<dyn OperatorChannel>,
    handlers: HandlerRegistry,
    messenger: Messenger,
    reminders: ReminderScheduler,
    settings: RuntimeSettings,
}

impl LocalHost {
    pub fn builder(completion: Arc<dyn CompletionService>) -> LocalHostBuilder {
        LocalHostBuilder::new(completion)
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Messenger bound to this host; signals through it start cold actors
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    pub fn handles(&self) -> Vec<ActorHandle> {
        self.actors.iter().map(|slot| slot.key().clone()).collect()
    }

    /// Start every actor with a stored record
    pub async fn resume_all(&self) -> RuntimeResult<usize> {
        let records = self.states.load_all().await?;
        let count = records.len();
        for record in records {
            self.start_actor(&record.state.identity).await?;
        }
        if count > 0 {
            info!(count, "Resumed stored actors");
        }
        Ok(count)
    }

    /// Re-arm reminders left pending by a previous run
    pub async fn resume_reminders(&self) -> RuntimeResult<usize> {
        Ok(self.reminders.resume_pending().await?.len())
    }

    /// Register a tool with a running actor.
    ///
    /// The registration is applied between turns. A descriptor without a
    /// handler is advertised to the model but reported as unknown when
    /// invoked.
    pub async fn register_tool(
        &self,
        handle: &ActorHandle,
        descriptor: ToolDescriptor,
        handler: Option<Arc<dyn ToolHandler>>,
    ) -> RuntimeResult<()> {
        let (reply, response) = oneshot::channel();
        self.send_command(
            handle,
            ActorCommand::RegisterTool {
                descriptor,
                handler,
                reply,
            },
        )?;
        let result = response
            .await
            .map_err(|_| HostError::Unavailable(handle.clone()))?;
        Ok(result?)
    }

    /// Register a handler together with its own descriptor
    pub async fn register_handler(
        &self,
        handle: &ActorHandle,
        handler: Arc<dyn ToolHandler>,
    ) -> RuntimeResult<()> {
        let descriptor = handler.descriptor();
        self.register_tool(handle, descriptor, Some(handler)).await
    }

    /// Stop an actor after its current turn; its status becomes `Terminated`
    pub async fn terminate(&self, handle: &ActorHandle) -> HostResult<()> {
        let task = match self.actors.get_mut(handle) {
            Some(mut slot) => match slot.value_mut() {
                Slot::Live(actor) => {
                    actor.terminated = true;
                    let _ = actor.commands.send(ActorCommand::Stop);
                    actor.task.take()
                }
                Slot::Starting => return Err(HostError::Unavailable(handle.clone())),
            },
            None => return Err(HostError::NotFound(handle.clone())),
        };

        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(actor = %handle, error = %e, "Actor task ended abnormally");
            }
        }
        info!(actor = %handle, "Actor terminated");
        Ok(())
    }

    /// Terminate every live actor and disarm pending reminders.
    ///
    /// Reminder records stay in the store for [`Self::resume_reminders`].
    pub async fn shutdown(&self) {
        let handles = self.handles();
        info!(actors = handles.len(), "Shutting down host");
        self.reminders.disarm_all();
        let results = join_all(handles.iter().map(|handle| self.terminate(handle))).await;
        for (handle, result) in handles.iter().zip(results) {
            if let Err(e) = result {
                debug!(actor = %handle, error = %e, "Skipping actor during shutdown");
            }
        }
    }

    fn send_command(&self, handle: &ActorHandle, command: ActorCommand) -> HostResult<()> {
        let slot = self
            .actors
            .get(handle)
            .ok_or_else(|| HostError::NotFound(handle.clone()))?;
        match slot.value() {
            Slot::Live(actor) if actor.status() == ActorStatus::Running => actor
                .commands
                .send(command)
                .map_err(|_| HostError::Unavailable(handle.clone())),
            _ => Err(HostError::Unavailable(handle.clone())),
        }
    }

    async fn load_record(&self, identity: &ActorIdentity) -> HostResult<ActorRecord> {
        let handle = identity.handle();
        if let Some(record) = self.states.load(&handle).await? {
            info!(actor = %handle, turns = record.turns_completed, "Resuming actor from stored state");
            return Ok(record);
        }

        let config = self
            .configs
            .load(&identity.persona_type, &identity.actor_id)
            .await?;
        let mut defaults = builtin_registry(&config.peers);
        for descriptor in self.handlers.descriptors() {
            if let Err(e) = defaults.register(descriptor) {
                warn!(actor = %handle, error = %e, "Skipping host tool");
            }
        }
        info!(actor = %handle, "Creating actor from configuration");
        Ok(ActorRecord::new(
            ConversationState::new(identity.clone(), &config, defaults),
            0,
        ))
    }

    async fn spawn_actor(&self, identity: &ActorIdentity) -> HostResult<RunningActor> {
        let record = self.load_record(identity).await?;
        let dispatcher = ToolDispatcher::new(
            Arc::new(self.messenger.clone()),
            Arc::clone(&self.operator),
            self.reminders.clone(),
            self.handlers.clone(),
            self.settings.tool_timeout,
        );
        let (commands, receiver) = mpsc::unbounded_channel();
        let (actor, snapshots) = AgentActor::new(
            record,
            Arc::clone(&self.completion),
            dispatcher,
            Arc::clone(&self.states),
            self.settings.step_timeout,
            receiver,
        );
        Ok(RunningActor {
            commands,
            snapshots,
            task: Some(tokio::spawn(actor.run())),
            terminated: false,
        })
    }
}

#[async_trait]
impl ActorHost for LocalHost {
    async fn start_actor(&self, identity: &ActorIdentity) -> HostResult<()> {
        let handle = identity.handle();
        match self.actors.entry(handle.clone()) {
            Entry::Occupied(mut slot) => {
                let status = slot.get().status();
                if matches!(status, ActorStatus::Starting | ActorStatus::Running) {
                    debug!(actor = %handle, status = %status, "Actor already live");
                    return Ok(());
                }
                slot.insert(Slot::Starting);
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Starting);
            }
        }

        match self.spawn_actor(identity).await {
            Ok(actor) => {
                self.actors.insert(handle, Slot::Live(actor));
                Ok(())
            }
            Err(e) => {
                self.actors.remove(&handle);
                warn!(actor = %handle, error = %e, "Actor failed to start");
                Err(e)
            }
        }
    }

    async fn status(&self, handle: &ActorHandle) -> HostResult<ActorStatus> {
        Ok(self
            .actors
            .get(handle)
            .map_or(ActorStatus::NotFound, |slot| slot.status()))
    }

    async fn signal(&self, handle: &ActorHandle, message: InboundMessage) -> HostResult<()> {
        self.send_command(handle, ActorCommand::Signal(message))
    }

    async fn query(&self, handle: &ActorHandle) -> HostResult<ConversationSnapshot> {
        let live = self.actors.get(handle).and_then(|slot| match slot.value() {
            Slot::Live(actor) => Some(actor.snapshots.borrow().clone()),
            Slot::Starting => None,
        });
        if let Some(snapshot) = live {
            return Ok(snapshot);
        }

        self.states
            .load(handle)
            .await?
            .map(|record| record.snapshot())
            .ok_or_else(|| HostError::NotFound(handle.clone()))
    }
}

/// `ActorHost` view held by the host's own directory.
///
/// Holding the host weakly keeps actors from keeping it alive.
struct WeakHost(Weak<LocalHost>);

impl WeakHost {
    fn upgrade(&self) -> HostResult<Arc<LocalHost>> {
        self.0.upgrade().ok_or(HostError::ShuttingDown)
    }
}

#[async_trait]
impl ActorHost for WeakHost {
    async fn start_actor(&self, identity: &ActorIdentity) -> HostResult<()> {
        self.upgrade()?.start_actor(identity).await
    }

    async fn status(&self, handle: &ActorHandle) -> HostResult<ActorStatus> {
        self.upgrade()?.status(handle).await
    }

    async fn signal(&self, handle: &ActorHandle, message: InboundMessage) -> HostResult<()> {
        self.upgrade()?.signal(handle, message).await
    }

    async fn query(&self, handle: &ActorHandle) -> HostResult<ConversationSnapshot> {
        self.upgrade()?.query(handle).await
    }
}

/// Builder for [`LocalHost`].
///
/// Stores default to in-memory implementations, the operator channel to
/// [`LogOperatorChannel`].
pub struct LocalHostBuilder {
    completion: Arc<dyn CompletionService>,
    configs: Arc<dyn ActorConfigStore>,
    states: Arc<dyn StateStore>,
    reminders: Arc<dyn ReminderStore>,
    operator: Arc<dyn OperatorChannel>,
    handlers: HandlerRegistry,
    settings: RuntimeSettings,
}

impl LocalHostBuilder {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            configs: Arc::new(InMemoryConfigStore::new()),
            states: Arc::new(InMemoryStateStore::new()),
            reminders: Arc::new(InMemoryReminderStore::new()),
            operator: Arc::new(LogOperatorChannel),
            handlers: HandlerRegistry::new(),
            settings: RuntimeSettings::default(),
        }
    }

    #[must_use]
    pub fn settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn config_store(mut self, configs: Arc<dyn ActorConfigStore>) -> Self {
        self.configs = configs;
        self
    }

    #[must_use]
    pub fn state_store(mut self, states: Arc<dyn StateStore>) -> Self {
        self.states = states;
        self
    }

    #[must_use]
    pub fn reminder_store(mut self, reminders: Arc<dyn ReminderStore>) -> Self {
        self.reminders = reminders;
        self
    }

    /// File-backed stores under the configured state and config directories.
    ///
    /// Uses the settings set so far; call after [`Self::settings`].
    #[must_use]
    pub fn file_stores(self) -> Self {
        let state_dir = self.settings.state_dir.clone();
        let config_dir = self.settings.config_dir.clone();
        self.config_store(Arc::new(FileConfigStore::new(config_dir)))
            .state_store(Arc::new(FileStateStore::new(state_dir.join("actors"))))
            .reminder_store(Arc::new(FileReminderStore::new(state_dir.join("reminders"))))
    }

    #[must_use]
    pub fn operator(mut self, operator: Arc<dyn OperatorChannel>) -> Self {
        self.operator = operator;
        self
    }

    /// Handler available to every actor; its descriptor is seeded into the
    /// registry of actors created from configuration
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.handlers.insert(handler);
        self
    }

    pub fn build(self) -> Arc<LocalHost> {
        Arc::new_cyclic(|weak: &Weak<LocalHost>| {
            let directory = ActorDirectory::new(
                Arc::new(WeakHost(weak.clone())),
                self.settings.directory_config(),
            );
            let messenger = Messenger::new(directory);
            let reminders = ReminderScheduler::new(
                messenger.clone(),
                self.reminders,
                self.settings.reminder_max_attempts,
                self.settings.reminder_retry_backoff,
            );
            LocalHost {
                actors: DashMap::new(),
                completion: self.completion,
                configs: self.configs,
                states: self.states,
                operator: self.operator,
                handlers: self.handlers,
                messenger,
                reminders,
                settings: self.settings,
            }
        })
    }
}
