use agora_core::config::{ActorConfigStore, FileConfigStore};
use agora_core::error::{ConfigError, HostError};
use agora_core::host::ActorHost;
use agora_core::identifiers::{ActorHandle, ActorId, ActorIdentity, RunId};
use agora_core::message::InboundMessage;
use agora_core::operator::OperatorChannel;
use agora_runtime::{AnthropicClient, LocalHost, RuntimeError, RuntimeSettings};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

mod personas;

use personas::Persona;

#[derive(Parser, Debug)]
#[command(name = "agora", version)]
#[command(about = "Agora - host a persona's agent actor and talk to it as its operator")]
struct Cli {
    /// Conversation/run the actor belongs to
    #[arg(long, global = true, env = "AGORA_RUN_ID", default_value = "default")]
    run_id: RunId,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Personal shopping assistant talking to bank agents
    Consumer { actor_id: ActorId },
    /// Merchant assistant talking to bank agents
    Merchant { actor_id: ActorId },
    /// Bank assistant talking to consumers and merchants
    Issuer { actor_id: ActorId },
}

impl Commands {
    fn persona(&self) -> (Persona, &ActorId) {
        match self {
            Commands::Consumer { actor_id } => (Persona::Consumer, actor_id),
            Commands::Merchant { actor_id } => (Persona::Merchant, actor_id),
            Commands::Issuer { actor_id } => (Persona::Issuer, actor_id),
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("failed to read operator input: {0}")]
    Stdin(#[from] std::io::Error),
}

/// Prints operator notifications to the terminal
struct TerminalOperator;

#[async_trait]
impl OperatorChannel for TerminalOperator {
    async fn notify(&self, actor: &ActorIdentity, message: &str) {
        println!("[{}] {}", actor.actor_id, message);
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .try_init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!(error = %e, "Launcher failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let (persona, actor_id) = cli.command.persona();
    let identity = ActorIdentity::new(persona.persona_type(), actor_id.clone(), cli.run_id);
    let settings = RuntimeSettings::from_env()?;

    let configs = FileConfigStore::new(&settings.config_dir);
    write_configs(&configs, persona, actor_id).await?;

    let completion = AnthropicClient::from_env()?;
    let host = LocalHost::builder(Arc::new(completion))
        .settings(settings)
        .file_stores()
        .operator(Arc::new(TerminalOperator))
        .build();

    info!(
        actor = %identity,
        queue = %ActorHandle::queue_name(&identity.actor_id),
        "Serving actor"
    );
    let resumed = host.resume_reminders().await?;
    if resumed > 0 {
        info!(reminders = resumed, "Pending reminders re-armed");
    }
    host.start_actor(&identity).await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for interrupt");
                }
                info!("Interrupt received, shutting down");
                break;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if let Err(e) = host
                        .messenger()
                        .signal(&identity, InboundMessage::operator(line))
                        .await
                    {
                        warn!(actor = %identity, error = %e, "Failed to deliver operator input");
                    }
                }
                None => {
                    info!("Operator input closed; waiting for interrupt");
                    stdin_open = false;
                }
            },
        }
    }

    host.shutdown().await;
    Ok(())
}

/// Write this actor's configuration, plus one for each peer that has none,
/// so peers cold-started in this process can be configured
async fn write_configs(
    configs: &FileConfigStore,
    persona: Persona,
    actor_id: &ActorId,
) -> Result<(), ConfigError> {
    let config = persona.config(actor_id);
    configs
        .save(&persona.persona_type(), actor_id, &config)
        .await?;

    for (peer_id, info) in &config.peers {
        let Some(peer_persona) = Persona::from_persona_type(&info.persona_type) else {
            continue;
        };
        match configs.load(&info.persona_type, peer_id).await {
            Ok(_) => {}
            Err(ConfigError::NotFound { .. }) => {
                configs
                    .save(&info.persona_type, peer_id, &peer_persona.config(peer_id))
                    .await?;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_persona_and_run_id() {
        let cli = Cli::try_parse_from(["agora", "consumer", "Anil", "--run-id", "r7"]).unwrap();
        let (persona, actor_id) = cli.command.persona();
        assert_eq!(persona, Persona::Consumer);
        assert_eq!(actor_id.as_str(), "Anil");
        assert_eq!(cli.run_id.as_str(), "r7");
    }

    #[test]
    fn rejects_invalid_actor_ids() {
        assert!(Cli::try_parse_from(["agora", "issuer", "../etc"]).is_err());
    }

    #[tokio::test]
    async fn peer_configs_are_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let configs = FileConfigStore::new(dir.path());
        let anil = ActorId::parse("Anil").unwrap();

        write_configs(&configs, Persona::Consumer, &anil).await.unwrap();

        let issuer = Persona::Issuer.persona_type();
        let hdfc = ActorId::parse("HDFCBank").unwrap();
        let bank = configs.load(&issuer, &hdfc).await.unwrap();
        assert!(bank.system_prompt.contains("issuer assistant for HDFCBank"));
        assert!(configs.config_path(&issuer, &hdfc).exists());
        assert!(configs
            .load(&Persona::Consumer.persona_type(), &anil)
            .await
            .is_ok());
    }
}
