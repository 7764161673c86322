//! Directory and messenger behaviour against a scripted host

use agora_core::host::ActorStatus;
use agora_core::identifiers::{PersonaType, RunId};
use agora_core::message::{InboundMessage, PeerMessage};
use agora_mesh::{
    ActorDirectory, DirectoryConfig, MeshError, Messenger, PeerDelivery, delivery_acknowledgment,
};
use agora_testing::fixtures::{actor_id, eventually, identity};
use agora_testing::{LookupStep, MockHost};
use std::sync::Arc;
use std::time::Duration;

fn loan_request() -> PeerMessage {
    PeerMessage {
        from_id: actor_id("Anil"),
        to_id: actor_id("HDFCBank"),
        body: "find me a loan offer".into(),
        run_id: RunId::parse("run-1").unwrap(),
        destination_persona_type: PersonaType::parse("Issuer").unwrap(),
    }
}

fn messenger(host: &MockHost, max_polls: u32) -> Messenger {
    let config = DirectoryConfig {
        poll_interval: Duration::from_secs(1),
        max_polls,
    };
    Messenger::new(ActorDirectory::new(Arc::new(host.clone()), config))
}

#[tokio::test(start_paused = true)]
async fn cold_destination_is_started_once_and_signalled_after_running() {
    let handle = identity("issuer", "HDFCBank", "run-1").handle();
    let host = MockHost::new().with_statuses(
        &handle,
        vec![
            ActorStatus::NotFound,
            ActorStatus::Starting,
            ActorStatus::Starting,
            ActorStatus::Running,
        ],
    );

    let ack = messenger(&host, 10).deliver(&loan_request()).await.unwrap();

    assert_eq!(ack, delivery_acknowledgment(&actor_id("HDFCBank")));
    assert_eq!(host.start_calls().len(), 1);
    assert_eq!(host.start_calls()[0].handle(), handle);
    // initial lookup plus three polls, the last of which saw Running
    assert_eq!(host.lookup_count(&handle), 4);
    assert_eq!(
        host.signals_to(&handle),
        vec![InboundMessage::peer(actor_id("Anil"), "find me a loan offer")]
    );
}

#[tokio::test(start_paused = true)]
async fn terminated_destination_is_restarted_not_signalled_dead() {
    let handle = identity("Issuer", "HDFCBank", "run-1").handle();
    let host = MockHost::new().with_statuses(
        &handle,
        vec![ActorStatus::Terminated, ActorStatus::Running],
    );

    messenger(&host, 10).deliver(&loan_request()).await.unwrap();

    assert!(eventually(Duration::from_secs(1), || async { host.start_calls().len() == 1 }).await);
    assert_eq!(host.signals_to(&handle).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_lookup_is_treated_as_not_found() {
    let handle = identity("Issuer", "HDFCBank", "run-1").handle();
    let host = MockHost::new().with_script(
        &handle,
        vec![LookupStep::Fail, LookupStep::Fail, LookupStep::Status(ActorStatus::Running)],
    );

    messenger(&host, 10).deliver(&loan_request()).await.unwrap();

    assert_eq!(host.start_calls().len(), 1);
    assert_eq!(host.signals_to(&handle).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn running_destination_is_signalled_without_start() {
    let handle = identity("Issuer", "HDFCBank", "run-1").handle();
    let host = MockHost::new().with_statuses(&handle, vec![ActorStatus::Running]);

    messenger(&host, 10).deliver(&loan_request()).await.unwrap();
    tokio::task::yield_now().await;

    assert!(host.start_calls().is_empty());
    assert_eq!(host.lookup_count(&handle), 1);
    assert_eq!(host.signals_to(&handle).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn readiness_polling_has_a_ceiling() {
    let handle = identity("Issuer", "HDFCBank", "run-1").handle();
    let host = MockHost::new().with_statuses(&handle, vec![ActorStatus::Failed]);

    let err = messenger(&host, 3).deliver(&loan_request()).await.unwrap_err();

    match err {
        MeshError::NotReady {
            handle: h,
            polls,
            last_status,
        } => {
            assert_eq!(h, handle);
            assert_eq!(polls, 3);
            assert_eq!(last_status, ActorStatus::Failed);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(host.start_calls().len(), 1);
    assert!(host.signals().is_empty());
}

#[tokio::test(start_paused = true)]
async fn signal_failure_is_reported_to_sender() {
    let handle = identity("Issuer", "HDFCBank", "run-1").handle();
    let host = MockHost::new()
        .with_statuses(&handle, vec![ActorStatus::Running])
        .with_failing_signals();

    let err = messenger(&host, 3).deliver(&loan_request()).await.unwrap_err();

    assert!(matches!(err, MeshError::SendFailed { .. }));
    assert!(err.to_string().contains("issuer_HDFCBank_run-1"));
}
