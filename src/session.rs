//! Interaction state for one client session
//!
//! Tracks exactly one orchestration run at a time. The pure `Machine`
//! holds the state transitions and the run sequence counter; `Session`
//! drives orchestration against a backend and commits the outcome only
//! when the run has not been superseded (last submission wins).

use crate::backend::BackendClient;
use crate::orchestrator::{self, Answer, OrchestrationError};
use crate::validate::{validate, ValidationError};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Session state; exactly one variant holds at a time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AskState {
    #[default]
    Idle,
    Pending,
    Succeeded(Answer),
    Failed(OrchestrationError),
}

impl AskState {
    pub fn is_pending(&self) -> bool {
        matches!(self, AskState::Pending)
    }
}

/// Why a submission was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("a run is already in flight")]
    Busy,
}

/// State plus the run sequence counter. Pure and synchronous; all I/O
/// lives in `Session`.
#[derive(Debug, Default)]
pub struct Machine {
    state: AskState,
    seq: u64,
}

impl Machine {
    pub fn state(&self) -> &AskState {
        &self.state
    }

    /// Accept a new submission, discarding any prior settled state.
    /// Rejected while a run is in flight so overlapping runs cannot race
    /// on the single state slot.
    pub fn begin(&mut self) -> Result<u64, SubmitError> {
        if self.state.is_pending() {
            return Err(SubmitError::Busy);
        }
        self.seq += 1;
        self.state = AskState::Pending;
        Ok(self.seq)
    }

    /// Commit a terminal transition. Returns false when `seq` is not the
    /// latest accepted run; the stale completion is discarded.
    pub fn commit(&mut self, seq: u64, outcome: Result<Answer, OrchestrationError>) -> bool {
        if seq != self.seq || !self.state.is_pending() {
            return false;
        }
        self.state = match outcome {
            Ok(answer) => AskState::Succeeded(answer),
            Err(err) => AskState::Failed(err),
        };
        true
    }

    /// Clear a settled run back to `Idle`. Rejected while a run is in
    /// flight; a no-op from `Idle`.
    pub fn reset(&mut self) -> Result<(), SubmitError> {
        if self.state.is_pending() {
            return Err(SubmitError::Busy);
        }
        self.state = AskState::Idle;
        Ok(())
    }
}

/// Drives orchestration runs against a backend and holds their state.
/// One instance per client session.
pub struct Session {
    backend: Arc<dyn BackendClient>,
    machine: Mutex<Machine>,
}

impl Session {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            machine: Mutex::new(Machine::default()),
        }
    }

    pub fn state(&self) -> AskState {
        self.machine.lock().unwrap().state().clone()
    }

    /// Validate and run one submission. Returns once the run settles;
    /// orchestration failures land in the state, not the return value.
    /// The only suspension points are the two network calls inside the
    /// orchestrator; validation and transitions never yield.
    pub async fn submit(&self, repo_url: &str, question: &str) -> Result<(), SubmitError> {
        validate(repo_url, question)?;

        let seq = self.machine.lock().unwrap().begin()?;
        tracing::info!(seq, repo_url, "run started");

        let outcome = orchestrator::run(self.backend.as_ref(), repo_url, question).await;

        let committed = self.machine.lock().unwrap().commit(seq, outcome);
        if committed {
            tracing::info!(seq, "run settled");
        } else {
            tracing::debug!(seq, "discarded superseded completion");
        }
        Ok(())
    }

    pub fn reset(&self) -> Result<(), SubmitError> {
        self.machine.lock().unwrap().reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::MockBackend;
    use crate::backend::{ApiError, ApiErrorKind, AskReply};
    use crate::orchestrator::Phase;

    fn answer() -> Answer {
        Answer {
            explanation: "E".to_string(),
            file_name: "f.js".to_string(),
            code_snippet: "c".to_string(),
        }
    }

    fn full_reply() -> AskReply {
        AskReply {
            explanation: Some("E".to_string()),
            file_name: Some("f.js".to_string()),
            code_snippet: Some("c".to_string()),
        }
    }

    // Machine (pure transitions)

    #[test]
    fn begin_rejected_while_pending() {
        let mut machine = Machine::default();
        machine.begin().unwrap();
        assert_eq!(machine.begin(), Err(SubmitError::Busy));
        assert!(machine.state().is_pending());
    }

    #[test]
    fn stale_commit_is_discarded() {
        let mut machine = Machine::default();
        let first = machine.begin().unwrap();
        assert!(machine.commit(
            first,
            Err(OrchestrationError {
                phase: Phase::Ingest,
                message: "clone failed".to_string(),
            })
        ));

        let second = machine.begin().unwrap();
        assert_ne!(first, second);

        // A late duplicate completion for the superseded run must not land.
        assert!(!machine.commit(first, Ok(answer())));
        assert!(machine.state().is_pending());

        assert!(machine.commit(second, Ok(answer())));
        assert_eq!(machine.state(), &AskState::Succeeded(answer()));
    }

    #[test]
    fn reset_clears_settled_state() {
        let mut machine = Machine::default();
        let seq = machine.begin().unwrap();
        machine.commit(
            seq,
            Err(OrchestrationError {
                phase: Phase::Ask,
                message: "boom".to_string(),
            }),
        );
        machine.reset().unwrap();
        assert_eq!(machine.state(), &AskState::Idle);
    }

    #[test]
    fn reset_rejected_while_pending() {
        let mut machine = Machine::default();
        machine.begin().unwrap();
        assert_eq!(machine.reset(), Err(SubmitError::Busy));
    }

    // Session (driver)

    #[tokio::test]
    async fn successful_submission_settles_succeeded() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_ingest(Ok(()));
        backend.queue_ask(Ok(full_reply()));
        let session = Session::new(backend);

        session
            .submit("https://github.com/a/b", "What does f do?")
            .await
            .unwrap();

        assert_eq!(session.state(), AskState::Succeeded(answer()));
    }

    #[tokio::test]
    async fn ingest_failure_settles_failed_without_ask() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_ingest(Err(ApiError::new(ApiErrorKind::Server, "clone failed")));
        let session = Session::new(backend.clone());

        session
            .submit("https://github.com/a/b", "What does f do?")
            .await
            .unwrap();

        assert_eq!(
            session.state(),
            AskState::Failed(OrchestrationError {
                phase: Phase::Ingest,
                message: "clone failed".to_string(),
            })
        );
        assert_eq!(backend.ask_count(), 0);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_backend() {
        let backend = Arc::new(MockBackend::new());
        let session = Session::new(backend.clone());

        let err = session.submit("   ", "question").await.unwrap_err();

        assert_eq!(err, SubmitError::Invalid(ValidationError::EmptyRepoUrl));
        assert_eq!(backend.ingest_count(), 0);
        assert_eq!(backend.ask_count(), 0);
        assert_eq!(session.state(), AskState::Idle);
    }

    #[tokio::test]
    async fn submit_while_pending_is_rejected() {
        let backend = Arc::new(MockBackend::new());
        let release = backend.gate_ingest();
        backend.queue_ingest(Ok(()));
        backend.queue_ask(Ok(full_reply()));
        let session = Arc::new(Session::new(backend.clone()));

        let first = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.submit("https://github.com/a/b", "q1").await })
        };

        // Wait for the first run to reach the gated ingest call.
        while backend.ingest_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(session.state().is_pending());

        let second = session.submit("https://github.com/a/b", "q2").await;
        assert_eq!(second, Err(SubmitError::Busy));
        assert!(session.state().is_pending());

        release.send(()).unwrap();
        first.await.unwrap().unwrap();

        assert_eq!(session.state(), AskState::Succeeded(answer()));
        // The rejected submission never started a second run.
        assert_eq!(backend.ingest_count(), 1);
        assert_eq!(backend.ask_count(), 1);
    }

    #[tokio::test]
    async fn new_submission_discards_previous_outcome() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_ingest(Err(ApiError::new(ApiErrorKind::Server, "clone failed")));
        backend.queue_ingest(Ok(()));
        backend.queue_ask(Ok(full_reply()));
        let session = Session::new(backend);

        session.submit("https://github.com/a/b", "q").await.unwrap();
        assert!(matches!(session.state(), AskState::Failed(_)));

        session.submit("https://github.com/a/b", "q").await.unwrap();
        assert_eq!(session.state(), AskState::Succeeded(answer()));
    }
}
