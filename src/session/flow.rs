// src/session/flow.rs
//! Guest analyze flow: welcome -> analyze -> results, with an error
//! overlay on the first two steps.
//!
//! Failures never auto-retry: the causes (limits, expiry) are not
//! transient, so every failure keeps the user on the current step with
//! an explicit recovery action. A cancellation token is checked before
//! every state mutation that follows an await, so a cancelled flow
//! resolves as a no-op instead of mutating dead state.

use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::session::client::GuestApi;
use crate::session::error::GuestError;
use crate::session::store::{CredentialStore, GuestCredentials};
use crate::types::analysis::{AnalysisRequest, AnalysisResult};

const SESSION_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Welcome,
    Analyze,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    Retry,
    SignIn,
    SignUp,
    ViewPricing,
}

impl RecoveryAction {
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::Retry => "Try again",
            RecoveryAction::SignIn => "Sign in",
            RecoveryAction::SignUp => "Create an account",
            RecoveryAction::ViewPricing => "View pricing",
        }
    }
}

/// A classified failure plus the actions offered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowError {
    pub error: GuestError,
    pub actions: Vec<RecoveryAction>,
}

impl From<GuestError> for FlowError {
    fn from(error: GuestError) -> Self {
        let actions = match &error {
            GuestError::RateLimitExceeded | GuestError::DailyLimitExceeded => {
                vec![RecoveryAction::SignIn, RecoveryAction::ViewPricing]
            }
            GuestError::InsufficientCredits => {
                vec![RecoveryAction::SignUp, RecoveryAction::ViewPricing]
            }
            GuestError::SessionCreation(_) => {
                vec![RecoveryAction::Retry, RecoveryAction::SignIn]
            }
            _ => vec![RecoveryAction::Retry],
        };
        Self { error, actions }
    }
}

/// Form state behind the submit gate.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeForm {
    pub resume: Option<PathBuf>,
    pub job_description: String,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
}

impl AnalyzeForm {
    /// Client-side precondition only; the server re-validates.
    pub fn can_submit(&self) -> bool {
        self.resume.is_some() && !self.job_description.trim().is_empty()
    }

    fn to_request(&self) -> Option<AnalysisRequest> {
        Some(AnalysisRequest {
            resume_path: self.resume.clone()?,
            job_description: self.job_description.clone(),
            job_title: self.job_title.clone(),
            company_name: self.company_name.clone(),
        })
    }
}

pub struct AnalyzeFlow<A, S> {
    api: A,
    store: S,
    cancel: CancellationToken,
    step: FlowStep,
    credits: u32,
    token: Option<String>,
    pub form: AnalyzeForm,
    error: Option<FlowError>,
    result: Option<AnalysisResult>,
}

impl<A: GuestApi, S: CredentialStore> AnalyzeFlow<A, S> {
    pub fn new(api: A, store: S, cancel: CancellationToken) -> Self {
        Self {
            api,
            store,
            cancel,
            step: FlowStep::Welcome,
            credits: 0,
            token: None,
            form: AnalyzeForm::default(),
            error: None,
            result: None,
        }
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn credits(&self) -> u32 {
        self.credits
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Resume the stored session if the server still honors it,
    /// otherwise create a fresh one. Failures land as a displayed error
    /// on the welcome step.
    pub async fn bootstrap(&mut self) {
        self.error = None;

        // Local validity is only a pre-filter to skip a doomed round
        // trip; session-info is the authoritative check.
        if self.store.is_valid() {
            if let Some(credentials) = self.store.get() {
                match self.api.session_info(&credentials.guest_token).await {
                    Ok(snapshot) => {
                        if self.cancel.is_cancelled() {
                            return;
                        }
                        self.token = Some(credentials.guest_token);
                        self.credits = snapshot.credits;
                        self.step = FlowStep::Analyze;
                        return;
                    }
                    Err(GuestError::SessionInvalid) => {
                        if self.cancel.is_cancelled() {
                            return;
                        }
                        // Server rejected the token: recreate silently.
                        if let Err(e) = self.store.clear() {
                            warn!("Failed to clear rejected credentials: {}", e);
                        }
                    }
                    Err(
                        err @ (GuestError::ConnectionTimeout | GuestError::NetworkFailure),
                    ) => {
                        if self.cancel.is_cancelled() {
                            return;
                        }
                        error!("Session resume failed: {}", err);
                        self.error = Some(FlowError::from(err));
                        return;
                    }
                    Err(other) => {
                        warn!("Session resume failed, creating a new session: {}", other);
                    }
                }
            }
        }

        self.create_session().await;
    }

    async fn create_session(&mut self) {
        match tokio::time::timeout(SESSION_BOOTSTRAP_TIMEOUT, self.api.create_session()).await {
            Err(_elapsed) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                error!("Guest session creation timed out");
                self.error = Some(FlowError::from(GuestError::ConnectionTimeout));
            }
            Ok(Err(err)) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                error!("Guest session creation failed: {}", err);
                self.error = Some(FlowError::from(err));
            }
            Ok(Ok(session)) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                let credentials = GuestCredentials {
                    guest_token: session.token.clone(),
                    guest_expires_at: session.expires_at,
                    guest_session_id: session.session_id.clone(),
                };
                if let Err(e) = self.store.store(&credentials) {
                    // Session still works for this run; it just won't
                    // survive a restart.
                    warn!("Failed to persist guest credentials: {}", e);
                }
                self.token = Some(session.token);
                self.credits = session.credits;
                self.step = FlowStep::Analyze;
            }
        }
    }

    /// Submit the current form. No-op while the gate is closed.
    pub async fn submit(&mut self) {
        if !self.form.can_submit() {
            return;
        }
        let Some(token) = self.token.clone() else {
            self.error = Some(FlowError::from(GuestError::SessionInvalid));
            return;
        };
        let Some(request) = self.form.to_request() else {
            return;
        };

        self.error = None;

        match self.api.analyze_resume(&token, &request).await {
            Ok(response) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.credits = response
                    .credits_remaining
                    .unwrap_or_else(|| self.credits.saturating_sub(1));
                self.result = Some(response.analysis);
                self.step = FlowStep::Results;
            }
            Err(GuestError::InsufficientCredits) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                // Terminal for guests: whatever we thought we had, the
                // server says zero.
                self.credits = 0;
                self.error = Some(FlowError::from(GuestError::InsufficientCredits));
            }
            Err(GuestError::SessionInvalid) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                if let Err(e) = self.store.clear() {
                    warn!("Failed to clear rejected credentials: {}", e);
                }
                self.token = None;
                self.error = Some(FlowError::from(GuestError::SessionInvalid));
            }
            Err(other) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.error = Some(FlowError::from(other));
            }
        }
    }

    /// Back to the analyze step for another run. Credits persist across
    /// analyses within one session lifetime; no new session is created.
    pub fn reset_for_new_analysis(&mut self) {
        self.form = AnalyzeForm::default();
        self.result = None;
        self.error = None;
        self.step = FlowStep::Analyze;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::client::GuestApi;
    use crate::types::analysis::AnalyzeResponse;
    use crate::types::session::{GuestSession, SessionSnapshot};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemoryStore {
        credentials: Mutex<Option<GuestCredentials>>,
    }

    impl MemoryStore {
        fn empty() -> Self {
            Self {
                credentials: Mutex::new(None),
            }
        }

        fn with(credentials: GuestCredentials) -> Self {
            Self {
                credentials: Mutex::new(Some(credentials)),
            }
        }
    }

    impl CredentialStore for MemoryStore {
        fn store(&self, credentials: &GuestCredentials) -> anyhow::Result<()> {
            *self.credentials.lock().unwrap() = Some(credentials.clone());
            Ok(())
        }

        fn get(&self) -> Option<GuestCredentials> {
            self.credentials.lock().unwrap().clone()
        }

        fn clear(&self) -> anyhow::Result<()> {
            *self.credentials.lock().unwrap() = None;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeApi {
        create_calls: AtomicUsize,
        info_calls: AtomicUsize,
        analyze_calls: AtomicUsize,
        create_response: Option<Result<GuestSession, GuestError>>,
        info_response: Option<Result<SessionSnapshot, GuestError>>,
        analyze_response: Option<Result<AnalyzeResponse, GuestError>>,
        last_analyze: Mutex<Option<(String, AnalysisRequest)>>,
        hang_create: bool,
    }

    #[async_trait]
    impl GuestApi for FakeApi {
        async fn create_session(&self) -> Result<GuestSession, GuestError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.hang_create {
                std::future::pending::<()>().await;
            }
            self.create_response
                .clone()
                .unwrap_or(Err(GuestError::NetworkFailure))
        }

        async fn session_info(&self, _token: &str) -> Result<SessionSnapshot, GuestError> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            self.info_response
                .clone()
                .unwrap_or(Err(GuestError::SessionInvalid))
        }

        async fn analyze_resume(
            &self,
            token: &str,
            request: &AnalysisRequest,
        ) -> Result<AnalyzeResponse, GuestError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_analyze.lock().unwrap() = Some((token.to_string(), request.clone()));
            self.analyze_response
                .clone()
                .unwrap_or(Err(GuestError::NetworkFailure))
        }

        async fn analysis(&self, _token: &str, _id: &str) -> Result<AnalysisResult, GuestError> {
            Err(GuestError::Generic("not scripted".to_string()))
        }
    }

    fn fresh_session() -> GuestSession {
        GuestSession {
            token: "tok_new".to_string(),
            credits: 2,
            expires_at: Utc::now() + ChronoDuration::hours(24),
            session_id: "sess_new".to_string(),
        }
    }

    fn live_credentials() -> GuestCredentials {
        GuestCredentials {
            guest_token: "tok_stored".to_string(),
            guest_expires_at: Utc::now() + ChronoDuration::hours(1),
            guest_session_id: "sess_stored".to_string(),
        }
    }

    fn filled_form() -> AnalyzeForm {
        AnalyzeForm {
            resume: Some(PathBuf::from("resume.pdf")),
            job_description: "Senior Engineer building distributed systems".to_string(),
            job_title: Some("Senior Engineer".to_string()),
            company_name: Some("Initech".to_string()),
        }
    }

    fn success_analysis() -> AnalyzeResponse {
        serde_json::from_str(
            r#"{"credits_remaining": 1, "overall_score": 81.0, "id": "an_1"}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_start_creates_session_once() {
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());

        flow.bootstrap().await;

        assert_eq!(flow.api.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.step(), FlowStep::Analyze);
        assert_eq!(flow.credits(), 2);
        // The fresh session was persisted.
        assert_eq!(flow.store.get().unwrap().guest_token, "tok_new");
    }

    #[tokio::test]
    async fn test_confirmed_stored_session_skips_creation() {
        let api = FakeApi {
            info_response: Some(Ok(SessionSnapshot {
                credits: 5,
                expires_at: Utc::now() + ChronoDuration::hours(1),
                session_id: "sess_stored".to_string(),
            })),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(
            api,
            MemoryStore::with(live_credentials()),
            CancellationToken::new(),
        );

        flow.bootstrap().await;

        assert_eq!(flow.api.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.api.info_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.step(), FlowStep::Analyze);
        assert_eq!(flow.credits(), 5);
        assert_eq!(flow.session_token(), Some("tok_stored"));
    }

    #[tokio::test]
    async fn test_locally_expired_session_skips_info_round_trip() {
        let expired = GuestCredentials {
            guest_expires_at: Utc::now() - ChronoDuration::hours(1),
            ..live_credentials()
        };
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::with(expired), CancellationToken::new());

        flow.bootstrap().await;

        assert_eq!(flow.api.info_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.api.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.step(), FlowStep::Analyze);
    }

    #[tokio::test]
    async fn test_server_rejected_token_recreates_silently() {
        let api = FakeApi {
            info_response: Some(Err(GuestError::SessionInvalid)),
            create_response: Some(Ok(fresh_session())),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(
            api,
            MemoryStore::with(live_credentials()),
            CancellationToken::new(),
        );

        flow.bootstrap().await;

        assert_eq!(flow.api.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.step(), FlowStep::Analyze);
        assert!(flow.error().is_none());
        assert_eq!(flow.store.get().unwrap().guest_token, "tok_new");
    }

    #[tokio::test]
    async fn test_creation_failure_stays_on_welcome_with_actions() {
        let api = FakeApi {
            create_response: Some(Err(GuestError::RateLimitExceeded)),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());

        flow.bootstrap().await;

        assert_eq!(flow.step(), FlowStep::Welcome);
        let error = flow.error().unwrap();
        assert_eq!(error.error, GuestError::RateLimitExceeded);
        assert!(error.actions.contains(&RecoveryAction::SignIn));
        assert!(error.actions.contains(&RecoveryAction::ViewPricing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_times_out_after_ten_seconds() {
        let api = FakeApi {
            hang_create: true,
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());

        flow.bootstrap().await;

        assert_eq!(flow.step(), FlowStep::Welcome);
        assert_eq!(
            flow.error().unwrap().error,
            GuestError::ConnectionTimeout
        );
    }

    #[tokio::test]
    async fn test_submit_gate_requires_file_and_description() {
        let empty = AnalyzeForm::default();
        let file_only = AnalyzeForm {
            resume: Some(PathBuf::from("resume.pdf")),
            ..Default::default()
        };
        let description_only = AnalyzeForm {
            job_description: "Senior Engineer".to_string(),
            ..Default::default()
        };
        let both = AnalyzeForm {
            resume: Some(PathBuf::from("resume.pdf")),
            job_description: "Senior Engineer".to_string(),
            ..Default::default()
        };
        let whitespace_description = AnalyzeForm {
            resume: Some(PathBuf::from("resume.pdf")),
            job_description: "   ".to_string(),
            ..Default::default()
        };

        assert!(!empty.can_submit());
        assert!(!file_only.can_submit());
        assert!(!description_only.can_submit());
        assert!(both.can_submit());
        assert!(!whitespace_description.can_submit());
    }

    #[tokio::test]
    async fn test_successful_submit_reaches_results() {
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            analyze_response: Some(Ok(success_analysis())),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());
        flow.bootstrap().await;
        flow.form = filled_form();

        flow.submit().await;

        assert_eq!(flow.step(), FlowStep::Results);
        assert_eq!(flow.result().unwrap().overall_score, Some(81.0));
        assert_eq!(flow.credits(), 1);

        let (token, request) = flow.api.last_analyze.lock().unwrap().clone().unwrap();
        assert_eq!(token, "tok_new");
        assert_eq!(request.resume_path, PathBuf::from("resume.pdf"));
        assert_eq!(
            request.job_description,
            "Senior Engineer building distributed systems"
        );
        assert_eq!(request.job_title.as_deref(), Some("Senior Engineer"));
        assert_eq!(request.company_name.as_deref(), Some("Initech"));
    }

    #[tokio::test]
    async fn test_insufficient_credits_forces_zero_display() {
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            analyze_response: Some(Err(GuestError::InsufficientCredits)),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());
        flow.bootstrap().await;
        assert_eq!(flow.credits(), 2);
        flow.form = filled_form();

        flow.submit().await;

        // Stays on analyze with an upgrade prompt; last known credit
        // count is overridden to zero.
        assert_eq!(flow.step(), FlowStep::Analyze);
        assert_eq!(flow.credits(), 0);
        let error = flow.error().unwrap();
        assert_eq!(error.error, GuestError::InsufficientCredits);
        assert!(error.actions.contains(&RecoveryAction::SignUp));
    }

    #[tokio::test]
    async fn test_rejected_token_on_submit_clears_credentials() {
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            analyze_response: Some(Err(GuestError::SessionInvalid)),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());
        flow.bootstrap().await;
        flow.form = filled_form();

        flow.submit().await;

        assert_eq!(flow.step(), FlowStep::Analyze);
        assert!(flow.session_token().is_none());
        assert!(flow.store.get().is_none());
    }

    #[tokio::test]
    async fn test_submit_is_noop_while_gate_closed() {
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());
        flow.bootstrap().await;

        flow.submit().await;

        assert_eq!(flow.api.analyze_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.step(), FlowStep::Analyze);
    }

    #[tokio::test]
    async fn test_reset_keeps_session_and_credits() {
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            analyze_response: Some(Ok(success_analysis())),
            ..Default::default()
        };
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), CancellationToken::new());
        flow.bootstrap().await;
        flow.form = filled_form();
        flow.submit().await;
        assert_eq!(flow.step(), FlowStep::Results);

        flow.reset_for_new_analysis();

        assert_eq!(flow.step(), FlowStep::Analyze);
        assert!(flow.result().is_none());
        assert!(flow.form.resume.is_none());
        assert_eq!(flow.credits(), 1);
        assert_eq!(flow.api.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_resume_leaves_rejected_credentials_intact() {
        let api = FakeApi {
            info_response: Some(Err(GuestError::SessionInvalid)),
            create_response: Some(Ok(fresh_session())),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let mut flow = AnalyzeFlow::new(
            api,
            MemoryStore::with(live_credentials()),
            cancel.clone(),
        );

        cancel.cancel();
        flow.bootstrap().await;

        // The stored credentials survive; no recreation happens either.
        assert_eq!(flow.step(), FlowStep::Welcome);
        assert_eq!(flow.store.get().unwrap().guest_token, "tok_stored");
        assert_eq!(flow.api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_flow_never_mutates_state() {
        let api = FakeApi {
            create_response: Some(Ok(fresh_session())),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let mut flow = AnalyzeFlow::new(api, MemoryStore::empty(), cancel.clone());

        cancel.cancel();
        flow.bootstrap().await;

        // The request may still have fired, but the resolution is a no-op.
        assert_eq!(flow.step(), FlowStep::Welcome);
        assert!(flow.error().is_none());
        assert!(flow.session_token().is_none());
    }
}
