use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::entities::customer::Customer;
use crate::domain::entities::invoice::{Invoice, InvoiceStats};
use crate::domain::entities::project::{Project, ProjectStats};
use crate::domain::entities::query::SupportQuery;
use crate::domain::entities::record::Record;
use crate::domain::entities::session::Credential;
use crate::infra::gemini::client::GeminiClient;
use crate::infra::import::snapshot::Snapshot;
use crate::infra::memory::store::InMemoryStore;
use crate::infra::sqlite::repo::SqliteSessionStore;
use crate::ui::state::page_state::PageController;
use crate::usecase::ports::ai::AiAssistant;
use crate::usecase::ports::repo::{RecordStore, StoreError};
use crate::usecase::ports::session::SessionStorage;
use crate::usecase::services::ai_service::AssistantService;
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::rate_gate::RateGate;
use crate::usecase::services::request_slot::{RequestError, RequestSlot};
use crate::usecase::services::session_service::{SessionContext, SessionError};

/// Everything a running dashboard holds: one controller per management
/// page, the login session and the AI assistant.
pub struct AppState {
    pub customers: PageController<Customer>,
    pub invoices: PageController<Invoice>,
    pub projects: PageController<Project>,
    pub queries: PageController<SupportQuery>,
    pub session: SessionContext,
    pub assistant: Arc<dyn AiAssistant>,
    pub rate_gate: Arc<RateGate>,
    ai_slot: RequestSlot,
    import: ImportService,
}

impl AppState {
    pub fn new(
        page_size: usize,
        session: SessionContext,
        assistant: Arc<dyn AiAssistant>,
        rate_gate: Arc<RateGate>,
    ) -> Self {
        Self {
            customers: PageController::new(empty_store::<Customer>(), page_size),
            invoices: PageController::new(empty_store::<Invoice>(), page_size),
            projects: PageController::new(empty_store::<Project>(), page_size),
            queries: PageController::new(empty_store::<SupportQuery>(), page_size),
            session,
            assistant,
            rate_gate,
            ai_slot: RequestSlot::new("ai-panel"),
            import: ImportService::new(),
        }
    }

    /// Wires the SQLite session file and the Gemini client from `config`.
    pub fn from_config(config: &AppConfig, now: DateTime<Utc>) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = Arc::new(
            SqliteSessionStore::open(config.session_db_path())
                .context("failed to open session store")?,
        );
        let session = SessionContext::init(
            storage,
            Credential::demo_accounts(),
            config.session_ttl(),
            now,
        )
        .context("failed to restore session")?;

        let rate_gate = Arc::new(RateGate::new(config.ai_min_interval));
        let client = GeminiClient::new(config.gemini_api_key.clone())?
            .with_models(config.gemini_model.clone(), config.gemini_insights_model.clone())
            .with_base_url(config.gemini_base_url.clone());
        let assistant: Arc<dyn AiAssistant> =
            Arc::new(AssistantService::new(client, Arc::clone(&rate_gate)));

        Ok(Self::new(config.page_size, session, assistant, rate_gate))
    }

    /// Replaces all four collections.
    pub fn install(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        self.customers.store().seed(snapshot.customers)?;
        self.invoices.store().seed(snapshot.invoices)?;
        self.projects.store().seed(snapshot.projects)?;
        self.queries.store().seed(snapshot.queries)?;
        Ok(())
    }

    pub async fn load(&self, path: &Path) -> Result<usize, crate::error::Error> {
        let snapshot = self.import.load(path).await?;
        let count = snapshot.record_count();
        self.install(snapshot)?;
        info!(records = count, "workspace loaded");
        Ok(count)
    }

    /// Drops a dataset load still in flight.
    pub fn cancel_load(&self) {
        self.import.cancel();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            customers: self.customers.store().list(),
            invoices: self.invoices.store().list(),
            projects: self.projects.store().list(),
            queries: self.queries.store().list(),
        }
    }

    /// Stats over the invoices passing the invoice page's filters.
    pub fn invoice_stats(&self, now: DateTime<Utc>) -> InvoiceStats {
        InvoiceStats::from_invoices(&self.invoices.matching(now))
    }

    /// Stats over the projects passing the project page's filters.
    pub fn project_stats(&self, now: DateTime<Utc>) -> ProjectStats {
        ProjectStats::from_projects(&self.projects.matching(now), now)
    }

    /// Runs an assistant call in the AI panel slot; a newer call cancels it.
    pub async fn run_ai<F, T>(&self, work: F) -> Result<T, RequestError>
    where
        F: Future<Output = T>,
    {
        self.ai_slot.run(work).await
    }

    /// Drops the assistant call in flight; it resolves as cancelled.
    pub fn cancel_ai(&self) {
        self.ai_slot.cancel();
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.session.logout()
    }
}

fn empty_store<R: Record>() -> Arc<dyn RecordStore<R>> {
    Arc::new(InMemoryStore::<R>::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::filter::Predicate;
    use crate::domain::entities::invoice::InvoiceStatus;
    use crate::domain::entities::project::{ProjectDraft, ProjectStatus};
    use crate::domain::entities::record::RecordId;
    use crate::infra::memory::session::MemorySessionStorage;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().expect("timestamp should parse")
    }

    fn state() -> AppState {
        let session = SessionContext::init(
            Arc::new(MemorySessionStorage::default()),
            Credential::demo_accounts(),
            chrono::Duration::hours(24),
            now(),
        )
        .expect("session should init");
        let rate_gate = Arc::new(RateGate::new(Duration::ZERO));
        let client = GeminiClient::new("").expect("client should build");
        let assistant: Arc<dyn AiAssistant> =
            Arc::new(AssistantService::new(client, Arc::clone(&rate_gate)));
        AppState::new(10, session, assistant, rate_gate)
    }

    fn invoice(id: u64, customer: &str, amount: f64, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: RecordId(id),
            invoice_number: format!("INV-2024-{id:03}"),
            customer: customer.to_string(),
            customer_email: String::new(),
            amount,
            status,
            due_date: now(),
            created_at: now(),
            items: Vec::new(),
            notes: String::new(),
            updated_at: None,
        }
    }

    fn project(id: u64, status: ProjectStatus, progress: i32, deadline: NaiveDate) -> Project {
        Project::from_draft(
            RecordId(id),
            ProjectDraft {
                name: format!("Project {id}"),
                client: "Acme Corporation".to_string(),
                status,
                progress,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                deadline: Some(deadline),
                ..ProjectDraft::default()
            },
            now(),
        )
    }

    fn snapshot() -> Snapshot {
        let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).expect("valid date");
        Snapshot {
            invoices: vec![
                invoice(1, "Acme Corporation", 1000.0, InvoiceStatus::Paid),
                invoice(2, "Acme Corporation", 250.0, InvoiceStatus::Overdue),
                invoice(3, "Startup Hub", 4000.0, InvoiceStatus::Sent),
            ],
            projects: vec![
                project(1, ProjectStatus::Active, 60, day(3, 1)),
                project(2, ProjectStatus::Planning, 0, day(12, 1)),
            ],
            ..Snapshot::default()
        }
    }

    #[test]
    fn invoice_stats_follow_the_invoice_filters() {
        let mut state = state();
        state.install(snapshot()).expect("install should succeed");

        assert_eq!(state.invoice_stats(now()).total, 3);

        state.invoices.set_filter("search", Predicate::search("acme"));
        let stats = state.invoice_stats(now());

        assert_eq!(stats.total, 2);
        assert_eq!(stats.paid_amount, 1000.0);
        assert_eq!(stats.overdue_amount, 250.0);
        assert_eq!(stats.pending_amount, 0.0);
    }

    #[test]
    fn project_stats_count_overdue_work() {
        let state = state();
        state.install(snapshot()).expect("install should succeed");

        let stats = state.project_stats(now());

        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.planning, 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.average_progress, 30);
        assert_eq!(
            state.projects.store().get(RecordId(2)).map(|p| p.status),
            Some(ProjectStatus::Planning)
        );
    }

    #[test]
    fn snapshot_returns_installed_records() {
        let state = state();
        let installed = snapshot();
        state.install(installed.clone()).expect("install should succeed");

        let taken = state.snapshot();

        assert_eq!(taken.invoices, installed.invoices);
        assert_eq!(taken.record_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ai_resolves_pending_call_as_cancelled() {
        let state = state();

        let (result, ()) = tokio::join!(
            state.run_ai(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late summary"
            }),
            async {
                tokio::task::yield_now().await;
                state.cancel_ai();
            }
        );

        assert_eq!(result, Err(RequestError::Cancelled));
    }
}
