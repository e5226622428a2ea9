use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rusqlite::Connection;

use crate::domain::entities::customer::{Customer, CustomerDraft, CustomerStatus};
use crate::domain::entities::dataset::{PageState, SortSpec};
use crate::domain::entities::edit::BulkOp;
use crate::domain::entities::filter::{FilterSet, Predicate};
use crate::domain::entities::invoice::{Invoice, InvoiceDraft, InvoiceStatus, LineItemDraft};
use crate::domain::entities::record::{Record, RecordId};
use crate::domain::entities::session::{Credential, LoginForm};
use crate::infra::gemini::client::GeminiClient;
use crate::infra::import::snapshot::{load_snapshot, save_snapshot, Snapshot};
use crate::infra::memory::store::InMemoryStore;
use crate::infra::sqlite::queries::{get_value, remove_value, set_value};
use crate::infra::sqlite::repo::SqliteSessionStore;
use crate::infra::sqlite::schema::init_db;
use crate::ui::state::page_state::PageController;
use crate::usecase::pipeline::{bulk, filter, paginate, sort};
use crate::usecase::ports::ai::{AiAssistant, AiError, SummaryRequest};
use crate::usecase::ports::repo::RecordStore;
use crate::usecase::ports::session::{SessionStorage, SESSION_KEY, TOKEN_KEY};
use crate::usecase::services::ai_service::AssistantService;
use crate::usecase::services::rate_gate::RateGate;
use crate::usecase::services::session_service::{SessionContext, DEFAULT_SESSION_TTL_HOURS};

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("bizdesk-{prefix}-{nanos}"))
}

fn now() -> DateTime<Utc> {
    "2024-06-15T12:00:00Z".parse().expect("timestamp should parse")
}

fn customer(id: u64, name: &str, status: CustomerStatus, revenue: f64) -> Customer {
    let mut customer = Customer::from_draft(
        RecordId(id),
        CustomerDraft {
            name: name.to_string(),
            company: format!("{name} Ltd"),
            email: format!("c{id}@example.com"),
            phone: "555-0100".to_string(),
            industry: if id % 2 == 0 { "retail" } else { "technology" }.to_string(),
            status,
            ..CustomerDraft::default()
        },
        now(),
    );
    customer.total_revenue = revenue;
    customer
}

fn invoice(id: u64, amount: f64) -> Invoice {
    Invoice::from_draft(
        RecordId(id),
        InvoiceDraft {
            invoice_number: format!("INV-{id:03}"),
            customer: "Acme Corporation".to_string(),
            customer_email: "billing@acme.com".to_string(),
            status: InvoiceStatus::Sent,
            due_date: chrono::NaiveDate::from_ymd_opt(2024, 7, 1),
            items: vec![LineItemDraft {
                description: "Hosting".to_string(),
                quantity: 1.0,
                rate: amount,
            }],
            ..InvoiceDraft::default()
        },
        now(),
    )
}

fn ids<R: Record>(records: &[R]) -> Vec<u64> {
    records.iter().map(|record| record.id().0).collect()
}

#[test]
fn init_db_creates_session_table() {
    let temp_dir = unique_test_dir("init-db");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("session.sqlite");

    let result = init_db(&db_path);

    assert!(result.is_ok(), "init_db should succeed: {result:?}");
    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'session_kv'",
            [],
            |row| row.get(0),
        )
        .expect("should query sqlite_master");
    assert_eq!(table_count, 1);
}

#[test]
fn session_values_upsert_and_delete() {
    let db_path = unique_test_dir("session-kv").join("session.sqlite");
    init_db(&db_path).expect("init_db should succeed");

    set_value(&db_path, TOKEN_KEY, "first").expect("set should succeed");
    set_value(&db_path, TOKEN_KEY, "second").expect("upsert should succeed");
    assert_eq!(
        get_value(&db_path, TOKEN_KEY).expect("get should succeed"),
        Some("second".to_string())
    );

    remove_value(&db_path, TOKEN_KEY).expect("remove should succeed");
    assert_eq!(get_value(&db_path, TOKEN_KEY).expect("get should succeed"), None);
}

#[test]
fn sqlite_session_survives_reopen() {
    let db_path = unique_test_dir("session-reopen").join("session.sqlite");
    let login_at = now();
    {
        let storage: Arc<dyn SessionStorage> =
            Arc::new(SqliteSessionStore::open(db_path.clone()).expect("store should open"));
        let mut session = SessionContext::init(
            storage,
            Credential::demo_accounts(),
            Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            login_at,
        )
        .expect("init should succeed");
        session
            .login(
                LoginForm {
                    email: "admin@erpcrm.com".to_string(),
                    password: "admin123".to_string(),
                    remember_me: false,
                },
                login_at,
            )
            .expect("login should succeed");
    }

    let storage = Arc::new(SqliteSessionStore::open(db_path).expect("store should reopen"));
    let restored = SessionContext::init(
        storage.clone(),
        Credential::demo_accounts(),
        Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        login_at + Duration::hours(1),
    )
    .expect("init should succeed");

    assert_eq!(restored.current().map(|s| s.email.as_str()), Some("admin@erpcrm.com"));
    assert!(storage.get(SESSION_KEY).expect("get should succeed").is_some());
}

#[test]
fn snapshot_round_trips_through_disk() {
    let path = unique_test_dir("snapshot").join("records.json");
    let snapshot = Snapshot {
        customers: vec![customer(1, "Ann Lee", CustomerStatus::Active, 1200.0)],
        invoices: vec![invoice(7, 450.0)],
        ..Snapshot::default()
    };

    save_snapshot(&path, &snapshot).expect("save should succeed");
    let loaded = load_snapshot(&path).expect("load should succeed");

    assert_eq!(loaded, snapshot);
}

#[test]
fn filter_sort_paginate_scenario() {
    let records = vec![
        customer(1, "One", CustomerStatus::Active, 100.0),
        customer(2, "Two", CustomerStatus::Inactive, 50.0),
        customer(3, "Three", CustomerStatus::Active, 75.0),
    ];

    let filters = FilterSet::new().with("status", Predicate::equals("status", "active"));
    let filtered = filter::apply(&records, &filters, now());
    assert_eq!(ids(&filtered), vec![1, 3]);

    let sorted = sort::sort(&filtered, &SortSpec::asc("total_revenue"));
    assert_eq!(ids(&sorted), vec![3, 1]);

    let window = paginate::paginate(&sorted, PageState::new(1, 1));
    assert_eq!(ids(&window.records), vec![3]);
    assert_eq!(window.total_pages, 2);
}

#[test]
fn page_past_the_end_is_an_empty_window() {
    let records: Vec<Customer> = (1..=5)
        .map(|id| customer(id, "Ann", CustomerStatus::Active, 10.0))
        .collect();

    let window = paginate::paginate(&records, PageState::new(999, 10));

    assert!(window.records.is_empty());
    assert_eq!(window.total_pages, 1);
}

#[test]
fn bulk_delete_reports_missing_ids() {
    let store = vec![invoice(1, 10.0), invoice(2, 20.0)];

    let outcome = bulk::apply(
        &BulkOp::Delete,
        &[RecordId(1), RecordId(2), RecordId(999)],
        &store,
        now(),
    )
    .expect("bulk delete should succeed");

    assert!(outcome.updated_store.is_empty());
    assert_eq!(outcome.failures, vec![RecordId(999)]);
}

#[test]
fn selection_is_cleared_when_page_size_changes() {
    let store: Arc<dyn RecordStore<Customer>> = Arc::new(
        InMemoryStore::with_records(
            (1..=30)
                .map(|id| customer(id, "Ann", CustomerStatus::Active, 1.0))
                .collect(),
        )
        .expect("seed should succeed"),
    );
    let mut controller = PageController::new(store, 10);
    controller.view(now());
    controller.toggle_all_visible(true);
    assert_eq!(controller.selection().len(), 10);

    controller.set_items_per_page(50);

    assert!(controller.selection().is_empty());
}

#[tokio::test]
async fn unavailable_assistant_never_reaches_the_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let client = GeminiClient::new("")
        .expect("client should build")
        .with_base_url(server.url());
    let assistant = AssistantService::new(client, Arc::new(RateGate::default()));

    assert!(!assistant.is_available());
    let result = assistant
        .generate_summary(SummaryRequest::Invoice(Box::new(invoice(1, 10.0))))
        .await;

    assert_eq!(result, Err(AiError::Unavailable));
    mock.assert_async().await;
}

const STATUSES: [CustomerStatus; 3] = [
    CustomerStatus::Active,
    CustomerStatus::Inactive,
    CustomerStatus::Pending,
];
const NAMES: [&str; 5] = ["Ann Lee", "Bob Ray", "Cy Dunn", "Dee Ann", "Eve Bo"];

fn customers_strategy() -> impl Strategy<Value = Vec<Customer>> {
    prop::collection::vec((0..NAMES.len(), 0..STATUSES.len(), 0u32..500), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(index, (name, status, revenue))| {
                customer(index as u64 + 1, NAMES[name], STATUSES[status], f64::from(revenue))
            })
            .collect()
    })
}

fn filters_strategy() -> impl Strategy<Value = FilterSet> {
    (
        prop::option::of(prop::sample::select(vec!["ann", "b", "LEE", "zz"])),
        prop::option::of(0..STATUSES.len()),
        prop::option::of((0u32..300, 200u32..500)),
    )
        .prop_map(|(search, status, revenue)| {
            let mut filters = FilterSet::new();
            if let Some(search) = search {
                filters.set("search", Predicate::search(search));
            }
            if let Some(status) = status {
                filters.set("status", Predicate::equals("status", STATUSES[status].as_str()));
            }
            if let Some((min, max)) = revenue {
                filters.set(
                    "revenue",
                    Predicate::number_range(
                        "total_revenue",
                        Some(min.to_string().as_str()),
                        Some(max.to_string().as_str()),
                    ),
                );
            }
            filters
        })
}

proptest! {
    #[test]
    fn filtering_is_idempotent(records in customers_strategy(), filters in filters_strategy()) {
        let once = filter::apply(&records, &filters, now());
        let twice = filter::apply(&once, &filters, now());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn extra_predicate_never_grows_result(
        records in customers_strategy(),
        filters in filters_strategy()
    ) {
        let base = filter::apply(&records, &filters, now());
        let narrowed = filters.clone().with("industry", Predicate::equals("industry", "retail"));
        let fewer = filter::apply(&records, &narrowed, now());
        prop_assert!(fewer.len() <= base.len());
    }

    #[test]
    fn sort_keeps_ties_in_input_order(records in customers_strategy(), desc in any::<bool>()) {
        let spec = if desc { SortSpec::desc("status") } else { SortSpec::asc("status") };
        let sorted = sort::sort(&records, &spec);
        for pair in sorted.windows(2) {
            if pair[0].status == pair[1].status {
                prop_assert!(pair[0].id < pair[1].id);
            }
        }
    }

    #[test]
    fn amount_sort_is_ordered(
        amounts in prop::collection::vec(0u32..10_000, 0..30),
        desc in any::<bool>()
    ) {
        let invoices: Vec<Invoice> = amounts
            .iter()
            .enumerate()
            .map(|(index, amount)| invoice(index as u64 + 1, f64::from(*amount) + 1.0))
            .collect();
        let spec = if desc { SortSpec::desc("amount") } else { SortSpec::asc("amount") };
        let sorted = sort::sort(&invoices, &spec);
        for pair in sorted.windows(2) {
            if desc {
                prop_assert!(pair[0].amount >= pair[1].amount);
            } else {
                prop_assert!(pair[0].amount <= pair[1].amount);
            }
        }
    }

    #[test]
    fn pages_cover_every_record_once(records in customers_strategy(), per_page in 1usize..12) {
        let total_pages = PageState::new(1, per_page).total_pages(records.len());
        let mut seen = Vec::new();
        for page in 1..=total_pages {
            let window = paginate::paginate(&records, PageState::new(page, per_page));
            prop_assert!(window.records.len() <= per_page);
            seen.extend(ids(&window.records));
        }
        prop_assert_eq!(seen, ids(&records));
    }
}
