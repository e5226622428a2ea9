use std::future::Future;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use bizdesk::config::AppConfig;
use bizdesk::domain::entities::dataset::{SortDirection, SortSpec};
use bizdesk::domain::entities::filter::Predicate;
use bizdesk::domain::entities::record::{Record, RecordId};
use bizdesk::domain::entities::session::LoginForm;
use bizdesk::infra::export::file::write_artifact;
use bizdesk::infra::import::snapshot::{save_snapshot, Snapshot};
use bizdesk::logging::init_tracing;
use bizdesk::ui::state::app_state::AppState;
use bizdesk::ui::state::page_state::PageController;
use bizdesk::usecase::pipeline::export;
use bizdesk::usecase::ports::ai::{AiError, SummaryRequest};

const API_KEY_URL: &str = "https://aistudio.google.com/app/apikey";

#[derive(Parser)]
#[command(
    name = "bizdesk",
    about = "Customers, invoices, projects and support queries from the command line",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Record snapshot to read (defaults to records.json in the data dir)
    #[arg(long, global = true, value_name = "FILE")]
    data: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a directory account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Keep the session past the usual expiry
        #[arg(long)]
        remember_me: bool,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List one page of records
    List(ListArgs),
    /// Write matching records to a CSV file
    Export {
        #[command(flatten)]
        query: QueryArgs,
        /// Only these ids (default: every matching record)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u64>,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete records by id and save the snapshot
    Delete {
        #[arg(value_enum)]
        kind: Kind,
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
        /// Must be `DELETE`
        #[arg(long)]
        confirm: String,
    },
    /// Invoice or project figures over the matching records
    Stats {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// AI summary of one invoice
    SummarizeInvoice { id: u64 },
    /// AI summary of a support query's notes
    SummarizeNotes { id: u64 },
    /// AI business insights over all invoices
    Insights,
    /// AI response suggestions for a support query
    Suggest { id: u64 },
    /// AI sentiment analysis of a message
    Sentiment { text: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Customers,
    Invoices,
    Projects,
    Queries,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(value_enum)]
    kind: Kind,
    /// Free-text search over the searchable fields
    #[arg(long, short)]
    search: Option<String>,
    /// Exact match, e.g. `status=paid`
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    equals: Vec<String>,
    /// Date window, e.g. `due_date=last-month`
    #[arg(long, value_name = "FIELD=TOKEN")]
    date: Vec<String>,
    /// Numeric range, e.g. `amount=100..500`
    #[arg(long, value_name = "FIELD=MIN..MAX")]
    range: Vec<String>,
    /// Sort field
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    desc: bool,
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    query: QueryArgs,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    per_page: Option<usize>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_level);

    let now = Utc::now();
    let mut state = AppState::from_config(&config, now)?;
    let data_path = cli.data.clone().unwrap_or_else(|| config.snapshot_path());

    match cli.command {
        Commands::Login {
            email,
            password,
            remember_me,
        } => {
            let session = state.session.login(
                LoginForm {
                    email,
                    password,
                    remember_me,
                },
                now,
            )?;
            println!("Signed in as {} ({})", session.email, session.role);
        }
        Commands::Logout => {
            state.logout()?;
            println!("Signed out");
        }
        Commands::Whoami => match state.session.current() {
            Some(session) => println!(
                "{} ({}), signed in {}",
                session.email,
                session.role,
                session.login_time.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!("Not signed in"),
        },
        command => {
            if !state.session.check(now)? {
                return Err(anyhow!("not signed in; run `bizdesk login` first"));
            }
            load_records(&state, &data_path).await?;
            run_records_command(&mut state, command, &data_path, now).await?;
        }
    }

    Ok(())
}

async fn load_records(state: &AppState, path: &Path) -> Result<()> {
    if !path.exists() {
        warn!(path = %path.display(), "no record snapshot found; starting empty");
        state.install(Snapshot::default())?;
        return Ok(());
    }
    cancel_on_interrupt(state.load(path), || state.cancel_load()).await?;
    Ok(())
}

/// Runs `work`, calling `cancel` on Ctrl-C so the request settles as
/// cancelled instead of being dropped mid-flight.
async fn cancel_on_interrupt<F: Future>(work: F, cancel: impl FnOnce()) -> F::Output {
    tokio::pin!(work);
    tokio::select! {
        output = &mut work => output,
        interrupted = tokio::signal::ctrl_c() => {
            if interrupted.is_ok() {
                warn!("interrupted; cancelling request");
                cancel();
            }
            work.await
        }
    }
}

async fn run_records_command(
    state: &mut AppState,
    command: Commands,
    data_path: &Path,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        Commands::List(args) => match args.query.kind {
            Kind::Customers => list(&mut state.customers, &args, now),
            Kind::Invoices => list(&mut state.invoices, &args, now),
            Kind::Projects => list(&mut state.projects, &args, now),
            Kind::Queries => list(&mut state.queries, &args, now),
        },
        Commands::Export { query, ids, out } => {
            let path = match query.kind {
                Kind::Customers => export_records(&mut state.customers, &query, &ids, &out, now),
                Kind::Invoices => export_records(&mut state.invoices, &query, &ids, &out, now),
                Kind::Projects => export_records(&mut state.projects, &query, &ids, &out, now),
                Kind::Queries => export_records(&mut state.queries, &query, &ids, &out, now),
            }?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Delete { kind, ids, confirm } => {
            let (deleted, missing) = match kind {
                Kind::Customers => delete_records(&mut state.customers, &ids, &confirm, now),
                Kind::Invoices => delete_records(&mut state.invoices, &ids, &confirm, now),
                Kind::Projects => delete_records(&mut state.projects, &ids, &confirm, now),
                Kind::Queries => delete_records(&mut state.queries, &ids, &confirm, now),
            }?;
            save_snapshot(data_path, &state.snapshot())?;
            println!("Deleted {deleted} record(s)");
            if !missing.is_empty() {
                eprintln!("Skipped missing ids: {}", join_ids(&missing));
            }
            Ok(())
        }
        Commands::Stats { query } => match query.kind {
            Kind::Invoices => {
                apply_query(&mut state.invoices, &query)?;
                let stats = state.invoice_stats(now);
                println!("Invoices: {} total", stats.total);
                println!(
                    "  draft {} / sent {} / paid {} / overdue {}",
                    stats.draft, stats.sent, stats.paid, stats.overdue
                );
                println!("Amount:  ${:.2}", stats.total_amount);
                println!(
                    "  paid ${:.2} / pending ${:.2} / overdue ${:.2}",
                    stats.paid_amount, stats.pending_amount, stats.overdue_amount
                );
                Ok(())
            }
            Kind::Projects => {
                apply_query(&mut state.projects, &query)?;
                let stats = state.project_stats(now);
                println!("Projects: {} total", stats.total);
                println!(
                    "  active {} / planning {} / completed {} / overdue {}",
                    stats.active, stats.planning, stats.completed, stats.overdue
                );
                println!("Average progress: {}%", stats.average_progress);
                Ok(())
            }
            Kind::Customers | Kind::Queries => {
                Err(anyhow!("stats are kept for invoices and projects only"))
            }
        },
        Commands::SummarizeInvoice { id } => {
            let invoice = find(state.invoices.store().get(RecordId(id)), "invoice", id)?;
            let request = SummaryRequest::Invoice(Box::new(invoice));
            let summary = ask(state, state.assistant.generate_summary(request)).await?;
            println!("{summary}");
            Ok(())
        }
        Commands::SummarizeNotes { id } => {
            let query = find(state.queries.store().get(RecordId(id)), "query", id)?;
            let request = SummaryRequest::QueryNotes(query.notes);
            let summary = ask(state, state.assistant.generate_summary(request)).await?;
            println!("{summary}");
            Ok(())
        }
        Commands::Insights => {
            let request = SummaryRequest::Business(state.invoices.store().list());
            let insights = ask(state, state.assistant.generate_summary(request)).await?;
            println!("{insights}");
            Ok(())
        }
        Commands::Suggest { id } => {
            let query = find(state.queries.store().get(RecordId(id)), "query", id)?;
            let suggestions =
                ask(state, state.assistant.generate_response_suggestions(&query)).await?;
            for (index, suggestion) in suggestions.iter().enumerate() {
                println!("{}. {suggestion}", index + 1);
            }
            Ok(())
        }
        Commands::Sentiment { text } => {
            let report = ask(state, state.assistant.analyze_sentiment(&text)).await?;
            println!("Sentiment:      {}", report.sentiment);
            println!("Confidence:     {}", report.confidence);
            println!("Emotions:       {}", report.emotions);
            println!("Urgency:        {}", report.urgency);
            println!("Recommendation: {}", report.recommendation);
            Ok(())
        }
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => Ok(()),
    }
}

fn find<R>(record: Option<R>, what: &str, id: u64) -> Result<R> {
    record.ok_or_else(|| anyhow!("no {what} with id {id}"))
}

async fn ask<T>(
    state: &AppState,
    work: impl std::future::Future<Output = Result<T, AiError>>,
) -> Result<T> {
    if !state.assistant.is_available() {
        eprintln!("The AI assistant needs a Gemini API key.");
        eprintln!(
            "Create one at {API_KEY_URL} and set GEMINI_API_KEY in your environment or .env file."
        );
        return Err(AiError::Unavailable.into());
    }
    let result = cancel_on_interrupt(state.run_ai(work), || state.cancel_ai()).await?;
    Ok(result?)
}

fn apply_query<R: Record>(
    controller: &mut PageController<R>,
    query: &QueryArgs,
) -> Result<()> {
    if let Some(search) = &query.search {
        controller.set_filter("search", Predicate::search(search.as_str()));
    }
    for raw in &query.equals {
        let (field, value) = split_pair(raw)?;
        controller.set_filter(format!("where:{field}"), Predicate::equals(field, value));
    }
    for raw in &query.date {
        let (field, token) = split_pair(raw)?;
        controller.set_filter(format!("date:{field}"), Predicate::date_token(field, token));
    }
    for raw in &query.range {
        let (field, bounds) = split_pair(raw)?;
        let (min, max) = bounds.split_once("..").unwrap_or((bounds, ""));
        let min = Some(min.trim()).filter(|value| !value.is_empty());
        let max = Some(max.trim()).filter(|value| !value.is_empty());
        controller.set_filter(
            format!("range:{field}"),
            Predicate::number_range(field, min, max),
        );
    }
    if let Some(key) = &query.sort {
        let direction = if query.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        controller.set_sort(SortSpec::new(key.as_str(), direction));
    }
    Ok(())
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim(), value.trim()))
        .filter(|(field, _)| !field.is_empty())
        .with_context(|| format!("expected FIELD=VALUE, got `{raw}`"))
}

fn list<R: Record>(
    controller: &mut PageController<R>,
    args: &ListArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    apply_query(controller, &args.query)?;
    if let Some(per_page) = args.per_page {
        controller.set_items_per_page(per_page);
    }
    controller.set_page(args.page);
    let view = controller.view(now);

    let schema = R::schema();
    println!("{}", schema.export_headers.join("\t"));
    for record in &view.window.records {
        println!("{}", record.export_row().join("\t"));
    }

    let (from, to) = view.window.display_range();
    println!();
    println!(
        "Showing {from}-{to} of {} (page {} of {}, {} filter(s) active)",
        view.window.total_items,
        view.current_page,
        view.window.display_total_pages(),
        view.active_filters
    );
    Ok(())
}

fn export_records<R: Record>(
    controller: &mut PageController<R>,
    query: &QueryArgs,
    ids: &[u64],
    out: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    apply_query(controller, query)?;
    let artifact = if ids.is_empty() {
        export::to_csv(&controller.matching(now), now)?
    } else {
        for id in ids {
            controller.toggle_selected(RecordId(*id));
        }
        let outcome = controller.bulk_export(now)?;
        if !outcome.failures.is_empty() {
            eprintln!("Skipped missing ids: {}", join_ids(&outcome.failures));
        }
        outcome
            .export
            .ok_or_else(|| anyhow!("bulk export produced no artifact"))?
    };
    write_artifact(out, &artifact)
}

/// Returns the number deleted and the ids that were not found.
fn delete_records<R: Record>(
    controller: &mut PageController<R>,
    ids: &[u64],
    confirm: &str,
    now: DateTime<Utc>,
) -> Result<(usize, Vec<RecordId>)> {
    for id in ids {
        controller.toggle_selected(RecordId(*id));
    }
    let outcome = controller
        .bulk_delete(confirm, now)?
        .ok_or_else(|| anyhow!("type --confirm DELETE to delete {} record(s)", ids.len()))?;
    Ok((outcome.affected.len(), outcome.failures))
}

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(|id| id.0.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
