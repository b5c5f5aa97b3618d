use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use adreport_client::{
    app_state::AppState,
    config::AppConfig,
    models::{
        import_state::{ImportOutcome, ImportState, Notice, NoticeLevel},
        report::{DateRange, NewSavedReport, ReportQuery, DEFAULT_QUERY_LIMIT},
    },
    services::imports::ImportFile,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adreport", version, about = "Client for the adtech reporting API")]
struct Cli {
    /// Overrides API_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a CSV file and follow the import until it finishes
    Import { file: PathBuf },
    /// List recent import jobs
    Imports,
    /// Number of report rows stored by the server
    Count,
    /// Dashboard summary totals
    Summary,
    /// Available report dimensions and metrics
    Fields,
    /// Run an ad-hoc report
    Query {
        #[command(flatten)]
        report: ReportArgs,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: u32,
    },
    /// Export a report as CSV
    Export {
        #[command(flatten)]
        report: ReportArgs,
        #[arg(short, long, default_value = "report.csv")]
        output: PathBuf,
    },
    /// Manage saved report definitions
    Saved {
        #[command(subcommand)]
        action: SavedCommand,
    },
}

#[derive(Subcommand)]
enum SavedCommand {
    List,
    Save {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        report: ReportArgs,
    },
    Delete { id: String },
}

#[derive(Args)]
struct ReportArgs {
    #[arg(short = 'd', long = "dimension")]
    dimensions: Vec<String>,
    #[arg(short = 'm', long = "metric")]
    metrics: Vec<String>,
    /// First day (YYYY-MM-DD), requires --to
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD), requires --from
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
}

impl ReportArgs {
    fn date_range(&self) -> Option<DateRange> {
        match (self.from, self.to) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Structured logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url;
    }

    if let Some(addr) = &config.metrics_bind_addr {
        let addr: SocketAddr = addr.parse()?;
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        tracing::info!(%addr, "Serving Prometheus metrics");
    }
    describe_metrics();

    tracing::debug!(api_base_url = %config.api_base_url, "Using reporting API");
    let state = AppState::new(config)?;

    match cli.command {
        Command::Import { file } => return follow_import(&state, &file).await,
        Command::Imports => {
            for job in state.api.recent_imports().await? {
                println!(
                    "{}\t{}\t{}%\t{}",
                    job.job_id,
                    job.status,
                    job.progress.min(100),
                    job.created_at.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Count => println!("{}", state.api.record_count().await?),
        Command::Summary => {
            let summary = state.api.summary().await?;
            println!("Total requests:    {}", summary.total_requests);
            println!("Total impressions: {}", summary.total_impressions);
            println!("Total clicks:      {}", summary.total_clicks);
            println!("Total payout:      {:.2}", summary.total_payout);
            println!("Average eCPM:      {:.2}", summary.average_ecpm);
        }
        Command::Fields => {
            println!("Dimensions:");
            for d in state.api.dimensions().await? {
                println!("  {d}");
            }
            println!("Metrics:");
            for m in state.api.metrics().await? {
                println!("  {m}");
            }
        }
        Command::Query { report, page, limit } => {
            let query = ReportQuery::new(report.dimensions.clone(), report.metrics.clone())
                .with_date_range(report.date_range())
                .with_page(page, limit);
            let result = state.api.query(&query).await?;

            let columns: Vec<&String> = query.dimensions.iter().chain(&query.metrics).collect();
            println!(
                "{}",
                columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join("\t")
            );
            for row in &result.data {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| row.get(c.as_str()).map(render_cell).unwrap_or_default())
                    .collect();
                println!("{}", cells.join("\t"));
            }
            println!(
                "-- {} of {} rows (page {}, limit {})",
                result.data.len(),
                result.total,
                result.page,
                result.limit
            );
        }
        Command::Export { report, output } => {
            let query = ReportQuery::for_export(report.dimensions.clone(), report.metrics.clone())
                .with_date_range(report.date_range());
            let csv = state.api.export(&query).await?;
            tokio::fs::write(&output, &csv).await?;
            println!("Wrote {} bytes to {}", csv.len(), output.display());
        }
        Command::Saved { action } => run_saved(&state, action).await?,
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_saved(state: &AppState, action: SavedCommand) -> Result<(), Box<dyn Error>> {
    match action {
        SavedCommand::List => {
            for report in state.api.saved_reports().await? {
                let range = report
                    .date_range
                    .map(|r| format!("{}..{}", r.start, r.end))
                    .unwrap_or_else(|| "all dates".to_string());
                println!(
                    "{}\t{}\t[{}] x [{}]\t{}\t{}",
                    report.id,
                    report.name,
                    report.dimensions.join(", "),
                    report.metrics.join(", "),
                    range,
                    report.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        SavedCommand::Save { name, report } => {
            let new_report = NewSavedReport {
                name,
                date_range: report.date_range(),
                dimensions: report.dimensions,
                metrics: report.metrics,
            };
            let created = state.api.save_report(&new_report).await?;
            println!("Saved report {}", created.id);
        }
        SavedCommand::Delete { id } => {
            state.api.delete_saved_report(&id).await?;
            println!("Deleted report {id}");
        }
    }
    Ok(())
}

/// Submit `path` and print every state change until the job finishes.
async fn follow_import(state: &AppState, path: &Path) -> Result<ExitCode, Box<dyn Error>> {
    let file = ImportFile::from_path(path).await?;
    let poller = state.import_poller();
    let mut states = poller.subscribe();
    tracing::info!(
        file = %path.display(),
        interval_ms = poller.interval().as_millis() as u64,
        "Starting import"
    );

    let renderer = tokio::spawn(async move {
        let mut last_notice: Option<Notice> = None;
        while states.changed().await.is_ok() {
            let snapshot = states.borrow_and_update().clone();
            render_state(&snapshot, &mut last_notice);
        }
    });

    let outcome = match poller.submit(file).await {
        Ok(handle) => {
            tokio::select! {
                outcome = handle.outcome() => outcome,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, stopping import polling");
                    poller.shutdown();
                    ImportOutcome::Cancelled
                }
            }
        }
        // The renderer prints the upload notice.
        Err(_) => ImportOutcome::Cancelled,
    };

    drop(poller);
    let _ = renderer.await;

    Ok(if outcome.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render_state(state: &ImportState, last_notice: &mut Option<Notice>) {
    if let Some(job) = &state.job {
        let mut line = format!(
            "[{}] job {} {} {}%",
            state.phase,
            job.job_id,
            job.status,
            job.percent()
        );
        if let (Some(processed), Some(total)) = (job.processed_records, job.total_records) {
            line.push_str(&format!(" ({processed}/{total} records)"));
        }
        println!("{line}");
        if !job.errors.is_empty() && !state.is_busy() {
            println!("Errors:");
            for error in &job.errors {
                println!("  - {error}");
            }
        }
    } else {
        println!("[{}]", state.phase);
    }

    if state.notice.is_some() && state.notice != *last_notice {
        if let Some(notice) = &state.notice {
            match notice.level {
                NoticeLevel::Success => println!("{}", notice.text),
                NoticeLevel::Error => eprintln!("{}", notice.text),
            }
        }
        *last_notice = state.notice.clone();
    }
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn describe_metrics() {
    metrics::describe_counter!("import_uploads_total", "CSV uploads attempted");
    metrics::describe_counter!("import_upload_failures", "CSV uploads rejected or failed");
    metrics::describe_counter!("import_status_checks_total", "Import status checks issued");
    metrics::describe_counter!(
        "import_status_check_errors",
        "Import status checks that failed and stopped polling"
    );
    metrics::describe_counter!("import_jobs_completed", "Import jobs observed as completed");
    metrics::describe_counter!("import_jobs_failed", "Import jobs observed as failed");
    metrics::describe_histogram!(
        "import_duration_seconds",
        "Time from upload acceptance to observed completion"
    );
}
