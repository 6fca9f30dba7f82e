use anyhow::{bail, Context};
use clap::Parser;
use khatt::review::{self, Command};
use khatt::{
    BatchProgress, ExportMode, ExportService, ExtractionService, HttpClient, LocalExport,
    LocalExtraction, Phase, Session,
};
use khatt_core::{Config, ImageKind, ImageUpload};
use khatt_extract::GeminiBackend;
use khatt_sheets::exporter_from_settings;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands, RunArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config =
        Config::discover(args.config.as_deref()).context("Failed to load configuration")?;
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.client.image_timeout_secs));

    let (extraction, export): (Box<dyn ExtractionService>, Option<Box<dyn ExportService>>) =
        if args.local {
            let backend = GeminiBackend::from_settings(&config.extraction)
                .context("Gemini is not configured")?;
            let export = match exporter_from_settings(&config.sheets) {
                Ok(exporter) => {
                    Some(Box::new(LocalExport::new(exporter)) as Box<dyn ExportService>)
                }
                Err(e) => {
                    println!("Spreadsheet export unavailable: {e}");
                    None
                }
            };
            (Box::new(LocalExtraction::new(backend)), export)
        } else {
            let client = HttpClient::new(args.server.unwrap_or(config.client.server_url));
            tracing::info!(server = client.base_url(), "Using khatt server");
            (Box::new(client.clone()), Some(Box::new(client) as Box<dyn ExportService>))
        };

    let mut session = Session::new();
    let mut uploads = Vec::new();
    for path in &args.files {
        match read_upload(path).await {
            Ok(upload) => uploads.push(upload),
            Err(e) => println!("✗ {e:#}"),
        }
    }
    let intake = session.add_files(uploads);
    for rejection in &intake.rejected {
        println!("✗ {rejection}");
    }
    if session.phase() != Phase::Preview {
        bail!("No usable images");
    }
    println!("{} image(s) queued", intake.accepted.len());

    let (tx, mut rx) = mpsc::channel::<BatchProgress>(64);
    let printer = tokio::spawn(async move {
        while let Some(p) = rx.recv().await {
            if !p.current.is_empty() {
                println!("[{:>3}%] {}/{} {}", p.percent(), p.processed, p.total, p.current);
            }
        }
    });
    let report = session.process(extraction.as_ref(), timeout, Some(tx)).await;
    let _ = printer.await;

    for outcome in report.outcomes.iter().filter(|o| !o.success) {
        println!(
            "✗ {}: {}",
            outcome.file_name,
            outcome.error.as_deref().unwrap_or("failed")
        );
    }
    let stats = session.stats();
    println!(
        "Done: {} record(s) from {} of {} image(s), {} failed",
        stats.records, stats.completed, stats.images, stats.errors
    );

    review_loop(&mut session, export.as_deref()).await
}

async fn read_upload(path: &Path) -> anyhow::Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("{}: cannot read file", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = ImageKind::from_extension(&file_name)
        .map(ImageKind::mime_type)
        .unwrap_or("application/octet-stream");
    Ok(ImageUpload::new(file_name, mime, bytes))
}

fn print_records(session: &Session) {
    for record in session.records().iter() {
        let short: String = record.id.as_str().chars().take(8).collect();
        println!("{short}  {:<14}  {}", record.national_id, record.name);
    }
    let stats = session.stats();
    if stats.suspicious > 0 {
        println!("{} record(s) have a national ID that is not 14 digits", stats.suspicious);
    }
}

async fn review_loop(
    session: &mut Session,
    export: Option<&dyn ExportService>,
) -> anyhow::Result<()> {
    print_records(session);
    println!("{}", review::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match review::parse_command(&line) {
            Ok(c) => c,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::List => print_records(session),
            Command::Edit { id, national_id, name } => {
                match review::resolve_id(&id, session.records().iter().map(|r| &r.id)) {
                    Ok(id) => {
                        session.edit(&id, &name, &national_id);
                        println!("Updated");
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Command::Delete { id } => {
                match review::resolve_id(&id, session.records().iter().map(|r| &r.id)) {
                    Ok(id) => {
                        session.delete(&id);
                        println!("Deleted");
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Command::Create { title } => {
                export_with(session, export, ExportMode::CreateNew { title }).await
            }
            Command::Append { sheet_url } => {
                export_with(session, export, ExportMode::AppendTo { sheet_url }).await
            }
            Command::Reset => {
                session.reset();
                println!("Session cleared");
                return Ok(());
            }
            Command::Help => println!("{}", review::HELP),
            Command::Quit => return Ok(()),
        }
    }
}

async fn export_with(
    session: &mut Session,
    export: Option<&dyn ExportService>,
    mode: ExportMode,
) {
    let Some(service) = export else {
        println!("Spreadsheet export is not configured");
        return;
    };
    match session.export(service, mode).await {
        Ok(url) => println!("✓ {url}"),
        Err(e) => println!("✗ {e}"),
    }
}
