use clap::Parser;
use console::style;
use metascrub::scrubber::{BatchReport, RunReport, run};
use metascrub::{ExtensionFilter, ScrubConfig};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "metascrub",
    version,
    about = "Elimina metadata de documentos Office/OpenDocument, imágenes y PDF"
)]
struct Cli {
    /// Archivo o directorio a procesar
    path: PathBuf,
    /// No conservar la copia .bak del original
    #[arg(long)]
    no_backup: bool,
    /// Solo mostrar los archivos que se procesarían
    #[arg(long)]
    dry_run: bool,
    /// Trabajadores concurrentes (mínimo 2; por defecto, los núcleos disponibles)
    #[arg(long)]
    workers: Option<usize>,
    /// Habilitar la limpieza de PDF
    #[arg(long)]
    with_pdf: bool,
    /// Procesar solo estas extensiones (ej. docx,xlsx,pdf)
    #[arg(long, default_value = "")]
    include: String,
    /// Excluir estas extensiones
    #[arg(long, default_value = "")]
    exclude: String,
    /// Imprimir el resultado como JSON
    #[arg(long)]
    json: bool,
    /// Terminar con código 1 si algún archivo falla
    #[arg(long)]
    strict: bool,
    /// Más detalle en los registros (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {}", style("Error:").red().bold(), error);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: &Cli) -> Result<ExitCode, Box<dyn Error>> {
    let defaults = ScrubConfig::default();
    let config = ScrubConfig {
        backup: !cli.no_backup,
        dry_run: cli.dry_run,
        workers: cli.workers.unwrap_or(defaults.workers),
        with_pdf: cli.with_pdf,
        filter: ExtensionFilter::parse(&cli.include, &cli.exclude)?,
        ..defaults
    };

    let report = run(&cli.path, &config)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }

    let failed = matches!(&report, RunReport::Completed(batch) if batch.failures > 0);
    if failed && cli.strict {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn render_report(report: &RunReport) {
    match report {
        RunReport::DryRun { candidates } if candidates.is_empty() => {
            println!("{}", style("No se encontraron archivos para procesar.").yellow());
        }
        RunReport::DryRun { candidates } => {
            println!(
                "{}",
                style(format!("Se procesarían {} archivos:", candidates.len())).cyan()
            );
            for path in candidates {
                println!("{}", style(format!("│ {}", path.display())).dim());
            }
        }
        RunReport::Completed(batch) => render_batch(batch),
    }
}

fn render_batch(batch: &BatchReport) {
    if batch.successes + batch.failures == 0 {
        println!("{}", style("No se encontraron archivos para procesar.").yellow());
        return;
    }

    for failed in &batch.failed {
        println!("{}", style(format!("│ [FALLO] {}", failed.error)).red());
    }
    if batch.degraded > 0 {
        println!(
            "{}",
            style(format!(
                "│ {} archivos se reemplazaron por copia no atómica (original en uso)",
                batch.degraded
            ))
            .yellow()
        );
    }

    println!(
        "{}",
        style(format!(
            "Proceso completado: {} correctos, {} fallidos.",
            batch.successes, batch.failures
        ))
        .green()
        .bold()
    );
}
