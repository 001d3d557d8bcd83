//! Limpieza masiva: descubrimiento de archivos y reparto entre un grupo fijo de trabajadores.

use serde::Serialize;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;
use walkdir::WalkDir;

use crate::config::{ExtensionFilter, ScrubConfig};
use crate::error::ScrubError;

use super::classify::{Classification, ScrubJob, classify, classify_explicit};
use super::constants::MIN_WORKERS;
use super::removal::Scrubber;
use super::replace::CommitOutcome;

/// Resultado de procesar un único archivo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScrubOutcome {
    Success {
        degraded: bool,
        backup: Option<PathBuf>,
    },
    Failure {
        kind: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub enum CleanupEvent {
    Started { total: usize, workers: usize },
    Success { path: PathBuf, degraded: bool },
    Failure { path: PathBuf, error: String },
    Finished { successes: usize, failures: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub kind: String,
    pub error: String,
}

/// Contadores agregados de un lote. `degraded` es un subconjunto de `successes`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub successes: usize,
    pub failures: usize,
    pub degraded: usize,
    pub failed: Vec<FailedFile>,
}

impl BatchReport {
    pub fn counts(&self) -> (usize, usize) {
        (self.successes, self.failures)
    }

    fn record(
        &mut self,
        path: PathBuf,
        outcome: ScrubOutcome,
        sender: Option<&Sender<CleanupEvent>>,
    ) {
        match outcome {
            ScrubOutcome::Success { degraded, .. } => {
                self.successes += 1;
                if degraded {
                    self.degraded += 1;
                }
                emit(sender, CleanupEvent::Success { path, degraded });
            }
            ScrubOutcome::Failure { kind, reason } => {
                self.failures += 1;
                emit(
                    sender,
                    CleanupEvent::Failure {
                        path: path.clone(),
                        error: reason.clone(),
                    },
                );
                self.failed.push(FailedFile {
                    path,
                    kind,
                    error: reason,
                });
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RunReport {
    DryRun { candidates: Vec<PathBuf> },
    Completed(BatchReport),
}

/// Recorre `root` (archivo o árbol de directorios) y devuelve los trabajos a procesar.
///
/// Solo es fatal no poder acceder a la raíz. Una ruta de archivo indicada directamente
/// se valida de forma estricta; dentro de un directorio lo no reconocido se omite.
pub fn collect_candidate_files(
    root: &Path,
    filter: &ExtensionFilter,
) -> Result<Vec<ScrubJob>, ScrubError> {
    let metadata = std::fs::metadata(root).map_err(|e| ScrubError::from(e).at(root))?;

    if !metadata.is_dir() {
        return Ok(vec![classify_explicit(root, filter).map_err(|e| e.at(root))?]);
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 => {
                let error = error
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("no se pudo recorrer la raíz"));
                return Err(ScrubError::Io(error).at(root));
            }
            Err(error) => {
                tracing::warn!(%error, "entrada omitida durante el recorrido");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        if let Classification::Process(strategy) = classify(entry.path(), filter) {
            jobs.push(ScrubJob {
                path: entry.into_path(),
                strategy,
            });
        }
    }

    Ok(jobs)
}

/// Ejecuta un lote completo según la configuración. En modo simulación no modifica nada.
pub fn run(input: &Path, config: &ScrubConfig) -> Result<RunReport, ScrubError> {
    let jobs = collect_candidate_files(input, &config.filter)?;

    if config.dry_run {
        return Ok(RunReport::DryRun {
            candidates: jobs.into_iter().map(|job| job.path).collect(),
        });
    }

    let scrubber = Scrubber::from_config(config);
    Ok(RunReport::Completed(run_cleanup(
        jobs,
        &scrubber,
        config.effective_workers(),
    )))
}

pub fn run_cleanup(jobs: Vec<ScrubJob>, scrubber: &Scrubber, workers: usize) -> BatchReport {
    run_pool(jobs, scrubber, workers, None)
}

/// Igual que `run_cleanup`, emitiendo eventos de progreso por `sender`.
pub fn run_cleanup_with_sender(
    jobs: Vec<ScrubJob>,
    scrubber: &Scrubber,
    workers: usize,
    sender: Sender<CleanupEvent>,
) -> BatchReport {
    run_pool(jobs, scrubber, workers, Some(&sender))
}

/// Cada trabajo se encola una sola vez y la cola se cierra antes de arrancar; los
/// trabajadores envían sus resultados a este hilo, único dueño de los contadores.
fn run_pool(
    jobs: Vec<ScrubJob>,
    scrubber: &Scrubber,
    workers: usize,
    sender: Option<&Sender<CleanupEvent>>,
) -> BatchReport {
    let workers = workers.max(MIN_WORKERS);
    emit(
        sender,
        CleanupEvent::Started {
            total: jobs.len(),
            workers,
        },
    );

    let (job_tx, job_rx) = mpsc::channel::<ScrubJob>();
    for job in jobs {
        let _ = job_tx.send(job);
    }
    drop(job_tx);
    let queue = Mutex::new(job_rx);

    let (outcome_tx, outcome_rx) = mpsc::channel::<(PathBuf, ScrubOutcome)>();
    let mut report = BatchReport::default();

    thread::scope(|scope| {
        for worker in 0..workers {
            let queue = &queue;
            let outcome_tx = outcome_tx.clone();
            scope.spawn(move || {
                while let Some(job) = next_job(queue) {
                    let outcome = scrub_isolated(scrubber, &job);
                    if outcome_tx.send((job.path, outcome)).is_err() {
                        break;
                    }
                }
                tracing::trace!(worker, "trabajador sin más tareas");
            });
        }
        drop(outcome_tx);

        for (path, outcome) in outcome_rx {
            report.record(path, outcome, sender);
        }
    });

    emit(
        sender,
        CleanupEvent::Finished {
            successes: report.successes,
            failures: report.failures,
        },
    );
    report
}

fn next_job(queue: &Mutex<Receiver<ScrubJob>>) -> Option<ScrubJob> {
    let receiver = queue.lock().unwrap_or_else(PoisonError::into_inner);
    receiver.recv().ok()
}

/// Frontera del trabajador: ningún error ni pánico de un archivo sale de aquí.
fn scrub_isolated(scrubber: &Scrubber, job: &ScrubJob) -> ScrubOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| scrubber.scrub(job)))
        .unwrap_or_else(|_| {
            Err(
                ScrubError::Format("el procesamiento terminó de forma inesperada".to_string())
                    .at(&job.path),
            )
        });

    match result {
        Ok(report) => {
            let degraded = report.outcome == CommitOutcome::Degraded;
            tracing::info!(path = %job.path.display(), degraded, "metadata eliminada");
            ScrubOutcome::Success {
                degraded,
                backup: report.backup,
            }
        }
        Err(error) => {
            tracing::error!(path = %job.path.display(), %error, "no se pudo limpiar");
            ScrubOutcome::Failure {
                kind: error.kind().to_string(),
                reason: error.to_string(),
            }
        }
    }
}

fn emit(sender: Option<&Sender<CleanupEvent>>, event: CleanupEvent) {
    if let Some(sender) = sender {
        let _ = sender.send(event);
    }
}
