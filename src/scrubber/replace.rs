//! Confirmación del archivo preparado: respaldo previo, renombrado atómico con un reintento
//! y, como último recurso, copia no atómica.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::ScrubError;

use super::constants::DEFAULT_RETRY_DELAY;
use super::utils::{backup_path, timestamped_backup_path};

const MAX_BACKUP_CANDIDATES: usize = 64;

/// Operaciones de sistema de archivos usadas al reemplazar el original.
pub trait FileMover: Send + Sync {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    /// Sobrescribe el contenido de `to` con el de `from`. No es atómico.
    fn copy_over(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut source = File::open(from)?;
        let mut target = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(to)?;
        io::copy(&mut source, &mut target)?;
        target.sync_all()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Implementación directa sobre `std::fs`.
pub struct StdMover;

impl FileMover for StdMover {}

/// `Degraded` indica que el reemplazo se hizo por copia y perdió la garantía de atomicidad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Atomic,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReport {
    pub outcome: CommitOutcome,
    pub backup: Option<PathBuf>,
}

enum ReplaceStep {
    AttemptAtomicMove,
    RetryOnce,
    FallbackCopy,
    Failed(io::Error),
}

#[derive(Clone)]
pub struct Replacer {
    keep_backup: bool,
    retry_delay: Duration,
    mover: Arc<dyn FileMover>,
}

impl Default for Replacer {
    fn default() -> Self {
        Self::new(true, DEFAULT_RETRY_DELAY)
    }
}

impl Replacer {
    pub fn new(keep_backup: bool, retry_delay: Duration) -> Self {
        Self {
            keep_backup,
            retry_delay,
            mover: Arc::new(StdMover),
        }
    }

    pub fn with_mover(mut self, mover: Arc<dyn FileMover>) -> Self {
        self.mover = mover;
        self
    }

    /// Reemplaza `original` por `staged`.
    ///
    /// Si se pidió respaldo, se escribe y sincroniza antes de cualquier paso destructivo;
    /// si falla, ni el original ni el preparado se tocan. Cuando todo falla el archivo
    /// preparado se deja en su sitio para diagnóstico.
    pub fn commit(&self, original: &Path, staged: &Path) -> Result<CommitReport, ScrubError> {
        let backup = if self.keep_backup {
            Some(create_backup(original)?)
        } else {
            None
        };

        if let Ok(metadata) = fs::metadata(original) {
            let _ = fs::set_permissions(staged, metadata.permissions());
        }

        let outcome = self.replace(original, staged)?;
        Ok(CommitReport { outcome, backup })
    }

    fn replace(&self, original: &Path, staged: &Path) -> Result<CommitOutcome, ScrubError> {
        let mut step = ReplaceStep::AttemptAtomicMove;

        loop {
            step = match step {
                ReplaceStep::AttemptAtomicMove => match self.mover.rename(staged, original) {
                    Ok(()) => return Ok(CommitOutcome::Atomic),
                    Err(error) => {
                        tracing::debug!(
                            path = %original.display(),
                            %error,
                            "renombrado fallido, se reintentará"
                        );
                        ReplaceStep::RetryOnce
                    }
                },
                ReplaceStep::RetryOnce => {
                    thread::sleep(self.retry_delay);
                    match self.mover.rename(staged, original) {
                        Ok(()) => return Ok(CommitOutcome::Atomic),
                        Err(error) => {
                            tracing::warn!(
                                path = %original.display(),
                                %error,
                                "renombrado atómico imposible, se copiará encima del original"
                            );
                            ReplaceStep::FallbackCopy
                        }
                    }
                }
                ReplaceStep::FallbackCopy => match self.mover.copy_over(staged, original) {
                    Ok(()) => {
                        if let Err(error) = self.mover.remove(staged) {
                            tracing::warn!(
                                path = %staged.display(),
                                %error,
                                "no se pudo borrar el archivo temporal"
                            );
                        }
                        tracing::warn!(
                            path = %original.display(),
                            "reemplazo degradado: copia no atómica"
                        );
                        return Ok(CommitOutcome::Degraded);
                    }
                    Err(error) => ReplaceStep::Failed(error),
                },
                ReplaceStep::Failed(error) => {
                    return Err(ScrubError::Io(io::Error::new(
                        error.kind(),
                        format!(
                            "no se pudo reemplazar el original (posiblemente en uso); \
                             el archivo preparado queda en {}: {}",
                            staged.display(),
                            error
                        ),
                    )));
                }
            };
        }
    }
}

/// Copia el original a un nombre de respaldo libre y lo sincroniza en disco.
fn create_backup(original: &Path) -> Result<PathBuf, ScrubError> {
    let mut source = File::open(original)?;
    let (path, mut target) = open_backup_target(original)?;

    let written = io::copy(&mut source, &mut target).and_then(|_| target.sync_all());
    if let Err(error) = written {
        drop(target);
        let _ = fs::remove_file(&path);
        return Err(ScrubError::Io(io::Error::new(
            error.kind(),
            format!("no se pudo crear el respaldo {}: {}", path.display(), error),
        )));
    }

    if let Ok(metadata) = source.metadata() {
        let _ = fs::set_permissions(&path, metadata.permissions());
    }

    tracing::debug!(backup = %path.display(), "respaldo creado");
    Ok(path)
}

/// `create_new` garantiza que nunca se sobrescribe un respaldo existente.
fn open_backup_target(original: &Path) -> Result<(PathBuf, File), ScrubError> {
    let timestamp = chrono::Utc::now().timestamp();
    let candidates = iter::once(backup_path(original))
        .chain((0..).map(|attempt| timestamped_backup_path(original, timestamp, attempt)));

    for candidate in candidates.take(MAX_BACKUP_CANDIDATES) {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(error) => return Err(error.into()),
        }
    }

    Err(ScrubError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no hay un nombre de respaldo libre para {}", original.display()),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    use crate::scrubber::utils::staged_path;

    /// Falla el renombrado las primeras `rename_failures` veces; opcionalmente también la copia.
    struct FlakyMover {
        rename_failures: usize,
        fail_copy: bool,
        renames: AtomicUsize,
        copies: AtomicUsize,
    }

    impl FlakyMover {
        fn new(rename_failures: usize, fail_copy: bool) -> Arc<Self> {
            Arc::new(Self {
                rename_failures,
                fail_copy,
                renames: AtomicUsize::new(0),
                copies: AtomicUsize::new(0),
            })
        }
    }

    impl FileMover for FlakyMover {
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            let attempt = self.renames.fetch_add(1, Ordering::SeqCst);
            if attempt < self.rename_failures {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "archivo en uso"));
            }
            fs::rename(from, to)
        }

        fn copy_over(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.copies.fetch_add(1, Ordering::SeqCst);
            if self.fail_copy {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "archivo en uso"));
            }
            StdMover.copy_over(from, to)
        }
    }

    fn fixture(dir: &Path) -> io::Result<(PathBuf, PathBuf)> {
        let original = dir.join("informe.docx");
        let staged = staged_path(&original);
        fs::write(&original, b"contenido original")?;
        fs::write(&staged, b"contenido limpio")?;
        Ok((original, staged))
    }

    #[test]
    fn backup_matches_pre_commit_content() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (original, staged) = fixture(dir.path())?;

        let report = Replacer::new(true, Duration::ZERO).commit(&original, &staged)?;

        assert_eq!(report.outcome, CommitOutcome::Atomic);
        let backup = report.backup.ok_or("falta el respaldo")?;
        assert_eq!(backup, dir.path().join("informe.docx.bak"));
        assert_eq!(fs::read(&backup)?, b"contenido original");
        assert_eq!(fs::read(&original)?, b"contenido limpio");
        assert!(!staged.exists());
        Ok(())
    }

    #[test]
    fn existing_backup_is_never_overwritten() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (original, staged) = fixture(dir.path())?;
        fs::write(dir.path().join("informe.docx.bak"), b"respaldo previo")?;

        let report = Replacer::new(true, Duration::ZERO).commit(&original, &staged)?;
        let backup = report.backup.ok_or("falta el respaldo")?;

        assert_ne!(backup, dir.path().join("informe.docx.bak"));
        let name = backup
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("nombre inválido")?;
        assert!(name.starts_with("informe.docx."));
        assert!(name.ends_with(".bak"));
        assert_eq!(fs::read(&backup)?, b"contenido original");
        assert_eq!(
            fs::read(dir.path().join("informe.docx.bak"))?,
            b"respaldo previo"
        );
        Ok(())
    }

    #[test]
    fn no_backup_when_disabled() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (original, staged) = fixture(dir.path())?;

        let report = Replacer::new(false, Duration::ZERO).commit(&original, &staged)?;

        assert_eq!(report.backup, None);
        assert!(!dir.path().join("informe.docx.bak").exists());
        assert_eq!(fs::read(&original)?, b"contenido limpio");
        Ok(())
    }

    #[test]
    fn single_rename_failure_is_retried() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (original, staged) = fixture(dir.path())?;
        let mover = FlakyMover::new(1, false);

        let report = Replacer::new(false, Duration::ZERO)
            .with_mover(mover.clone())
            .commit(&original, &staged)?;

        assert_eq!(report.outcome, CommitOutcome::Atomic);
        assert_eq!(mover.renames.load(Ordering::SeqCst), 2);
        assert_eq!(mover.copies.load(Ordering::SeqCst), 0);
        assert_eq!(fs::read(&original)?, b"contenido limpio");
        Ok(())
    }

    #[test]
    fn persistent_rename_failure_degrades_to_copy() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (original, staged) = fixture(dir.path())?;
        let mover = FlakyMover::new(usize::MAX, false);

        let report = Replacer::new(true, Duration::ZERO)
            .with_mover(mover.clone())
            .commit(&original, &staged)?;

        assert_eq!(report.outcome, CommitOutcome::Degraded);
        assert_eq!(mover.renames.load(Ordering::SeqCst), 2);
        assert_eq!(fs::read(&original)?, b"contenido limpio");
        assert!(!staged.exists());
        Ok(())
    }

    #[test]
    fn total_failure_keeps_staged_file_and_original() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (original, staged) = fixture(dir.path())?;

        let error = Replacer::new(false, Duration::ZERO)
            .with_mover(FlakyMover::new(usize::MAX, true))
            .commit(&original, &staged)
            .unwrap_err();

        assert_eq!(error.kind(), "io");
        assert_eq!(fs::read(&staged)?, b"contenido limpio");
        assert_eq!(fs::read(&original)?, b"contenido original");
        Ok(())
    }

    #[test]
    fn backup_failure_aborts_before_replacing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let original = dir.path().join("desaparecido.docx");
        let staged = staged_path(&original);
        fs::write(&staged, b"contenido limpio")?;

        let error = Replacer::new(true, Duration::ZERO)
            .commit(&original, &staged)
            .unwrap_err();

        assert_eq!(error.kind(), "io");
        assert!(!original.exists());
        assert_eq!(fs::read(&staged)?, b"contenido limpio");
        Ok(())
    }
}
