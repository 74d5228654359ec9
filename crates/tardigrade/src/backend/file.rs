//! File-system checkpoint storage with atomic writes and rotation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{restore_views, snapshot_views, Backend, ViewRecord};
use crate::view::ArrayHandle;
use crate::{Error, Result};

/// File magic prefixed to every checkpoint file.
const MAGIC: [u8; 4] = *b"TDGR";

/// Format version written into the manifest; readers reject anything newer.
const FORMAT_VERSION: u32 = 1;

/// Configuration for file-backed checkpoint storage.
#[derive(Clone, Debug)]
pub struct FileBackendConfig {
    /// Directory checkpoint files are written under
    pub dir: PathBuf,
    /// Keep only the newest N iterations per label (0 = keep all)
    pub keep_last: usize,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("checkpoints"),
            keep_last: 0,
        }
    }
}

impl FileBackendConfig {
    /// Create a new config with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Set how many iterations to retain per label.
    pub fn keep_last(mut self, n: usize) -> Self {
        self.keep_last = n;
        self
    }
}

/// Everything stored for one `(label, iteration)` key.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    label: String,
    iteration: u64,
    views: Vec<ViewRecord>,
}

/// Checkpoint storage as one file per `(label, iteration)` key.
///
/// Files are named `{label}.{iteration:06}.ckpt` under the configured
/// directory and written atomically (temp file, then rename), so a crash
/// mid-write never leaves a truncated checkpoint under the final name and
/// re-persisting a key simply replaces it.
///
/// # Example
///
/// ```ignore
/// let config = FileBackendConfig::new("./checkpoints").keep_last(3);
/// let mut backend = FileBackend::with_config(config);
///
/// // To resume a run:
/// if let Some(iteration) = backend.latest("diffusion")? {
///     println!("Resuming after iteration {}", iteration);
/// }
/// ```
#[derive(Debug)]
pub struct FileBackend {
    config: FileBackendConfig,
}

impl FileBackend {
    /// Create a backend writing under `dir`, keeping every checkpoint.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_config(FileBackendConfig::new(dir))
    }

    /// Create a backend from a full config.
    pub fn with_config(config: FileBackendConfig) -> Self {
        if let Err(e) = fs::create_dir_all(&config.dir) {
            tracing::warn!("Failed to create checkpoint directory: {}", e);
        }
        Self { config }
    }

    /// Directory checkpoint files live under.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Path a given key is stored at.
    pub fn path_for(&self, label: &str, iteration: u64) -> PathBuf {
        self.config.dir.join(format!("{label}.{iteration:06}.ckpt"))
    }

    /// Newest stored iteration for `label`, if any.
    pub fn latest(&self, label: &str) -> Result<Option<u64>> {
        validate_label(label)?;
        Ok(self.scan_iterations(label).pop())
    }

    /// All stored iterations for `label`, oldest first.
    pub fn list_iterations(&self, label: &str) -> Result<Vec<u64>> {
        validate_label(label)?;
        Ok(self.scan_iterations(label))
    }

    fn scan_iterations(&self, label: &str) -> Vec<u64> {
        let entries = match fs::read_dir(&self.config.dir) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };

        let mut iterations: Vec<u64> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter_map(|name| parse_file_name(&name, label))
            .collect();

        iterations.sort_unstable();
        iterations
    }

    /// Remove old iterations of `label`, keeping only the newest N.
    fn prune(&self, label: &str) {
        if self.config.keep_last == 0 {
            return;
        }
        let mut iterations = self.scan_iterations(label);
        while iterations.len() > self.config.keep_last {
            let old = self.path_for(label, iterations.remove(0));
            if let Err(e) = fs::remove_file(&old) {
                tracing::warn!(path = %old.display(), "Failed to remove old checkpoint: {}", e);
            } else {
                tracing::debug!(path = %old.display(), "Removed old checkpoint");
            }
        }
    }

    fn read_manifest(&self, label: &str, iteration: u64) -> Result<Manifest> {
        let path = self.path_for(label, iteration);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::MissingCheckpoint {
                    label: label.to_string(),
                    iteration,
                })
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::Format(format!(
                "not a checkpoint file: {}",
                path.display()
            )));
        }
        let manifest: Manifest = bincode::deserialize(&bytes[MAGIC.len()..])?;
        if manifest.version != FORMAT_VERSION {
            return Err(Error::Format(format!(
                "unsupported checkpoint format version {}",
                manifest.version
            )));
        }
        if manifest.label != label || manifest.iteration != iteration {
            return Err(Error::Format(format!(
                "checkpoint key mismatch: file holds '{}' iteration {}",
                manifest.label, manifest.iteration
            )));
        }
        Ok(manifest)
    }
}

impl Backend for FileBackend {
    fn restart_available(&self, label: &str, iteration: u64) -> bool {
        validate_label(label).is_ok() && self.path_for(label, iteration).is_file()
    }

    fn restart(
        &mut self,
        label: &str,
        iteration: u64,
        handles: &mut [ArrayHandle],
    ) -> Result<()> {
        validate_label(label)?;
        let manifest = self.read_manifest(label, iteration)?;
        restore_views(&manifest.views, handles)?;
        tracing::info!(
            path = %self.path_for(label, iteration).display(),
            iteration,
            "Loaded checkpoint"
        );
        Ok(())
    }

    fn checkpoint(&mut self, label: &str, iteration: u64, handles: &[ArrayHandle]) -> Result<()> {
        validate_label(label)?;
        fs::create_dir_all(&self.config.dir)?;

        let manifest = Manifest {
            version: FORMAT_VERSION,
            label: label.to_string(),
            iteration,
            views: snapshot_views(handles)?,
        };
        let body = bincode::serialize(&manifest)?;
        let mut data = Vec::with_capacity(MAGIC.len() + body.len());
        data.extend_from_slice(&MAGIC);
        data.extend_from_slice(&body);

        let path = self.path_for(label, iteration);
        let tmp = path.with_extension("ckpt.tmp");
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &path)?;
        tracing::info!(path = %path.display(), iteration, "Saved checkpoint");

        self.prune(label);
        Ok(())
    }
}

/// Reject labels that cannot serve as a single path component.
pub(crate) fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() || label.contains('/') || label.contains('\\') || label.contains("..") {
        return Err(Error::InvalidLabel(label.to_string()));
    }
    Ok(())
}

/// Extract the iteration from `{label}.{iteration}.ckpt`, parsing from the
/// right so labels may contain dots.
fn parse_file_name(name: &str, label: &str) -> Option<u64> {
    let stem = name.strip_suffix(".ckpt")?;
    let (file_label, iteration) = stem.rsplit_once('.')?;
    if file_label != label {
        return None;
    }
    iteration.parse().ok()
}
