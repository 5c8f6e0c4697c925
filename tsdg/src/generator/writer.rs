//! Writing encoded blocks to rotated output files.
//!
//! Every block lands in a new file `<prefix>-<index>.bin`. The index comes
//! from a counter shared by all shards, so file names never collide.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use metrics::counter;
use tracing::{debug, warn};
use tsdg_payload::Block;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Writer`].
pub enum Error {
    /// The output file could not be created, written or synced.
    #[error("Io error writing {path:?}: {source}")]
    Io {
        /// The file being written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
}

/// Counters shared by every shard of a run.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    /// Index of the next output file.
    pub file_index: Arc<AtomicU64>,
    /// Files written so far.
    pub files: Arc<AtomicU64>,
    /// Samples written to disk so far.
    pub samples: Arc<AtomicU64>,
}

/// Writes blocks for one shard.
#[derive(Debug)]
pub struct Writer {
    prefix: PathBuf,
    counters: Counters,
    metric_labels: Vec<(String, String)>,
}

impl Writer {
    /// Create a writer for shard `shard` writing next to `prefix`.
    #[must_use]
    pub fn new(prefix: &Path, counters: Counters, shard: usize) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            counters,
            metric_labels: vec![("shard".to_string(), shard.to_string())],
        }
    }

    /// Write `block` to a fresh file and return its path. The file is synced
    /// before returning.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created, written or synced.
    pub fn write(&self, block: &Block) -> Result<PathBuf, Error> {
        let index = self.counters.file_index.fetch_add(1, Ordering::Relaxed);
        let path = path_from_prefix(&self.prefix, index);

        let err = |source| Error::Io {
            path: path.clone(),
            source,
        };
        create_synced(&path, |file| file.write_all(&block.bytes)).map_err(err)?;

        self.counters.files.fetch_add(1, Ordering::Relaxed);
        self.counters
            .samples
            .fetch_add(block.samples, Ordering::Relaxed);
        counter!("files_written", &self.metric_labels).increment(1);
        counter!("bytes_written", &self.metric_labels).increment(block.bytes.len() as u64);
        counter!("samples_generated", &self.metric_labels).increment(block.samples);
        debug!(
            "wrote {} series, {} samples, {} bytes to {}",
            block.series,
            block.samples,
            block.bytes.len(),
            path.display()
        );
        Ok(path)
    }
}

/// Create `path`, fill it and sync it. A file that was created but not fully
/// written is removed again.
fn create_synced<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let mut file = fs::File::create(path)?;
    if let Err(err) = fill(&mut file).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(remove) = fs::remove_file(path) {
            warn!("could not remove partial file {}: {remove}", path.display());
        }
        return Err(err);
    }
    Ok(())
}

/// `<prefix>-<index>.bin`
#[must_use]
pub fn path_from_prefix(prefix: &Path, index: u64) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("-{index}.bin"));
    PathBuf::from(name)
}
