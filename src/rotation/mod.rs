// src/rotation/mod.rs

//! Time-based rotating log files for backend stdout/stderr.
//!
//! The live file is always `path`. Once `rotation_time` has passed since it
//! was opened, the next write renames it to `path.<YYYYmmddHHMMSS>` and starts
//! a fresh file. Rotated siblings older than `max_age` are deleted at rotation
//! time. A zero `rotation_time` never rotates; a zero `max_age` never prunes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Create every missing directory leading up to `path`.
pub fn create_path_to_file(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Open (append) the live log file at `path`.
pub fn open_rotated_log(
    path: impl Into<PathBuf>,
    rotation_time: Duration,
    max_age: Duration,
) -> io::Result<RotatingLog> {
    let path = path.into();
    let file = open_append(&path)?;
    Ok(RotatingLog {
        path,
        rotation_time,
        max_age,
        file,
        opened_at: Instant::now(),
    })
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writable sink that rotates the underlying file by age.
#[derive(Debug)]
pub struct RotatingLog {
    path: PathBuf,
    rotation_time: Duration,
    max_age: Duration,
    file: File,
    opened_at: Instant,
}

impl RotatingLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotation_due(&self) -> bool {
        !self.rotation_time.is_zero() && self.opened_at.elapsed() >= self.rotation_time
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.file.metadata()?.len() == 0 {
            self.opened_at = Instant::now();
            return Ok(());
        }
        self.prune_expired();

        let target = self.rotated_name();
        fs::rename(&self.path, &target)?;
        debug!(from = %self.path.display(), to = %target.display(), "rotated log file");

        self.file = open_append(&self.path)?;
        self.opened_at = Instant::now();
        Ok(())
    }

    fn rotated_name(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let base = PathBuf::from(format!("{}.{}", self.path.display(), stamp));
        if !base.exists() {
            return base;
        }
        // Several rotations inside one second.
        (1..)
            .map(|n| PathBuf::from(format!("{}.{}", base.display(), n)))
            .find(|p| !p.exists())
            .unwrap_or(base)
    }

    /// Remove rotated siblings (`<file>.<suffix>`) last modified before `max_age`.
    fn prune_expired(&self) {
        if self.max_age.is_zero() {
            return;
        }
        let Some(file_name) = self.path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let prefix = format!("{file_name}.");
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot list log directory for pruning");
                return;
            }
        };

        let now = SystemTime::now();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix) {
                continue;
            }
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > self.max_age);
            if expired {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(file = %entry.path().display(), error = %e, "failed to prune old log");
                }
            }
        }
    }
}

impl Write for RotatingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.rotation_due() {
            if let Err(e) = self.rotate() {
                // Keep writing to whatever file we have.
                warn!(file = %self.path.display(), error = %e, "log rotation failed");
                self.opened_at = Instant::now();
            }
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Copy a child's output stream into `sink` until EOF, then close the sink.
///
/// File writes, and the rename and directory scan of a rotation, run on the
/// blocking pool.
pub async fn pump<R>(mut reader: R, mut sink: RotatingLog) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; 8 * 1024];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let chunk = buf[..n].to_vec();
        sink = on_blocking_pool(move || {
            sink.write_all(&chunk)?;
            Ok(sink)
        })
        .await?;
        total += n as u64;
    }
    on_blocking_pool(move || sink.flush()).await?;
    Ok(total)
}

async fn on_blocking_pool<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}
