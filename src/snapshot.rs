use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Sibling temp file a save is staged in: `calendar.json` -> `calendar.json.tmp`.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read a whole JSON document. A missing file is `Ok(None)`; anything
/// unreadable or unparseable is an error (never treated as empty).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(value))
}

/// Replace `path` with the JSON encoding of `value`, all-or-nothing.
///
/// The document is written to a temp file and fsynced, then renamed over the
/// target. A crash at any point leaves either the old or the new file.
///
/// `Err` means the target was not replaced. Everything that can fail runs
/// before the rename; once the rename lands the save counts as committed,
/// and a failed directory fsync is only logged.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let started = Instant::now();
    let tmp = tmp_path(path);

    let dir = open_parent_dir(path)?;
    if let Err(e) = stage(&tmp, value) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    if let Some(dir) = dir
        && let Err(e) = dir.sync_all()
    {
        warn!("{} replaced but directory fsync failed: {e}", path.display());
    }

    metrics::histogram!(
        crate::observability::PERSIST_DURATION_SECONDS,
        "file" => file_label(path)
    )
    .record(started.elapsed().as_secs_f64());
    Ok(())
}

fn stage<T: Serialize + ?Sized>(tmp: &Path, value: &T) -> io::Result<()> {
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Handle used to make the rename itself durable.
#[cfg(unix)]
fn open_parent_dir(path: &Path) -> io::Result<Option<File>> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent).map(Some)
}

#[cfg(not(unix))]
fn open_parent_dir(_path: &Path) -> io::Result<Option<File>> {
    Ok(None)
}
