//! Crash-safe JSON files on disk

use std::io::{Read, Seek, Write};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::PrettyFormatter;
use tokio::fs;

use crate::prelude::*;

/// Read a JSON file, creating it as `{}` if it does not exist
#[instrument(level = "debug")]
pub async fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if fs::metadata(path).await.is_err() {
        debug!("Creating empty store");
        write(path, &serde_json::json!({})).await?;
    }

    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Error reading {path:?}"))?;

    serde_json::from_slice(&bytes).with_context(|| format!("Invalid JSON in {path:?}"))
}

fn to_pretty(data: &impl Serialize) -> Result<Vec<u8>> {
    // Round-trip through Value so object keys come out sorted
    let value = serde_json::to_value(data).context("Error serializing data")?;

    let mut out = vec![];
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut ser)
        .context("Error formatting data")?;

    Ok(out)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Error creating directory {dir:?}"))?;

    let mut prefix = path.file_stem().unwrap_or_default().to_os_string();
    prefix.push("-");
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    // Removed on drop unless persisted
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)
        .with_context(|| format!("Error creating temporary file in {dir:?}"))?;

    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("Error writing {:?}", tmp.path()))?;

    let mut check = vec![];
    tmp.rewind()
        .and_then(|()| tmp.read_to_end(&mut check))
        .with_context(|| format!("Error reading back {:?}", tmp.path()))?;
    serde_json::from_slice::<serde_json::Value>(&check)
        .with_context(|| format!("Corrupt data written to {:?}", tmp.path()))?;

    tmp.persist(path)
        .map(|_| ())
        .with_context(|| format!("Error moving temporary file to {path:?}"))
}

/// Atomically replace a JSON file
///
/// The data is written to a uniquely named temporary file next to `path` and
/// read back before being moved over the original.
#[instrument(level = "debug", skip(data))]
pub async fn write(path: &Path, data: &impl Serialize) -> Result {
    let bytes = to_pretty(data)?;
    let path = path.to_owned();

    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
        .await
        .context("Store write task panicked")?
}
