/**
 * Crash-safe in-place file replacement
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Replace `destination` with `bytes` via a sibling temp file and a rename.
///
/// The temp file inherits the destination's permissions. On failure the
/// destination is untouched and the temp file is removed.
pub fn atomic_write_replace(destination: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_path_for(destination);

    let result = fs::write(&temp, bytes)
        .and_then(|_| match fs::metadata(destination) {
            Ok(metadata) => fs::set_permissions(&temp, metadata.permissions()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        })
        .and_then(|_| fs::rename(&temp, destination));

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.datefill-{}-{}", name, std::process::id(), suffix))
}
