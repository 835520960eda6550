//! Timestamped copies of data files taken before they are rewritten

use chrono::NaiveDateTime;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Give up looking for a free backup name after this many suffixes
const MAX_BACKUP_SUFFIX: u32 = 1000;

/// Copy `source` to `<name>.bak_<YYYYMMDDHHMMSS>`.
///
/// Returns `Ok(None)` when there is nothing to back up. Existing backups are
/// never overwritten; a numeric suffix is appended instead.
pub fn backup_file(source: &Path, now: NaiveDateTime) -> io::Result<Option<PathBuf>> {
    let mut input = match File::open(source) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let base = format!("{}.bak_{}", file_name, now.format("%Y%m%d%H%M%S"));

    for attempt in 0..MAX_BACKUP_SUFFIX {
        let name = if attempt == 0 {
            base.clone()
        } else {
            format!("{}_{}", base, attempt)
        };
        let target = source.with_file_name(name);

        let mut output = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };

        if let Err(e) = io::copy(&mut input, &mut output) {
            drop(output);
            let _ = fs::remove_file(&target);
            return Err(e);
        }
        return Ok(Some(target));
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free backup name for {}", base),
    ))
}
