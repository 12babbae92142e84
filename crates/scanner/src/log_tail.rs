use crate::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// How much of a log file the error collector looks at.
pub const DEFAULT_TAIL_BYTES: u64 = 50 * 1024;

/// Reads at most the last `max_bytes` of `path` as lossy UTF-8.
///
/// Returns `Ok(None)` when the file does not exist. When the read starts mid-file the first
/// (partial) line is dropped so callers only ever see whole lines.
pub fn tail_file(path: &Path, max_bytes: u64) -> Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let len = file.metadata()?.len();
    let start = len.saturating_sub(max_bytes);
    if start > 0 {
        file.seek(SeekFrom::Start(start))?;
    }

    let mut bytes = Vec::with_capacity(usize::try_from(len - start).unwrap_or(0));
    file.take(max_bytes).read_to_end(&mut bytes)?;

    let text = String::from_utf8_lossy(&bytes);
    if start == 0 {
        return Ok(Some(text.into_owned()));
    }
    match text.find('\n') {
        Some(pos) => Ok(Some(text[pos + 1..].to_string())),
        None => Ok(Some(String::new())),
    }
}

/// Reads a whole text file if it is no larger than `max_bytes`.
pub fn read_text_bounded(path: &Path, max_bytes: u64) -> Result<Option<String>> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if meta.len() > max_bytes {
        log::debug!(
            "Not reading {} ({} bytes > {max_bytes})",
            path.display(),
            meta.len()
        );
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
