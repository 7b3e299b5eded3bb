//! Line-ending and encoding normalization for snapshots.
//!
//! Every snapshot reaches the engine as UTF-8 with `\n` line terminators and
//! no byte-order mark, whatever platform produced it. Sources call
//! [`normalize`] on raw bytes before building units.

use std::path::Path;

use crate::error::ReconcileError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode `bytes` as UTF-8, drop a leading BOM, and rewrite CRLF and lone CR
/// terminators to LF.
///
/// # Errors
/// Returns [`ReconcileError::NotUtf8`] naming `origin` if `bytes` is not
/// valid UTF-8.
pub fn normalize(bytes: &[u8], origin: &Path) -> Result<String, ReconcileError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| ReconcileError::NotUtf8 {
        path: origin.to_owned(),
        offset: e.valid_up_to(),
    })?;
    Ok(normalize_line_endings(text))
}

/// Rewrite CRLF and lone CR to LF.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Read and normalize a file. A missing file is `Ok(None)`, not an error.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or decoded.
pub fn read_snapshot(path: &Path) -> Result<Option<String>, ReconcileError> {
    match std::fs::read(path) {
        Ok(bytes) => normalize(&bytes, path).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReconcileError::io("read", path, e)),
    }
}
