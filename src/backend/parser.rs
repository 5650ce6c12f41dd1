//! Parsers for yt-dlp output

use super::traits::RawMetadata;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str;

/// Parse the JSON document printed by `--dump-single-json`
pub fn parse_metadata(stdout: &[u8]) -> Result<RawMetadata> {
    serde_json::from_slice(stdout)
        .map_err(|e| Error::BackendFailure(format!("unreadable backend metadata: {e}")))
}

/// Path printed by `--print after_move:filepath`, the last non-empty stdout line
pub fn parse_download_path(stdout: &[u8]) -> Result<PathBuf> {
    str::from_utf8(stdout)
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| Error::BackendFailure("backend reported no output file".into()))
}

/// Condense stderr of a failed run into one message
///
/// Prefers the backend's `ERROR:` lines, then the last non-empty line, then
/// the exit code.
pub fn failure_message(stderr: &[u8], exit_code: Option<i32>) -> String {
    let text = str::from_utf8(stderr).unwrap_or_default();

    let errors: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return errors.join("; ");
    }

    if let Some(last) = text.lines().map(str::trim).rfind(|l| !l.is_empty()) {
        return last.to_string();
    }

    match exit_code {
        Some(code) => format!("backend exited with status {code}"),
        None => "backend terminated by signal".to_string(),
    }
}

/// Whether a failure message points at browser cookies or a sign-in wall
pub fn is_credential_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("cookie") || lower.contains("sign in") || lower.contains("sign-in")
}
