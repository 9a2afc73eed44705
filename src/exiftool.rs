//! External exiftool invocation.
//!
//! Exiftool is the most authoritative metadata source the resolver has, but
//! it is strictly optional: a missing binary, a non-zero exit, or garbage
//! output all mean "no tool metadata for this file" and the resolution
//! chain carries on with the next tier. Nothing in this module produces a
//! hard error.

use crate::timestamp::{EXIFTOOL_DATE_TAGS, ToolMetadata};
use serde_json::Value;
use std::path::Path;
use std::process::Command;

/// Date format requested from exiftool, matching what
/// [`crate::timestamp::parse_datetime`] accepts directly.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle to the external exiftool binary.
///
/// Availability is probed once at construction; per-file lookups on an
/// unavailable client are free no-ops, so the scanner can call
/// [`ExifToolClient::read_metadata`] unconditionally.
#[derive(Debug, Clone, Copy)]
pub struct ExifToolClient {
    available: bool,
}

impl ExifToolClient {
    /// Probes for exiftool on the PATH by running `exiftool -ver`.
    pub fn detect() -> Self {
        let available = Command::new("exiftool")
            .arg("-ver")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);
        ExifToolClient { available }
    }

    /// Creates a client that never invokes the binary. Used by tests and
    /// callers that want tool metadata disabled.
    pub fn unavailable() -> Self {
        ExifToolClient { available: false }
    }

    /// Whether the exiftool binary was found at construction time.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Reads the date tags of one file.
    ///
    /// Runs `exiftool -j -d <format> -<tag>... <path>` and flattens the
    /// first object of the JSON array into a string map. Returns `None`
    /// when the tool is unavailable, fails, or yields no string values;
    /// the caller treats all of those identically as a tier failure.
    pub fn read_metadata(&self, path: &Path) -> Option<ToolMetadata> {
        if !self.available {
            return None;
        }

        let mut command = Command::new("exiftool");
        command.arg("-j").arg("-d").arg(DATE_FORMAT);
        for tag in EXIFTOOL_DATE_TAGS {
            command.arg(format!("-{}", tag));
        }
        command.arg(path);

        let output = command.output().ok()?;
        if !output.status.success() || output.stdout.is_empty() {
            return None;
        }

        let payload: Value = serde_json::from_slice(&output.stdout).ok()?;
        let first = payload.as_array()?.first()?.as_object()?;

        let meta: ToolMetadata = first
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_str()
                    .map(|text| (key.clone(), text.to_string()))
            })
            .collect();

        if meta.is_empty() { None } else { Some(meta) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_client_yields_no_metadata() {
        let client = ExifToolClient::unavailable();
        assert!(!client.is_available());
        assert!(client.read_metadata(Path::new("anything.jpg")).is_none());
    }

    #[test]
    fn test_detect_does_not_panic_without_binary() {
        // Whatever the host has installed, probing must be infallible.
        let _ = ExifToolClient::detect();
    }
}
