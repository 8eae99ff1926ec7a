//! Trace-info command implementation.

use super::output::{TraceSummary, format_trace};
use super::{CliError, OutputFormat};
use nle_bridge::trace::read_trace;
use std::path::Path;

/// Execute the trace-info command.
///
/// # Errors
///
/// Returns an error if the trace can't be read or is truncated.
pub(crate) fn execute(path: &Path, format: OutputFormat) -> Result<(), CliError> {
    let frames = read_trace(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    let summary = TraceSummary::from_frames(&frames);

    match format {
        OutputFormat::Text => print!("{}", format_trace(path, &summary)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}
