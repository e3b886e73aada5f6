//! The JSON report shape described in the engine's own documentation of its
//! external interface: hunks plus a summary, with the patched bytes written
//! separately (to `--out` or stdout) rather than embedded here.

use serde::Serialize;

use hunkstitch_core::{HunkReport, PipelineResult, Summary};

#[derive(Serialize)]
pub struct Report<'a> {
    pub hunks: &'a [HunkReport],
    pub summary: Summary,
    pub parse_error: &'a Option<String>,
}

impl<'a> From<&'a PipelineResult> for Report<'a> {
    fn from(result: &'a PipelineResult) -> Self {
        Report {
            hunks: &result.hunks,
            summary: result.summary,
            parse_error: &result.parse_error,
        }
    }
}
