//! Output formatting utilities for CLI.

use nle_bridge::obs::blstats::{NLE_BL_DEPTH, NLE_BL_SCORE, NLE_BL_TIME};
use nle_bridge::obs::{BLSTATS, CHARS};
use nle_bridge::trace::{FrameChannel, RecordedFrame};
use nle_bridge::{EndCause, Seeds, Session};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Whether the hero stands on the down stairs.
///
/// The demo draws the whole level, so the stairs glyph disappears exactly
/// when the hero covers it.
pub(super) fn on_stairs(session: &Session<'_>) -> bool {
    session
        .observation(CHARS)
        .is_some_and(|chars| !chars.contains(&b'>'))
}

/// Outcome of one episode.
#[derive(Debug, Clone, Serialize)]
pub(super) struct EpisodeSummary {
    /// Module the episode ran in.
    pub(super) module: String,
    /// Seeds the episode ran with.
    pub(super) seeds: Seeds,
    /// Actions sent.
    pub(super) steps: u64,
    /// How it ended (null if the step limit hit first).
    pub(super) end: Option<EndCause>,
    /// Final score.
    pub(super) score: i64,
    /// Final dungeon depth.
    pub(super) depth: i64,
    /// Final game turn.
    pub(super) turn: i64,
    /// Trace file written, if any.
    pub(super) trace: Option<String>,
}

impl EpisodeSummary {
    /// Snapshot the current episode of `session`.
    pub(super) fn from_session(session: &Session<'_>, seeds: Seeds) -> Self {
        let stat = |i: usize| {
            session
                .observation(BLSTATS)
                .and_then(|s| s.get(i).copied())
                .unwrap_or(0)
        };
        Self {
            module: display_path(session.module_path()),
            seeds,
            steps: session.steps(),
            end: session.how_done(),
            score: stat(NLE_BL_SCORE),
            depth: stat(NLE_BL_DEPTH),
            turn: stat(NLE_BL_TIME),
            trace: session.trace_path().map(display_path),
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Aggregate over many episodes.
#[derive(Debug, Serialize)]
pub(super) struct RolloutSummary {
    /// Episodes played.
    pub(super) episodes: u64,
    /// Actions sent across all episodes.
    pub(super) total_steps: u64,
    /// Wall time in seconds.
    pub(super) duration_secs: f64,
    /// Throughput.
    pub(super) steps_per_sec: f64,
    /// Episodes per end cause; `TIMEOUT` counts step-limit cutoffs.
    pub(super) end_causes: BTreeMap<String, u64>,
    /// Mean final score.
    pub(super) mean_score: f64,
    /// Deepest level reached by any episode.
    pub(super) max_depth: i64,
    /// Per-episode results.
    pub(super) results: Vec<EpisodeSummary>,
}

/// Trace file statistics.
#[derive(Debug, Default, Serialize)]
pub(super) struct TraceSummary {
    /// Frames in the file.
    pub(super) frames: usize,
    /// Terminal output frames.
    pub(super) output_frames: usize,
    /// Input frames (one per action).
    pub(super) input_frames: usize,
    /// Total terminal output bytes.
    pub(super) output_bytes: usize,
    /// Seconds between first and last frame.
    pub(super) span_secs: u32,
    /// Count per action key.
    pub(super) actions: BTreeMap<String, usize>,
}

impl TraceSummary {
    pub(super) fn from_frames(frames: &[RecordedFrame]) -> Self {
        let mut summary = Self {
            frames: frames.len(),
            ..Self::default()
        };
        for frame in frames {
            match frame.channel {
                FrameChannel::Output => {
                    summary.output_frames += 1;
                    summary.output_bytes += frame.payload.len();
                }
                FrameChannel::Input => {
                    summary.input_frames += 1;
                    if let Some(action) = frame.action() {
                        *summary.actions.entry(action_label(action)).or_default() += 1;
                    }
                }
            }
        }
        if let (Some(first), Some(last)) = (frames.first(), frames.last()) {
            summary.span_secs = last.sec.saturating_sub(first.sec);
        }
        summary
    }
}

/// Printable name of an action key.
pub(super) fn action_label(action: i32) -> String {
    match u8::try_from(action) {
        Ok(27) => "ESC".to_string(),
        Ok(b) if b.is_ascii_graphic() => char::from(b).to_string(),
        _ => format!("#{action}"),
    }
}

/// Format one episode as human-readable text.
pub(super) fn format_episode(result: &EpisodeSummary) -> String {
    let mut output = String::new();
    let (core, disp, reseed, lgen) = result.seeds.as_tuple();

    output.push_str(&format!("Episode ({})\n", result.module));
    output.push_str(&format!("  Seeds: core={core} disp={disp} reseed={reseed}"));
    if let Some(lgen) = lgen {
        output.push_str(&format!(" lgen={lgen}"));
    }
    output.push('\n');
    match result.end {
        Some(how) => output.push_str(&format!("  End: {how}\n")),
        None => output.push_str("  End: step limit reached\n"),
    }
    output.push_str(&format!(
        "  Steps: {}  Turn: {}  Depth: {}  Score: {}\n",
        result.steps, result.turn, result.depth, result.score
    ));
    if let Some(trace) = &result.trace {
        output.push_str(&format!("  Trace: {trace}\n"));
    }
    output
}

/// Format a rollout as human-readable text.
pub(super) fn format_rollout(summary: &RolloutSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Rollout: {} episodes\n", summary.episodes));
    output.push_str(&format!(
        "  Steps: {} ({:.0} steps/sec over {:.2}s)\n",
        summary.total_steps, summary.steps_per_sec, summary.duration_secs
    ));
    output.push_str(&format!(
        "  Mean score: {:.1}  Max depth: {}\n\n",
        summary.mean_score, summary.max_depth
    ));
    output.push_str("  End causes:\n");
    for (cause, count) in &summary.end_causes {
        #[allow(clippy::cast_precision_loss)]
        let pct = *count as f64 * 100.0 / summary.episodes.max(1) as f64;
        output.push_str(&format!("    {cause:<14} {count:>6} ({pct:.1}%)\n"));
    }
    output
}

/// Format trace statistics as human-readable text.
pub(super) fn format_trace(path: &Path, summary: &TraceSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Trace: {}\n", path.display()));
    output.push_str(&format!(
        "  Frames: {} ({} output, {} input)\n",
        summary.frames, summary.output_frames, summary.input_frames
    ));
    output.push_str(&format!("  Output bytes: {}\n", summary.output_bytes));
    output.push_str(&format!("  Span: {}s\n", summary.span_secs));
    if !summary.actions.is_empty() {
        output.push_str("  Actions:\n");
        for (action, count) in &summary.actions {
            output.push_str(&format!("    {action:<4} {count}\n"));
        }
    }
    output
}
