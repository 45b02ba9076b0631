//! Prompt Builder: pure functions from session inputs to a system/user prompt pair.
//!
//! No I/O and no clock: identical inputs always produce identical prompts.

use crate::coaching::format::{OutputFormat, Perspective};
use crate::coaching::prompts::{
    BASE_TASK_TEMPLATE, CANDIDATE_PERSPECTIVE, CONTINUE_STEP, HISTORY_HEADER,
    INTERVIEWER_PERSPECTIVE, JSON_A_FORMAT_INSTRUCTION, JSON_A_TASK_TEMPLATE,
    JSON_B_FORMAT_INSTRUCTION, JSON_B_TASK_TEMPLATE, NEW_MESSAGE_HEADER, START_STEP,
    TEXT_FORMAT_INSTRUCTION,
};
use crate::coaching::session::TranscriptEntry;
use crate::llm_client::prompts::{COACH_SYSTEM, JSON_OUTPUT_RULE};

/// Number of transcript messages (including the new one) quoted into a turn prompt.
pub const HISTORY_WINDOW: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// The immutable inputs of a session that every prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub perspective: Perspective,
    pub format: OutputFormat,
    pub cv_text: &'a str,
    pub jd_text: &'a str,
}

pub fn format_instruction(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => TEXT_FORMAT_INSTRUCTION,
        OutputFormat::JsonA => JSON_A_FORMAT_INSTRUCTION,
        OutputFormat::JsonB => JSON_B_FORMAT_INSTRUCTION,
    }
}

pub fn perspective_text(perspective: Perspective) -> &'static str {
    match perspective {
        Perspective::Interviewer => INTERVIEWER_PERSPECTIVE,
        Perspective::Candidate => CANDIDATE_PERSPECTIVE,
    }
}

/// The coaching system prompt, tightened to JSON-only output for JSON formats.
pub fn system_prompt(format: OutputFormat) -> String {
    if format.is_json() {
        format!("{COACH_SYSTEM}{JSON_OUTPUT_RULE}")
    } else {
        COACH_SYSTEM.to_string()
    }
}

fn base_task(inputs: &PromptInputs<'_>, step4: &str) -> String {
    fill_template(
        BASE_TASK_TEMPLATE,
        &[
            ("step4", step4),
            ("perspective", perspective_text(inputs.perspective)),
            ("cv_text", inputs.cv_text),
            ("jd_text", inputs.jd_text),
        ],
    )
}

/// Prompt for the opening turn of a session.
pub fn build_start_prompt(inputs: &PromptInputs<'_>) -> PromptPair {
    let instruction = format_instruction(inputs.format);
    let documents = [("cv_text", inputs.cv_text), ("jd_text", inputs.jd_text)];

    let user = match inputs.format {
        OutputFormat::Text => format!("{instruction}\n\n{}", base_task(inputs, START_STEP)),
        OutputFormat::JsonA => format!(
            "{instruction}\n\n{}",
            fill_template(JSON_A_TASK_TEMPLATE, &documents)
        ),
        OutputFormat::JsonB => format!(
            "{instruction}\n\n{}\n\n{}",
            fill_template(JSON_B_TASK_TEMPLATE, &documents),
            perspective_text(inputs.perspective)
        ),
    };

    PromptPair {
        system: system_prompt(inputs.format),
        user,
    }
}

/// Prompt for a follow-up turn. `history` is the transcript before this turn;
/// `new_message` is the pending user message, not yet recorded.
pub fn build_turn_prompt(
    inputs: &PromptInputs<'_>,
    history: &[TranscriptEntry],
    new_message: &str,
) -> PromptPair {
    let keep = HISTORY_WINDOW.saturating_sub(1);
    let recent = &history[history.len().saturating_sub(keep)..];

    let mut history_block: Vec<String> = recent
        .iter()
        .map(|entry| format!("{}: {}", entry.role.label(), entry.content))
        .collect();
    history_block.push(format!("USER: {new_message}"));

    let user = format!(
        "{}\n\n{}\n\n{HISTORY_HEADER}\n{}\n\n{NEW_MESSAGE_HEADER}\n{new_message}\n",
        format_instruction(inputs.format),
        base_task(inputs, CONTINUE_STEP),
        history_block.join("\n"),
    );

    PromptPair {
        system: system_prompt(inputs.format),
        user,
    }
}

/// Single-pass `{key}` substitution. Values are inserted verbatim and never
/// rescanned, so placeholder-like text inside a CV stays untouched.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
