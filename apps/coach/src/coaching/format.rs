//! Output formats, perspectives, and the JSON contracts the model must satisfy.
//!
//! Parsing is deliberately forgiving at the edges: a JSON reply that does not
//! parse, or parses into the wrong shape, is rendered as raw text with a notice.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm_client::strip_json_fences;

pub const MATCH_COUNT: usize = 5;
pub const GAP_COUNT: usize = 5;
pub const QUESTION_COUNT: usize = 10;

pub const INVALID_JSON_NOTICE: &str = "Invalid JSON returned. Showing raw response";

/// The output schema of a session. Locked when the session starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Text,
    /// Summaries plus top matches and gaps (`MatchReport`).
    #[serde(rename = "JSON_A")]
    JsonA,
    /// Tailored interview questions with model answers (`QuestionSet`).
    #[serde(rename = "JSON_B")]
    JsonB,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Text, OutputFormat::JsonA, OutputFormat::JsonB];

    pub fn is_json(self) -> bool {
        !matches!(self, OutputFormat::Text)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "Text",
            OutputFormat::JsonA => "JSON_A",
            OutputFormat::JsonB => "JSON_B",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the model role-plays the interviewer or coaches the candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    Interviewer,
    #[default]
    Candidate,
}

impl Perspective {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "interviewer" => Some(Perspective::Interviewer),
            "candidate" => Some(Perspective::Candidate),
            _ => None,
        }
    }
}

/// JSON_A result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub cv_summary: String,
    pub job_summary: String,
    pub matches: Vec<String>,
    pub gaps: Vec<String>,
}

/// JSON_B result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<InterviewQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    /// "behavioral" or "technical" as instructed; kept verbatim from the model.
    #[serde(rename = "type")]
    pub question_type: String,
    pub model_answer: String,
}

/// An assistant turn interpreted against the session's locked format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantOutput {
    Text { text: String },
    MatchReport(MatchReport),
    QuestionSet(QuestionSet),
    /// A JSON format was locked but the reply did not satisfy the contract.
    Raw { text: String, notice: String },
}

/// Interprets raw model text. Never fails: unusable JSON degrades to `Raw`.
pub fn render_output(format: OutputFormat, raw: &str) -> AssistantOutput {
    let parsed = match format {
        OutputFormat::Text => {
            return AssistantOutput::Text {
                text: raw.to_string(),
            }
        }
        OutputFormat::JsonA => parse_match_report(raw).map(AssistantOutput::MatchReport),
        OutputFormat::JsonB => parse_question_set(raw).map(AssistantOutput::QuestionSet),
    };

    parsed.unwrap_or_else(|reason| {
        warn!(format = %format, "Falling back to raw output: {reason}");
        AssistantOutput::Raw {
            text: raw.to_string(),
            notice: INVALID_JSON_NOTICE.to_string(),
        }
    })
}

pub fn parse_match_report(raw: &str) -> Result<MatchReport, String> {
    let report: MatchReport =
        serde_json::from_str(strip_json_fences(raw)).map_err(|e| e.to_string())?;
    if report.matches.len() != MATCH_COUNT || report.gaps.len() != GAP_COUNT {
        return Err(format!(
            "expected {MATCH_COUNT} matches and {GAP_COUNT} gaps, got {} and {}",
            report.matches.len(),
            report.gaps.len()
        ));
    }
    Ok(report)
}

pub fn parse_question_set(raw: &str) -> Result<QuestionSet, String> {
    let set: QuestionSet =
        serde_json::from_str(strip_json_fences(raw)).map_err(|e| e.to_string())?;
    if set.questions.len() != QUESTION_COUNT {
        return Err(format!(
            "expected {QUESTION_COUNT} questions, got {}",
            set.questions.len()
        ));
    }
    Ok(set)
}
