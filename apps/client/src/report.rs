//! Report Renderer — classifies the LLM's six-section feedback text into display sections.
//!
//! The feedback prompt asks for six literal labels in a fixed order. Rendering is a lossy,
//! label-driven scan: blocks carrying none of the labels are dropped without error, and a
//! section whose label the model omitted simply does not appear. `missing_labels` exposes
//! that gap so callers can log it instead of silently losing a section.

use serde::Serialize;

// ────────────────────────────────────────────────────────────────────────────
// Section vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// The six sections of a feedback report, in template order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    OverallScore,
    Strengths,
    Weaknesses,
    CommunicationSkills,
    TechnicalUnderstanding,
    FinalRecommendation,
}

impl SectionKind {
    /// All kinds in the order the prompt demands them.
    pub const ALL: [SectionKind; 6] = [
        SectionKind::OverallScore,
        SectionKind::Strengths,
        SectionKind::Weaknesses,
        SectionKind::CommunicationSkills,
        SectionKind::TechnicalUnderstanding,
        SectionKind::FinalRecommendation,
    ];

    /// The literal label the LLM is instructed to emit, colon included.
    pub fn label(self) -> &'static str {
        match self {
            SectionKind::OverallScore => "Overall Score:",
            SectionKind::Strengths => "Strengths:",
            SectionKind::Weaknesses => "Weaknesses:",
            SectionKind::CommunicationSkills => "Communication Skills:",
            SectionKind::TechnicalUnderstanding => "Technical Understanding:",
            SectionKind::FinalRecommendation => "Final Recommendation:",
        }
    }

    /// Heading shown to the candidate.
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::OverallScore => "Overall Score",
            SectionKind::Strengths => "Strengths",
            SectionKind::Weaknesses => "Areas for Improvement",
            SectionKind::CommunicationSkills => "Communication Skills",
            SectionKind::TechnicalUnderstanding => "Technical Understanding",
            SectionKind::FinalRecommendation => "Final Recommendation",
        }
    }
}

/// Hiring verdict extracted from the final recommendation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Hire,
    NoHire,
    NeedsImprovement,
    Unclear,
}

impl Verdict {
    /// "No Hire" is checked before "Hire" since the latter is a substring of the former.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("no hire") {
            Verdict::NoHire
        } else if lower.contains("needs improvement") {
            Verdict::NeedsImprovement
        } else if lower.contains("hire") {
            Verdict::Hire
        } else {
            Verdict::Unclear
        }
    }
}

/// One displayed block of the report, with its label and bullet markers removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportSection {
    OverallScore { score: String },
    Strengths { items: Vec<String> },
    Weaknesses { items: Vec<String> },
    CommunicationSkills { text: String },
    TechnicalUnderstanding { text: String },
    FinalRecommendation { verdict: Verdict, text: String },
}

impl ReportSection {
    pub fn kind(&self) -> SectionKind {
        match self {
            ReportSection::OverallScore { .. } => SectionKind::OverallScore,
            ReportSection::Strengths { .. } => SectionKind::Strengths,
            ReportSection::Weaknesses { .. } => SectionKind::Weaknesses,
            ReportSection::CommunicationSkills { .. } => SectionKind::CommunicationSkills,
            ReportSection::TechnicalUnderstanding { .. } => SectionKind::TechnicalUnderstanding,
            ReportSection::FinalRecommendation { .. } => SectionKind::FinalRecommendation,
        }
    }
}

/// Result of rendering feedback text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderedReport {
    /// Recognised sections in the order they appeared. May be empty.
    Report { sections: Vec<ReportSection> },
    /// The input was not usable text at all.
    InvalidFormat,
}

impl RenderedReport {
    pub fn sections(&self) -> &[ReportSection] {
        match self {
            RenderedReport::Report { sections } => sections,
            RenderedReport::InvalidFormat => &[],
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// Renders raw bytes, falling back to `InvalidFormat` when they are not UTF-8.
pub fn render_bytes(raw: &[u8]) -> RenderedReport {
    match std::str::from_utf8(raw) {
        Ok(text) => render(text),
        Err(_) => RenderedReport::InvalidFormat,
    }
}

/// Splits feedback text into blocks and classifies each by its label.
///
/// Never panics. Blank input is `InvalidFormat`; text with no recognised labels is an
/// empty report.
pub fn render(feedback: &str) -> RenderedReport {
    if feedback.trim().is_empty() {
        return RenderedReport::InvalidFormat;
    }

    let normalized = feedback.replace("\r\n", "\n");
    let sections = split_blocks(&normalized)
        .iter()
        .filter_map(|block| classify_block(block))
        .collect();

    RenderedReport::Report { sections }
}

/// Template labels that do not occur anywhere in `feedback` (case-insensitive).
pub fn missing_labels(feedback: &str) -> Vec<SectionKind> {
    SectionKind::ALL
        .into_iter()
        .filter(|kind| find_label(feedback, kind.label()).is_none())
        .collect()
}

/// Blank-line-delimited blocks. A labelled line inside a block also starts a new block,
/// so dense single-newline output still yields one block per section.
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut blocks);
            continue;
        }
        if !current.is_empty() && starts_with_label(line) {
            flush(&mut current, &mut blocks);
        }
        current.push(line);
    }
    flush(&mut current, &mut blocks);

    blocks
}

fn flush(current: &mut Vec<&str>, blocks: &mut Vec<String>) {
    if !current.is_empty() {
        blocks.push(current.join("\n"));
        current.clear();
    }
}

fn starts_with_label(line: &str) -> bool {
    let stripped = line.trim_start_matches(|c: char| c == '#' || c == '*' || c == '_' || c.is_whitespace());
    SectionKind::ALL.iter().any(|kind| {
        let label = kind.label();
        stripped.len() >= label.len()
            && stripped.as_bytes()[..label.len()].eq_ignore_ascii_case(label.as_bytes())
    })
}

/// Byte offset of `label` in `haystack`, ignoring ASCII case.
/// Labels are ASCII, so ASCII lowercasing keeps offsets aligned with the original text.
fn find_label(haystack: &str, label: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&label.to_ascii_lowercase())
}

fn classify_block(block: &str) -> Option<ReportSection> {
    // The earliest label is the heading; later ones are just words in the prose.
    let (kind, offset) = SectionKind::ALL
        .into_iter()
        .filter_map(|kind| find_label(block, kind.label()).map(|pos| (kind, pos)))
        .min_by_key(|&(_, pos)| pos)?;

    let body = block[offset + kind.label().len()..]
        .trim_start_matches(['*', '_'])
        .trim();

    let section = match kind {
        SectionKind::OverallScore => ReportSection::OverallScore {
            score: if body.is_empty() {
                "N/A".to_string()
            } else {
                body.to_string()
            },
        },
        SectionKind::Strengths => ReportSection::Strengths {
            items: bullet_items(body),
        },
        SectionKind::Weaknesses => ReportSection::Weaknesses {
            items: bullet_items(body),
        },
        SectionKind::CommunicationSkills => ReportSection::CommunicationSkills {
            text: body.to_string(),
        },
        SectionKind::TechnicalUnderstanding => ReportSection::TechnicalUnderstanding {
            text: body.to_string(),
        },
        SectionKind::FinalRecommendation => ReportSection::FinalRecommendation {
            verdict: Verdict::classify(body),
            text: body.to_string(),
        },
    };

    Some(section)
}

fn bullet_items(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .map(strip_bullet)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    for marker in ["- ", "-", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim();
        }
    }
    line
}
