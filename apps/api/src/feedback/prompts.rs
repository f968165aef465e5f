// LLM prompt templates for interview feedback.
// The labels below are parsed by `interview_client::report`; keep them in sync.

pub const FEEDBACK_SYSTEM: &str = "\
You are a senior technical interviewer evaluating a candidate after a mock interview. \
Be specific, fair and concise. \
Respond in plain text using exactly the section labels you are given, in the given order. \
Do NOT add extra sections, headings, preambles or closing remarks.";

/// Feedback prompt template. Replace `{transcript}` before sending.
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"Analyze the interview conversation below and return a professional evaluation report.

Format the report EXACTLY like this, keeping every label verbatim, in this order, with a blank line between sections:

Overall Score: (out of 10)

Strengths:
- point

Weaknesses:
- point

Communication Skills:
(short evaluation)

Technical Understanding:
(short evaluation)

Final Recommendation:
(Hire / No Hire / Needs Improvement)

Interview Transcript:
{transcript}"#;
