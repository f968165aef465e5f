//! Client-side pieces of the mock interview flow.
//!
//! - `report`: turns the six-section feedback text into display sections.
//! - `relay`: drives one interview (upload, voice session, transcript relay, feedback).
//! - `gateway`: typed HTTP client for the interview API.

pub mod error;
pub mod gateway;
pub mod relay;
pub mod report;

pub use error::ClientError;
pub use gateway::{HttpGateway, InterviewGateway};
pub use relay::{InterviewSession, SessionState, VoiceEvent, VoiceSdk};
pub use report::{render, RenderedReport, ReportSection, SectionKind, Verdict};
