// Résumé intake: text extraction, optional archival of the original upload, HTTP handler.

pub mod archive;
pub mod extract;
pub mod handlers;
