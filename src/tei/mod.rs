//! TEI (GROBID) document handling.

mod metadata;
mod text;

pub use metadata::{parse_tei_metadata, TeiError};
pub use text::extract_tei_text;

/// TEI namespace URI.
pub const TEI_NS: &[u8] = b"http://www.tei-c.org/ns/1.0";
