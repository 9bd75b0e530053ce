mod epub;
pub mod error;
mod fb2;
mod format;
mod isbn;
mod models;
mod pdf;
mod xml;

use tracing::instrument;

use crate::error::Result;
pub use crate::format::Format;
pub use crate::models::BookMetadata;

/// Easy, top-level entrypoint for extracting [`BookMetadata`] from the raw
/// bytes of an uploaded book.
///
/// The format is sniffed from the content, never from a file name. Input that
/// isn't EPUB, FB2 or PDF is not an error: the result has `format: None` and
/// every other field empty, and it is up to the caller to reject it.
#[instrument(skip(data), fields(size = data.as_ref().len()))]
pub fn extract(data: impl AsRef<[u8]>) -> Result<BookMetadata> {
    let data = data.as_ref();
    let Some(format) = Format::sniff(data) else {
        tracing::debug!("unrecognised book format");
        return Ok(BookMetadata::default());
    };
    let metadata = match format {
        Format::Epub => epub::extract(data)?,
        Format::Fb2 => fb2::extract(data)?,
        Format::Pdf => pdf::extract(data)?,
    };
    Ok(BookMetadata { format: Some(format), ..metadata })
}

/// Seam between the shelf and whatever reads book files.
///
/// Extraction is CPU-bound and synchronous; async callers are expected to
/// move it off the runtime (`spawn_blocking`).
pub trait Extractor: Send + Sync {
    fn extract(&self, data: &[u8]) -> Result<BookMetadata>;
}

/// The [`Extractor`] backed by this crate's EPUB, FB2 and PDF readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatExtractor;

impl Extractor for FormatExtractor {
    fn extract(&self, data: &[u8]) -> Result<BookMetadata> {
        extract(data)
    }
}
