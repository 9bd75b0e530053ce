use derive_more::Display;
use std::str::FromStr;

/// Book file formats the extractor understands.
///
/// The [`Display`] form doubles as the file extension used for storage keys
/// and as the value recorded in the catalog.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    #[display("epub")]
    Epub,
    #[display("fb2")]
    Fb2,
    #[display("pdf")]
    Pdf,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PDF_MAGIC: &[u8] = b"%PDF-";
// The OCF container requires an uncompressed `mimetype` entry first in the
// archive, which puts its name and contents right after the 30-byte local
// file header.
const EPUB_MIMETYPE: &[u8] = b"mimetypeapplication/epub+zip";
const XML_SNIFF_WINDOW: usize = 1024;

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Epub => "epub",
            Self::Fb2 => "fb2",
            Self::Pdf => "pdf",
        }
    }

    /// Detect the format from the leading bytes of a file.
    ///
    /// Returns `None` for anything that isn't recognisably one of the
    /// supported formats (including ZIP archives that aren't EPUBs).
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(PDF_MAGIC) {
            return Some(Self::Pdf);
        }
        if data.starts_with(ZIP_MAGIC) {
            return match data.get(30..30 + EPUB_MIMETYPE.len()) {
                Some(window) if window == EPUB_MIMETYPE => Some(Self::Epub),
                // Plenty of EPUBs in the wild are zipped without respecting
                // the entry order; look for the container manifest instead.
                _ => crate::epub::has_container(data).then_some(Self::Epub),
            };
        }
        let head = &data[..data.len().min(XML_SNIFF_WINDOW)];
        let head = String::from_utf8_lossy(head);
        let head = head.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with('<') && head.contains("<FictionBook") {
            return Some(Self::Fb2);
        }
        None
    }
}

impl FromStr for Format {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "epub" => Ok(Self::Epub),
            "fb2" => Ok(Self::Fb2),
            "pdf" => Ok(Self::Pdf),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3", Some(Format::Pdf))]
    #[case(b"PK\x03\x04\x0a\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x08\x00\x00\x00mimetypeapplication/epub+zip", Some(Format::Epub))]
    #[case(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<FictionBook xmlns=\"http://www.gribuser.ru/xml/fictionbook/2.0\">", Some(Format::Fb2))]
    #[case(b"\xef\xbb\xbf  <FictionBook>", Some(Format::Fb2))]
    #[case(b"<?xml version=\"1.0\"?><html></html>", None)]
    #[case(b"plain text, not a book", None)]
    #[case(b"", None)]
    fn test_sniff(#[case] data: &[u8], #[case] expected: Option<Format>) {
        assert_eq!(Format::sniff(data), expected);
    }

    #[test]
    fn test_zip_without_container_is_unknown() {
        // A truncated local header that isn't a readable archive.
        assert_eq!(Format::sniff(b"PK\x03\x04garbage"), None);
    }

    #[test]
    fn test_display_matches_extension() {
        for format in [Format::Epub, Format::Fb2, Format::Pdf] {
            assert_eq!(format.to_string(), format.extension());
            assert_eq!(format.extension().parse::<Format>(), Ok(format));
        }
        assert_eq!(".EPUB".parse::<Format>(), Ok(Format::Epub));
        assert!("mobi".parse::<Format>().is_err());
    }
}
