//! PDF document information dictionary.

use crate::error::{ErrorKind, Result};
use crate::isbn;
use crate::models::BookMetadata;
use exn::ResultExt;
use lopdf::{Dictionary, Document, Object};
use tracing::instrument;

#[instrument(skip_all)]
pub(crate) fn extract(data: &[u8]) -> Result<BookMetadata> {
    let document = Document::load_mem(data).or_raise(|| ErrorKind::Pdf)?;
    let Some(info) = info_dictionary(&document) else {
        return Ok(BookMetadata::default());
    };
    // ISBNs are commonly tucked into the keywords or subject.
    let isbn = [b"Keywords".as_slice(), b"Subject".as_slice()]
        .into_iter()
        .filter_map(|key| text(info, key))
        .flat_map(|value| {
            value
                .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';'))
                .filter_map(isbn::normalize)
                .collect::<Vec<_>>()
        })
        .next()
        .unwrap_or_default();
    Ok(BookMetadata {
        title: text(info, b"Title").unwrap_or_default(),
        author: text(info, b"Author").unwrap_or_default(),
        isbn,
        ..BookMetadata::default()
    })
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn text(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::String(bytes, _) => decode(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        _ => return None,
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Text strings are UTF-16BE when they carry a byte order mark, and
/// PDFDocEncoding (treated as Latin-1) otherwise.
fn decode(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xfe, 0xff]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
            String::from_utf16_lossy(&units)
        },
        None => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{Dictionary, Document, Object, dictionary};

    /// A one-page PDF whose trailer references the given info dictionary.
    pub(crate) fn build(info: Option<Dictionary>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(info) = info {
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}
