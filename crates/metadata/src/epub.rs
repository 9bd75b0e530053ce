//! EPUB (OCF container + OPF package document) extraction.

use crate::error::{ErrorKind, Result};
use crate::isbn;
use crate::models::BookMetadata;
use crate::xml::{attribute, local_name};
use exn::ResultExt;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};
use tracing::instrument;
use zip::ZipArchive;

const CONTAINER_PATH: &str = "META-INF/container.xml";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Whether the bytes are a readable ZIP archive with an OCF container manifest.
pub(crate) fn has_container(data: &[u8]) -> bool {
    ZipArchive::new(Cursor::new(data)).is_ok_and(|mut archive| archive.by_name(CONTAINER_PATH).is_ok())
}

#[instrument(skip_all)]
pub(crate) fn extract(data: &[u8]) -> Result<BookMetadata> {
    let mut archive = ZipArchive::new(Cursor::new(data)).or_raise(|| ErrorKind::Archive)?;
    let container = read_entry(&mut archive, CONTAINER_PATH)?;
    let opf_path = rootfile(&container)?;
    let package = Package::parse(&read_entry(&mut archive, &opf_path)?)?;
    let cover = match package.cover_href() {
        Some(href) => {
            let cover_path = resolve(&opf_path, href);
            // A dangling cover reference shouldn't sink the whole book.
            read_bytes(&mut archive, &cover_path).unwrap_or_else(|err| {
                tracing::debug!(path = %cover_path, error = ?err, "EPUB cover listed in manifest could not be read");
                Vec::new()
            })
        },
        None => Vec::new(),
    };
    Ok(BookMetadata {
        title: package.title.unwrap_or_default(),
        author: package.creators.join(", "),
        publisher: package.publisher.unwrap_or_default(),
        isbn: package.isbn.unwrap_or_default(),
        cover,
        format: None,
    })
}

fn read_bytes(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name).or_raise(|| ErrorKind::MissingPart("archive entry"))?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf).or_raise(|| ErrorKind::Archive)?;
    Ok(buf)
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<String> {
    Ok(String::from_utf8_lossy(&read_bytes(archive, name)?).into_owned())
}

/// Location of the OPF package document, from `META-INF/container.xml`.
fn rootfile(container: &str) -> Result<String> {
    let mut reader = Reader::from_str(container);
    loop {
        match reader.read_event().or_raise(|| ErrorKind::Xml("container.xml"))? {
            Event::Start(e) | Event::Empty(e) if local_name(&e) == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path", "container.xml")? {
                    return Ok(path);
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    exn::bail!(ErrorKind::MissingPart("rootfile"))
}

/// Resolve a manifest `href` against the directory holding the OPF file.
fn resolve(opf_path: &str, href: &str) -> String {
    let mut segments: Vec<&str> = opf_path.split('/').collect();
    segments.pop();
    for part in href.split('/') {
        match part {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            part => segments.push(part),
        }
    }
    segments.join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Creator,
    Publisher,
    Identifier,
}

#[derive(Debug)]
struct ManifestItem {
    id: String,
    href: String,
    media_type: String,
    properties: String,
}

#[derive(Debug, Default)]
struct Package {
    title: Option<String>,
    creators: Vec<String>,
    publisher: Option<String>,
    isbn: Option<String>,
    /// EPUB 2 `<meta name="cover" content="item-id"/>`
    cover_id: Option<String>,
    manifest: Vec<ManifestItem>,
}

impl Package {
    fn parse(opf: &str) -> Result<Self> {
        let mut reader = Reader::from_str(opf);
        let mut package = Self::default();
        // Element currently collecting text, with its `scheme` attribute.
        let mut open: Option<(Field, Option<String>, String)> = None;
        loop {
            match reader.read_event().or_raise(|| ErrorKind::Xml("package document"))? {
                Event::Start(e) => {
                    open = package.visit(&e)?.map(|(field, scheme)| (field, scheme, String::new()));
                },
                Event::Empty(e) => {
                    package.visit(&e)?;
                },
                Event::Text(text) => {
                    if let Some((_, _, buf)) = open.as_mut() {
                        buf.push_str(&text.unescape().or_raise(|| ErrorKind::Xml("package document"))?);
                    }
                },
                Event::CData(text) => {
                    if let Some((_, _, buf)) = open.as_mut() {
                        buf.push_str(&String::from_utf8_lossy(&text));
                    }
                },
                Event::End(_) => {
                    if let Some((field, scheme, text)) = open.take() {
                        package.record(field, scheme, text.trim());
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }
        Ok(package)
    }

    /// Handle an opening (or empty) element, returning the metadata field
    /// whose text should be collected.
    fn visit(&mut self, e: &BytesStart<'_>) -> Result<Option<(Field, Option<String>)>> {
        const CTX: &str = "package document";
        let field = match local_name(e) {
            b"title" => Field::Title,
            b"creator" => Field::Creator,
            b"publisher" => Field::Publisher,
            b"identifier" => Field::Identifier,
            b"meta" => {
                if attribute(e, b"name", CTX)?.as_deref() == Some("cover") {
                    self.cover_id = attribute(e, b"content", CTX)?;
                }
                return Ok(None);
            },
            b"item" => {
                self.manifest.push(ManifestItem {
                    id: attribute(e, b"id", CTX)?.unwrap_or_default(),
                    href: attribute(e, b"href", CTX)?.unwrap_or_default(),
                    media_type: attribute(e, b"media-type", CTX)?.unwrap_or_default(),
                    properties: attribute(e, b"properties", CTX)?.unwrap_or_default(),
                });
                return Ok(None);
            },
            _ => return Ok(None),
        };
        Ok(Some((field, attribute(e, b"scheme", CTX)?)))
    }

    fn record(&mut self, field: Field, scheme: Option<String>, text: &str) {
        if text.is_empty() {
            return;
        }
        match field {
            // The first title is the main one; later ones are subtitles.
            Field::Title if self.title.is_none() => self.title = Some(text.to_string()),
            Field::Creator => self.creators.push(text.to_string()),
            Field::Publisher if self.publisher.is_none() => self.publisher = Some(text.to_string()),
            Field::Identifier if self.isbn.is_none() => {
                let declared = scheme.is_some_and(|s| s.eq_ignore_ascii_case("isbn"));
                self.isbn = isbn::normalize(text).or_else(|| declared.then(|| text.to_string()));
            },
            _ => {},
        }
    }

    fn cover_href(&self) -> Option<&str> {
        let is_image = |item: &&ManifestItem| item.media_type.starts_with("image/");
        // EPUB 3 marks the cover in the manifest itself.
        self.manifest
            .iter()
            .find(|item| item.properties.split_whitespace().any(|p| p == "cover-image"))
            .or_else(|| {
                let id = self.cover_id.as_deref()?;
                self.manifest.iter().find(|item| item.id == id)
            })
            .or_else(|| {
                self.manifest
                    .iter()
                    .filter(is_image)
                    .find(|item| item.id.to_ascii_lowercase().contains("cover"))
            })
            .map(|item| item.href.as_str())
            .filter(|href| !href.is_empty())
    }
}
