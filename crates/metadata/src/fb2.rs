//! FictionBook 2 extraction.
//!
//! FB2 is a single XML document: bibliographic data lives under
//! `description/title-info` and `description/publish-info`, and the cover is
//! an `<image>` in `title-info/coverpage` pointing at a base64 `<binary>`
//! further down the file.

use crate::error::{ErrorKind, Result};
use crate::isbn;
use crate::models::BookMetadata;
use crate::xml::{attribute, local_name};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use exn::ResultExt;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::instrument;

const CONTEXT: &str = "FB2 document";

#[instrument(skip_all)]
pub(crate) fn extract(data: &[u8]) -> Result<BookMetadata> {
    let text = String::from_utf8_lossy(data);
    let mut reader = Reader::from_str(&text);
    let mut stack: Vec<String> = Vec::new();
    let mut book = FictionBook::default();
    loop {
        match reader.read_event().or_raise(|| ErrorKind::Xml(CONTEXT))? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(local_name(&e)).into_owned();
                book.open(&stack, &name, &e)?;
                stack.push(name);
            },
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(local_name(&e)).into_owned();
                book.open(&stack, &name, &e)?;
            },
            Event::Text(t) => {
                let t = t.unescape().or_raise(|| ErrorKind::Xml(CONTEXT))?;
                book.text(&stack, &t);
            },
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    book.close(&stack, &name);
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(book.finish())
}

#[derive(Debug, Default)]
struct AuthorName {
    first: String,
    middle: String,
    last: String,
    nickname: String,
}

impl AuthorName {
    fn display(&self) -> Option<String> {
        let full = [&self.first, &self.middle, &self.last]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let name = if full.is_empty() { self.nickname.trim().to_string() } else { full };
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Default)]
struct FictionBook {
    title: String,
    authors: Vec<String>,
    author: Option<AuthorName>,
    publisher: String,
    isbn: String,
    cover_id: Option<String>,
    in_cover_binary: bool,
    cover_base64: String,
}

fn parent(stack: &[String]) -> Option<&str> {
    stack.len().checked_sub(2).map(|i| stack[i].as_str())
}

impl FictionBook {
    fn open(&mut self, stack: &[String], name: &str, e: &BytesStart<'_>) -> Result<()> {
        let top = stack.last().map(String::as_str);
        match (name, top) {
            ("author", Some("title-info")) => self.author = Some(AuthorName::default()),
            ("image", Some("coverpage")) if self.cover_id.is_none() => {
                self.cover_id = attribute(e, b"href", CONTEXT)?
                    .map(|href| href.trim_start_matches('#').to_string())
                    .filter(|id| !id.is_empty());
            },
            ("binary", _) => {
                let id = attribute(e, b"id", CONTEXT)?;
                self.in_cover_binary = self.cover_id.is_some() && id == self.cover_id;
            },
            _ => {},
        }
        Ok(())
    }

    fn text(&mut self, stack: &[String], text: &str) {
        let Some(current) = stack.last().map(String::as_str) else {
            return;
        };
        match (current, parent(stack)) {
            ("book-title", Some("title-info")) => self.title.push_str(text),
            ("publisher", Some("publish-info")) => self.publisher.push_str(text),
            ("isbn", Some("publish-info")) => self.isbn.push_str(text),
            ("binary", _) if self.in_cover_binary => self.cover_base64.push_str(text),
            (part, Some("author")) => {
                if let Some(author) = self.author.as_mut() {
                    match part {
                        "first-name" => author.first.push_str(text),
                        "middle-name" => author.middle.push_str(text),
                        "last-name" => author.last.push_str(text),
                        "nickname" => author.nickname.push_str(text),
                        _ => {},
                    }
                }
            },
            _ => {},
        }
    }

    fn close(&mut self, stack: &[String], name: &str) {
        match (name, stack.last().map(String::as_str)) {
            ("author", Some("title-info")) => {
                if let Some(author) = self.author.take().and_then(|a| a.display()) {
                    self.authors.push(author);
                }
            },
            ("binary", _) => self.in_cover_binary = false,
            _ => {},
        }
    }

    fn finish(self) -> BookMetadata {
        let encoded: String = self.cover_base64.split_ascii_whitespace().collect();
        let cover = if encoded.is_empty() {
            Vec::new()
        } else {
            BASE64.decode(encoded.as_bytes()).unwrap_or_else(|err| {
                tracing::debug!(error = %err, "FB2 cover binary is not valid base64");
                Vec::new()
            })
        };
        let isbn = self.isbn.trim();
        BookMetadata {
            title: self.title.trim().to_string(),
            author: self.authors.join(", "),
            publisher: self.publisher.trim().to_string(),
            isbn: isbn::normalize(isbn).unwrap_or_else(|| isbn.to_string()),
            cover,
            format: None,
        }
    }
}
