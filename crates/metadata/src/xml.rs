use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use quick_xml::events::BytesStart;

/// Element name without its namespace prefix (`dc:title` → `title`).
pub(crate) fn local_name<'a>(e: &'a BytesStart<'_>) -> &'a [u8] {
    e.local_name().into_inner()
}

/// Unescaped value of the first attribute whose local name matches.
pub(crate) fn attribute(e: &BytesStart<'_>, name: &[u8], context: &'static str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.or_raise(|| ErrorKind::Xml(context))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().or_raise(|| ErrorKind::Xml(context))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
