use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::DecodeError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `<name attr="v">` or `<name attr="v"/>`
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    /// `</name>`
    Close { name: String },
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// Byte offset of the `<`.
    pub offset: usize,
}

/// Split engine output into tags. Text, comments, processing instructions,
/// declarations and CDATA sections are skipped. Tag nesting is checked by
/// the parser, not here.
pub fn lex(src: &str) -> Result<Vec<Spanned>, DecodeError> {
    let mut reader = Reader::from_str(src);
    reader.check_end_names(false);

    let mut tokens = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|e| DecodeError::new(reader.buffer_position(), e.to_string()))?;
        // The reader stops just past the tag's `>`.
        let end = reader.buffer_position();
        let offset = src.get(..end).and_then(|s| s.rfind('<')).unwrap_or(end);
        let token = match event {
            Event::Start(tag) => open(&tag, false, offset)?,
            Event::Empty(tag) => open(&tag, true, offset)?,
            Event::End(tag) => Token::Close {
                name: utf8(tag.name().as_ref(), offset)?,
            },
            Event::Eof => break,
            _ => continue,
        };
        tokens.push(Spanned { token, offset });
    }
    Ok(tokens)
}

fn open(tag: &BytesStart<'_>, self_closing: bool, offset: usize) -> Result<Token, DecodeError> {
    let name = utf8(tag.name().as_ref(), offset)?;
    let mut attrs = Vec::new();
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| DecodeError::new(offset, format!("in <{}>: {}", name, e)))?;
        let key = utf8(attr.key.as_ref(), offset)?;
        // Unknown entity references are kept verbatim.
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.push((key, value));
    }
    Ok(Token::Open {
        name,
        attrs,
        self_closing,
    })
}

fn utf8(bytes: &[u8], offset: usize) -> Result<String, DecodeError> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => Ok(s.to_string()),
        Cow::Owned(_) => Err(DecodeError::new(offset, "tag or attribute name is not UTF-8")),
    }
}
