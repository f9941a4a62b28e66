//! Element tree built from the tag stream. Every open tag must be closed by
//! a tag of the same name; text content is not retained.

use super::lexer::{Spanned, Token};
use super::DecodeError;

/// Nesting deeper than this is rejected rather than recursed into.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub offset: usize,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first iteration over this element and all descendants.
    pub fn walk(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(e) = stack.pop() {
            out.push(e);
            stack.extend(e.children.iter().rev());
        }
        out
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    end_offset: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Option<&'a Spanned> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn element(&mut self, open: &'a Spanned, depth: usize) -> Result<Element, DecodeError> {
        let Token::Open {
            name,
            attrs,
            self_closing,
        } = &open.token
        else {
            return Err(DecodeError::new(open.offset, "expected an opening tag"));
        };
        if depth > MAX_DEPTH {
            return Err(DecodeError::new(open.offset, "elements nested too deeply"));
        }

        let mut element = Element {
            name: name.clone(),
            attrs: attrs.clone(),
            children: Vec::new(),
            offset: open.offset,
        };
        if *self_closing {
            return Ok(element);
        }

        loop {
            let Some(tok) = self.next() else {
                return Err(DecodeError::new(
                    self.end_offset,
                    format!("element <{}> opened at byte {} is never closed", name, open.offset),
                ));
            };
            match &tok.token {
                Token::Open { .. } => {
                    let child = self.element(tok, depth + 1)?;
                    element.children.push(child);
                }
                Token::Close { name: closing } if closing == name => return Ok(element),
                Token::Close { name: closing } => {
                    return Err(DecodeError::new(
                        tok.offset,
                        format!("mismatched closing tag </{}>, expected </{}>", closing, name),
                    ));
                }
            }
        }
    }
}

/// Build the element tree for a single-rooted document.
pub fn parse(tokens: &[Spanned], src_len: usize) -> Result<Element, DecodeError> {
    let mut p = Parser {
        tokens,
        pos: 0,
        end_offset: src_len,
    };
    let root = match p.next() {
        Some(t) if matches!(t.token, Token::Open { .. }) => p.element(t, 0)?,
        Some(t) => {
            return Err(DecodeError::new(t.offset, "closing tag before any root element"));
        }
        None => return Err(DecodeError::new(src_len, "missing root element")),
    };
    if let Some(extra) = p.next() {
        return Err(DecodeError::new(extra.offset, "content after the root element"));
    }
    Ok(root)
}
