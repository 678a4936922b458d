//! Locates the structured payload inside generated text.
//!
//! The generator is told to answer with a bare JSON object, but it regularly
//! wraps it in code fences or chatty prose. We take everything from the first
//! `{` to the last `}`. This is not a balanced-brace parse: two sibling
//! objects, or a stray brace in surrounding prose, yield a wrong span that the
//! validator then rejects.

use crate::{Error, Result};

/// Return the outermost `{ ... }` span of `text`, delimiters included.
pub fn extract_payload(text: &str) -> Result<&str> {
    let start = text.find('{').ok_or(Error::Extraction)?;
    let end = text.rfind('}').ok_or(Error::Extraction)?;

    if end < start {
        return Err(Error::Extraction);
    }

    // Both delimiters are single-byte ASCII, so these are char boundaries.
    Ok(&text[start..=end])
}
