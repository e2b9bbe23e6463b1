//! Streaming Fragment Decoder
//!
//! Response bodies arrive in arbitrary chunks: a chunk may end in the middle
//! of a multi-byte character, a tag, or a fragment. The decoder buffers
//! bytes, decodes the valid UTF-8 prefix, and releases every top-level
//! element that is complete so far. Whatever is left waits for the next
//! chunk.
//!
//! # Scanning
//!
//! The scanner tracks element depth only. It understands quoted attribute
//! values, comments, doctype-like declarations, void and self-closing tags,
//! and raw-text elements (`script`, `style`, `textarea`, `title`) whose
//! content may contain `<` freely. Text between top-level elements is
//! dropped.

use crate::dom::is_void_element;

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Incremental splitter of a response body into top-level fragments.
#[derive(Debug, Default)]
pub struct FragmentDecoder {
    bytes: Vec<u8>,
    text: String,
}

impl FragmentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk. Returns the source of every fragment completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);
        self.decode_utf8();

        let (fragments, consumed) = split_complete(&self.text);
        let fragments = fragments.into_iter().map(String::from).collect();
        self.text.drain(..consumed);
        fragments
    }

    /// End of body. Any unfinished markup is released as a final fragment
    /// for the lenient parser to close.
    pub fn finish(mut self) -> Vec<String> {
        if !self.bytes.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.bytes));
        }
        let rest = self.text.trim();
        if rest.is_empty() {
            Vec::new()
        } else {
            vec![rest.to_string()]
        }
    }

    /// Text decoded but not yet released.
    pub fn pending(&self) -> &str {
        &self.text
    }

    fn decode_utf8(&mut self) {
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(text) => {
                    self.text.push_str(text);
                    self.bytes.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.bytes[..valid]));
                    match err.error_len() {
                        // Invalid sequence: replace it and keep going.
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.bytes.drain(..valid + len);
                        }
                        // Truncated sequence: wait for the next chunk.
                        None => {
                            self.bytes.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Split `text` into complete top-level elements. Returns them together
/// with the number of bytes that may be discarded.
fn split_complete(text: &str) -> (Vec<&str>, usize) {
    let bytes = text.as_bytes();
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &text[i..];

        if rest.starts_with("<!--") {
            match rest[4..].find("-->") {
                Some(end) => i += 4 + end + 3,
                None => return (fragments, start.unwrap_or(i)),
            }
            continue;
        }

        if rest.starts_with("</") {
            let Some(end) = rest.find('>') else {
                return (fragments, start.unwrap_or(i));
            };
            i += end + 1;
            depth = depth.saturating_sub(1);
            if depth == 0 {
                if let Some(s) = start.take() {
                    fragments.push(&text[s..i]);
                }
            }
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            let Some(end) = rest.find('>') else {
                return (fragments, start.unwrap_or(i));
            };
            i += end + 1;
            continue;
        }

        if !rest[1..].starts_with(|ch: char| ch.is_ascii_alphabetic()) {
            if rest.len() == 1 {
                // A lone `<` may be the start of a tag in the next chunk.
                return (fragments, start.unwrap_or(i));
            }
            i += 1;
            continue;
        }

        let Some(end) = tag_end(rest) else {
            return (fragments, start.unwrap_or(i));
        };
        let name: String = rest[1..]
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        let self_closing = rest[..end].ends_with('/');
        let open = i;
        i += end + 1;

        if depth == 0 {
            start = Some(open);
        }

        if is_void_element(&name) || self_closing {
            if depth == 0 {
                if let Some(s) = start.take() {
                    fragments.push(&text[s..i]);
                }
            }
            continue;
        }

        depth += 1;

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let closing = format!("</{name}");
            match text[i..].to_ascii_lowercase().find(&closing) {
                Some(offset) => i += offset,
                None => return (fragments, start.unwrap_or(i)),
            }
        }
    }

    let consumed = start.unwrap_or(bytes.len());
    (fragments, consumed)
}

/// Offset of the `>` closing the start tag at the beginning of `tag`,
/// skipping quoted attribute values.
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, ch) in tag.char_indices().skip(1) {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return Some(offset),
            (None, _) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_only_complete_fragments() {
        let mut decoder = FragmentDecoder::new();
        assert!(decoder.push(b"<div id=\"a\"><p>one</p>").is_empty());
        assert_eq!(
            decoder.push(b"</div><div id=\"b\">tw"),
            ["<div id=\"a\"><p>one</p></div>"]
        );
        assert_eq!(decoder.push(b"o</div>\n"), ["<div id=\"b\">two</div>"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn several_fragments_in_one_chunk() {
        let mut decoder = FragmentDecoder::new();
        let out = decoder.push(b"<p id=\"x\">1</p> <hr id=\"y\"> <img id=\"z\" /><br/>");
        assert_eq!(out, ["<p id=\"x\">1</p>", "<hr id=\"y\">", "<img id=\"z\" />", "<br/>"]);
        assert_eq!(decoder.pending(), "");
    }

    #[test]
    fn multibyte_characters_split_across_chunks() {
        let text = "<p id=\"e\">héllo</p>".as_bytes();
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = FragmentDecoder::new();
        assert!(decoder.push(&text[..split]).is_empty());
        assert_eq!(decoder.push(&text[split..]), ["<p id=\"e\">héllo</p>"]);
    }

    #[test]
    fn quoted_angle_brackets_and_comments() {
        let mut decoder = FragmentDecoder::new();
        let out = decoder.push(b"<!-- lead --><div title=\"a > b\"><!-- </div> --></div>");
        assert_eq!(out, ["<div title=\"a > b\"><!-- </div> --></div>"]);
    }

    #[test]
    fn raw_text_content_is_not_scanned() {
        let mut decoder = FragmentDecoder::new();
        assert!(decoder.push(b"<div id=\"s\"><script>if (a < b) { x = '<div>'; }").is_empty());
        assert_eq!(
            decoder.push(b"</script></div>"),
            ["<div id=\"s\"><script>if (a < b) { x = '<div>'; }</script></div>"]
        );
    }

    #[test]
    fn split_tag_waits_for_the_rest() {
        let mut decoder = FragmentDecoder::new();
        assert!(decoder.push(b"<div id=\"a\" cla").is_empty());
        assert!(decoder.push(b"ss=\"x\">hi").is_empty());
        assert_eq!(decoder.push(b"</div>"), ["<div id=\"a\" class=\"x\">hi</div>"]);
    }

    #[test]
    fn finish_flushes_unterminated_markup() {
        let mut decoder = FragmentDecoder::new();
        assert!(decoder.push(b"<div id=\"open\"><p>partial").is_empty());
        assert_eq!(decoder.finish(), ["<div id=\"open\"><p>partial"]);
    }
}
