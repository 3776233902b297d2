use memchr::memmem::Finder;

use crate::MathDisplay;

/// Finds math spans in a document and replaces them.
///
/// Block spans are matched first and may cover several lines. Inline spans are then matched in the
/// text between block spans and never cross a line break. An opening delimiter without a closing
/// partner is not an error: it is kept as literal text.
pub struct Replacer {
    inline: Delimiters,
    block: Delimiters,
    ignore_escaped_delim: bool,
}

struct Delimiters {
    opening: Finder<'static>,
    closing: Finder<'static>,
    opening_len: usize,
    closing_len: usize,
}

impl Delimiters {
    fn new((open, close): (&str, &str)) -> Self {
        Self {
            opening: Finder::new(open).into_owned(),
            closing: Finder::new(close).into_owned(),
            opening_len: open.len(),
            closing_len: close.len(),
        }
    }
}

/// A piece of the document after the block pass.
enum Segment<'source> {
    Text(&'source str),
    Math(&'source str),
}

impl Default for Replacer {
    fn default() -> Self {
        Self::new(("$", "$"), ("$$", "$$"), false)
    }
}

impl Replacer {
    /// Create a replacer with the given `(opening, closing)` delimiters.
    ///
    /// With `ignore_escaped_delim`, a delimiter directly preceded by a backslash never opens or
    /// closes a span.
    ///
    /// # Panics
    ///
    /// Panics if any of the four delimiters is empty.
    pub fn new(
        inline_delim: (&str, &str),
        block_delim: (&str, &str),
        ignore_escaped_delim: bool,
    ) -> Self {
        assert!(
            [inline_delim.0, inline_delim.1, block_delim.0, block_delim.1]
                .iter()
                .all(|delim| !delim.is_empty()),
            "math delimiters must not be empty"
        );
        Self {
            inline: Delimiters::new(inline_delim),
            block: Delimiters::new(block_delim),
            ignore_escaped_delim,
        }
    }

    /// Whether `input` contains anything that could open a span.
    pub fn may_contain_math(&self, input: &str) -> bool {
        let bytes = input.as_bytes();
        self.inline.opening.find(bytes).is_some() || self.block.opening.find(bytes).is_some()
    }

    /// Replace every math span in `input`.
    ///
    /// `f` receives the output buffer, the trimmed span content and the span's display mode, and
    /// appends the replacement.
    pub fn replace<F>(&self, input: &str, mut f: F) -> String
    where
        F: FnMut(&mut String, &str, MathDisplay),
    {
        let mut result = String::with_capacity(input.len());
        for segment in self.split_blocks(input) {
            match segment {
                Segment::Math(content) => f(&mut result, content.trim(), MathDisplay::Block),
                Segment::Text(text) => self.replace_inline(&mut result, text, &mut f),
            }
        }
        result
    }

    /// Split the input at block spans.
    fn split_blocks<'source>(&self, input: &'source str) -> Vec<Segment<'source>> {
        let bytes = input.as_bytes();
        let mut segments = Vec::new();
        let mut current_pos = 0;

        while current_pos < input.len() {
            let Some(idx) = self.find_delimiter(&bytes[current_pos..], &self.block.opening) else {
                break;
            };
            let open_pos = current_pos + idx;
            let start = open_pos + self.block.opening_len;
            let Some(idx) = self.find_delimiter(&bytes[start..], &self.block.closing) else {
                // A later opening delimiter cannot find a closing one either.
                break;
            };
            let end = start + idx;
            if open_pos > current_pos {
                segments.push(Segment::Text(&input[current_pos..open_pos]));
            }
            segments.push(Segment::Math(&input[start..end]));
            current_pos = end + self.block.closing_len;
        }
        if current_pos < input.len() {
            segments.push(Segment::Text(&input[current_pos..]));
        }
        segments
    }

    /// Replace inline spans within a text segment.
    fn replace_inline<F>(&self, result: &mut String, text: &str, f: &mut F)
    where
        F: FnMut(&mut String, &str, MathDisplay),
    {
        let bytes = text.as_bytes();
        let mut copied = 0;
        let mut search_pos = 0;

        while search_pos < text.len() {
            let Some(idx) = self.find_delimiter(&bytes[search_pos..], &self.inline.opening) else {
                break;
            };
            let open_pos = search_pos + idx;
            let start = open_pos + self.inline.opening_len;
            let Some(idx) = self.find_delimiter(&bytes[start..], &self.inline.closing) else {
                break;
            };
            let end = start + idx;
            let content = &text[start..end];
            if memchr::memchr(b'\n', content.as_bytes()).is_some() {
                // Not a span; try again from the next byte.
                search_pos = open_pos + 1;
                continue;
            }
            result.push_str(&text[copied..open_pos]);
            f(result, content.trim(), MathDisplay::Inline);
            copied = end + self.inline.closing_len;
            search_pos = copied;
        }
        result.push_str(&text[copied..]);
    }

    /// Find the next delimiter, skipping escaped ones if so configured.
    fn find_delimiter(&self, input: &[u8], finder: &Finder) -> Option<usize> {
        if !self.ignore_escaped_delim {
            return finder.find(input);
        }

        let mut offset = 0;
        while let Some(relative_pos) = finder.find(&input[offset..]) {
            let absolute_pos = offset + relative_pos;
            if absolute_pos > 0 && input[absolute_pos - 1] == b'\\' {
                offset = absolute_pos + 1;
                continue;
            }
            return Some(absolute_pos);
        }
        None
    }
}
