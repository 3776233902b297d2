use std::borrow::Cow;

use pulldown_cmark::{Options, Parser, html};

use crate::{LatexToHtml, RenderConfig, html::document_style, replace::Replacer};

/// A markdown-to-HTML engine that knows nothing about math.
pub trait MarkdownEngine {
    /// Convert markdown text into an HTML document.
    fn to_html(&self, markdown: &str) -> String;
}

/// CommonMark engine backed by `pulldown-cmark`, producing a complete HTML document.
#[derive(Debug, Clone, Copy)]
pub struct CommonMark {
    options: Options,
}

impl Default for CommonMark {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }
}

impl CommonMark {
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }
}

impl MarkdownEngine for CommonMark {
    fn to_html(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut output = String::with_capacity(markdown.len() * 3 / 2 + 128);
        output.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n</head>\n<body>\n");
        html::push_html(&mut output, parser);
        output.push_str("</body>\n</html>\n");
        output
    }
}

/// Renders a whole note: math spans first, markdown second.
///
/// ```rust
/// use mdnotes_markup::{DocumentRenderer, RenderConfig};
///
/// let renderer = DocumentRenderer::new(RenderConfig::default());
/// let html = renderer.render("Energy: $E = mc^2$");
/// assert!(html.contains("mc²"));
/// assert!(html.contains("<style>"));
/// ```
pub struct DocumentRenderer<E = CommonMark> {
    converter: LatexToHtml,
    replacer: Replacer,
    engine: E,
    style: String,
}

impl DocumentRenderer<CommonMark> {
    pub fn new(config: RenderConfig) -> Self {
        Self::with_engine(config, CommonMark::default())
    }
}

impl<E: MarkdownEngine> DocumentRenderer<E> {
    pub fn with_engine(config: RenderConfig, engine: E) -> Self {
        let style = document_style(&config);
        Self {
            converter: LatexToHtml::new(config),
            replacer: Replacer::default(),
            engine,
            style,
        }
    }

    /// Use a different span replacer, e.g. one that ignores escaped delimiters.
    pub fn with_replacer(mut self, replacer: Replacer) -> Self {
        self.replacer = replacer;
        self
    }

    #[inline]
    pub fn converter(&self) -> &LatexToHtml {
        &self.converter
    }

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Replace every math span with its HTML, leaving the rest of the markdown untouched.
    pub fn substitute_math<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.replacer.may_contain_math(text) {
            return Cow::Borrowed(text);
        }
        Cow::Owned(self.replacer.replace(text, |buf, latex, display| {
            self.converter.render_into(buf, latex, display);
        }))
    }

    /// Render a markdown document with math into a styled HTML document.
    pub fn render(&self, text: &str) -> String {
        let markdown = self.substitute_math(text);
        let mut output = self.engine.to_html(&markdown);
        inject_style(&mut output, &self.style);
        output
    }
}

/// Put `style` right after the opening `<head>` tag, or at the very start without one.
pub(crate) fn inject_style(document: &mut String, style: &str) {
    match memchr::memmem::find(document.as_bytes(), b"<head>") {
        Some(idx) => document.insert_str(idx + "<head>".len(), style),
        None => document.insert_str(0, style),
    }
}
