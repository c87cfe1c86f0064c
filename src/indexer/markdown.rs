use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Reduces markdown to its prose.
///
/// Code blocks, inline code, HTML and link/image destinations are dropped;
/// emphasis, strikethrough and heading markers disappear with the parse.
/// Link text is kept. Block ends become newlines.
pub fn strip_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut out = String::with_capacity(markdown.len());
    let mut in_code_block = false;

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(text) if !in_code_block => out.push_str(&text),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::BlockQuote(_)
                | TagEnd::TableCell
                | TagEnd::TableRow,
            ) => out.push('\n'),
            _ => {}
        }
    }

    out.trim().to_string()
}
