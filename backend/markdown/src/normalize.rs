//! Markdown to channel rich text.
//!
//! The channel understands `*bold*`, `_italic_` and `~strike~` and nothing else,
//! so headings, lists, fences, rules and links are flattened to plain text.

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};
use regex::Regex;

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Line endings to LF, tabs to spaces, other control characters dropped.
fn clean_control_chars(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

struct ChannelWriter {
    out: String,
    /// Ordered-list counters; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    /// Output offset where each open link's text starts.
    links: Vec<usize>,
    in_heading: bool,
    cells_in_row: usize,
}

impl ChannelWriter {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            lists: Vec::new(),
            links: Vec::new(),
            in_heading: false,
            cells_in_row: 0,
        }
    }

    fn ensure_line_start(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn end_block(&mut self) {
        self.out.push_str("\n\n");
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(..) => {
                self.ensure_line_start();
                self.in_heading = true;
                self.out.push('*');
            }
            Tag::List(start) => {
                self.ensure_line_start();
                self.lists.push(start);
            }
            Tag::Item => {
                self.ensure_line_start();
                if let Some(Some(n)) = self.lists.last_mut() {
                    self.out.push_str(&format!("{n}. "));
                    *n += 1;
                }
            }
            Tag::Emphasis => self.out.push('_'),
            Tag::Strong if !self.in_heading => self.out.push('*'),
            Tag::Strikethrough => self.out.push('~'),
            Tag::Link(..) | Tag::Image(..) => self.links.push(self.out.len()),
            Tag::TableHead | Tag::TableRow => self.cells_in_row = 0,
            Tag::TableCell => {
                if self.cells_in_row > 0 {
                    self.out.push_str(" | ");
                }
                self.cells_in_row += 1;
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::CodeBlock(_) | Tag::BlockQuote | Tag::Table(_) => self.end_block(),
            Tag::Heading(..) => {
                self.in_heading = false;
                self.out.push('*');
                self.end_block();
            }
            Tag::List(_) => {
                self.lists.pop();
                self.end_block();
            }
            Tag::Item | Tag::TableHead | Tag::TableRow => self.out.push('\n'),
            Tag::Emphasis => self.out.push('_'),
            Tag::Strong if !self.in_heading => self.out.push('*'),
            Tag::Strikethrough => self.out.push('~'),
            Tag::Link(kind, url, _) | Tag::Image(kind, url, _) => {
                let text_start = self.links.pop().unwrap_or(self.out.len());
                let text = &self.out[text_start..];
                let is_auto = matches!(kind, LinkType::Autolink | LinkType::Email);
                if !is_auto && !url.is_empty() && text != url.as_ref() {
                    if text.is_empty() {
                        self.out.push_str(&url);
                    } else {
                        self.out.push_str(&format!(" ({url})"));
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> String {
        let trimmed_lines = self
            .out
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        EXCESS_NEWLINES
            .replace_all(&trimmed_lines, "\n\n")
            .trim()
            .to_string()
    }
}

/// Rewrite Markdown model output into the channel's formatting subset.
pub fn normalize_for_channel(raw: &str) -> String {
    let cleaned = clean_control_chars(raw);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut writer = ChannelWriter::new(cleaned.len());
    for event in Parser::new_ext(&cleaned, options) {
        match event {
            Event::Start(tag) => writer.start(tag),
            Event::End(tag) => writer.end(tag),
            Event::Text(text) | Event::Code(text) | Event::Html(text) => {
                writer.out.push_str(&text)
            }
            Event::SoftBreak | Event::HardBreak => writer.out.push('\n'),
            Event::Rule => writer.end_block(),
            Event::TaskListMarker(done) => {
                writer.out.push_str(if done { "[x] " } else { "[ ] " })
            }
            Event::FootnoteReference(label) => writer.out.push_str(&format!("[{label}]")),
        }
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_become_bold() {
        assert_eq!(normalize_for_channel("# Title\nBody"), "*Title*\n\nBody");
        assert_eq!(normalize_for_channel("## **Total**"), "*Total*");
    }

    #[test]
    fn inline_styles_map_to_channel_syntax() {
        assert_eq!(
            normalize_for_channel("**bold** __also__ *it* ~~gone~~ `code`"),
            "*bold* *also* _it_ ~gone~ code"
        );
    }

    #[test]
    fn bullets_are_stripped_and_numbers_kept() {
        assert_eq!(normalize_for_channel("- one\n- two\n- three"), "one\ntwo\nthree");
        assert_eq!(normalize_for_channel("* star\n\n+ plus"), "star\n\nplus");
        assert_eq!(normalize_for_channel("1. first\n2. second"), "1. first\n2. second");
    }

    #[test]
    fn links_show_their_target() {
        assert_eq!(
            normalize_for_channel("See [the site](https://example.com)."),
            "See the site (https://example.com)."
        );
        assert_eq!(
            normalize_for_channel("<https://example.com>"),
            "https://example.com"
        );
    }

    #[test]
    fn fences_and_rules_are_dropped() {
        assert_eq!(
            normalize_for_channel("before\n\n```text\nline one\n```\n\n---\n\nafter"),
            "before\n\nline one\n\nafter"
        );
    }

    #[test]
    fn control_characters_and_line_endings() {
        assert_eq!(normalize_for_channel("a\r\nb\u{7}\tc"), "a\nb c");
    }

    #[test]
    fn blank_runs_collapse_and_edges_trim() {
        assert_eq!(normalize_for_channel("\n\n  x\n\n\n\n\ny  \n\n"), "x\n\ny");
    }

    #[test]
    fn tables_flatten_to_rows() {
        assert_eq!(
            normalize_for_channel("| Item | Qty |\n|---|---|\n| Tea | 2 |"),
            "Item | Qty\nTea | 2"
        );
    }

    #[test]
    fn plain_ocr_text_is_untouched() {
        let text = "ACME Corp.\nInvoice 2024-117\n\nAmount due: $1,250.00";
        assert_eq!(normalize_for_channel(text), text);
    }
}
