//! Markdown → HTML rendering seam.
//!
//! The widget never trusts upstream text: raw HTML blocks in the markdown are
//! emitted as escaped text, link and image destinations outside
//! [`ALLOWED_LINK_SCHEMES`] are blanked, and soft line breaks become `<br />`
//! so the model's line structure survives in the container.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// Schemes a rendered link or image may point at. Relative destinations
/// (no scheme) are always allowed.
pub const ALLOWED_LINK_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Whether a link destination may be emitted as-is. Browsers ignore
/// whitespace and control characters inside a scheme, so those are dropped
/// before the scheme is compared.
fn is_safe_destination(dest: &str) -> bool {
    let cleaned: String = dest
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match cleaned.find([':', '/', '?', '#']) {
        Some(i) if cleaned[i..].starts_with(':') => ALLOWED_LINK_SCHEMES.contains(&&cleaned[..i]),
        _ => true,
    }
}

/// Pure text → HTML conversion.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// Default renderer backed by pulldown-cmark.
#[derive(Debug, Clone, Copy)]
pub struct CmarkRenderer {
    options: Options,
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS,
        }
    }
}

impl CmarkRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options).map(|ev| match ev {
            Event::SoftBreak => Event::HardBreak,
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) if !is_safe_destination(&dest_url) => {
                tracing::debug!(dest = %dest_url, "blanking unsafe link destination");
                Event::Start(Tag::Link {
                    link_type,
                    dest_url: CowStr::Borrowed("#"),
                    title,
                    id,
                })
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) if !is_safe_destination(&dest_url) => Event::Start(Tag::Image {
                link_type,
                dest_url: CowStr::Borrowed(""),
                title,
                id,
            }),
            other => other,
        });
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Escape text for insertion into HTML and turn every newline form into `<br>`.
pub fn status_to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("<br>");
            }
            '\n' => out.push_str("<br>"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_breaks_become_line_breaks() {
        let html = CmarkRenderer::new().render("Hello\nWorld");
        assert_eq!(html, "<p>Hello<br />\nWorld</p>\n");
    }

    #[test]
    fn renders_common_markdown() {
        let html = CmarkRenderer::new().render("# Title\n\n- **one**\n- two");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<li><strong>one</strong></li>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = CmarkRenderer::new().render("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn script_urls_are_blanked() {
        let html = CmarkRenderer::new().render("[click](javascript:alert(document.cookie)) ![i](javascript:x)");
        assert!(!html.contains("javascript:"), "{html}");
        assert!(html.contains("<a href=\"#\">click</a>"));
        assert!(html.contains("<img src=\"\" alt=\"i\" />"));

        for md in [
            "[a](JavaScript:alert(1))",
            "[b](data:text/html;base64,PHNjcmlwdD4=)",
            "[c](vbscript:msgbox)",
            "[d](java&#x09;script:alert(1))",
            "<javascript:alert(1)>",
        ] {
            let html = CmarkRenderer::new().render(md);
            assert!(html.contains("href=\"#\""), "{md} -> {html}");
        }
    }

    #[test]
    fn ordinary_links_are_kept() {
        let html = CmarkRenderer::new().render(
            "[web](https://example.com/a?b=1) [mail](mailto:x@example.com) [rel](/entries/2#top) ![p](img/a.png)",
        );
        assert!(html.contains("href=\"https://example.com/a?b=1\""));
        assert!(html.contains("href=\"mailto:x@example.com\""));
        assert!(html.contains("href=\"/entries/2#top\""));
        assert!(html.contains("src=\"img/a.png\""));
    }

    #[test]
    fn status_text_is_escaped_and_broken_into_lines() {
        assert_eq!(status_to_html("a\r\nb\rc\nd"), "a<br>b<br>c<br>d");
        assert_eq!(status_to_html("<b>&"), "&lt;b&gt;&amp;");
    }
}
