//! Block-to-HTML rendering
//!
//! Blocks come out of the cache as raw JSON. Each one is parsed on its own
//! and rendered to an HTML fragment; a block that fails to parse is logged
//! and skipped so the rest of the post still renders.

use super::model::{Block, BlockData, ReadingNowBook, RichText};

/// Render a slice of raw blocks to an HTML fragment
pub fn render_blocks(blocks: &[serde_json::Value]) -> String {
    let mut out = String::new();

    for raw in blocks {
        let block: Block = match serde_json::from_value(raw.clone()) {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!("skipping unparseable block: {}", e);
                continue;
            }
        };
        render_block(&mut out, &block);
    }

    out
}

/// Render one block
fn render_block(out: &mut String, block: &Block) {
    match &block.data {
        BlockData::Paragraph { paragraph } => {
            if paragraph.rich_text.is_empty() {
                return;
            }
            out.push_str(r#"<p class="my-2">"#);
            render_rich_text(out, &paragraph.rich_text);
            out.push_str("</p>");
        }
        BlockData::Heading1 { heading_1 } => {
            render_heading(out, &heading_1.rich_text, "h1", "text-3xl my-4 font-bold");
        }
        BlockData::Heading2 { heading_2 } => {
            render_heading(out, &heading_2.rich_text, "h2", "text-2xl my-3 font-bold");
        }
        BlockData::Heading3 { heading_3 } => {
            render_heading(out, &heading_3.rich_text, "h3", "text-xl my-2 font-bold");
        }
        BlockData::BulletedListItem { bulleted_list_item } => {
            out.push_str(r#"<li class="list-disc ml-6 my-1">"#);
            render_rich_text(out, &bulleted_list_item.rich_text);
            out.push_str("</li>");
        }
        BlockData::NumberedListItem { numbered_list_item } => {
            out.push_str(r#"<li class="list-decimal ml-6 my-1">"#);
            render_rich_text(out, &numbered_list_item.rich_text);
            out.push_str("</li>");
        }
        BlockData::ToDo { to_do } => {
            let checked = if to_do.checked { " checked" } else { "" };
            out.push_str(&format!(
                r#"<div class="my-1"><input type="checkbox" disabled{}> "#,
                checked
            ));
            render_rich_text(out, &to_do.rich_text);
            out.push_str("</div>");
        }
        BlockData::Code { code } => {
            if code.rich_text.is_empty() {
                return;
            }
            let source: String = code
                .rich_text
                .iter()
                .map(|span| span.text.content.as_str())
                .collect();
            out.push_str(&format!(
                r#"<pre class="my-4 p-4 overflow-x-auto"><code class="language-{}">{}</code></pre>"#,
                html_escape(&code.language),
                html_escape(&source)
            ));
        }
        BlockData::Image { image } => {
            let Some(url) = image.url() else {
                return;
            };
            out.push_str(&format!(
                r#"<figure class="my-4"><img src="{}" alt="" loading="lazy">"#,
                html_escape(url)
            ));
            if !image.caption.is_empty() {
                out.push_str(r#"<figcaption class="text-sm">"#);
                render_rich_text(out, &image.caption);
                out.push_str("</figcaption>");
            }
            out.push_str("</figure>");
        }
        BlockData::Divider => {
            out.push_str(r#"<hr class="my-6">"#);
        }
        // child pages and unknown kinds render nothing
        BlockData::ChildPage { .. } | BlockData::Unsupported => {}
    }
}

fn render_heading(out: &mut String, spans: &[RichText], tag: &str, classes: &str) {
    if spans.is_empty() {
        return;
    }
    out.push_str(&format!(r#"<{} class="{}">"#, tag, classes));
    render_rich_text(out, spans);
    out.push_str(&format!("</{}>", tag));
}

/// Render every span of a rich text run with its annotations
fn render_rich_text(out: &mut String, spans: &[RichText]) {
    for span in spans {
        let mut html = html_escape(&span.text.content);

        if span.annotations.code {
            html = format!("<code>{}</code>", html);
        }
        if span.annotations.bold {
            html = format!("<strong>{}</strong>", html);
        }
        if span.annotations.italic {
            html = format!("<em>{}</em>", html);
        }
        if span.annotations.strikethrough {
            html = format!("<s>{}</s>", html);
        }
        if span.annotations.underline {
            html = format!("<u>{}</u>", html);
        }
        if let Some(url) = span.link_url() {
            html = format!(
                r#"<a class="underline text-green-600" href="{}">{}</a>"#,
                html_escape(url),
                html
            );
        }

        out.push_str(&html);
    }
}

/// Assemble reading-now books from a divider-separated block list.
///
/// The source page is authored as groups of heading_1 (title), heading_2
/// (author), heading_3 (progress), image and paragraph (comments), split by
/// divider blocks.
pub fn collect_reading_now(blocks: &[serde_json::Value]) -> Vec<ReadingNowBook> {
    let mut books = Vec::new();
    let mut current = ReadingNowBook::default();

    for raw in blocks {
        let block: Block = match serde_json::from_value(raw.clone()) {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!("skipping unparseable reading-now block: {}", e);
                continue;
            }
        };

        match &block.data {
            BlockData::Divider => {
                if !current.is_empty() {
                    books.push(std::mem::take(&mut current));
                }
            }
            BlockData::Heading1 { heading_1 } => {
                current.title = plain_text(&heading_1.rich_text);
            }
            BlockData::Heading2 { heading_2 } => {
                current.author = plain_text(&heading_2.rich_text);
            }
            BlockData::Heading3 { heading_3 } => {
                current.progress = plain_text(&heading_3.rich_text);
            }
            BlockData::Image { image } => {
                current.image_url = image.url().unwrap_or_default().to_string();
            }
            BlockData::Paragraph { paragraph } => {
                current.comments = plain_text(&paragraph.rich_text);
            }
            _ => {}
        }
    }

    // a page without a trailing divider still yields its last book
    if !current.is_empty() {
        books.push(current);
    }

    books
}

fn plain_text(spans: &[RichText]) -> String {
    spans
        .iter()
        .map(|span| span.plain_text.as_str())
        .collect::<Vec<_>>()
        .join("")
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_block(kind: &str, content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": format!("{}-id", kind),
            "type": kind,
            kind: {
                "rich_text": [
                    {"plain_text": content, "text": {"content": content}}
                ]
            }
        })
    }

    #[test]
    fn test_render_paragraph_and_heading() {
        let blocks = vec![
            text_block("heading_1", "A Title"),
            text_block("paragraph", "Some prose."),
        ];
        let html = render_blocks(&blocks);
        assert!(html.contains(">A Title</h1>"));
        assert!(html.contains(">Some prose.</p>"));
    }

    #[test]
    fn test_render_escapes_content() {
        let blocks = vec![text_block("paragraph", "<script>alert(1)</script>")];
        let html = render_blocks(&blocks);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_annotations_and_link() {
        let blocks = vec![serde_json::json!({
            "id": "b",
            "type": "paragraph",
            "paragraph": {
                "rich_text": [
                    {
                        "plain_text": "bold",
                        "annotations": {"bold": true},
                        "text": {"content": "bold"}
                    },
                    {
                        "plain_text": "here",
                        "text": {"content": "here", "link": {"url": "https://example.com"}}
                    }
                ]
            }
        })];
        let html = render_blocks(&blocks);
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains(r#"href="https://example.com""#));
    }

    #[test]
    fn test_render_code_block() {
        let blocks = vec![serde_json::json!({
            "id": "b",
            "type": "code",
            "code": {
                "language": "rust",
                "rich_text": [{"plain_text": "fn main() {}", "text": {"content": "fn main() {}"}}]
            }
        })];
        let html = render_blocks(&blocks);
        assert!(html.contains(r#"class="language-rust""#));
        assert!(html.contains("fn main() {}"));
    }

    #[test]
    fn test_render_skips_bad_block() {
        let blocks = vec![
            serde_json::json!({"nonsense": true}),
            text_block("paragraph", "still here"),
        ];
        let html = render_blocks(&blocks);
        assert!(html.contains("still here"));
    }

    #[test]
    fn test_collect_reading_now_groups() {
        let blocks = vec![
            text_block("heading_1", "Book One"),
            text_block("heading_2", "Author One"),
            text_block("heading_3", "p. 120"),
            serde_json::json!({"id": "d1", "type": "divider", "divider": {}}),
            text_block("heading_1", "Book Two"),
            text_block("paragraph", "so far so good"),
        ];

        let books = collect_reading_now(&blocks);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Book One");
        assert_eq!(books[0].author, "Author One");
        assert_eq!(books[0].progress, "p. 120");
        // the trailing group without a divider is kept
        assert_eq!(books[1].title, "Book Two");
        assert_eq!(books[1].comments, "so far so good");
    }

    #[test]
    fn test_collect_reading_now_drops_empty_groups() {
        let blocks = vec![
            serde_json::json!({"id": "d1", "type": "divider", "divider": {}}),
            serde_json::json!({"id": "d2", "type": "divider", "divider": {}}),
        ];
        assert!(collect_reading_now(&blocks).is_empty());
    }
}
