// src/templates/preview.rs
//! Terminal rendering of the server's preview HTML.
//!
//! The service renders templates to full HTML pages meant for an
//! embedded preview pane; in a terminal we reduce that to headings,
//! paragraphs and bullet lines in document order.

use anyhow::Result;
use scraper::{Html, Selector};

pub fn preview_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("h1, h2, h3, p, li")
        .map_err(|e| anyhow::anyhow!("Invalid preview selector: {}", e))?;

    let mut lines = Vec::new();
    for element in document.select(&selector) {
        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }

        let line = match element.value().name() {
            "h1" => format!("# {}", text),
            "h2" | "h3" => format!("## {}", text),
            "li" => format!("  - {}", text),
            _ => text,
        };
        lines.push(line);
    }

    Ok(lines.join("\n"))
}
