use scout_core::error::AppError;
use scout_core::traits::Cleaner;
use scraper::{ElementRef, Html, Node};

/// Elements whose whole subtree is dropped before text extraction.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "noscript", "iframe", "svg", "template",
];

/// HTML-to-text cleaner using scraper.
///
/// Drops page chrome (navigation, header, footer) and non-content elements,
/// then emits each visible text node on its own trimmed line.
#[derive(Debug, Clone, Default)]
pub struct TextCleaner;

impl TextCleaner {
    pub fn new() -> Self {
        Self
    }
}

impl Cleaner for TextCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let document = Html::parse_document(html);
        Ok(collect_text(document.root_element()).join("\n"))
    }
}

/// Depth-first walk over visible text nodes, in document order.
///
/// Uses an explicit stack: page nesting depth is attacker-controlled.
fn collect_text(root: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack: Vec<_> = root.children().rev().collect();

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Node::Element(el) => {
                if !SKIPPED_TAGS.contains(&el.name()) {
                    stack.extend(node.children().rev());
                }
            }
            _ => {}
        }
    }

    lines
}
