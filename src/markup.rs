//! HTML loading and serialization
//!
//! Parsing and serialization both go through `scraper` (html5ever), so an
//! annotated page written after a validation pass is ordinary HTML5 output.

use std::path::Path;

use scraper::Html;

use crate::dom::Document;
use crate::error::{BevalidError, Result};

/// Parse a full HTML document
pub fn parse_html(source: &str) -> Document {
    Document::from(Html::parse_document(source))
}

/// Read and parse an HTML file
pub async fn load_html_file(path: &Path) -> Result<Document> {
    let bytes = tokio::fs::read(path).await?;
    let source = String::from_utf8(bytes).map_err(|e| BevalidError::Markup {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    Ok(parse_html(&source))
}

/// Write the whole document as HTML. A doctype is added when the source had none.
pub fn to_html(doc: &Document) -> String {
    let html = doc.html();
    let serialized = html.html();
    if html.tree.root().children().any(|child| child.value().is_doctype()) {
        serialized
    } else {
        format!("<!DOCTYPE html>\n{}", serialized)
    }
}
