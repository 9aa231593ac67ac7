//! Full-page export for the published site.

use serde::{Deserialize, Serialize};
use site_core::{ComponentRegistry, ElementTree, Viewport};

use crate::html::{escape_attr, escape_text};
use crate::{stylesheet, RenderDiagnostic, RenderMode, Renderer};

/// Styles shared by every published page.
const BASE_CSS: &str = "\
*, *::before, *::after { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, sans-serif; line-height: 1.5; }
img { max-width: 100%; display: block; }
figure { margin: 0; }
.site-button { display: inline-block; padding: 0.75rem 1.5rem; border-radius: 0.375rem; text-decoration: none; }
.site-button--primary { background: #2563eb; color: #fff; }
.site-button--secondary { background: #e5e7eb; color: #111827; }
.site-button--outline { border: 1px solid currentColor; }
.site-tooltip[data-tooltip]:hover::after { content: attr(data-tooltip); position: absolute; padding: 0.25rem 0.5rem; background: #111827; color: #fff; border-radius: 0.25rem; white-space: nowrap; z-index: 10; }
.site-tooltip[data-placement=\"top\"]:hover::after { bottom: 100%; left: 50%; transform: translateX(-50%); }
.site-tooltip[data-placement=\"bottom\"]:hover::after { top: 100%; left: 50%; transform: translateX(-50%); }
.site-tooltip[data-placement=\"left\"]:hover::after { right: 100%; top: 50%; transform: translateY(-50%); }
.site-tooltip[data-placement=\"right\"]:hover::after { left: 100%; top: 50%; transform: translateY(-50%); }
.site-timeline { list-style: none; padding: 0; }
";

/// Document-level settings of an exported page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    /// `<title>` text.
    pub title: String,
    /// `lang` attribute of the document.
    pub lang: String,
    /// Optional meta description.
    pub description: Option<String>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "Untitled site".to_string(),
            lang: "en".to_string(),
            description: None,
        }
    }
}

/// An exported page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPage {
    /// Complete HTML document with the stylesheet inlined.
    pub html: String,
    /// The generated stylesheet on its own.
    pub css: String,
    /// Problems recovered from while rendering.
    pub diagnostics: Vec<RenderDiagnostic>,
}

/// Render a tree as a standalone published page.
#[must_use]
pub fn export_page(
    tree: &ElementTree,
    registry: &ComponentRegistry,
    options: &PageOptions,
) -> PublishedPage {
    let output = Renderer::new(registry)
        .with_mode(RenderMode::Published)
        .render(tree, Viewport::Desktop);
    let css = stylesheet(tree, registry).to_css();
    let body = output.to_html();

    let description = options
        .description
        .as_deref()
        .map(|d| format!("<meta name=\"description\" content=\"{}\">\n", escape_attr(d)))
        .unwrap_or_default();
    let html = format!(
        "<!DOCTYPE html>\n\
         <html lang=\"{lang}\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         {description}\
         <title>{title}</title>\n\
         <style>\n{BASE_CSS}{css}</style>\n\
         </head>\n\
         <body>\n{body}\n</body>\n\
         </html>\n",
        lang = escape_attr(&options.lang),
        title = escape_text(&options.title),
    );

    tracing::debug!(
        "Exported page '{}' ({} bytes html, {} bytes css)",
        options.title,
        html.len(),
        css.len()
    );
    PublishedPage {
        html,
        css,
        diagnostics: output.diagnostics,
    }
}
