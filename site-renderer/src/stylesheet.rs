//! Responsive stylesheet for published pages.
//!
//! Desktop declarations are the unconditional base. Each narrower viewport
//! gets an `@media (max-width: ...)` block holding only what changes against
//! the cascade already in effect at that width:
//!
//! ```text
//! base     : desktop
//! tablet   : diff(desktop -> tablet)
//! mobile   : diff(tablet  -> mobile)   // mobile also matches the tablet query
//! ```
//!
//! Properties that disappear at a narrower viewport are reset with `unset`,
//! so a tablet override never leaks into mobile.

use std::fmt::Write;

use serde::Serialize;
use site_core::resolve::resolve;
use site_core::{ComponentRegistry, Element, ElementTree, Viewport};

use crate::style::{declarations, Declaration};

/// One CSS rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CssRule {
    /// Selector, e.g. `[data-element-id="hero"]`.
    pub selector: String,
    /// Declarations in output order.
    pub declarations: Vec<Declaration>,
    /// Viewport whose media query wraps the rule; `None` for the base.
    pub media: Option<Viewport>,
}

/// A generated stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stylesheet {
    /// Rules in cascade order.
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    /// Rules for one media target (`None` = base rules).
    pub fn rules_for(&self, media: Option<Viewport>) -> impl Iterator<Item = &CssRule> {
        self.rules.iter().filter(move |r| r.media == media)
    }

    /// Serialize to CSS text.
    #[must_use]
    pub fn to_css(&self) -> String {
        let mut css = String::with_capacity(self.rules.len() * 96);
        for rule in self.rules_for(None) {
            write_rule(&mut css, rule, "");
        }
        for viewport in [Viewport::Tablet, Viewport::Mobile] {
            let mut block = String::new();
            for rule in self.rules_for(Some(viewport)) {
                write_rule(&mut block, rule, "  ");
            }
            if let (false, Some(max)) = (block.is_empty(), viewport.max_width()) {
                let _ = write!(css, "@media (max-width: {max}px) {{\n{block}}}\n");
            }
        }
        css
    }
}

/// Generate the stylesheet for a tree.
///
/// Elements of unknown type are skipped.
#[must_use]
pub fn stylesheet(tree: &ElementTree, registry: &ComponentRegistry) -> Stylesheet {
    let mut sheet = Stylesheet::default();
    let mut media: Vec<CssRule> = Vec::new();
    tree.root().walk(&mut |element: &Element| {
        let Ok(descriptor) = registry.resolve(&element.kind) else {
            return;
        };
        let selector = selector_for(element);
        let desktop = declarations(&resolve(element, descriptor, Viewport::Desktop));
        let tablet = declarations(&resolve(element, descriptor, Viewport::Tablet));
        let mobile = declarations(&resolve(element, descriptor, Viewport::Mobile));

        if !desktop.is_empty() {
            sheet.rules.push(CssRule {
                selector: selector.clone(),
                declarations: desktop.clone(),
                media: None,
            });
        }
        for (viewport, from, to) in [
            (Viewport::Tablet, &desktop, &tablet),
            (Viewport::Mobile, &tablet, &mobile),
        ] {
            let changed = diff(from, to);
            if !changed.is_empty() {
                media.push(CssRule {
                    selector: selector.clone(),
                    declarations: changed,
                    media: Some(viewport),
                });
            }
        }
    });
    sheet.rules.extend(media);
    sheet
}

fn selector_for(element: &Element) -> String {
    let id: String = element
        .id
        .as_str()
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\n' | '\r'))
        .collect();
    format!("[data-element-id=\"{id}\"]")
}

/// Declarations needed to go from `from` to `to`.
fn diff(from: &[Declaration], to: &[Declaration]) -> Vec<Declaration> {
    let mut changed: Vec<Declaration> = to
        .iter()
        .filter(|decl| !from.contains(decl))
        .cloned()
        .collect();
    for (property, _) in from {
        if !to.iter().any(|(p, _)| p == property) {
            changed.push((property.clone(), "unset".to_string()));
        }
    }
    changed
}

fn write_rule(css: &mut String, rule: &CssRule, indent: &str) {
    let _ = writeln!(css, "{indent}{} {{", rule.selector);
    for (property, value) in &rule.declarations {
        let _ = writeln!(css, "{indent}  {property}: {value};");
    }
    let _ = writeln!(css, "{indent}}}");
}
