//! Integration tests for the composition engine (site-renderer).
//!
//! Builds a realistic landing page through the tree API, then checks the
//! editor render, the published page and the responsive stylesheet.

use serde_json::json;
use site_core::{ComponentDescriptor, ComponentRegistry, Element, ElementTree, RenderKind, Viewport};
use site_renderer::{export_page, stylesheet, PageOptions, RenderMode, Renderer};

/// Hero section, three-column feature row, gallery and footer.
fn landing_page() -> ElementTree {
    let registry = ComponentRegistry::builtin();
    let mut tree = ElementTree::new(Element::with_id("page", "section")).expect("root");

    let hero = Element::with_id("hero", "container")
        .with_child(
            Element::with_id("hero-title", "heading")
                .with_prop("text", "Build faster")
                .with_prop("level", 1),
        )
        .with_child(Element::with_id("hero-cta", "button").with_prop("label", "Start"));
    tree = tree
        .insert_child(registry, &"page".into(), hero, 0)
        .expect("hero");

    let mut features = Element::with_id("features", "row")
        .with_prop("columns", 3)
        .with_override(Viewport::Tablet, "columns", 2)
        .with_override(Viewport::Mobile, "columns", 1);
    for n in 1..=3 {
        features = features.with_child(
            Element::with_id(format!("feature-{n}"), "column").with_child(
                Element::with_id(format!("feature-{n}-text"), "text")
                    .with_prop("content", format!("<p>Feature <em>{n}</em></p>")),
            ),
        );
    }
    tree = tree
        .insert_child(registry, &"page".into(), features, 1)
        .expect("features");

    let gallery = Element::with_id("shots", "gallery")
        .with_prop("images", json!([{"src": "/1.png", "alt": "One"}, {"src": "/2.png"}]));
    tree = tree
        .insert_child(registry, &"page".into(), gallery, 2)
        .expect("gallery");
    tree.insert_child(registry, &"page".into(), Element::with_id("footer-gap", "spacer"), 3)
        .expect("spacer")
}

#[test]
fn test_editor_render_of_landing_page() {
    let tree = landing_page();
    let output = Renderer::new(ComponentRegistry::builtin()).render(&tree, Viewport::Mobile);
    assert!(!output.has_diagnostics());

    let features = output.root.find_by_element_id("features").expect("row");
    assert_eq!(features.style("flex-direction"), Some("column"));
    assert_eq!(features.child_elements().count(), 3);

    let html = output.to_html();
    assert!(html.contains("<p>Feature <em>2</em></p>"));
    assert!(html.contains("data-edit-field=\"content\""));
}

#[test]
fn test_published_page_is_self_contained() {
    let tree = landing_page();
    let page = export_page(
        &tree,
        ComponentRegistry::builtin(),
        &PageOptions {
            title: "Landing".into(),
            ..PageOptions::default()
        },
    );
    assert!(page.diagnostics.is_empty());
    assert!(page.html.contains("<h1 data-element-id=\"hero-title\""));
    assert!(page.html.contains("@media (max-width: 640px)"));
    assert!(!page.html.contains("contenteditable"));
    assert_eq!(page.html.matches("<figure>").count(), 2);
}

#[test]
fn test_stylesheet_tracks_each_viewport() {
    let tree = landing_page();
    let sheet = stylesheet(&tree, ComponentRegistry::builtin());
    let selector = "[data-element-id=\"features\"]";
    let count = |viewport| {
        sheet
            .rules_for(viewport)
            .filter(|r| r.selector == selector)
            .count()
    };
    assert_eq!(count(None), 1);
    // Tablet keeps a row (two columns), so nothing changes at that width.
    assert_eq!(count(Some(Viewport::Tablet)), 0);
    assert_eq!(count(Some(Viewport::Mobile)), 1);
}

#[test]
fn test_custom_registry_type_renders() {
    let mut registry = ComponentRegistry::with_builtins();
    registry.register(
        ComponentDescriptor::new("callout", RenderKind::Text)
            .with_defaults(json!({"content": "<p>Note</p>"}))
            .with_inline_edit("content"),
    );
    let tree = ElementTree::new(
        Element::with_id("root", "section").with_child(Element::with_id("c", "callout")),
    )
    .expect("tree");

    let strict = Renderer::new(ComponentRegistry::builtin())
        .with_mode(RenderMode::Published)
        .render(&tree, Viewport::Desktop);
    assert!(strict.into_result().is_err());

    let output = Renderer::new(&registry)
        .with_mode(RenderMode::Published)
        .render(&tree, Viewport::Desktop);
    let callout = output.root.find_by_element_id("c").expect("callout");
    assert_eq!(callout.attr("data-element-type"), Some("callout"));
    assert!(output.to_html().contains("<p>Note</p>"));
}
