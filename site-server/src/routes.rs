//! API route handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use site_core::{
    ComponentDescriptor, Element, ElementId, ElementTree, Props, SiteDocument,
    TreeRepository, Viewport,
};
use site_publish::PublishJob;
use site_renderer::{export_page, PageOptions, RenderDiagnostic, RenderMode, Renderer};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::validation::{
    validate_custom_domain, validate_element_id, validate_site_id, validate_subtree, validate_tree,
    ValidationError,
};
use crate::AppState;

/// Body of `PUT /api/sites/{site}/tree`. A full Site Document is accepted too.
#[derive(Debug, Deserialize)]
pub struct ReplaceTree {
    /// New root element.
    pub root: Element,
}

/// Body of `PATCH /api/sites/{site}/elements/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateElement {
    /// Partial props to merge.
    #[serde(default)]
    pub props: Props,
    /// Merge into this viewport's overrides instead of the base props.
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

/// Body of `POST /api/sites/{site}/elements/{parent}/children`.
#[derive(Debug, Deserialize)]
pub struct InsertChild {
    /// Complete element (with subtree) to insert.
    #[serde(default)]
    pub element: Option<Element>,
    /// Component type to instantiate with its defaults.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Position among the parent's children; appended when absent.
    #[serde(default)]
    pub index: Option<usize>,
}

/// Body of `POST /api/sites/{site}/elements/{id}/move`.
#[derive(Debug, Deserialize)]
pub struct MoveElement {
    /// New parent id.
    pub parent: String,
    /// Position among the new parent's children.
    pub index: usize,
}

/// Response to an insert.
#[derive(Debug, Serialize)]
pub struct Inserted {
    /// Id of the inserted element.
    pub id: ElementId,
    /// Tree after the insert.
    pub tree: SiteDocument,
}

/// Query of `GET /api/sites/{site}/render`.
#[derive(Debug, Default, Deserialize)]
pub struct RenderQuery {
    /// `desktop` (default), `tablet` or `mobile`.
    pub viewport: Option<String>,
    /// `editor` (default) or `published`.
    pub mode: Option<String>,
}

/// Response of `GET /api/sites/{site}/render`.
#[derive(Debug, Serialize)]
pub struct RenderResponse {
    /// Viewport rendered for.
    pub viewport: Viewport,
    /// Mode rendered in.
    pub mode: RenderMode,
    /// Rendered markup.
    pub html: String,
    /// Problems recovered from while rendering.
    pub diagnostics: Vec<RenderDiagnostic>,
}

/// Body of `POST /api/sites/{site}/publish`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBody {
    /// Optional custom domain to deploy to.
    #[serde(default)]
    pub custom_domain: Option<String>,
}

/// Response of `DELETE /api/sites/{site}/publish`.
#[derive(Debug, Serialize)]
pub struct Cancelled {
    /// Whether a running poll loop was stopped.
    pub cancelled: bool,
}

/// List the component registry.
pub async fn list_components(State(state): State<AppState>) -> Json<Vec<ComponentDescriptor>> {
    Json(state.registry.descriptors().into_iter().cloned().collect())
}

/// List stored sites.
pub async fn list_sites(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.site_ids())
}

/// Create a site holding an empty section.
pub async fn create_site(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<(StatusCode, Json<SiteDocument>)> {
    validate_site_id(&site)?;
    state.store.create_site(&site)?;
    Ok((StatusCode::CREATED, Json(state.store.document(&site)?)))
}

/// Delete a site and stop any publish polling for it.
pub async fn delete_site(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<StatusCode> {
    validate_site_id(&site)?;
    if !state.store.delete_site(&site)? {
        return Err(site_core::StoreError::SiteNotFound(site).into());
    }
    if let Some(publisher) = &state.publisher {
        publisher.cancel(&site);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Get a site's tree.
pub async fn get_tree(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<Json<SiteDocument>> {
    validate_site_id(&site)?;
    Ok(Json(state.store.document(&site)?))
}

/// Replace a site's tree, creating the site if needed.
pub async fn put_tree(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Json(body): Json<ReplaceTree>,
) -> ApiResult<Json<SiteDocument>> {
    validate_site_id(&site)?;
    let tree = ElementTree::new(body.root)?;
    validate_tree(&tree)?;
    let result = tree
        .validate(&state.registry)
        .map_err(ApiError::from)
        .and_then(|()| state.store.save_tree(&site, &tree).map_err(ApiError::from));
    metrics::record_tree_mutation("replace_tree", result.is_ok());
    result?;
    tracing::debug!("Replaced tree of {} ({} nodes)", site, tree.node_count());
    Ok(Json(state.store.document(&site)?))
}

/// Merge props into an element, or into one of its viewport overrides.
pub async fn update_element(
    State(state): State<AppState>,
    Path((site, id)): Path<(String, String)>,
    Json(body): Json<UpdateElement>,
) -> ApiResult<Json<SiteDocument>> {
    validate_site_id(&site)?;
    validate_element_id(&id)?;
    let id = ElementId::from(id);
    let (op, result) = match body.viewport {
        Some(viewport) => (
            "update_responsive_override",
            state.store.update(&site, |tree| {
                tree.update_responsive_override(&id, viewport, &body.props)
            }),
        ),
        None => (
            "update_props",
            state
                .store
                .update(&site, |tree| tree.update_props(&id, &body.props)),
        ),
    };
    mutation(&state, &site, op, result)
}

/// Insert a child element.
pub async fn insert_child(
    State(state): State<AppState>,
    Path((site, parent)): Path<(String, String)>,
    Json(body): Json<InsertChild>,
) -> ApiResult<(StatusCode, Json<Inserted>)> {
    validate_site_id(&site)?;
    validate_element_id(&parent)?;
    let element = match (body.element, body.kind) {
        (Some(element), _) => element,
        (None, Some(kind)) => state.registry.instantiate(&kind)?,
        (None, None) => {
            let missing = ValidationError::InvalidBody("either `element` or `type` is required".into());
            return Err(missing.into());
        }
    };
    validate_subtree(&element)?;

    let parent = ElementId::from(parent);
    let id = element.id.clone();
    let registry = &state.registry;
    let result = state.store.update(&site, |tree| {
        let index = match body.index {
            Some(index) => index,
            None => tree.get_node(&parent)?.children.len(),
        };
        tree.insert_child(registry, &parent, element, index)
    });
    let Json(tree) = mutation(&state, &site, "insert_child", result)?;
    Ok((StatusCode::CREATED, Json(Inserted { id, tree })))
}

/// Move an element under a new parent.
pub async fn move_element(
    State(state): State<AppState>,
    Path((site, id)): Path<(String, String)>,
    Json(body): Json<MoveElement>,
) -> ApiResult<Json<SiteDocument>> {
    validate_site_id(&site)?;
    validate_element_id(&id)?;
    validate_element_id(&body.parent)?;
    let id = ElementId::from(id);
    let parent = ElementId::from(body.parent);
    let registry = &state.registry;
    let result = state
        .store
        .update(&site, |tree| tree.move_node(registry, &id, &parent, body.index));
    mutation(&state, &site, "move_node", result)
}

/// Remove an element with its subtree.
pub async fn remove_element(
    State(state): State<AppState>,
    Path((site, id)): Path<(String, String)>,
) -> ApiResult<Json<SiteDocument>> {
    validate_site_id(&site)?;
    validate_element_id(&id)?;
    let id = ElementId::from(id);
    let result = state.store.update(&site, |tree| tree.remove_node(&id));
    mutation(&state, &site, "remove_node", result)
}

fn mutation(
    state: &AppState,
    site: &str,
    op: &str,
    result: site_core::StoreResult<ElementTree>,
) -> ApiResult<Json<SiteDocument>> {
    metrics::record_tree_mutation(op, result.is_ok());
    result?;
    Ok(Json(state.store.document(site)?))
}

/// Render a site's tree for one viewport.
pub async fn render(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Query(query): Query<RenderQuery>,
) -> ApiResult<Json<RenderResponse>> {
    validate_site_id(&site)?;
    let viewport = match query.viewport.as_deref() {
        Some(name) => name.parse::<Viewport>()?,
        None => Viewport::Desktop,
    };
    let mode = match query.mode.as_deref() {
        Some(name) => name
            .parse::<RenderMode>()
            .map_err(|_| ValidationError::InvalidParameter {
                name: "mode",
                value: name.to_string(),
            })?,
        None => RenderMode::Editor,
    };

    let tree = state.store.load_tree(&site)?;
    let output = Renderer::new(&state.registry)
        .with_mode(mode)
        .render(&tree, viewport);
    metrics::record_render(
        &viewport.to_string(),
        &mode.to_string(),
        output.diagnostics.len(),
    );
    Ok(Json(RenderResponse {
        viewport,
        mode,
        html: output.to_html(),
        diagnostics: output.diagnostics,
    }))
}

/// The full published page of a site.
pub async fn preview(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<Html<String>> {
    validate_site_id(&site)?;
    let tree = state.store.load_tree(&site)?;
    let options = PageOptions {
        title: site.clone(),
        ..PageOptions::default()
    };
    let page = export_page(&tree, &state.registry, &options);
    metrics::record_render("desktop", "published", page.diagnostics.len());
    Ok(Html(page.html))
}

/// Submit the current tree for publishing.
pub async fn start_publish(
    State(state): State<AppState>,
    Path(site): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<PublishJob>)> {
    validate_site_id(&site)?;
    let request: PublishBody = if body.iter().all(u8::is_ascii_whitespace) {
        PublishBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ValidationError::InvalidBody(e.to_string()))?
    };
    let Some(publisher) = &state.publisher else {
        metrics::record_publish_request("unavailable");
        return Err(ApiError::PublishUnavailable);
    };
    let custom_domain = request
        .custom_domain
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty());
    if let Some(domain) = &custom_domain {
        validate_custom_domain(domain)?;
    }

    let tree = state.store.load_tree(&site)?;
    publisher.prune();
    match publisher.publish(&site, &tree, custom_domain).await {
        Ok(job) => {
            metrics::record_publish_request("accepted");
            Ok((StatusCode::ACCEPTED, Json(job)))
        }
        Err(error) => {
            metrics::record_publish_request("rejected");
            Err(error.into())
        }
    }
}

/// The latest publish job of a site.
pub async fn publish_status(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<Json<PublishJob>> {
    validate_site_id(&site)?;
    let publisher = state.publisher.as_ref().ok_or(ApiError::PublishUnavailable)?;
    publisher
        .status(&site)
        .map(Json)
        .ok_or(ApiError::NoJob(site))
}

/// Stop polling the latest publish job of a site.
pub async fn cancel_publish(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<Json<Cancelled>> {
    validate_site_id(&site)?;
    let publisher = state.publisher.as_ref().ok_or(ApiError::PublishUnavailable)?;
    if publisher.status(&site).is_none() {
        return Err(ApiError::NoJob(site));
    }
    Ok(Json(Cancelled {
        cancelled: publisher.cancel(&site),
    }))
}

