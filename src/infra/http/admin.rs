//! Admin-only editor routes. Every handler here sits behind `require_admin`.

use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    application::{
        access::Identity, entries::EntryError, error::HttpError, forms::EntryForm,
    },
    domain::tags::is_route_token,
    presentation::views::{EditorTemplate, EditorView, LayoutContext, render_template_response},
};

use super::{HttpState, found, see_other};

#[derive(Debug, Deserialize)]
pub(super) struct DeleteForm {
    #[serde(default)]
    key: String,
}

pub(super) async fn new_entry_form(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, HttpError> {
    let chrome = state.chrome(&headers, uri.path()).await?;
    let view = LayoutContext::new(chrome, EditorView::blank());
    Ok(render_template_response(
        EditorTemplate { view },
        StatusCode::OK,
    ))
}

pub(super) async fn create_entry(
    State(state): State<HttpState>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    uri: Uri,
    Form(form): Form<EntryForm>,
) -> Result<Response, HttpError> {
    match state.entries.create(&identity.user, &form).await {
        Ok(entry) => Ok(see_other(&state.feed.permalink(&entry.slug))),
        Err(EntryError::Validation(errors)) => {
            let chrome = state.chrome(&headers, uri.path()).await?;
            let view = LayoutContext::new(
                chrome,
                EditorView::blank().with_submission(&form, &errors),
            );
            Ok(render_template_response(
                EditorTemplate { view },
                StatusCode::OK,
            ))
        }
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn edit_entry_form(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
    Path(key): Path<String>,
) -> Result<Response, HttpError> {
    if !is_route_token(&key) {
        return Ok(found("/new"));
    }

    let entry = match state.entries.get_by_key(&key).await {
        Ok(entry) => entry,
        Err(EntryError::NotFound) => return Ok(found("/new")),
        Err(err) => return Err(err.into()),
    };

    let chrome = state.chrome(&headers, uri.path()).await?;
    let view = LayoutContext::new(chrome, EditorView::for_entry(&entry));
    Ok(render_template_response(
        EditorTemplate { view },
        StatusCode::OK,
    ))
}

pub(super) async fn update_entry(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
    Path(key): Path<String>,
    Form(form): Form<EntryForm>,
) -> Result<Response, HttpError> {
    if !is_route_token(&key) {
        return Ok(see_other("/new"));
    }

    match state.entries.update(&key, &form).await {
        Ok(entry) => Ok(see_other(&state.feed.permalink(&entry.slug))),
        Err(EntryError::NotFound) => Ok(see_other("/new")),
        Err(EntryError::Validation(errors)) => {
            let chrome = state.chrome(&headers, uri.path()).await?;
            let view = LayoutContext::new(
                chrome,
                EditorView::for_key(&key).with_submission(&form, &errors),
            );
            Ok(render_template_response(
                EditorTemplate { view },
                StatusCode::OK,
            ))
        }
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn delete_entry(
    State(state): State<HttpState>,
    Form(form): Form<DeleteForm>,
) -> Result<Response, HttpError> {
    let success = state.entries.delete(form.key.trim()).await?;
    Ok(Json(json!({ "success": success })).into_response())
}
