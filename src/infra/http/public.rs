use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use tracing::error;
use url::form_urlencoded;

use crate::{
    application::{
        entries::EntryError,
        error::HttpError,
        pagination::PageOutcome,
        syndication::{ATOM_CONTENT_TYPE, render_feed},
    },
    domain::tags::is_route_token,
    presentation::views::{
        ArchiveTemplate, ArchiveView, EntryPageView, EntryTemplate, IndexTemplate, IndexView,
        LayoutContext, TagTemplate, TagView, entry_views, render_not_found_response,
        render_template_response,
    },
};

use super::{HttpState, db_health_response, found};

/// Query string of the main listing. Unparseable values fall back to
/// defaults instead of failing the request.
#[derive(Debug, Default, PartialEq, Eq)]
struct IndexQuery {
    start: u64,
    atom: bool,
}

impl IndexQuery {
    fn parse(raw: Option<&str>) -> Self {
        let mut start = None;
        let mut format = None;
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "start" if start.is_none() => start = Some(value.into_owned()),
                "format" if format.is_none() => format = Some(value.into_owned()),
                _ => {}
            }
        }

        Self {
            start: start
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(0),
            atom: format.as_deref() == Some("atom"),
        }
    }
}

pub(super) async fn index(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = IndexQuery::parse(raw.as_deref());

    let page = match state.entries.page(query.start).await {
        Ok(PageOutcome::Page(page)) => page,
        Ok(PageOutcome::RedirectToFirst) => return found("/"),
        Err(err) => return HttpError::from(err).into_response(),
    };

    if query.atom {
        return match render_feed(&page.entries, &state.feed) {
            Ok(body) => (
                StatusCode::OK,
                [(CONTENT_TYPE, HeaderValue::from_static(ATOM_CONTENT_TYPE))],
                body,
            )
                .into_response(),
            Err(err) => {
                error!(target = "gazette::http::feed", error = %err, "feed rendering failed");
                HttpError::from_error(
                    "infra::http::public::index",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Feed rendering failed",
                    &err,
                )
                .into_response()
            }
        };
    }

    let total = match state.entries.count(None).await {
        Ok(total) => total,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let chrome = match state.chrome(&headers, uri.path()).await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };
    let view = LayoutContext::new(
        chrome,
        IndexView::from_page(&page, total, &state.site.permalink_base),
    );
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

pub(super) async fn archive(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, HttpError> {
    let entries = state.entries.list_all().await?;
    let chrome = state.chrome(&headers, uri.path()).await?;

    let view = LayoutContext::new(
        chrome,
        ArchiveView {
            entries: entry_views(&entries, &state.site.permalink_base),
        },
    );
    Ok(render_template_response(
        ArchiveTemplate { view },
        StatusCode::OK,
    ))
}

pub(super) async fn entry(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
    Path(slug): Path<String>,
) -> Result<Response, HttpError> {
    let chrome = state.chrome(&headers, uri.path()).await?;
    if !is_route_token(&slug) {
        return Ok(render_not_found_response(chrome));
    }

    match state.entries.permalink(&slug).await {
        Ok((entry, adjacency)) => {
            let view = LayoutContext::new(
                chrome,
                EntryPageView::new(&entry, &adjacency, &state.site.permalink_base),
            );
            Ok(render_template_response(
                EntryTemplate { view },
                StatusCode::OK,
            ))
        }
        Err(EntryError::NotFound) => Ok(render_not_found_response(chrome)),
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn tag(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
    Path(tag): Path<String>,
) -> Result<Response, HttpError> {
    let chrome = state.chrome(&headers, uri.path()).await?;
    if !is_route_token(&tag) {
        return Ok(render_not_found_response(chrome));
    }

    let entries = state.entries.list_by_tag(&tag).await?;
    let view = LayoutContext::new(
        chrome,
        TagView {
            entries: entry_views(&entries, &state.site.permalink_base),
            tag,
        },
    );
    Ok(render_template_response(TagTemplate { view }, StatusCode::OK))
}

/// Old date-based permalinks now live on a separate archive host.
pub(super) async fn legacy_redirect(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
    Path((year, month, day, slug)): Path<(String, String, String, String)>,
) -> Result<Response, HttpError> {
    let numeric = |segment: &str| {
        !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit())
    };

    if numeric(&year) && numeric(&month) && numeric(&day) && is_route_token(&slug) {
        return Ok(found(&format!(
            "{}/{year}/{month}/{day}/{slug}/",
            state.site.legacy_archive_url
        )));
    }

    let chrome = state.chrome(&headers, uri.path()).await?;
    Ok(render_not_found_response(chrome))
}

pub(super) async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.entries.health_check().await)
}

pub(super) async fn fallback(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, HttpError> {
    let chrome = state.chrome(&headers, uri.path()).await?;
    Ok(render_not_found_response(chrome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_query_defaults_on_garbage() {
        assert_eq!(IndexQuery::parse(None), IndexQuery::default());
        assert_eq!(IndexQuery::parse(Some("start=abc")).start, 0);
        assert_eq!(IndexQuery::parse(Some("start=-5")).start, 0);
        assert_eq!(IndexQuery::parse(Some("start=")).start, 0);
    }

    #[test]
    fn index_query_reads_start_and_format() {
        let query = IndexQuery::parse(Some("start=20&format=atom"));
        assert_eq!(query.start, 20);
        assert!(query.atom);

        let query = IndexQuery::parse(Some("format=rss&start=5&start=9"));
        assert_eq!(query.start, 5);
        assert!(!query.atom);
    }
}
