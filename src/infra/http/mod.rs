mod admin;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderMap, HeaderValue, StatusCode, header::LOCATION},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::access::IdentityProvider;
use crate::application::entries::EntryService;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::repos::RepoError;
use crate::application::syndication::FeedMetadata;
use crate::config::SiteSettings;
use crate::presentation::views::{LayoutChrome, entry_links};

pub use middleware::RequestContext;

use self::middleware::{log_responses, require_admin, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub entries: Arc<EntryService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub site: Arc<SiteSettings>,
    pub feed: Arc<FeedMetadata>,
}

impl HttpState {
    pub fn new(
        entries: EntryService,
        identity: Arc<dyn IdentityProvider>,
        site: SiteSettings,
    ) -> Self {
        let feed = FeedMetadata {
            title: site.title.clone(),
            link: site.link.clone(),
            description: site.description.clone(),
            language: site.language.clone(),
            permalink_base: site.permalink_base.clone(),
        };
        Self {
            entries: Arc::new(entries),
            identity,
            site: Arc::new(site),
            feed: Arc::new(feed),
        }
    }

    /// Layout data shared by every rendered page.
    async fn chrome(&self, headers: &HeaderMap, path: &str) -> Result<LayoutChrome, HttpError> {
        let recent = self.entries.recent_entries().await?;
        let identity = self.identity.current_identity(headers);

        Ok(LayoutChrome {
            site_title: self.site.title.clone(),
            site_description: self.site.description.clone(),
            language: self.site.language.clone(),
            request_path: path.to_string(),
            is_admin: identity.as_ref().is_some_and(|identity| identity.is_admin),
            nickname: identity.map(|identity| identity.nickname),
            recent: entry_links(&recent, &self.site.permalink_base),
        })
    }
}

pub fn build_router(state: HttpState) -> Router {
    let admin_routes = Router::new()
        .route("/new", get(admin::new_entry_form).post(admin::create_entry))
        .route(
            "/edit/{key}",
            get(admin::edit_entry_form).post(admin::update_entry),
        )
        .route("/delete", post(admin::delete_entry))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .route("/", get(public::index))
        .route("/archive", get(public::archive))
        .route("/e/{slug}", get(public::entry))
        .route("/t/{tag}", get(public::tag))
        .route("/{year}/{month}/{day}/{slug}", get(public::legacy_redirect))
        .route("/{year}/{month}/{day}/{slug}/", get(public::legacy_redirect))
        .route("/_health/db", get(public::db_health))
        .fallback(public::fallback);

    public_routes
        .merge(admin_routes)
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// 302 redirect.
fn found(location: &str) -> Response {
    redirect(StatusCode::FOUND, location)
}

/// 303 redirect after a successful form submission.
fn see_other(location: &str) -> Response {
    redirect(StatusCode::SEE_OTHER, location)
}

fn redirect(status: StatusCode, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (status, [(LOCATION, value)]).into_response(),
        Err(err) => HttpError::new(
            "infra::http::redirect",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Redirect target is invalid",
            err.to_string(),
        )
        .into_response(),
    }
}
