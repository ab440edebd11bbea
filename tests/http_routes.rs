use std::num::NonZeroU64;
use std::sync::Arc;

use atom_syndication::Feed;
use axum::{
    Router,
    body::Body,
    http::{
        HeaderName, Method, Request, StatusCode,
        header::{CONTENT_TYPE, LOCATION},
    },
    response::Response,
};
use gazette::application::access::IdentityProvider;
use gazette::application::entries::EntryService;
use gazette::application::forms::EntryForm;
use gazette::cache::{CacheConfig, LruCacheClient, RecentEntriesCache};
use gazette::config::SiteSettings;
use gazette::infra::http::{HttpState, build_router};
use gazette::infra::identity::HeaderIdentityProvider;
use gazette::infra::memory::MemoryRepositories;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const ADMIN: &str = "ben@example.com";
const READER: &str = "eve@example.com";

fn site(page_size: u64) -> SiteSettings {
    SiteSettings {
        title: "Gazette".to_string(),
        link: "https://blog.example.com".to_string(),
        description: "Notes".to_string(),
        language: "en".to_string(),
        page_size: NonZeroU64::new(page_size).expect("non-zero page size"),
        permalink_base: "/e/".to_string(),
        legacy_archive_url: "http://old.example.com".to_string(),
    }
}

fn app(page_size: u64) -> (Router, EntryService) {
    let recent = RecentEntriesCache::new(
        Arc::new(LruCacheClient::default()),
        &CacheConfig::default(),
    );
    let entries = EntryService::new(Arc::new(MemoryRepositories::new()), recent)
        .with_page_size(page_size);
    let identity: Arc<dyn IdentityProvider> = Arc::new(HeaderIdentityProvider::new(
        HeaderName::from_static("x-forwarded-user"),
        vec![ADMIN.to_string()],
        "/login",
    ));

    let router = build_router(HttpState::new(entries.clone(), identity, site(page_size)));
    (router, entries)
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-forwarded-user", user);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_form(uri: &str, user: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(user) = user {
        builder = builder.header("x-forwarded-user", user);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.expect("response")
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf-8 body")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

fn form(title: &str, body: &str, tags: &str) -> EntryForm {
    EntryForm {
        title: title.to_string(),
        body: body.to_string(),
        tags: tags.to_string(),
    }
}

#[tokio::test]
async fn admin_creates_entry_and_reader_sees_it() {
    let (router, _) = app(10);

    let response = send(
        &router,
        post_form(
            "/new",
            Some(ADMIN),
            "title=Hello+World&body=%3Cp%3EHi%3C%2Fp%3E&tags=A%2C+a%2C+B",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/e/hello-world");

    let response = send(&router, get("/e/hello-world", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Hello World"));
    assert!(html.contains("<p>Hi</p>"));
    assert!(html.contains("href=\"/t/a\""));
    assert!(html.contains("href=\"/t/b\""));

    let response = send(&router, get("/t/a", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/e/hello-world"));

    let response = send(&router, get("/archive", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Hello World"));
}

#[tokio::test]
async fn invalid_submission_rerenders_form_with_errors() {
    let (router, entries) = app(10);

    let response = send(&router, post_form("/new", Some(ADMIN), "title=&body=draft")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));
    assert!(html.contains("draft"));
    assert!(entries.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn admin_routes_gate_on_identity() {
    let (router, _) = app(10);

    let response = send(&router, get("/new", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?return_to=%2Fnew");

    let response = send(&router, post_form("/new", None, "title=x&body=y")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, get("/new", Some(READER))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, post_form("/delete", Some(READER), "key=abc")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, get("/new", Some(ADMIN))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn edit_prefills_and_updates_entry() {
    let (router, entries) = app(10);
    let entry = entries
        .create(ADMIN, &form("Original", "body", "zeta, alpha"))
        .await
        .expect("created");

    let response = send(&router, get(&format!("/edit/{}", entry.key()), Some(ADMIN))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("value=\"alpha, zeta\""));
    assert!(html.contains("Original"));

    let response = send(
        &router,
        post_form(
            &format!("/edit/{}", entry.key()),
            Some(ADMIN),
            "title=Renamed&body=changed&tags=alpha",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/e/original");

    let updated = entries.get_by_key(&entry.key()).await.expect("entry");
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.slug, "original");
}

#[tokio::test]
async fn edit_with_unknown_key_falls_back_to_new() {
    let (router, _) = app(10);

    let response = send(&router, get("/edit/not-a-key", Some(ADMIN))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/new");

    let missing = uuid::Uuid::new_v4();
    let response = send(
        &router,
        post_form(&format!("/edit/{missing}"), Some(ADMIN), "title=t&body=b"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/new");
}

#[tokio::test]
async fn delete_reports_whether_an_entry_was_removed() {
    let (router, entries) = app(10);
    let entry = entries
        .create(ADMIN, &form("Doomed", "body", ""))
        .await
        .expect("created");

    let response = send(
        &router,
        post_form("/delete", Some(ADMIN), &format!("key={}", entry.key())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(json, serde_json::json!({ "success": true }));

    let response = send(
        &router,
        post_form("/delete", Some(ADMIN), &format!("key={}", entry.key())),
    )
    .await;
    let json: Value = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(json, serde_json::json!({ "success": false }));

    let response = send(&router, post_form("/delete", Some(ADMIN), "key=garbage")).await;
    let json: Value = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(json["success"], Value::Bool(false));

    let response = send(&router, get("/e/doomed", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn index_paginates_and_redirects_past_the_end() {
    let (router, entries) = app(2);
    for n in 0..3 {
        entries
            .create(ADMIN, &form(&format!("Entry {n}"), "body", ""))
            .await
            .expect("created");
    }

    let response = send(&router, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("/e/entry-2"));
    assert!(html.contains("/e/entry-1"));
    assert!(html.contains("/?start=2"));

    let response = send(&router, get("/?start=2", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/e/entry-0"));

    let response = send(&router, get("/?start=50", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let response = send(&router, get("/?start=18446744073709551615", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let response = send(&router, get("/?start=banana", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_site_renders_first_page() {
    let (router, _) = app(10);
    let response = send(&router, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn atom_format_serves_the_current_page_as_a_feed() {
    let (router, entries) = app(10);
    for title in ["First", "Second"] {
        entries
            .create(ADMIN, &form(title, "body", "news"))
            .await
            .expect("created");
    }

    let response = send(&router, get("/?format=atom", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/atom+xml; charset=utf-8")
    );

    let feed = Feed::read_from(&body_bytes(response).await[..]).expect("atom feed");
    assert_eq!(feed.entries().len(), 2);
    let links = feed
        .entries()
        .iter()
        .map(|entry| entry.links()[0].href().to_string())
        .collect::<Vec<_>>();
    assert!(links[0].ends_with("/e/second"));
    assert!(links[1].ends_with("/e/first"));
}

#[tokio::test]
async fn legacy_dates_redirect_to_the_archive_host() {
    let (router, _) = app(10);

    let response = send(&router, get("/2009/03/14/pi-day", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "http://old.example.com/2009/03/14/pi-day/"
    );

    let response = send(&router, get("/2009/03/14/pi-day/", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = send(&router, get("/year/03/14/pi-day", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&router, get("/2010/01/02/caf%C3%A9", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(LOCATION).is_none());
}

#[tokio::test]
async fn unknown_paths_render_not_found() {
    let (router, _) = app(10);

    for uri in [
        "/e/missing",
        "/nowhere",
        "/e/bad.slug",
        "/a/b",
        "/e/caf%C3%A9",
        "/t/caf%C3%A9",
    ] {
        let response = send(&router, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let response = send(&router, get("/t/unused", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn db_health_reports_no_content() {
    let (router, _) = app(10);
    let response = send(&router, get("/_health/db", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn sidebar_reflects_mutations_immediately() {
    let (router, entries) = app(10);
    entries
        .create(ADMIN, &form("Visible", "body", ""))
        .await
        .expect("created");

    let html = body_text(send(&router, get("/archive", None)).await).await;
    assert!(html.contains("Visible"));

    let response = send(
        &router,
        post_form("/new", Some(ADMIN), "title=Fresh+Post&body=new"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_text(send(&router, get("/t/none", None)).await).await;
    assert!(html.contains("/e/fresh-post"));
}
