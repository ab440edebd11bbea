use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::forms::{EntryForm, FieldErrors};
use crate::application::pagination::{Adjacency, EntryPage};
use crate::domain::entities::EntryRecord;
use crate::domain::tags::tags_as_text;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Data shared by every page: site chrome, the sidebar and the viewer.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub site_description: String,
    pub language: String,
    pub request_path: String,
    pub is_admin: bool,
    pub nickname: Option<String>,
    pub recent: Vec<EntryLink>,
}

pub struct LayoutContext<T> {
    pub chrome: LayoutChrome,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self { chrome, content }
    }
}

#[derive(Clone)]
pub struct TagBadge {
    pub name: String,
    pub href: String,
}

/// Title plus permalink, used for the sidebar and previous/next links.
#[derive(Clone)]
pub struct EntryLink {
    pub title: String,
    pub href: String,
}

impl EntryLink {
    pub fn from_entry(entry: &EntryRecord, permalink_base: &str) -> Self {
        Self {
            title: entry.title.clone(),
            href: format!("{permalink_base}{}", entry.slug),
        }
    }
}

pub fn entry_links(entries: &[EntryRecord], permalink_base: &str) -> Vec<EntryLink> {
    entries
        .iter()
        .map(|entry| EntryLink::from_entry(entry, permalink_base))
        .collect()
}

#[derive(Clone)]
pub struct EntryView {
    pub key: String,
    pub title: String,
    pub permalink: String,
    pub body: String,
    pub author: String,
    pub published: String,
    pub published_iso: String,
    pub tags: Vec<TagBadge>,
}

impl EntryView {
    pub fn from_entry(entry: &EntryRecord, permalink_base: &str) -> Self {
        Self {
            key: entry.key(),
            title: entry.title.clone(),
            permalink: format!("{permalink_base}{}", entry.slug),
            body: entry.body.clone(),
            author: entry.author_name().to_string(),
            published: display_date(entry.published),
            published_iso: entry.published.format(&Rfc3339).unwrap_or_default(),
            tags: entry
                .tags
                .iter()
                .map(|tag| TagBadge {
                    name: tag.clone(),
                    href: format!("/t/{tag}"),
                })
                .collect(),
        }
    }
}

pub fn entry_views(entries: &[EntryRecord], permalink_base: &str) -> Vec<EntryView> {
    entries
        .iter()
        .map(|entry| EntryView::from_entry(entry, permalink_base))
        .collect()
}

fn display_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[month repr:long] [day padding:none], [year]"))
        .unwrap_or_default()
}

pub struct IndexView {
    pub entries: Vec<EntryView>,
    /// Number of entries across all pages.
    pub total: u64,
    /// Link to newer entries; absent on the first page.
    pub newer_href: Option<String>,
    /// Link to older entries; absent on the last page.
    pub older_href: Option<String>,
}

impl IndexView {
    pub fn from_page(page: &EntryPage, total: u64, permalink_base: &str) -> Self {
        let window = page.window;
        Self {
            entries: entry_views(&page.entries, permalink_base),
            total,
            newer_href: (!window.is_first()).then(|| match window.previous_offset {
                0 => "/".to_string(),
                offset => format!("/?start={offset}"),
            }),
            older_href: page
                .has_more
                .then(|| format!("/?start={}", window.next_offset)),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

pub struct EntryPageView {
    pub entry: EntryView,
    pub previous: Option<EntryLink>,
    pub next: Option<EntryLink>,
}

impl EntryPageView {
    pub fn new(entry: &EntryRecord, adjacency: &Adjacency, permalink_base: &str) -> Self {
        Self {
            entry: EntryView::from_entry(entry, permalink_base),
            previous: adjacency
                .previous
                .as_ref()
                .map(|entry| EntryLink::from_entry(entry, permalink_base)),
            next: adjacency
                .next
                .as_ref()
                .map(|entry| EntryLink::from_entry(entry, permalink_base)),
        }
    }
}

#[derive(Template)]
#[template(path = "entry.html")]
pub struct EntryTemplate {
    pub view: LayoutContext<EntryPageView>,
}

pub struct TagView {
    pub tag: String,
    pub entries: Vec<EntryView>,
}

#[derive(Template)]
#[template(path = "tag.html")]
pub struct TagTemplate {
    pub view: LayoutContext<TagView>,
}

pub struct ArchiveView {
    pub entries: Vec<EntryView>,
}

#[derive(Template)]
#[template(path = "archive.html")]
pub struct ArchiveTemplate {
    pub view: LayoutContext<ArchiveView>,
}

/// Create/edit form state, re-rendered with field errors on validation failure.
pub struct EditorView {
    pub action: String,
    pub heading: &'static str,
    pub key: Option<String>,
    pub title: String,
    pub body: String,
    pub tags: String,
    pub title_error: Option<String>,
    pub body_error: Option<String>,
}

impl EditorView {
    pub fn blank() -> Self {
        Self {
            action: "/new".to_string(),
            heading: "New entry",
            key: None,
            title: String::new(),
            body: String::new(),
            tags: String::new(),
            title_error: None,
            body_error: None,
        }
    }

    pub fn for_key(key: &str) -> Self {
        Self {
            action: format!("/edit/{key}"),
            heading: "Edit entry",
            key: Some(key.to_string()),
            ..Self::blank()
        }
    }

    pub fn for_entry(entry: &EntryRecord) -> Self {
        Self {
            title: entry.title.clone(),
            body: entry.body.clone(),
            tags: tags_as_text(&entry.tags),
            ..Self::for_key(&entry.key())
        }
    }

    /// Keep what the author typed and attach the validation messages.
    pub fn with_submission(mut self, form: &EntryForm, errors: &FieldErrors) -> Self {
        self.title = form.title.clone();
        self.body = form.body.clone();
        self.tags = form.tags.clone();
        self.title_error = errors.for_field("title").map(str::to_string);
        self.body_error = errors.for_field("body").map(str::to_string);
        self
    }
}

#[derive(Template)]
#[template(path = "editor.html")]
pub struct EditorTemplate {
    pub view: LayoutContext<EditorView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::application::pagination::{PageOutcome, PageWindow};

    fn chrome() -> LayoutChrome {
        LayoutChrome {
            site_title: "Gazette".to_string(),
            site_description: "Notes".to_string(),
            language: "en".to_string(),
            request_path: "/".to_string(),
            is_admin: false,
            nickname: None,
            recent: Vec::new(),
        }
    }

    fn entry(slug: &str) -> EntryRecord {
        let at = datetime!(2024-03-02 10:00 UTC);
        EntryRecord {
            id: Uuid::new_v4(),
            author: "ben@example.com".to_string(),
            title: format!("Title {slug}"),
            slug: slug.to_string(),
            body: "<p>Body</p>".to_string(),
            published: at,
            updated: at,
            tags: BTreeSet::from(["rust".to_string()]),
        }
    }

    #[test]
    fn entry_view_formats_fields() {
        let view = EntryView::from_entry(&entry("hello"), "/e/");
        assert_eq!(view.permalink, "/e/hello");
        assert_eq!(view.author, "ben");
        assert_eq!(view.published, "March 2, 2024");
        assert_eq!(view.tags[0].href, "/t/rust");
    }

    #[test]
    fn index_links_follow_the_window() {
        let rows = vec![entry("a"), entry("b"), entry("c")];
        let PageOutcome::Page(page) = PageOutcome::from_rows(rows, PageWindow::new(2, 2)) else {
            panic!("page expected");
        };
        let view = IndexView::from_page(&page, 3, "/e/");
        assert_eq!(view.total, 3);
        assert_eq!(view.newer_href.as_deref(), Some("/"));
        assert_eq!(view.older_href.as_deref(), Some("/?start=4"));

        let PageOutcome::Page(page) = PageOutcome::from_rows(vec![entry("a")], PageWindow::new(0, 2))
        else {
            panic!("page expected");
        };
        let view = IndexView::from_page(&page, 1, "/e/");
        assert!(view.newer_href.is_none());
        assert!(view.older_href.is_none());
    }

    #[test]
    fn editor_keeps_submission_and_errors() {
        let form = EntryForm {
            title: String::new(),
            body: "draft".to_string(),
            tags: "a, b".to_string(),
        };
        let errors = form.validate().expect_err("title missing");
        let view = EditorView::blank().with_submission(&form, &errors);
        assert_eq!(view.body, "draft");
        assert_eq!(view.title_error.as_deref(), Some("This field is required."));
        assert!(view.body_error.is_none());
    }

    #[test]
    fn not_found_page_renders_with_report() {
        let response = render_not_found_response(chrome());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn entry_page_renders_body_and_neighbors() {
        let current = entry("current");
        let adjacency = Adjacency {
            previous: Some(entry("older")),
            next: None,
        };
        let view = LayoutContext::new(chrome(), EntryPageView::new(&current, &adjacency, "/e/"));
        let html = EntryTemplate { view }.render().expect("render");

        assert!(html.contains("<p>Body</p>"));
        assert!(html.contains("href=\"/e/older\""));
        assert!(!html.contains("Newer:"));
    }
}
