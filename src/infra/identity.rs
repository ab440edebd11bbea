//! Identity supplied by an authenticating reverse proxy.

use std::collections::BTreeSet;

use axum::http::{HeaderMap, HeaderName};
use url::form_urlencoded;

use crate::application::access::{Identity, IdentityProvider};
use crate::config::AuthSettings;
use crate::domain::entities::author_nickname;

/// Reads the signed-in user from a trusted request header.
#[derive(Debug, Clone)]
pub struct HeaderIdentityProvider {
    header: HeaderName,
    admins: BTreeSet<String>,
    login_url: String,
}

impl HeaderIdentityProvider {
    pub fn new(
        header: HeaderName,
        admins: impl IntoIterator<Item = String>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            header,
            admins: admins
                .into_iter()
                .map(|admin| admin.to_ascii_lowercase())
                .collect(),
            login_url: login_url.into(),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.user_header.clone(),
            settings.admins.iter().cloned(),
            settings.login_url.clone(),
        )
    }
}

impl IdentityProvider for HeaderIdentityProvider {
    fn current_identity(&self, headers: &HeaderMap) -> Option<Identity> {
        let user = headers.get(&self.header)?.to_str().ok()?.trim();
        if user.is_empty() {
            return None;
        }

        Some(Identity {
            user: user.to_string(),
            nickname: author_nickname(user).to_string(),
            is_admin: self.admins.contains(&user.to_ascii_lowercase()),
        })
    }

    fn login_url(&self, return_to: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("return_to", return_to)
            .finish();
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.login_url)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn provider() -> HeaderIdentityProvider {
        HeaderIdentityProvider::new(
            HeaderName::from_static("x-forwarded-user"),
            vec!["Ben@example.com".to_string()],
            "/login",
        )
    }

    fn headers(user: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-user",
            HeaderValue::from_str(user).expect("header value"),
        );
        headers
    }

    #[test]
    fn missing_or_blank_header_is_anonymous() {
        let provider = provider();
        assert!(provider.current_identity(&HeaderMap::new()).is_none());
        assert!(provider.current_identity(&headers("  ")).is_none());
    }

    #[test]
    fn admins_are_matched_case_insensitively() {
        let identity = provider()
            .current_identity(&headers("ben@example.com"))
            .expect("identity");
        assert!(identity.is_admin);
        assert_eq!(identity.nickname, "ben");

        let identity = provider()
            .current_identity(&headers("eve@example.com"))
            .expect("identity");
        assert!(!identity.is_admin);
    }

    #[test]
    fn login_url_carries_encoded_return_path() {
        assert_eq!(
            provider().login_url("/edit/abc?x=1"),
            "/login?return_to=%2Fedit%2Fabc%3Fx%3D1"
        );

        let provider = HeaderIdentityProvider::new(
            HeaderName::from_static("x-forwarded-user"),
            Vec::new(),
            "https://sso.example.com/auth?app=blog",
        );
        assert_eq!(
            provider.login_url("/new"),
            "https://sso.example.com/auth?app=blog&return_to=%2Fnew"
        );
    }
}
