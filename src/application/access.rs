//! Admin gate for privileged views and actions.

use axum::http::{HeaderMap, Method};

/// The signed-in user as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub nickname: String,
    pub is_admin: bool,
}

/// Source of the current request's identity.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self, headers: &HeaderMap) -> Option<Identity>;

    /// Where to send an anonymous visitor so they come back to `return_to`.
    fn login_url(&self, return_to: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow(Identity),
    RedirectToLogin,
    Forbidden,
}

/// Decide whether a request may reach an admin handler.
///
/// Anonymous reads are sent to the login flow; anonymous writes and
/// signed-in non-admins are refused outright.
pub fn authorize(identity: Option<Identity>, method: &Method) -> AccessDecision {
    match identity {
        None if is_read(method) => AccessDecision::RedirectToLogin,
        None => AccessDecision::Forbidden,
        Some(identity) if identity.is_admin => AccessDecision::Allow(identity),
        Some(_) => AccessDecision::Forbidden,
    }
}

fn is_read(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(is_admin: bool) -> Identity {
        Identity {
            user: "ben@example.com".to_string(),
            nickname: "ben".to_string(),
            is_admin,
        }
    }

    #[test]
    fn anonymous_reads_redirect_and_writes_are_forbidden() {
        assert_eq!(authorize(None, &Method::GET), AccessDecision::RedirectToLogin);
        assert_eq!(authorize(None, &Method::HEAD), AccessDecision::RedirectToLogin);
        assert_eq!(authorize(None, &Method::POST), AccessDecision::Forbidden);
        assert_eq!(authorize(None, &Method::DELETE), AccessDecision::Forbidden);
    }

    #[test]
    fn non_admins_are_forbidden_for_every_method() {
        for method in [Method::GET, Method::POST] {
            assert_eq!(
                authorize(Some(identity(false)), &method),
                AccessDecision::Forbidden
            );
        }
    }

    #[test]
    fn admins_are_allowed() {
        assert_eq!(
            authorize(Some(identity(true)), &Method::POST),
            AccessDecision::Allow(identity(true))
        );
    }
}
