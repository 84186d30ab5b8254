//! Visitor sessions.
//!
//! A session is an opaque UUID carried in an HTTP-only cookie. It only keys the rate
//! limiter, so a visitor who drops the cookie gets a new session.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "folio_session";

/// Resolves the session for a request, minting one when the cookie is absent or invalid.
///
/// Returns the jar to send back (with a `Set-Cookie` only when a session was minted)
/// and the session id.
#[must_use]
pub fn resolve_session(jar: CookieJar, secure: bool) -> (CookieJar, String) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        return (jar, id.to_string());
    }

    let id = Uuid::new_v4().to_string();
    tracing::debug!(session = %id, "Minted session");
    let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);
    (jar.add(cookie), id)
}
