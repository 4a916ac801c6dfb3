use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

const STATE_COOKIE_NAME: &str = "__aps_state";

/// Create the CSRF state cookie for the authorization redirect.
pub(super) fn csrf_cookie(state: &str, secure: bool, auth_path: &str) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(Duration::minutes(5))
        .build()
}

/// Create the removal cookie for the CSRF state.
pub(super) fn clear_csrf_cookie(auth_path: &str) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Get the CSRF state from cookies.
pub(super) fn get_csrf_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Create the session cookie.
pub(super) fn session_cookie(
    name: &str,
    session_id: &str,
    ttl_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(ttl_days))
        .build()
}

/// Create the removal cookie for the session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Get the session ID from cookies.
pub(super) fn get_session_id(
    jar: &PrivateCookieJar,
    name: &str,
) -> Option<crate::types::SessionId> {
    jar.get(name)
        .map(|c| crate::types::SessionId::from(c.value().to_string()))
}
