use axum::Json;
use axum::Router;
use axum::extract::{Form, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use super::cookies;
use super::error::AuthError;
use super::state::AuthState;
use super::traits::SessionStore;
use crate::factory::ClientFactory;
use crate::oauth::{AuthorizationFlows, ProfileLookup};
use crate::session::{Session, TokenPair};
use crate::types::{ClientId, SessionId};

/// Create the APS authentication router.
///
/// Mounts under the configured auth path (default `/api/auth`):
/// `POST credentials`, `POST credentials/unregister`, `GET login`,
/// `GET callback`, `GET|POST logout`, `GET token`, `GET profile`.
pub fn auth_routes<S, F>(state: AuthState<S, F>) -> Router
where
    S: SessionStore,
    F: ClientFactory,
{
    let auth_path = state.settings.auth_path.clone();

    Router::new()
        .route(&format!("{auth_path}/credentials"), post(credentials::<S, F>))
        .route(
            &format!("{auth_path}/credentials/unregister"),
            post(unregister::<S, F>),
        )
        .route(&format!("{auth_path}/login"), get(login::<S, F>))
        .route(&format!("{auth_path}/callback"), get(callback::<S, F>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<S, F>).post(logout::<S, F>),
        )
        .route(&format!("{auth_path}/token"), get(token::<S, F>))
        .route(&format!("{auth_path}/profile"), get(profile::<S, F>))
        .with_state(state)
}

// ── Credentials ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CredentialsForm {
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
    /// Register the secret for other sessions of this deployment.
    #[serde(default)]
    share: bool,
}

async fn credentials<S: SessionStore, F: ClientFactory>(
    State(state): State<AuthState<S, F>>,
    jar: PrivateCookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let client_secret = form.client_secret.filter(|s| !s.is_empty());
    let client_id = ClientId::from(form.client_id);

    if form.share {
        if let Some(secret) = &client_secret {
            state.registry.register(client_id.clone(), secret.clone());
            tracing::info!(client_id = %client_id, "client secret registered for shared use");
        }
    }

    // Switching credentials discards any previous tokens: re-login required.
    let session = Session::with_credentials(client_id, client_secret);

    let mut jar = jar;
    let existing = cookies::get_session_id(&jar, &state.settings.session_cookie_name);
    match existing {
        Some(id) if state.load_session(&id).await?.is_some() => {
            state.save_session(&id, session).await?;
        }
        _ => {
            let id = state
                .session_store
                .create(session)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;
            jar = jar.add(cookies::session_cookie(
                &state.settings.session_cookie_name,
                id.as_str(),
                state.settings.session_ttl_days,
                state.settings.secure_cookies,
            ));
        }
    }

    Ok((jar, Redirect::to(&state.settings.login_redirect)))
}

#[derive(Deserialize)]
struct UnregisterForm {
    client_secret: String,
}

async fn unregister<S: SessionStore, F: ClientFactory>(
    State(state): State<AuthState<S, F>>,
    Form(form): Form<UnregisterForm>,
) -> Redirect {
    state.registry.unregister(&form.client_secret);
    Redirect::to(&state.settings.login_redirect)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<S: SessionStore, F: ClientFactory>(
    State(state): State<AuthState<S, F>>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    let (_, session) = current_session(&state, &jar).await?;

    if !state.lifecycle.factory().has_identity(&session) {
        return Err(login_error(
            &state.settings.error_redirect,
            "missing_credentials",
        ));
    }

    let csrf_state = crate::csrf::generate_state();
    let url = state
        .lifecycle
        .factory()
        .internal_client(&session)
        .authorize_url(&csrf_state);

    let jar = jar.add(cookies::csrf_cookie(
        &csrf_state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    ));

    Ok((jar, Redirect::to(&url)))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<S: SessionStore, F: ClientFactory>(
    State(state): State<AuthState<S, F>>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from APS");
        return Err(login_error(&state.settings.error_redirect, desc));
    }

    let code = params
        .code
        .ok_or_else(|| login_error(&state.settings.error_redirect, "missing_code"))?;

    let received_state = params
        .state
        .ok_or_else(|| login_error(&state.settings.error_redirect, "state_mismatch"))?;

    let stored_state = cookies::get_csrf_state(&jar)
        .ok_or_else(|| login_error(&state.settings.error_redirect, "state_mismatch"))?;

    if received_state != stored_state {
        tracing::warn!("OAuth state mismatch");
        return Err(login_error(&state.settings.error_redirect, "state_mismatch"));
    }

    let (session_id, mut session) = current_session(&state, &jar).await?;

    state
        .lifecycle
        .exchange_code(&mut session, &code)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            login_error(&state.settings.error_redirect, "token_exchange_failed")
        })?;

    let mut jar = jar;
    match session_id {
        Some(id) => {
            state
                .save_session(&id, session)
                .await
                .map_err(|e| session_failure(&state.settings.error_redirect, &e))?;
            tracing::info!(session_id = %id, "APS OAuth2 login successful");
        }
        None => {
            let id = state
                .session_store
                .create(session)
                .await
                .map_err(|e| session_failure(&state.settings.error_redirect, &e))?;
            jar = jar.add(cookies::session_cookie(
                &state.settings.session_cookie_name,
                id.as_str(),
                state.settings.session_ttl_days,
                state.settings.secure_cookies,
            ));
            tracing::info!(session_id = %id, "APS OAuth2 login successful");
        }
    }

    let jar = jar.add(cookies::clear_csrf_cookie(&state.settings.auth_path));

    Ok((jar, Redirect::to(&state.settings.login_redirect)))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: SessionStore, F: ClientFactory>(
    State(state): State<AuthState<S, F>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if let Some(session_id) =
        cookies::get_session_id(&jar, &state.settings.session_cookie_name)
    {
        if let Err(e) = state.session_store.delete(&session_id).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
    }

    let clear_cookie = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    (
        jar.remove(clear_cookie),
        Redirect::to(&state.settings.logout_redirect),
    )
}

// ── Token & profile ────────────────────────────────────────────────

/// The public token pair, for embedding in a browser-side viewer.
async fn token<S: SessionStore, F: ClientFactory>(
    State(state): State<AuthState<S, F>>,
    jar: PrivateCookieJar,
) -> Result<Json<TokenPair>, AuthError> {
    let session_id = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
        .ok_or(AuthError::Unauthenticated)?;
    let tokens = state.user_tokens(&session_id).await?;
    Ok(Json(tokens.public))
}

#[derive(Serialize)]
struct ProfileResponse {
    name: String,
    picture: Option<String>,
}

async fn profile<S: SessionStore, F: ClientFactory>(
    State(state): State<AuthState<S, F>>,
    jar: PrivateCookieJar,
) -> Result<Json<ProfileResponse>, AuthError> {
    let session_id = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
        .ok_or(AuthError::Unauthenticated)?;
    let tokens = state.user_tokens(&session_id).await?;

    // Reload after the gate: a refresh may have rewritten the session.
    let session = state
        .load_session(&session_id)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    let profile = state
        .lifecycle
        .factory()
        .internal_client(&session)
        .get_user_info(&tokens.internal.access_token)
        .await
        .map_err(|e| AuthError::Provider(e.to_string()))?;

    Ok(Json(ProfileResponse {
        name: format!("{} {}", profile.first_name, profile.last_name),
        picture: profile.profile_images.get("sizeX40").cloned(),
    }))
}

// ── Helpers ────────────────────────────────────────────────────────

/// Session referenced by the cookie, or an empty one for sessions relying
/// on the deployment-default app.
async fn current_session<S: SessionStore, F: ClientFactory>(
    state: &AuthState<S, F>,
    jar: &PrivateCookieJar,
) -> Result<(Option<SessionId>, Session), Response> {
    match cookies::get_session_id(jar, &state.settings.session_cookie_name) {
        Some(id) => {
            let session = state
                .load_session(&id)
                .await
                .map_err(|e| session_failure(&state.settings.error_redirect, &e))?;
            match session {
                Some(session) => Ok((Some(id), session)),
                None => Ok((None, Session::default())),
            }
        }
        None => Ok((None, Session::default())),
    }
}

fn login_error(error_redirect: &str, code: &str) -> Response {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{error_redirect}?error={encoded}")).into_response()
}

fn session_failure(error_redirect: &str, e: &dyn std::fmt::Display) -> Response {
    tracing::error!(error = %e, "Session store failure");
    login_error(error_redirect, "session_failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::TokenLifecycleManager;
    use crate::lifecycle::mock::MockFactory;
    use crate::middleware::MemorySessionStore;
    use crate::middleware::config::AuthSettings;
    use crate::registry::ClientCredentialRegistry;

    #[tokio::test]
    async fn router_builds_with_generic_state() {
        let state = AuthState::from_parts(
            TokenLifecycleManager::new(MockFactory::new()),
            MemorySessionStore::default(),
            ClientCredentialRegistry::new(),
            AuthSettings::defaults(),
        );
        let _router: Router = auth_routes(state);
    }
}
