use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use shared::domain::SessionId;
use tracing::{debug, warn};

use crate::{
    api::{internal_error, ApiFailure},
    app_state::AppState,
};

/// The wizard session bound to the current request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionHandle {
    pub(crate) id: SessionId,
    issued: bool,
}

impl SessionHandle {
    /// Appends `Set-Cookie` when the session was created for this request.
    pub(crate) fn attach(self, cookie_name: &str, mut response: Response) -> Response {
        if !self.issued {
            return response;
        }
        let cookie = format!(
            "{cookie_name}={}; Path=/; HttpOnly; SameSite=Lax",
            self.id
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(error) => warn!(%error, "session cookie is not a valid header value"),
        }
        response
    }
}

/// Reuses the cookie's session while it is alive; otherwise issues a fresh one.
pub(crate) async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<SessionHandle, ApiFailure> {
    if let Some(id) = cookie_session(headers, &state.session_cookie) {
        let alive = state
            .storage
            .touch_session(&id)
            .await
            .map_err(internal_error)?;
        if alive {
            return Ok(SessionHandle { id, issued: false });
        }
        debug!(session = %id, "session cookie refers to an expired session");
    }

    let id = state
        .storage
        .create_session()
        .await
        .map_err(internal_error)?;
    debug!(session = %id, "issued wizard session");
    Ok(SessionHandle { id, issued: true })
}

pub(crate) fn cookie_session(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| value.trim().parse().ok())
}
