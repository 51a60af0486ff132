use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;

use crate::services::role_service::{self, Access};
use crate::services::session_service::{self, ACCESS_COOKIE};

/// Identity for the current request, resolved once by `require_auth` and
/// passed explicitly through extensions. There is no ambient session state.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

pub async fn require_auth(mut request: Request, next: Next) -> Response {
    // Extract the session cookie from the request
    let token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split("; ")
                .find(|c| c.starts_with(&format!("{}=", ACCESS_COOKIE)))
                .and_then(|c| c.strip_prefix(&format!("{}=", ACCESS_COOKIE)))
                .map(str::to_string)
        });

    if let Some(token) = token {
        if let Some(claims) = session_service::decode_claims(&token) {
            request.extensions_mut().insert(AuthenticatedUser {
                id: claims.sub,
                email: claims.email,
            });
            return next.run(request).await;
        }
    }

    // No valid session: send the guest to the login page, never an error page.
    Redirect::to("/login").into_response()
}

/// Layered inside `require_auth` on admin routes. A role mismatch lands on
/// the regular guest pages.
pub async fn require_admin(
    State(pool): State<SqlitePool>,
    request: Request,
    next: Next,
) -> Response {
    let user_id = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.id.clone());

    let role = match role_service::resolve_role(&pool, user_id.as_deref()).await {
        Ok(role) => role,
        Err(e) => {
            tracing::error!("Role lookup failed: {}", e);
            return Redirect::to("/events").into_response();
        }
    };

    match role_service::admin_gate(role) {
        Access::Allowed => next.run(request).await,
        Access::RedirectTo(target) => Redirect::to(target).into_response(),
    }
}
