use askama::Template;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::env;
use tracing::warn;

use crate::services::{notification_service, session_service};

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub notice: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoginQuery {
    pub notice: Option<String>,
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> Html<String> {
    let template = LoginTemplate {
        notice: query.notice.unwrap_or_default(),
    };
    Html(template.render().unwrap())
}

#[derive(Debug, Deserialize, Default)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// Landing endpoint for the emailed login link. A present code is
/// exchanged for a session; without one the guest is just sent onward and
/// the next request decides whether to re-authenticate.
pub async fn auth_callback_handler(
    Query(query): Query<CallbackQuery>,
    State(pool): State<SqlitePool>,
    headers: HeaderMap,
) -> Response {
    let configured = env::var("SITE_ORIGIN").ok();
    let origin = session_service::resolve_site_origin(
        configured.as_deref(),
        header_str(&headers, "origin"),
        header_str(&headers, "host"),
    );

    let Some(code) = query.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
        return Redirect::to(&format!("{}/events", origin)).into_response();
    };

    let identity_url = env::var("IDENTITY_SERVICE_URL")
        .unwrap_or_else(|_| "http://auth.localhost:8080".to_string());
    let client = notification_service::build_client();

    let tokens = match session_service::exchange_code(&client, &identity_url, code).await {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!("Session exchange failed: {}", e);
            return Redirect::to(&format!("{}/login?notice=auth_error", origin)).into_response();
        }
    };

    // Profiles are created lazily on the first successful authentication.
    if let Some(claims) = session_service::decode_claims(&tokens.access_token) {
        if let Err(e) = session_service::ensure_profile_for_claims(&pool, &claims).await {
            warn!("Profile creation for {} failed: {}", claims.sub, e);
        }
    }

    let mut response = Redirect::to(&format!("{}/events", origin)).into_response();
    session_service::apply_cookies(
        response.headers_mut(),
        session_service::session_cookies(&tokens),
    );
    response
}

pub async fn logout_handler() -> Response {
    let mut response = Redirect::to("/login").into_response();
    session_service::apply_cookies(
        response.headers_mut(),
        session_service::expired_session_cookies(),
    );
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|hv| hv.to_str().ok())
}
