use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose, Engine as _};
use cookie::Cookie;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::warn;

use crate::database::profile_repo;
use crate::error::{PortalError, PortalResult};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

const LOCAL_FALLBACK_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct IdentityServiceResponse {
    #[serde(rename = "success")]
    _success: bool,
    data: SessionTokens,
}

/// Claims carried in the session cookie. Only the payload segment is read
/// here; signature verification is the identity provider's job.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Exchange a one-time authentication code for session tokens. A provider
/// that is unreachable or answers garbage is an upstream failure; the
/// request is never silently treated as authenticated.
pub async fn exchange_code(
    client: &reqwest::Client,
    identity_url: &str,
    code: &str,
) -> PortalResult<SessionTokens> {
    let url = format!("{}/api/v1/auth/exchange", identity_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .json(&json!({ "code": code }))
        .send()
        .await
        .map_err(|e| PortalError::UpstreamUnavailable(format!("identity exchange: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::UpstreamUnavailable(format!(
            "identity exchange returned {}",
            status
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| PortalError::UpstreamUnavailable(format!("identity exchange body: {}", e)))?;

    let parsed: IdentityServiceResponse = serde_json::from_str(&body)
        .map_err(|e| PortalError::UpstreamUnavailable(format!("identity exchange parse: {}", e)))?;

    Ok(parsed.data)
}

pub fn decode_claims(access_token: &str) -> Option<IdentityClaims> {
    let parts: Vec<&str> = access_token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let payload = general_purpose::URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    serde_json::from_slice::<IdentityClaims>(&payload).ok()
}

/// Make sure a `Profile` row exists for these claims. A profile that was
/// provisioned by email before its owner ever signed in (the admin script
/// does this) is adopted by the real identity key; otherwise a fresh
/// invite-role profile is created lazily.
pub async fn ensure_profile_for_claims(
    pool: &SqlitePool,
    claims: &IdentityClaims,
) -> sqlx::Result<()> {
    if profile_repo::load_profile(pool, &claims.sub).await?.is_some() {
        return Ok(());
    }

    if let Some(email) = claims.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let adopted =
            profile_repo::adopt_profile_identity(pool, &email.to_lowercase(), &claims.sub).await?;
        if adopted > 0 {
            return Ok(());
        }
    }

    profile_repo::ensure_profile(pool, &claims.sub, claims.email.as_deref()).await?;
    Ok(())
}

pub fn session_cookies(tokens: &SessionTokens) -> Vec<Cookie<'static>> {
    let mut access = Cookie::new(ACCESS_COOKIE, tokens.access_token.clone());
    access.set_path("/");
    access.set_http_only(true);
    access.set_same_site(cookie::SameSite::Lax);

    let mut refresh = Cookie::new(REFRESH_COOKIE, tokens.refresh_token.clone());
    refresh.set_path("/");
    refresh.set_http_only(true);
    refresh.set_same_site(cookie::SameSite::Lax);

    vec![access, refresh]
}

pub fn expired_session_cookies() -> Vec<Cookie<'static>> {
    let mut cookies = session_cookies(&SessionTokens {
        access_token: String::new(),
        refresh_token: String::new(),
    });
    for cookie in &mut cookies {
        // Max-Age=0 tells the browser to drop the cookie outright instead
        // of keeping an emptied session cookie around.
        cookie.set_max_age(cookie::time::Duration::ZERO);
    }
    cookies
}

/// Append Set-Cookie headers for every cookie. A value that will not fit a
/// header is logged and skipped: the page still works with a stale session,
/// the next request simply re-authenticates.
pub fn apply_cookies(headers: &mut HeaderMap, cookies: Vec<Cookie<'static>>) {
    for cookie in cookies {
        match cookie.to_string().parse() {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => {
                warn!("Skipping cookie '{}': {}", cookie.name(), e);
            }
        }
    }
}

/// Redirect origin for the post-login destination, in priority order:
/// explicit configured origin, non-local request origin, non-local host
/// header, local-development fallback. Every link a guest receives by
/// email is built on top of this, so the chain is deliberate.
pub fn resolve_site_origin(
    configured: Option<&str>,
    origin_header: Option<&str>,
    host_header: Option<&str>,
) -> String {
    if let Some(configured) = configured.map(str::trim).filter(|s| !s.is_empty()) {
        return configured.trim_end_matches('/').to_string();
    }

    if let Some(origin) = origin_header.map(str::trim).filter(|s| !s.is_empty()) {
        if !is_local_host(host_of_origin(origin)) {
            return origin.trim_end_matches('/').to_string();
        }
    }

    if let Some(host) = host_header.map(str::trim).filter(|s| !s.is_empty()) {
        if !is_local_host(host) {
            return format!("https://{}", host);
        }
    }

    LOCAL_FALLBACK_ORIGIN.to_string()
}

fn host_of_origin(origin: &str) -> &str {
    let rest = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

fn is_local_host(host: &str) -> bool {
    let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
    let host = host.to_ascii_lowercase();
    host == "localhost"
        || host == "127.0.0.1"
        || host == "0.0.0.0"
        || host.ends_with(".localhost")
}
