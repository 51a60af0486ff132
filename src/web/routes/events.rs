use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::database::profile_repo;
use crate::error::PortalError;
use crate::services::registration_service::{self, EventsPageData};
use crate::services::role_service::{self, Access};
use crate::web::middleware::auth::AuthenticatedUser;

#[derive(Template)]
#[template(path = "events.html")]
pub struct EventsTemplate {
    pub page: EventsPageData,
}

#[derive(Debug, Deserialize, Default)]
pub struct EventsQuery {
    pub notice: Option<String>,
}

pub async fn events_page(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(query): Query<EventsQuery>,
    State(pool): State<SqlitePool>,
) -> Response {
    match onboarded_gate(&pool, &auth_user).await {
        Ok(Access::Allowed) => {}
        Ok(Access::RedirectTo(target)) => return Redirect::to(target).into_response(),
        Err(response) => return response,
    }

    let page = match registration_service::build_events_page(&pool, &auth_user.id, query.notice)
        .await
    {
        Ok(page) => page,
        Err(e) => {
            warn!("Events page load failed for {}: {}", auth_user.id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let template = EventsTemplate { page };
    Html(template.render().unwrap()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub num_participants: i64,
    pub return_to: Option<String>,
}

pub async fn event_register_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
    Form(form): Form<RegisterForm>,
) -> Response {
    match onboarded_gate(&pool, &auth_user).await {
        Ok(Access::Allowed) => {}
        Ok(Access::RedirectTo(target)) => return Redirect::to(target).into_response(),
        Err(response) => return response,
    }

    let notice = match registration_service::register(
        &pool,
        &auth_user.id,
        &event_id,
        form.num_participants,
    )
    .await
    {
        Ok(()) => "register_ok",
        Err(PortalError::CapacityExceeded { .. }) => "event_full",
        Err(PortalError::InvalidArgument(reason)) => {
            warn!("Registration for {} rejected: {}", event_id, reason);
            "invalid"
        }
        Err(e) => {
            warn!("Registration for {} failed: {}", event_id, e);
            "error"
        }
    };

    redirect_with_notice(form.return_to.as_deref(), notice)
}

#[derive(Debug, Deserialize, Default)]
pub struct CancelForm {
    pub return_to: Option<String>,
}

pub async fn event_cancel_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
    Form(form): Form<CancelForm>,
) -> Response {
    match onboarded_gate(&pool, &auth_user).await {
        Ok(Access::Allowed) => {}
        Ok(Access::RedirectTo(target)) => return Redirect::to(target).into_response(),
        Err(response) => return response,
    }

    let notice = match registration_service::cancel(&pool, &auth_user.id, &event_id).await {
        Ok(()) => "cancel_ok",
        Err(e) => {
            warn!("Cancellation for {} failed: {}", event_id, e);
            "error"
        }
    };

    redirect_with_notice(form.return_to.as_deref(), notice)
}

fn redirect_with_notice(return_to: Option<&str>, notice: &str) -> Response {
    if let Some(target) = return_to.and_then(sanitize_return_to) {
        let sep = if target.contains('?') { "&" } else { "?" };
        return Redirect::to(&format!("{}{}notice={}", target, sep, notice)).into_response();
    }
    Redirect::to(&format!("/events?notice={}", notice)).into_response()
}

fn sanitize_return_to(value: &str) -> Option<&str> {
    let v = value.trim();
    if !v.starts_with('/') {
        return None;
    }
    if v.starts_with("//") || v.contains("://") {
        return None;
    }
    Some(v)
}

async fn onboarded_gate(
    pool: &SqlitePool,
    auth_user: &AuthenticatedUser,
) -> Result<Access, Response> {
    let profile = match profile_repo::load_profile(pool, &auth_user.id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Profile lookup for {} failed: {}", auth_user.id, e);
            return Err(Redirect::to("/login?notice=auth_error").into_response());
        }
    };

    let Some(profile) = profile else {
        // Authenticated without a profile row: treat as a fresh invite and
        // send them through onboarding.
        return Ok(Access::RedirectTo("/onboarding"));
    };

    let role = role_service::parse_role(profile.role.as_deref());
    Ok(role_service::onboarded_gate(
        role,
        profile.onboarding_completed == 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{event_repo, registration_repo};
    use crate::test_support::test_pool;

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    async fn seed_event(pool: &SqlitePool, event_id: &str) {
        event_repo::insert_event(
            pool,
            event_repo::NewEvent {
                event_id,
                title: "Boat trip",
                description: None,
                event_type: "excursion",
                scheduled_at: "2026-09-12 14:00",
                location: None,
                max_participants: Some(10),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn posting_a_registration_before_onboarding_redirects_and_writes_nothing() {
        let pool = test_pool().await;
        profile_repo::ensure_profile(&pool, "g1", Some("g1@example.com"))
            .await
            .unwrap();
        seed_event(&pool, "e1").await;

        let guest = AuthenticatedUser {
            id: "g1".to_string(),
            email: Some("g1@example.com".to_string()),
        };
        let response = event_register_handler(
            Extension(guest),
            Path("e1".to_string()),
            State(pool.clone()),
            Form(RegisterForm {
                num_participants: 2,
                return_to: None,
            }),
        )
        .await;

        assert_eq!(location(&response), "/onboarding");
        let row = registration_repo::load_registration(&pool, "g1", "e1")
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn cancellation_is_gated_the_same_way() {
        let pool = test_pool().await;
        profile_repo::ensure_profile(&pool, "g1", Some("g1@example.com"))
            .await
            .unwrap();
        seed_event(&pool, "e1").await;

        let guest = AuthenticatedUser {
            id: "g1".to_string(),
            email: Some("g1@example.com".to_string()),
        };
        let response = event_cancel_handler(
            Extension(guest),
            Path("e1".to_string()),
            State(pool.clone()),
            Form(CancelForm { return_to: None }),
        )
        .await;

        assert_eq!(location(&response), "/onboarding");
    }

    #[tokio::test]
    async fn onboarded_guests_pass_the_gate_and_register() {
        let pool = test_pool().await;
        profile_repo::ensure_profile(&pool, "g1", Some("g1@example.com"))
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        profile_repo::complete_onboarding(
            &mut conn,
            "g1",
            profile_repo::TripDetails {
                arrival_date: "2026-09-10",
                departure_date: "2026-09-14",
                transport_mode: "plane",
                airport: Some("FCO"),
                residence: None,
            },
        )
        .await
        .unwrap();
        drop(conn);
        seed_event(&pool, "e1").await;

        let guest = AuthenticatedUser {
            id: "g1".to_string(),
            email: Some("g1@example.com".to_string()),
        };
        let response = event_register_handler(
            Extension(guest),
            Path("e1".to_string()),
            State(pool.clone()),
            Form(RegisterForm {
                num_participants: 2,
                return_to: None,
            }),
        )
        .await;

        assert_eq!(location(&response), "/events?notice=register_ok");
        let row = registration_repo::load_registration(&pool, "g1", "e1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.num_participants, 2);
    }
}
