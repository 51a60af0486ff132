use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::env;
use tracing::warn;

use crate::database::profile_repo;
use crate::error::PortalError;
use crate::services::onboarding_service::{self, FamilyMemberInput, OnboardingSubmission};
use crate::services::notification_service;
use crate::services::role_service::{self, Access};
use crate::web::middleware::auth::AuthenticatedUser;

#[derive(Template)]
#[template(path = "onboarding.html")]
pub struct OnboardingTemplate {
    pub notice: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct OnboardingQuery {
    pub notice: Option<String>,
}

pub async fn onboarding_page(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(query): Query<OnboardingQuery>,
    State(pool): State<SqlitePool>,
) -> Response {
    match onboarding_gate(&pool, &auth_user).await {
        Ok(Access::Allowed) => {}
        Ok(Access::RedirectTo(target)) => return Redirect::to(target).into_response(),
        Err(response) => return response,
    }

    let template = OnboardingTemplate {
        notice: query.notice.unwrap_or_default(),
    };
    Html(template.render().unwrap()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct OnboardingForm {
    pub arrival_date: String,
    pub departure_date: String,
    pub transport_mode: String,
    pub airport: Option<String>,
    pub residence: Option<String>,
    // Family rows are collected client-side into one JSON field:
    // [{"name": "...", "is_minor": false, "email": "..."}]
    pub family_json: String,
}

pub async fn onboarding_submit_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
    Form(form): Form<OnboardingForm>,
) -> Response {
    let family_members: Vec<FamilyMemberInput> = match serde_json::from_str(&form.family_json) {
        Ok(members) => members,
        Err(e) => {
            warn!("Onboarding family payload unreadable: {}", e);
            return Redirect::to("/onboarding?notice=invalid").into_response();
        }
    };

    let submission = OnboardingSubmission {
        arrival_date: form.arrival_date,
        departure_date: form.departure_date,
        transport_mode: form.transport_mode,
        airport: form.airport,
        residence: form.residence,
        family_members,
    };

    match onboarding_service::submit_onboarding(&pool, &auth_user.id, &submission).await {
        Ok(()) => {}
        Err(PortalError::InvalidArgument(reason)) => {
            warn!("Onboarding for {} rejected: {}", auth_user.id, reason);
            return Redirect::to("/onboarding?notice=invalid").into_response();
        }
        Err(e) => {
            warn!("Onboarding for {} failed: {}", auth_user.id, e);
            return Redirect::to("/onboarding?notice=error").into_response();
        }
    }

    // Invitations are secondary: a dead mail service never unwinds the
    // onboarding that just committed.
    let notify_url =
        env::var("NOTIFY_SERVICE_URL").unwrap_or_else(|_| "http://mail.localhost:8080".to_string());
    let client = notification_service::build_client();
    let notice = match onboarding_service::send_family_invitations(
        &pool,
        &client,
        &notify_url,
        &auth_user.id,
    )
    .await
    {
        Ok(report) if report.delivered < report.attempted => "onboarding_ok_invites_pending",
        Ok(_) => "onboarding_ok",
        Err(e) => {
            warn!("Family invitations for {} failed: {}", auth_user.id, e);
            "onboarding_ok_invites_pending"
        }
    };

    Redirect::to(&format!("/events?notice={}", notice)).into_response()
}

async fn onboarding_gate(
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

    // A session can outlive a missing profile row; recreate it lazily the
    // same way the auth callback does.
    let Some(profile) = profile else {
        if let Err(e) =
            profile_repo::ensure_profile(pool, &auth_user.id, auth_user.email.as_deref()).await
        {
            warn!("Profile creation for {} failed: {}", auth_user.id, e);
        }
        return Ok(Access::Allowed);
    };

    let role = role_service::parse_role(profile.role.as_deref());
    Ok(role_service::onboarding_form_gate(
        role,
        profile.onboarding_completed == 1,
    ))
}
