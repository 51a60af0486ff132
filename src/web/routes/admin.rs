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

use crate::error::PortalError;
use crate::services::admin_service::{self, GuestView};
use crate::web::middleware::auth::AuthenticatedUser;

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub guests: Vec<GuestView>,
    pub notice: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdminQuery {
    pub notice: Option<String>,
}

pub async fn admin_page(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(query): Query<AdminQuery>,
    State(pool): State<SqlitePool>,
) -> Response {
    let guests = match admin_service::list_guests(&pool).await {
        Ok(guests) => guests,
        Err(e) => {
            warn!("Guest overview load failed for {}: {}", auth_user.id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let template = AdminTemplate {
        guests,
        notice: query.notice.unwrap_or_default(),
    };
    Html(template.render().unwrap()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementForm {
    pub title: String,
    pub body: String,
}

pub async fn announcement_create_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
    Form(form): Form<AnnouncementForm>,
) -> Response {
    let notice =
        match admin_service::create_announcement(&pool, &auth_user.id, &form.title, &form.body)
            .await
        {
            Ok(()) => "announcement_ok",
            Err(PortalError::InvalidArgument(reason)) => {
                warn!("Announcement rejected: {}", reason);
                "invalid"
            }
            Err(e) => {
                warn!("Announcement failed: {}", e);
                "error"
            }
        };

    Redirect::to(&format!("/admin?notice={}", notice)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

pub async fn guest_role_handler(
    Extension(_auth_user): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
    State(pool): State<SqlitePool>,
    Form(form): Form<RoleForm>,
) -> Response {
    let notice = match admin_service::change_guest_role(&pool, &user_id, &form.role).await {
        Ok(()) => "role_ok",
        Err(PortalError::InvalidArgument(reason)) => {
            warn!("Role change for {} rejected: {}", user_id, reason);
            "invalid"
        }
        Err(e) => {
            warn!("Role change for {} failed: {}", user_id, e);
            "error"
        }
    };

    Redirect::to(&format!("/admin?notice={}", notice)).into_response()
}
