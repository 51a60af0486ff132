use axum::{
    middleware,
    response::Redirect,
    routing::{get, get_service, post},
    Router,
};
use dotenvy::dotenv;
use http::header::{HeaderValue, CACHE_CONTROL};
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use std::net::SocketAddr;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use portal::database::schema;
use portal::web::middleware::auth as auth_middleware;
use portal::web::routes::{admin, auth, events, onboarding};

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Start logging
    tracing_subscriber::fmt::init();

    // 2. Connect to the database
    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env");
    println!("Connecting to database: {}", db_url);

    let pool = SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .expect("Cannot connect to DB");

    schema::apply_schema(&pool)
        .await
        .expect("Cannot apply schema");

    // 3. Admin routes: auth first, then the role gate
    let admin_routes = Router::new()
        .route("/admin", get(admin::admin_page))
        .route(
            "/admin/announcements",
            post(admin::announcement_create_handler),
        )
        .route("/admin/guests/:user_id/role", post(admin::guest_role_handler))
        .layer(middleware::from_fn_with_state(
            pool.clone(),
            auth_middleware::require_admin,
        ));

    // 4. Guest routes under one session middleware layer
    let protected_routes = Router::new()
        .route("/events", get(events::events_page))
        .route(
            "/events/:event_id/register",
            post(events::event_register_handler),
        )
        .route(
            "/events/:event_id/cancel",
            post(events::event_cancel_handler),
        )
        .route(
            "/onboarding",
            get(onboarding::onboarding_page).post(onboarding::onboarding_submit_handler),
        )
        .route("/logout", post(auth::logout_handler))
        .merge(admin_routes)
        .layer(middleware::from_fn(auth_middleware::require_auth));

    // 5. Build the whole application
    let app = Router::new()
        // Public routes
        .route("/", get(|| async { Redirect::to("/events") }))
        .route("/login", get(auth::login_page))
        .route("/auth/callback", get(auth::auth_callback_handler))
        // Protected routes
        .merge(protected_routes)
        // Static files
        .nest_service(
            "/assets",
            get_service(ServeDir::new("assets")).layer(SetResponseHeaderLayer::if_not_present(
                CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            )),
        )
        // Layers
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        // State
        .with_state(pool);

    // 6. Start the server (with fallback port)
    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Cannot parse host/port");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!(
                "Could not bind on {}: {}. Trying fallback {}:{}",
                addr,
                e,
                host,
                port + 1
            );
            let fallback: SocketAddr = format!("{}:{}", host, port + 1)
                .parse()
                .expect("Cannot parse fallback");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("Cannot bind on fallback port")
        }
    };

    let bound_addr = listener.local_addr().unwrap();
    println!("🚀 Server running on http://{}", bound_addr);
    println!("📍 Go to http://{}/login to sign in", bound_addr);

    axum::serve(listener, app).await.unwrap();
}
