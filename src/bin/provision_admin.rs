use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;

use portal::database::schema;
use portal::services::{admin_service, notification_service};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let Some(email) = env::args().nth(1) else {
        eprintln!("usage: provision_admin <email>");
        std::process::exit(2);
    };

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env");
    let pool = SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .expect("Cannot connect to DB");
    schema::apply_schema(&pool)
        .await
        .expect("Cannot apply schema");

    let notify_url =
        env::var("NOTIFY_SERVICE_URL").unwrap_or_else(|_| "http://mail.localhost:8080".to_string());
    let client = notification_service::build_client();

    match admin_service::provision_admin(&pool, &client, &notify_url, &email).await {
        Ok(report) if report.created => {
            let delivered = report
                .invitation
                .map(|status| status.delivered)
                .unwrap_or(false);
            println!(
                "admin provisioned: user_id={}, invitation_delivered={}",
                report.user_id, delivered
            );
        }
        Ok(report) => {
            println!(
                "admin already present, role ensured: user_id={}",
                report.user_id
            );
        }
        Err(e) => {
            eprintln!("admin provisioning failed: {}", e);
            std::process::exit(1);
        }
    }
}
