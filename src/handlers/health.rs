use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::database::Database;

pub async fn health_check(db: web::Data<Database>) -> Result<HttpResponse> {
    match db.health_check().await {
        Ok(_) => {
            let stats = db.get_stats().await;
            let stats = match stats {
                Ok(stats) => json!({
                    "users": stats.users,
                    "tasks": stats.tasks,
                    "attachments": stats.attachments,
                }),
                Err(_) => json!(null),
            };

            Ok(HttpResponse::Ok().json(json!({
                "status": "ok",
                "database": "connected",
                "stats": stats,
            })))
        }
        Err(e) => {
            log::error!("Database health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": "Database connection failed",
            })))
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
