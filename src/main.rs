use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use taskdeck_be::config::AppConfig;
use taskdeck_be::database::Database;
use taskdeck_be::handlers::{auth_config, health_config, task_config};
use taskdeck_be::openapi::ApiDoc;
use taskdeck_be::storage::{AttachmentStore, CloudinaryClient};
use taskdeck_be::store::{PgTaskStore, TaskStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    let db = Database::new(&config.database_url)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Database error: {}", e);
            std::process::exit(1);
        });

    if let Err(e) = db.health_check().await {
        log::warn!("Database health check failed at startup: {}", e);
    }
    if let Err(e) = db.check_tables().await {
        log::warn!("Table check failed: {}", e);
    }
    match db.get_stats().await {
        Ok(stats) => stats.log_stats(),
        Err(e) => log::warn!("Could not read database statistics: {}", e),
    }

    let task_store: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(db.pool.clone()));
    let attachment_store: Arc<dyn AttachmentStore> =
        Arc::new(CloudinaryClient::new(&config.cloudinary));

    let db_data = web::Data::new(db);
    let store_data = web::Data::from(task_store);
    let attachments_data = web::Data::from(attachment_store);
    let config_data = web::Data::new(config.clone());

    log::info!(
        "Starting Taskdeck Backend API on port {} ({})",
        config.port,
        config.environment
    );

    let allowed_origins = config.frontend_urls.clone();
    let port = config.port;

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "Authorization",
                "Content-Type",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .supports_credentials();

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(db_data.clone())
            .app_data(store_data.clone())
            .app_data(attachments_data.clone())
            .app_data(config_data.clone())
            .configure(health_config)
            .configure(auth_config)
            .configure(task_config)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({
                        "name": "Taskdeck Backend API",
                        "version": "0.1.0",
                        "description": "REST API for project tasks with file attachments"
                    }))
                }),
            )
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
