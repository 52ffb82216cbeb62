//! OpenAPI specification for the taskdeck REST API, generated with utoipa.
//! Served as JSON at `/api-docs/openapi.json` and browsable at `/swagger-ui`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taskdeck Backend API",
        version = "0.1.0",
        description = "REST API for project tasks with Cloudinary-hosted attachments"
    ),
    paths(
        crate::handlers::task::list_tasks,
        crate::handlers::task::create_task,
        crate::handlers::task::get_task,
        crate::handlers::task::update_task,
        crate::handlers::task::delete_task,
        crate::handlers::auth::login,
    ),
    components(schemas(
        crate::models::task::TaskView,
        crate::models::task::TaskStatus,
        crate::models::task::TaskMultipartRequest,
        crate::models::auth::UserPublic,
        crate::models::auth::LoginRequest,
        crate::models::auth::LoginResponse,
        crate::models::auth::ErrorResponse,
    )),
    tags(
        (name = "tasks", description = "Task CRUD with optional file attachments"),
        (name = "auth", description = "Authentication")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the JWT bearer scheme the task handlers reference.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
