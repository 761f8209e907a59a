//! OpenAPI documentation configuration

use utoipa::{Modify, OpenApi};

/// Combined OpenAPI documentation for all APIs
#[derive(OpenApi)]
#[openapi(
    info(
        title = "We Vibe API",
        version = "0.1.0",
        description = "Community events, memberships and comments backed by MongoDB",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    modifiers(&DomainApis)
)]
pub struct ApiDoc;

/// Merges the domain documents in at the root, where their routes are mounted.
struct DomainApis;

impl Modify for DomainApis {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.merge(domain_events::ApiDoc::openapi());
    }
}
