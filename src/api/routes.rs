// API route configuration

use actix_web::web;

use crate::api::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        // Catalog queries
        .service(
            web::scope("/api")
                .route("/products", web::get().to(handlers::get_products))
                .route("/products/meta", web::get().to(handlers::get_products_meta)),
        );
}
