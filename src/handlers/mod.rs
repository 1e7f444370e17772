pub mod auth;
pub mod movie;
pub mod purchase;

pub use auth::auth_config;
pub use movie::movie_config;
pub use purchase::purchase_config;

use actix_web::web;

/// Registers every `/api/v1` route.
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(auth_config)
            .configure(movie_config)
            .configure(purchase_config),
    );
}
