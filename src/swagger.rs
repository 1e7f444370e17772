use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{PaymentMethod, PurchaseStatus, RoleName, VerificationChannel};
use crate::external::PaymentDetails;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::verify,
        handlers::auth::resend_otp,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::movie::list_movies,
        handlers::movie::get_movie,
        handlers::movie::search_movies,
        handlers::movie::create_movie,
        handlers::movie::update_movie,
        handlers::movie::delete_movie,
        handlers::purchase::create_purchase,
        handlers::purchase::list_purchases,
        handlers::purchase::list_payment_methods,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            RefreshTokenRequest,
            RefreshTokenResponse,
            LogoutRequest,
            VerificationRequest,
            OtpRequest,
            UserResponse,
            RoleName,
            VerificationChannel,
            MovieRequest,
            MovieResponse,
            MovieSearchRequest,
            MoviePage,
            PurchaseRequest,
            PurchaseResponse,
            PaymentDetails,
            PaymentMethod,
            PurchaseStatus,
            PaymentMethodResponse,
            ApiError,
            UserApiResponse,
            AuthApiResponse,
            RefreshApiResponse,
            MovieApiResponse,
            PurchaseApiResponse,
            PaymentMethodListApiResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and OTP verification API"),
        (name = "movie", description = "Movie catalog API"),
        (name = "purchase", description = "Movie purchase API"),
    ),
    info(
        title = "Cinema Backend API",
        version = "1.0.0",
        description = "Cinema Backend REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
