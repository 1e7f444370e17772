use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::middlewares::AuthContext;
use crate::models::*;
use crate::services::PurchaseService;

#[utoipa::path(
    post,
    path = "/purchases",
    tag = "purchase",
    request_body = PurchaseRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "购买成功", body = PurchaseResponse),
        (status = 403, description = "邮箱或手机号未验证"),
        (status = 404, description = "影片不存在"),
        (status = 409, description = "已购买过该影片")
    )
)]
pub async fn create_purchase(
    purchase_service: web::Data<PurchaseService>,
    ctx: AuthContext,
    request: web::Json<PurchaseRequest>,
) -> Result<HttpResponse> {
    match purchase_service.purchase(&ctx, request.into_inner()).await {
        Ok(purchase) => Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
            purchase,
            "Purchase completed successfully",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/purchases",
    tag = "purchase",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取购买记录成功", body = [PurchaseResponse]),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_purchases(
    purchase_service: web::Data<PurchaseService>,
    ctx: AuthContext,
) -> Result<HttpResponse> {
    match purchase_service.list_purchases(&ctx).await {
        Ok(purchases) => Ok(HttpResponse::Ok().json(ApiResponse::success(purchases))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/purchases/payment-methods",
    tag = "purchase",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "支付方式列表", body = [PaymentMethodResponse])
    )
)]
pub async fn list_payment_methods(
    purchase_service: web::Data<PurchaseService>,
) -> Result<HttpResponse> {
    let methods = purchase_service.list_payment_methods();
    Ok(HttpResponse::Ok().json(ApiResponse::success(methods)))
}

pub fn purchase_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/purchases")
            .route("", web::post().to(create_purchase))
            .route("", web::get().to(list_purchases))
            .route("/payment-methods", web::get().to(list_payment_methods)),
    );
}
