use crate::error::AppError;
use crate::utils::JwtService;
use actix_web::http::Method;
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// Identity of the caller, taken from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
}

impl FromRequest for AuthContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let ctx = req.extensions().get::<AuthContext>().cloned();
        ready(ctx.ok_or_else(|| AppError::InvalidToken("Missing access token".to_string()).into()))
    }
}

// 公开路径配置
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    // 仅对只读请求公开
    read_only_prefixes: Vec<&'static str>,
    // 前缀下的写操作中仍公开的 (method, path)
    public_writes: Vec<(Method, &'static str)>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            // 完全匹配的公开路径
            exact_paths: vec!["/swagger-ui", "/api-docs/openapi.json"],
            // 前缀匹配的公开路径
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/api/v1/auth/"],
            read_only_prefixes: vec!["/api/v1/movies"],
            public_writes: vec![(Method::POST, "/api/v1/movies/search")],
        }
    }

    fn is_public(&self, method: &Method, path: &str) -> bool {
        // 检查完全匹配
        if self.exact_paths.contains(&path) {
            return true;
        }

        // 检查前缀匹配
        if self
            .prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
        {
            return true;
        }

        if self
            .public_writes
            .iter()
            .any(|(m, p)| m == method && path == *p)
        {
            return true;
        }

        (method == Method::GET || method == Method::HEAD)
            && self
                .read_only_prefixes
                .iter()
                .any(|&prefix| path.starts_with(prefix))
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        if self.public_paths.is_public(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        // 提取Authorization header
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);

        let Some(token) = token else {
            let error = AppError::InvalidToken("Missing access token".to_string());
            return Box::pin(async move { Err(error.into()) });
        };

        let ctx = self
            .jwt_service
            .verify_access_token(&token)
            .and_then(|claims| {
                Ok(AuthContext {
                    user_id: claims.user_id()?,
                    username: claims.username,
                })
            });

        match ctx {
            Ok(ctx) => {
                // 将调用者身份添加到请求扩展中
                req.extensions_mut().insert(ctx);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}
