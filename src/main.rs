use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use cinema_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{
        BrevoEmailService, ChannelNotifier, LogNotifier, Notifier, SimulatedPaymentProcessor,
        TwilioService,
    },
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    let email: Arc<dyn Notifier> = if config.notification.email.is_configured() {
        Arc::new(BrevoEmailService::new(config.notification.email.clone()))
    } else {
        log::warn!("Email delivery is not configured, verification emails will only be logged");
        Arc::new(LogNotifier)
    };
    let sms: Arc<dyn Notifier> = if config.notification.twilio.is_configured() {
        Arc::new(TwilioService::new(config.notification.twilio.clone()))
    } else {
        log::warn!("Twilio is not configured, verification SMS will only be logged");
        Arc::new(LogNotifier)
    };
    Arc::new(ChannelNotifier::new(email, sms))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // 创建服务
    let role_service = RoleService::new(pool.clone());
    role_service
        .seed_roles()
        .await
        .expect("Failed to seed roles");

    let verification_service =
        VerificationService::new(pool.clone(), build_notifier(&config), config.otp.clone());
    let auth_service = AuthService::new(
        pool.clone(),
        jwt_service.clone(),
        role_service,
        verification_service.clone(),
    );
    let movie_service = MovieService::new(pool.clone());
    let purchase_service = PurchaseService::new(
        pool.clone(),
        movie_service.clone(),
        Arc::new(SimulatedPaymentProcessor),
        config.purchase.clone(),
    );

    if config.seed.sample_movies {
        if let Err(e) = movie_service.seed_sample_movies().await {
            log::error!("Failed to seed sample movies: {e}");
        }
    }

    // 启动后台任务
    tasks::spawn_all(verification_service.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(verification_service.clone()))
            .app_data(web::Data::new(movie_service.clone()))
            .app_data(web::Data::new(purchase_service.clone()))
            .configure(swagger_config)
            .configure(handlers::api_config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
