use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use stargift_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::TelegramService,
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
};

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
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 外部服务
    let telegram_service = TelegramService::new(config.telegram.clone());

    // 业务服务
    let raffle_service = RaffleService::new(pool.clone());
    let participation_service = ParticipationService::new(pool.clone());
    let sponsor_service = SponsorService::new(pool.clone(), telegram_service);
    let referral_service = ReferralService::new(
        pool.clone(),
        config.telegram.bot_username.clone(),
        config.rewards.referral_reward,
    );
    let user_service = UserService::new(pool.clone(), referral_service.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let host = config.server.host.clone();
    let port = config.server.port;

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(raffle_service.clone()))
            .app_data(web::Data::new(participation_service.clone()))
            .app_data(web::Data::new(sponsor_service.clone()))
            .app_data(web::Data::new(referral_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    // sponsor_config 先注册: check-membership 是精确路径,
                    // 要排在 /users 作用域前面才能命中
                    .configure(handlers::sponsor_config)
                    .configure(handlers::user_config)
                    .configure(handlers::raffle_config),
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
