use crate::entities::{sponsor_channel_entity as sponsor_channels, user_entity as users};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

/// 内存 SQLite, 单连接 (内存库按连接隔离, 多连接会各自为库)。
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1);
    let db = Database::connect(opt).await.expect("connect sqlite memory");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn seed_user(db: &DatabaseConnection, id: i64) -> users::Model {
    users::ActiveModel {
        id: Set(id),
        username: Set(Some(format!("user{id}"))),
        points: Set(0),
        level: Set(1),
        submission_count: Set(0),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed user")
}

pub async fn seed_user_with_points(db: &DatabaseConnection, id: i64, points: i64) -> users::Model {
    users::ActiveModel {
        id: Set(id),
        username: Set(Some(format!("user{id}"))),
        points: Set(points),
        level: Set(crate::services::points_service::level_for_points(points)),
        submission_count: Set(0),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed user")
}

pub async fn seed_channel(
    db: &DatabaseConnection,
    channel_id: &str,
    points_reward: i64,
    bot_has_access: bool,
) -> sponsor_channels::Model {
    sponsor_channels::ActiveModel {
        channel_id: Set(channel_id.to_string()),
        title: Set(format!("Sponsor {channel_id}")),
        points_reward: Set(points_reward),
        is_special: Set(false),
        bot_has_access: Set(bot_has_access),
        display_order: Set(0),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed channel")
}
