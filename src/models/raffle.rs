use crate::entities::raffle_entity as raffles;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 奖品类型 (tagged, 未知值在反序列化阶段直接拒绝)
#[derive(
    Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum PrizeType {
    #[sea_orm(string_value = "stars")]
    #[serde(rename = "stars")]
    Stars,
    #[sea_orm(string_value = "premium")]
    #[serde(rename = "premium")]
    Premium,
    #[sea_orm(string_value = "mixed")]
    #[serde(rename = "mixed")]
    Mixed,
}

/// 审核状态机: pending -> approved | rejected (单向)
#[derive(
    Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum RaffleStatus {
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    #[serde(rename = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
}

impl std::fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaffleStatus::Pending => write!(f, "pending"),
            RaffleStatus::Approved => write!(f, "approved"),
            RaffleStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// 审核决定, 同时作为审计日志里的 action 值
#[derive(
    Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum ReviewDecision {
    #[sea_orm(string_value = "approved")]
    #[serde(rename = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitRaffleRequest {
    /// 提交者 (频道主) 的用户ID
    pub submitter_id: i64,
    #[schema(example = "@prize_channel")]
    pub channel_name: String,
    /// 开奖贴的消息ID
    pub message_id: i64,
    #[schema(example = "100 Stars Giveaway")]
    pub title: String,
    pub prize_type: PrizeType,
    pub prize_value: i64,
    /// 参与者必须加入的频道
    pub required_channels: Vec<String>,
    pub raffle_datetime: DateTime<Utc>,
}

/// 编辑补丁 (仅 pending 状态可用), 全部字段可选
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EditRaffleRequest {
    pub channel_name: Option<String>,
    pub message_id: Option<i64>,
    pub title: Option<String>,
    pub prize_type: Option<PrizeType>,
    pub prize_value: Option<i64>,
    pub required_channels: Option<Vec<String>>,
    pub raffle_datetime: Option<DateTime<Utc>>,
}

/// PUT /raffles/{id} 的请求体, 按 action 区分审核与编辑。
/// edit 的可选字段直接平铺在请求体顶层, 与 EditRaffleRequest 一一对应。
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RaffleUpdateRequest {
    Review {
        reviewer_id: i64,
        decision: ReviewDecision,
        level_required: Option<i32>,
        rejection_reason: Option<String>,
    },
    Edit {
        channel_name: Option<String>,
        message_id: Option<i64>,
        title: Option<String>,
        prize_type: Option<PrizeType>,
        prize_value: Option<i64>,
        required_channels: Option<Vec<String>>,
        raffle_datetime: Option<DateTime<Utc>>,
    },
}

/// 逐版本快照, original_data 数组的元素 (最新在尾)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleSnapshot {
    pub version: i32,
    pub channel_name: String,
    pub message_id: i64,
    pub title: String,
    pub prize_type: PrizeType,
    pub prize_value: i64,
    pub required_channels: Vec<String>,
    pub raffle_datetime: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinRaffleRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinRaffleResponse {
    pub raffle_id: i64,
    pub participant_count: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RaffleResponse {
    pub id: i64,
    pub submitter_id: i64,
    pub request_number: i64,
    pub channel_name: String,
    pub message_id: i64,
    pub title: String,
    pub prize_type: PrizeType,
    pub prize_value: i64,
    pub required_channels: Vec<String>,
    pub raffle_datetime: DateTime<Utc>,
    pub status: RaffleStatus,
    pub level_required: i32,
    pub reviewer_id: Option<i64>,
    pub rejection_reason: Option<String>,
    pub participant_count: i64,
    pub version: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<raffles::Model> for RaffleResponse {
    fn from(m: raffles::Model) -> Self {
        let required_channels: Vec<String> =
            serde_json::from_value(m.required_channels).unwrap_or_default();
        Self {
            id: m.id,
            submitter_id: m.submitter_id,
            request_number: m.request_number,
            channel_name: m.channel_name,
            message_id: m.message_id,
            title: m.title,
            prize_type: m.prize_type,
            prize_value: m.prize_value,
            required_channels,
            raffle_datetime: m.raffle_datetime,
            status: m.status,
            level_required: m.level_required,
            reviewer_id: m.reviewer_id,
            rejection_reason: m.rejection_reason,
            participant_count: m.participant_count,
            version: m.version,
            created_at: m.created_at,
        }
    }
}
