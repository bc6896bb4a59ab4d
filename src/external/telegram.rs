use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// 外部成员验证方。调用可能超时或失败; 引擎把它当作不可信依赖,
/// 失败时整次检查以 ProviderUnavailable 结束且不改任何存储状态。
pub trait MembershipProvider: Send + Sync {
    fn is_member(
        &self,
        user_id: i64,
        channel_id: &str,
    ) -> impl std::future::Future<Output = AppResult<bool>> + Send;
}

/// Telegram Bot API getChatMember 客户端
#[derive(Clone)]
pub struct TelegramService {
    http: Client,
    cfg: TelegramConfig,
}

impl TelegramService {
    pub fn new(cfg: TelegramConfig) -> Self {
        let http = Client::builder()
            .user_agent("stargift-backend/telegram")
            .timeout(Duration::from_secs(cfg.membership_timeout_secs))
            .build()
            .expect("reqwest client");
        Self { http, cfg }
    }
}

/// 计为"已加入"的成员状态
const MEMBER_STATUSES: [&str; 4] = ["creator", "administrator", "member", "restricted"];

impl MembershipProvider for TelegramService {
    /// 查询用户在频道中的成员状态。
    /// chat_id 接受 @username 或数字 chat id。
    async fn is_member(&self, user_id: i64, channel_id: &str) -> AppResult<bool> {
        let url = format!(
            "{}/bot{}/getChatMember",
            self.cfg.api_base_url, self.cfg.bot_token
        );

        let resp = self
            .http
            .get(&url)
            .query(&[("chat_id", channel_id), ("user_id", &user_id.to_string())])
            .send()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("getChatMember failed: {e}")))?;

        let status = resp.status();
        let body: GetChatMemberResponse = resp
            .json()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("invalid provider reply: {e}")))?;

        if !status.is_success() || !body.ok {
            let desc = body.description.unwrap_or_default();
            return Err(AppError::ProviderUnavailable(format!(
                "getChatMember: HTTP {}: {}",
                status.as_u16(),
                desc
            )));
        }

        let member_status = body
            .result
            .map(|r| r.status)
            .ok_or_else(|| AppError::ProviderUnavailable("missing result".into()))?;

        Ok(MEMBER_STATUSES.contains(&member_status.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct GetChatMemberResponse {
    ok: bool,
    #[serde(default)]
    result: Option<ChatMember>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}
