use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// 机器人用户名, 用于拼推荐链接 t.me/{bot_username}?start={code}
    pub bot_username: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// getChatMember 调用的超时 (秒)
    #[serde(default = "default_membership_timeout")]
    pub membership_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// 每成功推荐一个新用户给推荐人的积分
    #[serde(default = "default_referral_reward")]
    pub referral_reward: i64,
}

/// 管理员白名单 (替代源代码里的硬编码管理员)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_membership_timeout() -> u64 {
    5
}

fn default_referral_reward() -> i64 {
    50
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            referral_reward: default_referral_reward(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    telegram: TelegramConfig {
                        bot_token: get_env("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
                        bot_username: get_env("TELEGRAM_BOT_USERNAME").unwrap_or_default(),
                        api_base_url: get_env("TELEGRAM_API_BASE_URL")
                            .unwrap_or_else(default_api_base_url),
                        membership_timeout_secs: get_env_parse(
                            "TELEGRAM_MEMBERSHIP_TIMEOUT_SECS",
                            default_membership_timeout(),
                        ),
                    },
                    rewards: RewardsConfig {
                        referral_reward: get_env_parse(
                            "REFERRAL_REWARD",
                            default_referral_reward(),
                        ),
                    },
                    admin: AdminConfig {
                        admin_ids: parse_id_list(get_env("ADMIN_IDS").unwrap_or_default()),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            config.telegram.bot_token = v;
        }
        if let Ok(v) = env::var("TELEGRAM_BOT_USERNAME") {
            config.telegram.bot_username = v;
        }
        if let Ok(v) = env::var("TELEGRAM_API_BASE_URL") {
            config.telegram.api_base_url = v;
        }
        if let Ok(v) = env::var("TELEGRAM_MEMBERSHIP_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.telegram.membership_timeout_secs = n;
        }
        if let Ok(v) = env::var("REFERRAL_REWARD")
            && let Ok(n) = v.parse()
        {
            config.rewards.referral_reward = n;
        }
        if let Ok(v) = env::var("ADMIN_IDS") {
            config.admin.admin_ids = parse_id_list(v);
        }

        Ok(config)
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin.admin_ids.contains(&user_id)
    }
}

/// "1,2,3" -> [1, 2, 3]; 非数字片段忽略
fn parse_id_list(raw: String) -> Vec<i64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect()
}
