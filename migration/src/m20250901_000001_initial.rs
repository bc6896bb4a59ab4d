use sea_orm_migration::prelude::*;

/// Users (平台用户积分账本)
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Points,
    Level,
    ReferralCode,
    ReferrerId,
    SubmissionCount,
    RestrictedUntil,
    CreatedAt,
    UpdatedAt,
}

/// Raffles (抽奖申请)
#[derive(DeriveIden)]
enum Raffles {
    Table,
    Id,
    SubmitterId,
    RequestNumber,
    ChannelName,
    MessageId,
    Title,
    PrizeType,
    PrizeValue,
    RequiredChannels,
    RaffleDatetime,
    Status,
    LevelRequired,
    ReviewerId,
    RejectionReason,
    ParticipantCount,
    Version,
    OriginalData,
    CreatedAt,
    UpdatedAt,
}

/// Raffle Participants (参与记录, 每人每抽奖一条)
#[derive(DeriveIden)]
enum RaffleParticipants {
    Table,
    Id,
    RaffleId,
    UserId,
    CreatedAt,
}

/// Raffle Views ("已查看"标记, 幂等)
#[derive(DeriveIden)]
enum RaffleViews {
    Table,
    Id,
    RaffleId,
    UserId,
    SeenAt,
}

/// Sponsor Channels (赞助频道配置, 本引擎只读)
#[derive(DeriveIden)]
enum SponsorChannels {
    Table,
    Id,
    ChannelId,
    Title,
    PointsReward,
    IsSpecial,
    BotHasAccess,
    DisplayOrder,
    CreatedAt,
    UpdatedAt,
}

/// User Sponsor Memberships (用户-频道成员状态与累计奖励)
#[derive(DeriveIden)]
enum UserSponsorMemberships {
    Table,
    Id,
    UserId,
    ChannelId,
    IsMember,
    PointsEarned,
    JoinedAt,
    LeftAt,
    LastChecked,
    CheckCount,
    CreatedAt,
    UpdatedAt,
}

/// Referrals (推荐关系, 每对唯一)
#[derive(DeriveIden)]
enum Referrals {
    Table,
    Id,
    ReferrerId,
    ReferredId,
    PointsEarned,
    CreatedAt,
}

/// Admin Actions (审核操作审计日志, 只追加)
#[derive(DeriveIden)]
enum AdminActions {
    Table,
    Id,
    AdminId,
    RaffleId,
    Action,
    Reason,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 初始结构。唯一索引即并发保证的兜底:
/// - raffles (submitter_id, request_number)
/// - raffle_participants (raffle_id, user_id)
/// - raffle_views (raffle_id, user_id)
/// - user_sponsor_memberships (user_id, channel_id)
/// - referrals (referrer_id, referred_id)
/// - users.referral_code / sponsor_channels.channel_id
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 用户表 (id 由身份子系统提供, 不自增)
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string())
                    .col(
                        ColumnDef::new(Users::Points)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::Level)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Users::ReferralCode).string())
                    .col(ColumnDef::new(Users::ReferrerId).big_integer())
                    .col(
                        ColumnDef::new(Users::SubmissionCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Users::RestrictedUntil).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_users_referral_code")
                    .table(Users::Table)
                    .col(Users::ReferralCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 抽奖表
        manager
            .create_table(
                Table::create()
                    .table(Raffles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Raffles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Raffles::SubmitterId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::RequestNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Raffles::ChannelName).string().not_null())
                    .col(ColumnDef::new(Raffles::MessageId).big_integer().not_null())
                    .col(ColumnDef::new(Raffles::Title).string().not_null())
                    .col(ColumnDef::new(Raffles::PrizeType).string().not_null())
                    .col(ColumnDef::new(Raffles::PrizeValue).big_integer().not_null())
                    .col(ColumnDef::new(Raffles::RequiredChannels).json().not_null())
                    .col(
                        ColumnDef::new(Raffles::RaffleDatetime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Raffles::LevelRequired)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Raffles::ReviewerId).big_integer())
                    .col(ColumnDef::new(Raffles::RejectionReason).string())
                    .col(
                        ColumnDef::new(Raffles::ParticipantCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Raffles::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Raffles::OriginalData).json().not_null())
                    .col(ColumnDef::new(Raffles::CreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Raffles::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_raffles_submitter_request_number")
                    .table(Raffles::Table)
                    .col(Raffles::SubmitterId)
                    .col(Raffles::RequestNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 参与记录表
        manager
            .create_table(
                Table::create()
                    .table(RaffleParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RaffleParticipants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RaffleParticipants::RaffleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RaffleParticipants::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RaffleParticipants::CreatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_raffle_participants_raffle_user")
                    .table(RaffleParticipants::Table)
                    .col(RaffleParticipants::RaffleId)
                    .col(RaffleParticipants::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 查看标记表
        manager
            .create_table(
                Table::create()
                    .table(RaffleViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RaffleViews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RaffleViews::RaffleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RaffleViews::UserId).big_integer().not_null())
                    .col(ColumnDef::new(RaffleViews::SeenAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_raffle_views_raffle_user")
                    .table(RaffleViews::Table)
                    .col(RaffleViews::RaffleId)
                    .col(RaffleViews::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 赞助频道表
        manager
            .create_table(
                Table::create()
                    .table(SponsorChannels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SponsorChannels::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SponsorChannels::ChannelId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SponsorChannels::Title).string().not_null())
                    .col(
                        ColumnDef::new(SponsorChannels::PointsReward)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SponsorChannels::IsSpecial)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SponsorChannels::BotHasAccess)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SponsorChannels::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SponsorChannels::CreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SponsorChannels::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_sponsor_channels_channel_id")
                    .table(SponsorChannels::Table)
                    .col(SponsorChannels::ChannelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 成员状态表
        manager
            .create_table(
                Table::create()
                    .table(UserSponsorMemberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSponsorMemberships::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserSponsorMemberships::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSponsorMemberships::ChannelId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSponsorMemberships::IsMember)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserSponsorMemberships::PointsEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UserSponsorMemberships::JoinedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(UserSponsorMemberships::LeftAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(UserSponsorMemberships::LastChecked)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(UserSponsorMemberships::CheckCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UserSponsorMemberships::CreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(UserSponsorMemberships::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_user_sponsor_memberships_user_channel")
                    .table(UserSponsorMemberships::Table)
                    .col(UserSponsorMemberships::UserId)
                    .col(UserSponsorMemberships::ChannelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 推荐关系表
        manager
            .create_table(
                Table::create()
                    .table(Referrals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Referrals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Referrals::ReferrerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Referrals::ReferredId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Referrals::PointsEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Referrals::CreatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_referrals_referrer_referred")
                    .table(Referrals::Table)
                    .col(Referrals::ReferrerId)
                    .col(Referrals::ReferredId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 审计日志表
        manager
            .create_table(
                Table::create()
                    .table(AdminActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminActions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdminActions::AdminId).big_integer().not_null())
                    .col(
                        ColumnDef::new(AdminActions::RaffleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdminActions::Action).string().not_null())
                    .col(ColumnDef::new(AdminActions::Reason).string())
                    .col(ColumnDef::new(AdminActions::CreatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminActions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Referrals::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(UserSponsorMemberships::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SponsorChannels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RaffleViews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RaffleParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Raffles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
