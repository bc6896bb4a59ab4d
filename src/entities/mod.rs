pub mod admin_actions;
pub mod raffle_participants;
pub mod raffle_views;
pub mod raffles;
pub mod referrals;
pub mod sponsor_channels;
pub mod user_sponsor_memberships;
pub mod users;

pub use admin_actions as admin_action_entity;
pub use raffle_participants as raffle_participant_entity;
pub use raffle_views as raffle_view_entity;
pub use raffles as raffle_entity;
pub use referrals as referral_entity;
pub use sponsor_channels as sponsor_channel_entity;
pub use user_sponsor_memberships as user_sponsor_membership_entity;
pub use users as user_entity;
