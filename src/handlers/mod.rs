pub mod raffle;
pub mod sponsor;
pub mod user;

pub use raffle::raffle_config;
pub use sponsor::sponsor_config;
pub use user::user_config;
