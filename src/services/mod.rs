pub mod participation_service;
pub mod points_service;
pub mod raffle_service;
pub mod referral_service;
pub mod sponsor_service;
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use participation_service::*;
pub use points_service::*;
pub use raffle_service::*;
pub use referral_service::*;
pub use sponsor_service::*;
pub use user_service::*;
