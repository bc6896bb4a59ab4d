pub mod common;
pub mod raffle;
pub mod sponsor;
pub mod user;

pub use common::*;
pub use raffle::*;
pub use sponsor::*;
pub use user::*;
