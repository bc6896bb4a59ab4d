pub mod referral_code;

pub use referral_code::*;
