use rand::Rng;

/// 去除易混淆字符 (0/O, 1/I) 的推荐码字母表
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 生成8位推荐码。唯一性由 users.referral_code 的唯一索引保证,
/// 冲突时调用方重新生成。
pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}
