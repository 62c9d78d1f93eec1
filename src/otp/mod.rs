//! 一次性密码 (OTP) 算法模块
//!
//! 提供纯算法核心，不做任何 I/O：
//!
//! - **HOTP**: 基于计数器的一次性密码原语 (RFC 4226)
//! - **TOTP**: 基于时间的一次性密码引擎 (RFC 6238)
//!
//! ## 示例
//!
//! ```rust
//! use totprs::otp::totp::{TotpConfig, TotpEngine};
//!
//! let engine = TotpEngine::new(TotpConfig::default()).unwrap();
//! let secret = b"12345678901234567890";
//!
//! // 指定时间戳生成验证码（确定性）
//! let code = engine.code_at(secret, 59).unwrap();
//! assert_eq!(code, "287082");
//!
//! // 在容差窗口内验证
//! assert!(engine.validate_at(secret, &code, 59).unwrap());
//! ```

use serde::{Deserialize, Serialize};

pub mod hotp;
pub mod totp;

pub use totp::{TotpConfig, TotpEngine};

/// OTP 哈希算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OtpAlgorithm {
    /// SHA-1（默认，认证器应用支持最广泛）
    #[default]
    SHA1,
    /// SHA-256
    SHA256,
    /// SHA-512
    SHA512,
}

impl OtpAlgorithm {
    /// 获取算法名称（用于 otpauth URI）
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpAlgorithm::SHA1 => "SHA1",
            OtpAlgorithm::SHA256 => "SHA256",
            OtpAlgorithm::SHA512 => "SHA512",
        }
    }

    /// 按名称解析算法（大小写不敏感）
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("SHA1") {
            Some(OtpAlgorithm::SHA1)
        } else if name.eq_ignore_ascii_case("SHA256") {
            Some(OtpAlgorithm::SHA256)
        } else if name.eq_ignore_ascii_case("SHA512") {
            Some(OtpAlgorithm::SHA512)
        } else {
            None
        }
    }

    /// 算法推荐的密钥长度（字节）
    ///
    /// 与 HMAC 输出长度一致：SHA-1 为 20 字节，SHA-256 为 32 字节，
    /// SHA-512 为 64 字节。
    pub fn recommended_secret_length(&self) -> usize {
        match self {
            OtpAlgorithm::SHA1 => 20,
            OtpAlgorithm::SHA256 => 32,
            OtpAlgorithm::SHA512 => 64,
        }
    }
}

impl std::fmt::Display for OtpAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
