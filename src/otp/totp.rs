//! TOTP (基于时间的一次性密码) 引擎模块
//!
//! 符合 RFC 6238 标准，兼容 Google Authenticator、Authy 等应用。
//! 纯算法核心：所有接口都接受显式时间戳，便于确定性测试；
//! `*_now` 变体只是读取系统时钟的便捷封装。
//!
//! ## 示例
//!
//! ```rust
//! use totprs::otp::totp::{TotpConfig, TotpEngine};
//!
//! let engine = TotpEngine::new(TotpConfig::default()).unwrap();
//! let secret = b"12345678901234567890";
//!
//! let code = engine.code_at(secret, 59).unwrap();
//! assert_eq!(code.len(), 6);
//!
//! // 同一时间窗口内验证成功
//! assert!(engine.validate_at(secret, &code, 59).unwrap());
//!
//! // 相距太远的窗口验证失败
//! assert!(!engine.validate_at(secret, &code, 59 + 300).unwrap());
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ConfigError, CryptoError, Error, Result};
use crate::otp::{OtpAlgorithm, hotp};
use crate::random::constant_time_compare;

/// TOTP 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpConfig {
    /// 验证码位数，默认 6 位，允许范围 [6, 8]
    pub digits: u32,

    /// 哈希算法
    pub algorithm: OtpAlgorithm,

    /// 时间步长（秒），默认 30 秒
    pub time_step: u64,

    /// 允许的时间偏差窗口（前后各多少个时间步）
    /// 默认为 1，即允许前后各一个步长的时钟漂移
    pub skew: u64,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            digits: 6,
            algorithm: OtpAlgorithm::SHA1,
            time_step: 30,
            skew: 1,
        }
    }
}

impl TotpConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置验证码位数
    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    /// 设置哈希算法
    pub fn with_algorithm(mut self, algorithm: OtpAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// 设置时间步长
    pub fn with_time_step(mut self, seconds: u64) -> Self {
        self.time_step = seconds;
        self
    }

    /// 设置时间偏差窗口
    pub fn with_skew(mut self, skew: u64) -> Self {
        self.skew = skew;
        self
    }

    /// 校验配置有效性
    ///
    /// 非法的位数或步长在这里拒绝，而不是推迟到验证时。
    pub fn validate(&self) -> Result<()> {
        if !(6..=8).contains(&self.digits) {
            return Err(Error::Config(ConfigError::InvalidDigits {
                digits: self.digits,
            }));
        }
        if self.time_step == 0 {
            return Err(Error::Config(ConfigError::InvalidTimeStep {
                time_step: self.time_step,
            }));
        }
        Ok(())
    }
}

/// TOTP 引擎
///
/// 构造时即校验配置，持有引擎就意味着配置合法。
#[derive(Debug, Clone)]
pub struct TotpEngine {
    config: TotpConfig,
}

impl TotpEngine {
    /// 用给定配置创建引擎
    ///
    /// 位数不在 [6, 8] 或步长为 0 时返回配置错误。
    pub fn new(config: TotpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 使用默认配置创建引擎
    pub fn with_defaults() -> Self {
        Self {
            config: TotpConfig::default(),
        }
    }

    /// 生成指定时间戳的 TOTP 验证码
    ///
    /// 确定性：相同输入总是产生相同输出。
    pub fn code_at(&self, secret: &[u8], timestamp: u64) -> Result<String> {
        let counter = timestamp / self.config.time_step;
        hotp::code(secret, self.config.algorithm, self.config.digits, counter)
    }

    /// 生成当前时间的 TOTP 验证码
    pub fn code_now(&self, secret: &[u8]) -> Result<String> {
        self.code_at(secret, current_timestamp())
    }

    /// 在指定时间戳验证提交的验证码
    ///
    /// 检查当前窗口以及前后各 `skew` 个窗口，使用常量时间比较。
    /// 提交的码视为不可信输入：先去掉空格和连字符，长度或字符
    /// 不符合要求时按普通不匹配处理（返回 false，不是错误）。
    /// 密钥为空才是错误。
    pub fn validate_at(&self, secret: &[u8], submitted: &str, timestamp: u64) -> Result<bool> {
        if secret.is_empty() {
            return Err(Error::Crypto(CryptoError::InvalidSecret(
                "secret key is empty".to_string(),
            )));
        }

        // 规范化不可信输入
        let normalized = submitted.replace([' ', '-'], "");
        if normalized.len() != self.config.digits as usize
            || !normalized.chars().all(|c| c.is_ascii_digit())
        {
            return Ok(false);
        }

        let current_counter = (timestamp / self.config.time_step) as i64;
        let skew = self.config.skew as i64;

        let mut matched = false;
        for offset in -skew..=skew {
            let counter = current_counter + offset;
            if counter < 0 {
                continue;
            }
            let expected = hotp::code(
                secret,
                self.config.algorithm,
                self.config.digits,
                counter as u64,
            )?;
            // 常量时间比较；遍历完整窗口，不提前返回
            if constant_time_compare(normalized.as_bytes(), expected.as_bytes()) {
                matched = true;
            }
        }

        Ok(matched)
    }

    /// 在当前时间验证提交的验证码
    pub fn validate_now(&self, secret: &[u8], submitted: &str) -> Result<bool> {
        self.validate_at(secret, submitted, current_timestamp())
    }

    /// 获取当前验证码的剩余有效时间（秒）
    pub fn time_remaining(&self) -> u64 {
        let timestamp = current_timestamp();
        self.config.time_step - (timestamp % self.config.time_step)
    }

    /// 获取配置
    pub fn config(&self) -> &TotpConfig {
        &self.config
    }
}

/// 获取当前 Unix 时间戳
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;

    const RFC_SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn test_totp_config_default() {
        let config = TotpConfig::default();
        assert_eq!(config.digits, 6);
        assert_eq!(config.algorithm, OtpAlgorithm::SHA1);
        assert_eq!(config.time_step, 30);
        assert_eq!(config.skew, 1);
    }

    #[test]
    fn test_totp_config_builder() {
        let config = TotpConfig::new()
            .with_digits(8)
            .with_algorithm(OtpAlgorithm::SHA256)
            .with_time_step(60)
            .with_skew(2);

        assert_eq!(config.digits, 8);
        assert_eq!(config.algorithm, OtpAlgorithm::SHA256);
        assert_eq!(config.time_step, 60);
        assert_eq!(config.skew, 2);
    }

    #[test]
    fn test_engine_rejects_bad_digits() {
        let result = TotpEngine::new(TotpConfig::default().with_digits(5));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidDigits { digits: 5 }))
        ));

        let result = TotpEngine::new(TotpConfig::default().with_digits(9));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidDigits { digits: 9 }))
        ));
    }

    #[test]
    fn test_engine_rejects_zero_time_step() {
        let result = TotpEngine::new(TotpConfig::default().with_time_step(0));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidTimeStep { time_step: 0 }))
        ));
    }

    // RFC 6238 附录 B 测试向量（SHA-1，8 位）
    #[test]
    fn test_rfc6238_test_vectors() {
        let engine = TotpEngine::new(TotpConfig::default().with_digits(8)).unwrap();

        assert_eq!(engine.code_at(RFC_SECRET, 59).unwrap(), "94287082");
        assert_eq!(engine.code_at(RFC_SECRET, 1111111109).unwrap(), "07081804");
        assert_eq!(engine.code_at(RFC_SECRET, 1111111111).unwrap(), "14050471");
        assert_eq!(engine.code_at(RFC_SECRET, 1234567890).unwrap(), "89005924");
        assert_eq!(engine.code_at(RFC_SECRET, 2000000000).unwrap(), "69279037");
    }

    #[test]
    fn test_window_boundary() {
        let engine = TotpEngine::with_defaults();

        // 时间戳 59 落在计数器 1 的窗口，89 已经进入计数器 2
        let code_59 = engine.code_at(RFC_SECRET, 59).unwrap();
        let code_89 = engine.code_at(RFC_SECRET, 89).unwrap();

        assert_eq!(code_59, "287082");
        assert_eq!(code_89, "359152");
        assert_ne!(code_59, code_89);
    }

    #[test]
    fn test_code_is_deterministic() {
        let engine = TotpEngine::with_defaults();

        let a = engine.code_at(RFC_SECRET, 1111111109).unwrap();
        let b = engine.code_at(RFC_SECRET, 1111111109).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_current_window() {
        let engine = TotpEngine::with_defaults();

        let code = engine.code_at(RFC_SECRET, 1111111109).unwrap();
        assert!(engine.validate_at(RFC_SECRET, &code, 1111111109).unwrap());
    }

    #[test]
    fn test_validate_adjacent_windows() {
        let engine = TotpEngine::with_defaults();

        let code = engine.code_at(RFC_SECRET, 1111111109).unwrap();

        // skew = 1：前后各一个窗口内仍然接受
        assert!(
            engine
                .validate_at(RFC_SECRET, &code, 1111111109 - 30)
                .unwrap()
        );
        assert!(
            engine
                .validate_at(RFC_SECRET, &code, 1111111109 + 30)
                .unwrap()
        );
    }

    #[test]
    fn test_validate_rejects_outside_window() {
        let engine = TotpEngine::with_defaults();

        let code = engine.code_at(RFC_SECRET, 1111111109).unwrap();

        // 超过 skew+1 个窗口之外必须拒绝
        assert!(
            !engine
                .validate_at(RFC_SECRET, &code, 1111111109 + 120)
                .unwrap()
        );
        assert!(
            !engine
                .validate_at(RFC_SECRET, &code, 1111111109 - 120)
                .unwrap()
        );
    }

    #[test]
    fn test_validate_with_spaces_and_hyphens() {
        let engine = TotpEngine::with_defaults();

        let code = engine.code_at(RFC_SECRET, 59).unwrap();
        let spaced = format!("{} {}", &code[..3], &code[3..]);
        let hyphened = format!("{}-{}", &code[..3], &code[3..]);

        assert!(engine.validate_at(RFC_SECRET, &spaced, 59).unwrap());
        assert!(engine.validate_at(RFC_SECRET, &hyphened, 59).unwrap());
    }

    #[test]
    fn test_validate_malformed_code_is_mismatch() {
        let engine = TotpEngine::with_defaults();

        // 长度不对、非数字都是普通不匹配，不是错误
        assert!(!engine.validate_at(RFC_SECRET, "12345", 59).unwrap());
        assert!(!engine.validate_at(RFC_SECRET, "1234567", 59).unwrap());
        assert!(!engine.validate_at(RFC_SECRET, "abcdef", 59).unwrap());
        assert!(!engine.validate_at(RFC_SECRET, "", 59).unwrap());
    }

    #[test]
    fn test_validate_empty_secret_is_error() {
        let engine = TotpEngine::with_defaults();

        let result = engine.validate_at(b"", "287082", 59);
        assert!(matches!(
            result,
            Err(Error::Crypto(CryptoError::InvalidSecret(_)))
        ));
    }

    #[test]
    fn test_zero_skew() {
        let engine = TotpEngine::new(TotpConfig::default().with_skew(0)).unwrap();

        let code = engine.code_at(RFC_SECRET, 1111111109).unwrap();
        assert!(engine.validate_at(RFC_SECRET, &code, 1111111109).unwrap());
        // 相邻窗口不再接受
        assert!(
            !engine
                .validate_at(RFC_SECRET, &code, 1111111109 + 30)
                .unwrap()
        );
    }

    #[test]
    fn test_early_timestamps_do_not_panic() {
        let engine = TotpEngine::with_defaults();

        // 计数器 0 附近，负偏移窗口被跳过
        let code = engine.code_at(RFC_SECRET, 10).unwrap();
        assert!(engine.validate_at(RFC_SECRET, &code, 10).unwrap());
    }

    #[test]
    fn test_eight_digit_codes() {
        let engine = TotpEngine::new(TotpConfig::default().with_digits(8)).unwrap();

        let code = engine.code_at(RFC_SECRET, 59).unwrap();
        assert_eq!(code.len(), 8);
        assert!(engine.validate_at(RFC_SECRET, &code, 59).unwrap());
    }

    #[test]
    fn test_time_remaining_bounds() {
        let engine = TotpEngine::with_defaults();
        let remaining = engine.time_remaining();

        assert!(remaining > 0);
        assert!(remaining <= 30);
    }
}
