//! HOTP (基于计数器的一次性密码) 原语模块
//!
//! 符合 RFC 4226 标准：以密钥对 8 字节大端计数器做 HMAC，
//! 再经动态截断得到固定位数的十进制验证码。
//!
//! TOTP 引擎以时间推导的计数器复用此原语。

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::error::{ConfigError, CryptoError, Error, Result};
use crate::otp::OtpAlgorithm;

/// 计算指定计数器的 HOTP 验证码
///
/// # Arguments
///
/// * `secret` - 原始密钥字节，不能为空
/// * `algorithm` - HMAC 哈希算法
/// * `digits` - 验证码位数，必须在 [6, 8] 内
/// * `counter` - 计数器值
///
/// # Returns
///
/// 返回零填充的 `digits` 位十进制验证码字符串
pub fn code(secret: &[u8], algorithm: OtpAlgorithm, digits: u32, counter: u64) -> Result<String> {
    if secret.is_empty() {
        return Err(Error::Crypto(CryptoError::InvalidSecret(
            "secret key is empty".to_string(),
        )));
    }
    if !(6..=8).contains(&digits) {
        return Err(Error::Config(ConfigError::InvalidDigits { digits }));
    }

    let counter_bytes = counter.to_be_bytes();

    let hash = match algorithm {
        OtpAlgorithm::SHA1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret).map_err(|e| {
                Error::Crypto(CryptoError::InvalidSecret(e.to_string()))
            })?;
            mac.update(&counter_bytes);
            mac.finalize().into_bytes().to_vec()
        }
        OtpAlgorithm::SHA256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|e| {
                Error::Crypto(CryptoError::InvalidSecret(e.to_string()))
            })?;
            mac.update(&counter_bytes);
            mac.finalize().into_bytes().to_vec()
        }
        OtpAlgorithm::SHA512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(secret).map_err(|e| {
                Error::Crypto(CryptoError::InvalidSecret(e.to_string()))
            })?;
            mac.update(&counter_bytes);
            mac.finalize().into_bytes().to_vec()
        }
    };

    // 动态截断
    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = ((hash[offset] & 0x7f) as u32) << 24
        | (hash[offset + 1] as u32) << 16
        | (hash[offset + 2] as u32) << 8
        | (hash[offset + 3] as u32);

    // 取模得到指定位数的码
    let modulo = 10u32.pow(digits);
    let value = binary % modulo;

    // 左填充零
    Ok(format!("{:0width$}", value, width = digits as usize))
}
