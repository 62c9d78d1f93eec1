//! 密钥供应表示模块
//!
//! 负责密钥在注册交接时的各种表示形式：
//!
//! - 密钥生成与 Base32 编解码（认证器应用的输入格式）
//! - `otpauth://totp/` 供应 URI 的构建与解析
//! - URI 的 QR 码渲染（PNG / SVG / 终端 Unicode，`qr` feature）
//!
//! ## 示例
//!
//! ```rust
//! use totprs::provision;
//! use totprs::store::SecretRecord;
//!
//! let record = SecretRecord::new("acme", "alice@example.com", vec![0xAB; 20]).unwrap();
//! let uri = provision::provisioning_uri(&record).unwrap();
//! assert!(uri.starts_with("otpauth://totp/"));
//!
//! // 解析回来能完整恢复各字段
//! let params = provision::parse_provisioning_uri(&uri).unwrap();
//! assert_eq!(params.issuer, "acme");
//! assert_eq!(params.account, "alice@example.com");
//! assert_eq!(params.secret, vec![0xAB; 20]);
//! ```

use base32::{Alphabet, decode as base32_decode, encode as base32_encode};

use crate::error::{EncodingError, Error, Result};
use crate::otp::OtpAlgorithm;
use crate::random::generate_random_bytes;
use crate::store::SecretRecord;

/// 生成指定长度的新密钥
///
/// 使用操作系统 CSPRNG；随机源不可用时返回熵错误。
pub fn generate_secret(length: usize) -> Result<Vec<u8>> {
    generate_random_bytes(length)
}

/// 生成符合算法推荐长度的新密钥
pub fn generate_secret_for(algorithm: OtpAlgorithm) -> Result<Vec<u8>> {
    generate_random_bytes(algorithm.recommended_secret_length())
}

/// 将密钥编码为 Base32 字符串（RFC 4648，无填充）
pub fn encode_secret(secret: &[u8]) -> String {
    base32_encode(Alphabet::Rfc4648 { padding: false }, secret)
}

/// 从 Base32 字符串解码密钥
///
/// 容忍空格和连字符分组，大小写不敏感。
pub fn decode_secret(encoded: &str) -> Result<Vec<u8>> {
    let clean = encoded.replace([' ', '-'], "").to_uppercase();
    base32_decode(Alphabet::Rfc4648 { padding: false }, &clean)
        .ok_or(Error::Encoding(EncodingError::InvalidBase32))
}

/// 从供应 URI 解析出的参数
///
/// 认证器应用扫描 QR 码后得到的就是这组参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedParams {
    /// 签发方名称
    pub issuer: String,
    /// 账户标识
    pub account: String,
    /// 原始密钥字节
    pub secret: Vec<u8>,
    /// 验证码位数
    pub digits: u32,
    /// 哈希算法
    pub algorithm: OtpAlgorithm,
    /// 时间步长（秒）
    pub period: u64,
}

/// 为记录构建 `otpauth://totp/` 供应 URI
///
/// 格式: `otpauth://totp/Issuer:account?secret=...&digits=...&period=...&algorithm=...&issuer=...`
///
/// 签发方或账户为空时返回编码错误。
pub fn provisioning_uri(record: &SecretRecord) -> Result<String> {
    if record.issuer.is_empty() {
        return Err(Error::Encoding(EncodingError::EmptyField(
            "issuer".to_string(),
        )));
    }
    if record.account.is_empty() {
        return Err(Error::Encoding(EncodingError::EmptyField(
            "account".to_string(),
        )));
    }

    let label = format!("{}:{}", record.issuer, record.account);
    Ok(format!(
        "otpauth://totp/{}?secret={}&digits={}&period={}&algorithm={}&issuer={}",
        urlencoding::encode(&label),
        encode_secret(&record.secret_key),
        record.digits,
        record.time_step,
        record.algorithm.as_str(),
        urlencoding::encode(&record.issuer)
    ))
}

/// 解析 `otpauth://totp/` 供应 URI
///
/// `issuer` 查询参数优先；缺失时退回标签中的 `Issuer:` 前缀。
/// `digits`、`period`、`algorithm` 缺失时使用标准默认值 (6 / 30 / SHA1)。
pub fn parse_provisioning_uri(uri: &str) -> Result<ProvisionedParams> {
    let rest = uri.strip_prefix("otpauth://totp/").ok_or_else(|| {
        Error::Encoding(EncodingError::InvalidUri(
            "missing otpauth://totp/ prefix".to_string(),
        ))
    })?;

    let (raw_label, raw_query) = rest.split_once('?').ok_or_else(|| {
        Error::Encoding(EncodingError::InvalidUri(
            "missing query string".to_string(),
        ))
    })?;

    let label = urlencoding::decode(raw_label)
        .map_err(|e| Error::Encoding(EncodingError::InvalidUri(e.to_string())))?
        .into_owned();

    // 标签格式为 "Issuer:account" 或仅 "account"
    let (label_issuer, label_account) = match label.split_once(':') {
        Some((issuer, account)) => (Some(issuer.to_string()), account.to_string()),
        None => (None, label),
    };

    let mut secret = None;
    let mut issuer_param = None;
    let mut digits = 6u32;
    let mut algorithm = OtpAlgorithm::SHA1;
    let mut period = 30u64;

    for pair in raw_query.split('&') {
        let Some((key, raw_value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(raw_value)
            .map_err(|e| Error::Encoding(EncodingError::InvalidUri(e.to_string())))?
            .into_owned();

        match key {
            "secret" => secret = Some(decode_secret(&value)?),
            "issuer" => issuer_param = Some(value),
            "digits" => {
                digits = value.parse().map_err(|_| {
                    Error::Encoding(EncodingError::InvalidUri(format!(
                        "invalid digits value '{}'",
                        value
                    )))
                })?;
            }
            "period" => {
                period = value.parse().map_err(|_| {
                    Error::Encoding(EncodingError::InvalidUri(format!(
                        "invalid period value '{}'",
                        value
                    )))
                })?;
            }
            "algorithm" => {
                algorithm = OtpAlgorithm::from_name(&value).ok_or_else(|| {
                    Error::Encoding(EncodingError::InvalidUri(format!(
                        "unknown algorithm '{}'",
                        value
                    )))
                })?;
            }
            _ => {}
        }
    }

    let secret = secret.ok_or_else(|| {
        Error::Encoding(EncodingError::InvalidUri(
            "missing secret parameter".to_string(),
        ))
    })?;

    let issuer = issuer_param.or(label_issuer).ok_or_else(|| {
        Error::Encoding(EncodingError::InvalidUri("missing issuer".to_string()))
    })?;

    Ok(ProvisionedParams {
        issuer,
        account: label_account,
        secret,
        digits,
        algorithm,
        period,
    })
}

// ============================================================================
// QR 渲染 (qr feature)
// ============================================================================

/// 将供应 URI 渲染为 PNG 图像字节
///
/// 渲染失败时返回错误，绝不产生截断的图像数据。
#[cfg(feature = "qr")]
pub fn qr_png(uri: &str) -> Result<Vec<u8>> {
    use std::io::Cursor;

    use image::Luma;
    use qrcode::QrCode;

    use crate::error::RenderError;

    let code = QrCode::new(uri.as_bytes())
        .map_err(|e| Error::Render(RenderError::QrEncoding(e.to_string())))?;

    let img = code.render::<Luma<u8>>().min_dimensions(200, 200).build();

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| Error::Render(RenderError::ImageEncoding(e.to_string())))?;

    Ok(buf.into_inner())
}

/// 将供应 URI 渲染为 SVG 文档
#[cfg(feature = "qr")]
pub fn qr_svg(uri: &str) -> Result<String> {
    use qrcode::QrCode;
    use qrcode::render::svg;

    use crate::error::RenderError;

    let code = QrCode::new(uri.as_bytes())
        .map_err(|e| Error::Render(RenderError::QrEncoding(e.to_string())))?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// 将供应 URI 渲染为终端可显示的 Unicode 字符串
#[cfg(feature = "qr")]
pub fn qr_unicode(uri: &str) -> Result<String> {
    use qrcode::QrCode;
    use qrcode::render::unicode;

    use crate::error::RenderError;

    let code = QrCode::new(uri.as_bytes())
        .map_err(|e| Error::Render(RenderError::QrEncoding(e.to_string())))?;

    Ok(code.render::<unicode::Dense1x2>().build())
}
