//! 统一错误类型模块
//!
//! 提供 totprs 库中所有操作的错误类型定义。
//!
//! 区分两类结果：验证码不匹配是正常的布尔结果（不是错误）；
//! 而配置非法、熵源不可用、存储损坏等才会以 `Error` 的形式返回。

use std::fmt;

/// totprs 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// totprs 库的错误类型
#[derive(Debug)]
pub enum Error {
    /// 配置错误（调用方缺陷，不应重试）
    Config(ConfigError),

    /// 密码学基础设施错误（熵源、密钥）
    Crypto(CryptoError),

    /// 供应表示编码/解码错误
    Encoding(EncodingError),

    /// QR 渲染错误
    Render(RenderError),

    /// 密钥存储错误
    Store(StoreError),

    /// 注册协议错误
    Enroll(EnrollError),

    /// 认证策略错误
    Auth(AuthError),
}

impl Error {
    /// 创建一个字段为空的配置错误
    pub fn empty_field(name: impl Into<String>) -> Self {
        Error::Config(ConfigError::EmptyField(name.into()))
    }

    /// 创建一个记录未找到的存储错误
    pub fn not_found(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Error::Store(StoreError::NotFound {
            issuer: issuer.into(),
            account: account.into(),
        })
    }
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 验证码位数超出允许范围 [6, 8]
    InvalidDigits { digits: u32 },
    /// 时间步长非法（必须大于 0）
    InvalidTimeStep { time_step: u64 },
    /// 必填字段为空
    EmptyField(String),
}

/// 密码学相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 系统随机源不可用
    EntropyUnavailable(String),
    /// 密钥缺失或不可用
    InvalidSecret(String),
}

/// 供应表示编码相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// 构建 URI 所需的字段为空
    EmptyField(String),
    /// Base32 密钥解码失败
    InvalidBase32,
    /// otpauth URI 格式非法
    InvalidUri(String),
}

/// QR 渲染相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// URI 无法编码为 QR 码
    QrEncoding(String),
    /// 图像编码失败
    ImageEncoding(String),
}

/// 密钥存储相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// (issuer, account) 对应的记录不存在
    NotFound { issuer: String, account: String },
    /// 持久化文档损坏（不会被静默替换为空存储）
    Corrupt(String),
    /// 读写持久化文档失败
    Io(String),
}

/// 注册协议相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollError {
    /// 尚未完成供应交接就尝试确认
    NotProvisioned,
    /// 确认码验证失败，候选密钥已丢弃
    ConfirmationRejected,
    /// 本次注册已进入终止状态
    Finished,
}

/// 认证策略相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 账户已被禁用，认证直接失败
    AccountDisabled { issuer: String, account: String },
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::Encoding(e) => write!(f, "Encoding error: {}", e),
            Error::Render(e) => write!(f, "Render error: {}", e),
            Error::Store(e) => write!(f, "Store error: {}", e),
            Error::Enroll(e) => write!(f, "Enrollment error: {}", e),
            Error::Auth(e) => write!(f, "Auth error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDigits { digits } => {
                write!(f, "digits must be between 6 and 8, got {}", digits)
            }
            ConfigError::InvalidTimeStep { time_step } => {
                write!(f, "time step must be greater than 0, got {}", time_step)
            }
            ConfigError::EmptyField(field) => write!(f, "field '{}' cannot be empty", field),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::EntropyUnavailable(msg) => {
                write!(f, "random source unavailable: {}", msg)
            }
            CryptoError::InvalidSecret(msg) => write!(f, "invalid secret key: {}", msg),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::EmptyField(field) => write!(f, "field '{}' cannot be empty", field),
            EncodingError::InvalidBase32 => write!(f, "invalid base32 secret"),
            EncodingError::InvalidUri(msg) => write!(f, "invalid provisioning uri: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::QrEncoding(msg) => write!(f, "qr encoding failed: {}", msg),
            RenderError::ImageEncoding(msg) => write!(f, "image encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { issuer, account } => {
                write!(
                    f,
                    "no record for account '{}' under issuer '{}'",
                    account, issuer
                )
            }
            StoreError::Corrupt(msg) => write!(f, "store document is corrupt: {}", msg),
            StoreError::Io(msg) => write!(f, "store i/o failed: {}", msg),
        }
    }
}

impl fmt::Display for EnrollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollError::NotProvisioned => {
                write!(f, "enrollment has not been provisioned yet")
            }
            EnrollError::ConfirmationRejected => {
                write!(f, "confirmation code rejected, enrollment aborted")
            }
            EnrollError::Finished => write!(f, "enrollment already finished"),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::AccountDisabled { issuer, account } => {
                write!(
                    f,
                    "account '{}' under issuer '{}' is disabled",
                    account, issuer
                )
            }
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for CryptoError {}
impl std::error::Error for EncodingError {}
impl std::error::Error for RenderError {}
impl std::error::Error for StoreError {}
impl std::error::Error for EnrollError {}
impl std::error::Error for AuthError {}

// ============================================================================
// From 实现 - 方便错误转换
// ============================================================================

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Error::Crypto(err)
    }
}

impl From<EncodingError> for Error {
    fn from(err: EncodingError) -> Self {
        Error::Encoding(err)
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Error::Render(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<EnrollError> for Error {
    fn from(err: EnrollError) -> Self {
        Error::Enroll(err)
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        Error::Auth(err)
    }
}
