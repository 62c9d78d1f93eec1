//! # TotpRS
//!
//! 一个按签发方分组的 TOTP 密钥签发、存储与验证库。
//!
//! ## 功能特性
//!
//! - **TOTP/HOTP 算法**: 符合 RFC 6238 / RFC 4226 的纯算法核心，无 I/O
//! - **密钥供应**: otpauth URI 构建与解析、Base32 编解码、QR 码渲染
//! - **注册协议**: 先确认后持久化的显式状态机，确认失败不落盘
//! - **密钥存储**: (issuer, account) 唯一映射，原子落盘，显式保存
//! - **认证门**: 账户/MFA 启用策略先于验证码评估
//! - **审计日志**: 覆盖、注册结果、验证结果的事件上报，绝不记录密钥
//!
//! ## Features
//!
//! - `qr` - 启用 QR 码渲染（PNG / SVG / 终端 Unicode，默认启用）
//!
//! ## 注册示例
//!
//! ```rust
//! use totprs::audit::NoOpAuditLogger;
//! use totprs::enroll::Enrollment;
//! use totprs::otp::totp::TotpEngine;
//! use totprs::provision;
//! use totprs::store::SecretStore;
//!
//! let mut store = SecretStore::new();
//! let audit = NoOpAuditLogger::new();
//!
//! // 1. 生成候选密钥并取得供应 URI（交给展示方渲染 QR 码）
//! let mut enrollment = Enrollment::begin("acme", "alice@example.com").unwrap();
//! let uri = enrollment.provisioning_uri().unwrap();
//!
//! // 2. 操作员扫描后输入认证器展示的验证码；这里模拟认证器
//! let params = provision::parse_provisioning_uri(&uri).unwrap();
//! let code = TotpEngine::with_defaults().code_now(&params.secret).unwrap();
//!
//! // 3. 确认成功才会把记录提交到存储
//! enrollment.confirm(&mut store, &audit, &code).unwrap();
//! assert!(store.get("acme", "alice@example.com").is_ok());
//! ```
//!
//! ## 验证示例
//!
//! ```rust
//! use totprs::audit::NoOpAuditLogger;
//! use totprs::gate::{AuthOutcome, ValidationGate};
//! use totprs::otp::totp::TotpEngine;
//! use totprs::store::{SecretRecord, SecretStore};
//!
//! let mut store = SecretStore::new();
//! store.upsert(SecretRecord::new("acme", "alice", vec![0xAB; 20]).unwrap());
//!
//! let gate = ValidationGate::new();
//! let audit = NoOpAuditLogger::new();
//!
//! let code = TotpEngine::with_defaults().code_now(&[0xAB; 20]).unwrap();
//! let outcome = gate
//!     .authenticate(&store, &audit, "acme", "alice", &code)
//!     .unwrap();
//! assert!(outcome.is_success());
//! ```
//!
//! ## 持久化
//!
//! 存储没有隐式自动保存：一批变更之后由调用方显式落盘。
//!
//! ```rust,no_run
//! use totprs::store::SecretStore;
//!
//! // 文件不存在时返回空存储（首次运行），损坏时报错
//! let store = SecretStore::load("store.json").unwrap();
//! // ... 一批注册/管理操作 ...
//! store.save("store.json").unwrap();
//! ```

pub mod audit;
pub mod enroll;
pub mod error;
pub mod gate;
pub mod otp;
pub mod provision;
pub mod random;
pub mod store;

pub use error::{Error, Result};

// ============================================================================
// OTP 算法相关导出
// ============================================================================

pub use otp::OtpAlgorithm;
pub use otp::totp::{TotpConfig, TotpEngine};

// ============================================================================
// 供应相关导出
// ============================================================================

pub use provision::{
    ProvisionedParams, decode_secret, encode_secret, generate_secret, generate_secret_for,
    parse_provisioning_uri, provisioning_uri,
};

#[cfg(feature = "qr")]
pub use provision::{qr_png, qr_svg, qr_unicode};

// ============================================================================
// 存储相关导出
// ============================================================================

pub use store::{RecordKey, SecretRecord, SecretStore, UpsertOutcome};

// ============================================================================
// 协议相关导出
// ============================================================================

pub use enroll::{Enrollment, EnrollmentReceipt, EnrollmentState};
pub use gate::{AuthOutcome, ValidationGate};

// ============================================================================
// 审计相关导出
// ============================================================================

pub use audit::{
    AuditEvent, AuditLogger, EventSeverity, EventType, InMemoryAuditLogger, NoOpAuditLogger,
};

// ============================================================================
// 随机数生成函数导出
// ============================================================================

pub use random::{constant_time_compare, constant_time_compare_str, generate_random_bytes};
