//! 审计日志模块
//!
//! 注册与认证流程通过这里向外部协作方报告安全事件：
//! 密钥覆盖、注册结果、验证结果、策略判定。
//! 事件只携带 (issuer, account) 等标识信息，绝不包含原始密钥。
//!
//! ## 使用示例
//!
//! ```rust
//! use totprs::audit::{AuditEvent, AuditLogger, EventType, InMemoryAuditLogger};
//!
//! let logger = InMemoryAuditLogger::new();
//!
//! logger.log(AuditEvent::enrollment_committed("acme", "alice@example.com"));
//! logger.log(AuditEvent::totp_failed("acme", "alice@example.com"));
//!
//! assert_eq!(logger.event_count(), 2);
//! let failures = logger.get_events_by_type(EventType::TotpFailed);
//! assert_eq!(failures.len(), 1);
//! ```

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 事件严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventSeverity {
    /// 一般信息
    #[default]
    Info,
    /// 警告
    Warning,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSeverity::Info => write!(f, "INFO"),
            EventSeverity::Warning => write!(f, "WARNING"),
        }
    }
}

/// 安全事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 已有密钥被覆盖
    SecretOverwritten,
    /// 注册确认成功，记录已提交
    EnrollmentCommitted,
    /// 注册确认失败，候选密钥已丢弃
    EnrollmentRejected,
    /// TOTP 验证成功
    TotpVerified,
    /// TOTP 验证失败
    TotpFailed,
    /// MFA 被策略旁路
    MfaBypassed,
    /// 对禁用账户的认证尝试
    DisabledAccountAttempt,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::SecretOverwritten => write!(f, "secret_overwritten"),
            EventType::EnrollmentCommitted => write!(f, "enrollment_committed"),
            EventType::EnrollmentRejected => write!(f, "enrollment_rejected"),
            EventType::TotpVerified => write!(f, "totp_verified"),
            EventType::TotpFailed => write!(f, "totp_failed"),
            EventType::MfaBypassed => write!(f, "mfa_bypassed"),
            EventType::DisabledAccountAttempt => write!(f, "disabled_account_attempt"),
        }
    }
}

/// 安全事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// 事件类型
    pub event_type: EventType,
    /// 严重程度
    pub severity: EventSeverity,
    /// 签发方名称
    pub issuer: String,
    /// 账户标识
    pub account: String,
    /// 事件消息/描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// 创建新的安全事件
    pub fn new(
        event_type: EventType,
        severity: EventSeverity,
        issuer: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            severity,
            issuer: issuer.into(),
            account: account.into(),
            message: None,
            timestamp: Utc::now(),
        }
    }

    // ========================================================================
    // 便捷构造方法
    // ========================================================================

    /// 已有密钥被覆盖
    pub fn secret_overwritten(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Self::new(EventType::SecretOverwritten, EventSeverity::Warning, issuer, account)
            .with_message("existing secret replaced by re-enrollment")
    }

    /// 注册提交成功
    pub fn enrollment_committed(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Self::new(EventType::EnrollmentCommitted, EventSeverity::Info, issuer, account)
            .with_message("enrollment confirmed and committed")
    }

    /// 注册确认失败
    pub fn enrollment_rejected(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Self::new(EventType::EnrollmentRejected, EventSeverity::Warning, issuer, account)
            .with_message("confirmation code rejected, candidate discarded")
    }

    /// TOTP 验证成功
    pub fn totp_verified(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Self::new(EventType::TotpVerified, EventSeverity::Info, issuer, account)
    }

    /// TOTP 验证失败
    pub fn totp_failed(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Self::new(EventType::TotpFailed, EventSeverity::Warning, issuer, account)
    }

    /// MFA 被策略旁路
    pub fn mfa_bypassed(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Self::new(EventType::MfaBypassed, EventSeverity::Info, issuer, account)
            .with_message("mfa disabled for account, code check skipped")
    }

    /// 对禁用账户的认证尝试
    pub fn disabled_account_attempt(
        issuer: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self::new(
            EventType::DisabledAccountAttempt,
            EventSeverity::Warning,
            issuer,
            account,
        )
        .with_message("authentication attempt against disabled account")
    }

    /// 设置消息
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 获取事件类型名称
    pub fn event_name(&self) -> String {
        self.event_type.to_string()
    }
}

// ============================================================================
// AuditLogger Trait
// ============================================================================

/// 审计日志记录器 trait
pub trait AuditLogger: Send + Sync {
    /// 记录安全事件
    fn log(&self, event: AuditEvent);
}

// ============================================================================
// InMemoryAuditLogger
// ============================================================================

/// 内存审计日志记录器
///
/// 用于测试和开发环境，将事件存储在内存中。
#[derive(Debug, Default)]
pub struct InMemoryAuditLogger {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl InMemoryAuditLogger {
    /// 创建新的内存日志记录器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取所有事件
    pub fn get_events(&self) -> Vec<AuditEvent> {
        self.events.read().unwrap().clone()
    }

    /// 获取事件数量
    pub fn event_count(&self) -> usize {
        self.events.read().unwrap().len()
    }

    /// 按事件类型获取事件
    pub fn get_events_by_type(&self, event_type: EventType) -> Vec<AuditEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// 按 (issuer, account) 获取事件
    pub fn get_events_for_account(&self, issuer: &str, account: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.issuer == issuer && e.account == account)
            .cloned()
            .collect()
    }

    /// 清空所有事件
    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }
}

impl AuditLogger for InMemoryAuditLogger {
    fn log(&self, event: AuditEvent) {
        self.events.write().unwrap().push(event);
    }
}

impl Clone for InMemoryAuditLogger {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

// ============================================================================
// NoOpAuditLogger
// ============================================================================

/// 空操作日志记录器
///
/// 不执行任何操作，用于不需要审计的嵌入场景。
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAuditLogger;

impl NoOpAuditLogger {
    /// 创建新的空操作日志记录器
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for NoOpAuditLogger {
    fn log(&self, _event: AuditEvent) {
        // 不执行任何操作
    }
}
