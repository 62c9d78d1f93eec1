//! 认证门模块
//!
//! 在调用 TOTP 引擎之前先应用账户/MFA 启用策略：
//!
//! 1. 查找记录（缺失时返回未找到错误；对外展示时调用方不应
//!    把它与验证码错误区分开，以免泄露账户是否存在）
//! 2. 账户被禁用时立即失败，不评估验证码
//! 3. MFA 被禁用时直接成功，不调用引擎
//! 4. 其余情况交给 TOTP 引擎判定
//!
//! ## 示例
//!
//! ```rust
//! use totprs::audit::NoOpAuditLogger;
//! use totprs::gate::{AuthOutcome, ValidationGate};
//! use totprs::store::{SecretRecord, SecretStore};
//!
//! let mut store = SecretStore::new();
//! let record = SecretRecord::new("acme", "alice", b"12345678901234567890".to_vec())
//!     .unwrap()
//!     .with_mfa_enabled(false);
//! store.upsert(record);
//!
//! let gate = ValidationGate::new();
//! let audit = NoOpAuditLogger::new();
//!
//! // MFA 被策略旁路：验证码内容无关紧要
//! let outcome = gate
//!     .authenticate(&store, &audit, "acme", "alice", "anything")
//!     .unwrap();
//! assert_eq!(outcome, AuthOutcome::MfaBypassed);
//! assert!(outcome.is_success());
//! ```

use crate::audit::{AuditEvent, AuditLogger};
use crate::error::{AuthError, Error, Result};
use crate::otp::totp::TotpEngine;
use crate::store::SecretStore;

/// 认证结果
///
/// 验证码不匹配是正常结果，不是错误；
/// 账户被禁用才以错误的形式返回。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// 验证码通过 TOTP 引擎验证
    Verified,
    /// 该账户的 MFA 被策略旁路，未调用引擎
    MfaBypassed,
    /// 验证码不匹配
    Rejected,
}

impl AuthOutcome {
    /// 认证是否成功
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Verified | AuthOutcome::MfaBypassed)
    }
}

/// 认证门
///
/// 引擎配置（位数、算法、步长）来自存储的记录本身；
/// 时钟漂移容差是验证方的策略，在这里统一设置。
#[derive(Debug, Clone)]
pub struct ValidationGate {
    skew: u64,
}

impl Default for ValidationGate {
    fn default() -> Self {
        Self { skew: 1 }
    }
}

impl ValidationGate {
    /// 创建默认认证门（前后各容忍一个时间窗口）
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建指定漂移容差的认证门
    pub fn with_skew(skew: u64) -> Self {
        Self { skew }
    }

    /// 用当前时间认证提交的验证码
    pub fn authenticate(
        &self,
        store: &SecretStore,
        audit: &dyn AuditLogger,
        issuer: &str,
        account: &str,
        submitted: &str,
    ) -> Result<AuthOutcome> {
        self.run(store, audit, issuer, account, submitted, None)
    }

    /// 用显式时间戳认证提交的验证码（用于测试）
    pub fn authenticate_at(
        &self,
        store: &SecretStore,
        audit: &dyn AuditLogger,
        issuer: &str,
        account: &str,
        submitted: &str,
        timestamp: u64,
    ) -> Result<AuthOutcome> {
        self.run(store, audit, issuer, account, submitted, Some(timestamp))
    }

    fn run(
        &self,
        store: &SecretStore,
        audit: &dyn AuditLogger,
        issuer: &str,
        account: &str,
        submitted: &str,
        timestamp: Option<u64>,
    ) -> Result<AuthOutcome> {
        let record = store.get(issuer, account)?;

        // 快速失败：禁用账户绝不评估验证码
        if !record.account_enabled {
            audit.log(AuditEvent::disabled_account_attempt(issuer, account));
            return Err(Error::Auth(AuthError::AccountDisabled {
                issuer: issuer.to_string(),
                account: account.to_string(),
            }));
        }

        if !record.mfa_enabled {
            audit.log(AuditEvent::mfa_bypassed(issuer, account));
            return Ok(AuthOutcome::MfaBypassed);
        }

        let engine = TotpEngine::new(record.totp_config().with_skew(self.skew))?;
        let ok = match timestamp {
            Some(ts) => engine.validate_at(&record.secret_key, submitted, ts)?,
            None => engine.validate_now(&record.secret_key, submitted)?,
        };

        if ok {
            audit.log(AuditEvent::totp_verified(issuer, account));
            Ok(AuthOutcome::Verified)
        } else {
            audit.log(AuditEvent::totp_failed(issuer, account));
            Ok(AuthOutcome::Rejected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{EventType, InMemoryAuditLogger};
    use crate::error::StoreError;
    use crate::otp::totp::TotpEngine;
    use crate::store::SecretRecord;

    const RFC_SECRET: &[u8] = b"12345678901234567890";

    fn store_with_alice() -> SecretStore {
        let mut store = SecretStore::new();
        store.upsert(SecretRecord::new("acme", "alice", RFC_SECRET.to_vec()).unwrap());
        store
    }

    #[test]
    fn test_correct_code_is_verified() {
        let store = store_with_alice();
        let audit = InMemoryAuditLogger::new();
        let gate = ValidationGate::new();

        let code = TotpEngine::with_defaults().code_at(RFC_SECRET, 59).unwrap();
        let outcome = gate
            .authenticate_at(&store, &audit, "acme", "alice", &code, 59)
            .unwrap();

        assert_eq!(outcome, AuthOutcome::Verified);
        assert!(outcome.is_success());
        assert_eq!(audit.get_events_by_type(EventType::TotpVerified).len(), 1);
    }

    #[test]
    fn test_wrong_code_is_rejected_not_error() {
        let store = store_with_alice();
        let audit = InMemoryAuditLogger::new();
        let gate = ValidationGate::new();

        // 与 t=59 的 "287082" 不同的合法格式验证码
        let outcome = gate
            .authenticate_at(&store, &audit, "acme", "alice", "287083", 59)
            .unwrap();

        assert_eq!(outcome, AuthOutcome::Rejected);
        assert!(!outcome.is_success());
        assert_eq!(audit.get_events_by_type(EventType::TotpFailed).len(), 1);
    }

    #[test]
    fn test_unknown_account_propagates_not_found() {
        let store = store_with_alice();
        let audit = InMemoryAuditLogger::new();
        let gate = ValidationGate::new();

        let result = gate.authenticate_at(&store, &audit, "acme", "nobody", "287082", 59);
        assert!(matches!(
            result,
            Err(Error::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_disabled_account_fails_even_with_correct_code() {
        let mut store = store_with_alice();
        store.set_account_enabled("acme", "alice", false).unwrap();
        let audit = InMemoryAuditLogger::new();
        let gate = ValidationGate::new();

        let code = TotpEngine::with_defaults().code_at(RFC_SECRET, 59).unwrap();
        let result = gate.authenticate_at(&store, &audit, "acme", "alice", &code, 59);

        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::AccountDisabled { .. }))
        ));
        assert_eq!(
            audit
                .get_events_by_type(EventType::DisabledAccountAttempt)
                .len(),
            1
        );
        // 禁用账户不评估验证码
        assert!(audit.get_events_by_type(EventType::TotpVerified).is_empty());
        assert!(audit.get_events_by_type(EventType::TotpFailed).is_empty());
    }

    #[test]
    fn test_mfa_disabled_bypasses_engine() {
        let mut store = store_with_alice();
        store.set_mfa_enabled("acme", "alice", false).unwrap();
        let audit = InMemoryAuditLogger::new();
        let gate = ValidationGate::new();

        // 完全是垃圾的验证码也能通过
        let outcome = gate
            .authenticate_at(&store, &audit, "acme", "alice", "garbage", 59)
            .unwrap();

        assert_eq!(outcome, AuthOutcome::MfaBypassed);
        assert!(outcome.is_success());
        assert_eq!(audit.get_events_by_type(EventType::MfaBypassed).len(), 1);
    }

    #[test]
    fn test_disabled_account_takes_precedence_over_mfa_bypass() {
        let mut store = store_with_alice();
        store.set_account_enabled("acme", "alice", false).unwrap();
        store.set_mfa_enabled("acme", "alice", false).unwrap();
        let audit = InMemoryAuditLogger::new();
        let gate = ValidationGate::new();

        let result = gate.authenticate_at(&store, &audit, "acme", "alice", "123456", 59);
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::AccountDisabled { .. }))
        ));
    }

    #[test]
    fn test_skew_policy_applies() {
        let store = store_with_alice();
        let audit = InMemoryAuditLogger::new();

        let code = TotpEngine::with_defaults().code_at(RFC_SECRET, 59).unwrap();

        // 零容差的门拒绝相邻窗口的验证码
        let strict = ValidationGate::with_skew(0);
        let outcome = strict
            .authenticate_at(&store, &audit, "acme", "alice", &code, 59 + 30)
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected);

        // 默认容差接受
        let relaxed = ValidationGate::new();
        let outcome = relaxed
            .authenticate_at(&store, &audit, "acme", "alice", &code, 59 + 30)
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Verified);
    }
}
