//! 注册协议模块
//!
//! 把"先确认、后持久化"的注册流程建模为显式状态机，
//! 不依赖终端或图像查看器即可单元测试：
//!
//! 1. **Generated** - 生成新密钥，构建候选记录（尚未入库）
//! 2. **Provisioned** - 供应 URI/QR 已交给外部展示方，等待操作员输入
//! 3. **Confirming** - 用引擎验证操作员提交的确认码（`confirm` 调用期间的瞬态）
//! 4. **Committed** / **Rejected** - 终止状态
//!
//! 确认成功才会把记录写入存储；确认失败时存储保持不变，
//! 候选密钥作废。一次确认失败后不允许复用同一密钥重试 —
//! 新的注册尝试必须从头生成新密钥，以限制单次 QR 展示的
//! 暴力猜测暴露面。
//!
//! ## 示例
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
//! let mut enrollment = Enrollment::begin("acme", "alice@example.com").unwrap();
//! let uri = enrollment.provisioning_uri().unwrap();
//!
//! // 模拟认证器应用：扫描 URI，算出当前验证码
//! let params = provision::parse_provisioning_uri(&uri).unwrap();
//! let code = TotpEngine::with_defaults().code_now(&params.secret).unwrap();
//!
//! enrollment.confirm(&mut store, &audit, &code).unwrap();
//! assert!(store.get("acme", "alice@example.com").is_ok());
//! ```

use crate::audit::{AuditEvent, AuditLogger};
use crate::error::{EnrollError, Error, Result};
use crate::otp::{TotpConfig, TotpEngine};
use crate::provision;
use crate::store::{SecretRecord, SecretStore, UpsertOutcome};

/// 注册尝试的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    /// 候选密钥已生成，尚未交接
    Generated,
    /// 供应载荷已交给展示方，等待确认码
    Provisioned,
    /// 确认成功，记录已提交到存储（终止状态）
    Committed,
    /// 确认失败，候选已作废（终止状态）
    Rejected,
}

/// 注册提交成功的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentReceipt {
    /// 签发方名称
    pub issuer: String,
    /// 账户标识
    pub account: String,
    /// 写入存储的结果（覆盖已有记录时为 `Overwritten`）
    pub outcome: UpsertOutcome,
}

/// 一次注册尝试
///
/// 每次尝试持有自己的候选记录和验证引擎；
/// 进入终止状态后只能丢弃，不能重新确认。
#[derive(Debug)]
pub struct Enrollment {
    record: SecretRecord,
    engine: TotpEngine,
    state: EnrollmentState,
}

impl Enrollment {
    /// 用默认配置（6 位、SHA-1、30 秒）开始新的注册尝试
    pub fn begin(issuer: impl Into<String>, account: impl Into<String>) -> Result<Self> {
        Self::begin_with(issuer, account, TotpConfig::default())
    }

    /// 用指定配置开始新的注册尝试
    ///
    /// 密钥长度由算法决定；配置非法或熵源不可用时返回错误。
    pub fn begin_with(
        issuer: impl Into<String>,
        account: impl Into<String>,
        config: TotpConfig,
    ) -> Result<Self> {
        let engine = TotpEngine::new(config.clone())?;
        let secret = provision::generate_secret_for(config.algorithm)?;

        let record = SecretRecord::new(issuer, account, secret)?
            .with_digits(config.digits)?
            .with_algorithm(config.algorithm)
            .with_time_step(config.time_step)?;

        Ok(Self {
            record,
            engine,
            state: EnrollmentState::Generated,
        })
    }

    /// 当前状态
    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    /// 签发方名称
    pub fn issuer(&self) -> &str {
        &self.record.issuer
    }

    /// 账户标识
    pub fn account(&self) -> &str {
        &self.record.account
    }

    /// 生成供应 URI 并进入 Provisioned 状态
    ///
    /// 交给外部展示方渲染；协议在这里挂起，等待操作员动作。
    /// 核心不强加超时，超时策略由调用方决定。
    pub fn provisioning_uri(&mut self) -> Result<String> {
        self.ensure_not_finished()?;
        let uri = provision::provisioning_uri(&self.record)?;
        self.state = EnrollmentState::Provisioned;
        Ok(uri)
    }

    /// 生成供应 QR 码 (PNG) 并进入 Provisioned 状态
    #[cfg(feature = "qr")]
    pub fn qr_png(&mut self) -> Result<Vec<u8>> {
        self.ensure_not_finished()?;
        let uri = provision::provisioning_uri(&self.record)?;
        let png = provision::qr_png(&uri)?;
        self.state = EnrollmentState::Provisioned;
        Ok(png)
    }

    /// 用当前时间验证确认码并提交
    pub fn confirm(
        &mut self,
        store: &mut SecretStore,
        audit: &dyn AuditLogger,
        submitted: &str,
    ) -> Result<EnrollmentReceipt> {
        let ok = match self.state {
            EnrollmentState::Generated => return Err(Error::Enroll(EnrollError::NotProvisioned)),
            EnrollmentState::Committed | EnrollmentState::Rejected => {
                return Err(Error::Enroll(EnrollError::Finished));
            }
            EnrollmentState::Provisioned => {
                self.engine.validate_now(&self.record.secret_key, submitted)?
            }
        };
        self.finish(store, audit, ok)
    }

    /// 用显式时间戳验证确认码并提交（用于测试）
    pub fn confirm_at(
        &mut self,
        store: &mut SecretStore,
        audit: &dyn AuditLogger,
        submitted: &str,
        timestamp: u64,
    ) -> Result<EnrollmentReceipt> {
        let ok = match self.state {
            EnrollmentState::Generated => return Err(Error::Enroll(EnrollError::NotProvisioned)),
            EnrollmentState::Committed | EnrollmentState::Rejected => {
                return Err(Error::Enroll(EnrollError::Finished));
            }
            EnrollmentState::Provisioned => {
                self.engine
                    .validate_at(&self.record.secret_key, submitted, timestamp)?
            }
        };
        self.finish(store, audit, ok)
    }

    /// 根据验证结果收尾：提交或作废
    fn finish(
        &mut self,
        store: &mut SecretStore,
        audit: &dyn AuditLogger,
        confirmed: bool,
    ) -> Result<EnrollmentReceipt> {
        if !confirmed {
            self.state = EnrollmentState::Rejected;
            audit.log(AuditEvent::enrollment_rejected(
                &self.record.issuer,
                &self.record.account,
            ));
            return Err(Error::Enroll(EnrollError::ConfirmationRejected));
        }

        let outcome = store.upsert(self.record.clone());
        self.state = EnrollmentState::Committed;

        if outcome.is_overwrite() {
            audit.log(AuditEvent::secret_overwritten(
                &self.record.issuer,
                &self.record.account,
            ));
        }
        audit.log(AuditEvent::enrollment_committed(
            &self.record.issuer,
            &self.record.account,
        ));

        Ok(EnrollmentReceipt {
            issuer: self.record.issuer.clone(),
            account: self.record.account.clone(),
            outcome,
        })
    }

    fn ensure_not_finished(&self) -> Result<()> {
        match self.state {
            EnrollmentState::Committed | EnrollmentState::Rejected => {
                Err(Error::Enroll(EnrollError::Finished))
            }
            _ => Ok(()),
        }
    }
}
