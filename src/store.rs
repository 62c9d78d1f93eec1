//! 密钥存储模块
//!
//! 提供 (issuer, account) 到密钥记录的持久化映射：
//!
//! - 内存中以复合键 `(issuer, account)` 维护唯一性不变量
//! - 持久化为单个 JSON 文档，按签发方嵌套分组
//! - 显式 `load` / `save`，没有隐式自动保存 —
//!   两次 `save` 之间的变更只存在于内存中，调用方负责在一批
//!   变更后落盘
//! - `save` 采用写临时文件再原子重命名的方式，失败不会留下
//!   截断的文档
//!
//! 存储本身不做内部加锁，按单线程同步使用设计；嵌入并发服务时
//! 由调用方对内存存储加读写锁，并对同一目标文件的 load/save
//! 周期做串行化。
//!
//! ## 示例
//!
//! ```rust
//! use totprs::store::{SecretRecord, SecretStore, UpsertOutcome};
//!
//! let mut store = SecretStore::new();
//! let record = SecretRecord::new("acme", "alice@example.com", vec![0xAB; 20]).unwrap();
//!
//! assert_eq!(store.upsert(record), UpsertOutcome::Inserted);
//! assert!(store.get("acme", "alice@example.com").is_ok());
//!
//! // 同一 (issuer, account) 再次写入是覆盖，并向调用方报告
//! let replacement = SecretRecord::new("acme", "alice@example.com", vec![0xCD; 20]).unwrap();
//! assert_eq!(store.upsert(replacement), UpsertOutcome::Overwritten);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CryptoError, Error, Result, StoreError};
use crate::otp::{OtpAlgorithm, TotpConfig};

/// 一个 (issuer, account) 对应的密钥记录
///
/// 记录由存储独占持有；调用方拿到的是克隆或不可变视图，
/// 修改必须经由存储的写入路径。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// 签发方名称（非空）
    pub issuer: String,

    /// 账户标识（用户名或邮箱，非空）
    pub account: String,

    /// 原始密钥字节，落盘时为 Base64 编码
    #[serde(with = "base64_bytes")]
    pub secret_key: Vec<u8>,

    /// 验证码位数，注册时固定
    pub digits: u32,

    /// HMAC 哈希算法
    pub algorithm: OtpAlgorithm,

    /// 时间步长（秒）
    pub time_step: u64,

    /// 账户是否启用；false 时认证必须失败
    pub account_enabled: bool,

    /// 是否启用 MFA；false 时跳过验证码检查
    pub mfa_enabled: bool,
}

impl SecretRecord {
    /// 用默认参数（6 位、SHA-1、30 秒）创建记录
    ///
    /// 签发方、账户或密钥为空时返回错误。
    pub fn new(
        issuer: impl Into<String>,
        account: impl Into<String>,
        secret_key: Vec<u8>,
    ) -> Result<Self> {
        let issuer = issuer.into();
        let account = account.into();

        if issuer.is_empty() {
            return Err(Error::empty_field("issuer"));
        }
        if account.is_empty() {
            return Err(Error::empty_field("account"));
        }
        if secret_key.is_empty() {
            return Err(Error::Crypto(CryptoError::InvalidSecret(
                "secret key is empty".to_string(),
            )));
        }

        Ok(Self {
            issuer,
            account,
            secret_key,
            digits: 6,
            algorithm: OtpAlgorithm::SHA1,
            time_step: 30,
            account_enabled: true,
            mfa_enabled: true,
        })
    }

    /// 设置验证码位数，范围 [6, 8]
    pub fn with_digits(mut self, digits: u32) -> Result<Self> {
        if !(6..=8).contains(&digits) {
            return Err(Error::Config(ConfigError::InvalidDigits { digits }));
        }
        self.digits = digits;
        Ok(self)
    }

    /// 设置哈希算法
    pub fn with_algorithm(mut self, algorithm: OtpAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// 设置时间步长（秒），必须大于 0
    pub fn with_time_step(mut self, time_step: u64) -> Result<Self> {
        if time_step == 0 {
            return Err(Error::Config(ConfigError::InvalidTimeStep { time_step }));
        }
        self.time_step = time_step;
        Ok(self)
    }

    /// 设置 MFA 启用标志
    pub fn with_mfa_enabled(mut self, enabled: bool) -> Self {
        self.mfa_enabled = enabled;
        self
    }

    /// 记录对应的复合键
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.issuer, &self.account)
    }

    /// 记录携带的 TOTP 配置（skew 由验证方决定）
    pub fn totp_config(&self) -> TotpConfig {
        TotpConfig::new()
            .with_digits(self.digits)
            .with_algorithm(self.algorithm)
            .with_time_step(self.time_step)
    }
}

/// (issuer, account) 复合键
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// 签发方名称
    pub issuer: String,
    /// 账户标识
    pub account: String,
}

impl RecordKey {
    /// 创建复合键
    pub fn new(issuer: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            account: account.into(),
        }
    }
}

/// `upsert` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 新插入的记录
    Inserted,
    /// 覆盖了已有记录（有意为之，但需要让调用方可见）
    Overwritten,
}

impl UpsertOutcome {
    /// 是否覆盖了已有记录
    pub fn is_overwrite(&self) -> bool {
        matches!(self, UpsertOutcome::Overwritten)
    }
}

/// 密钥存储
///
/// 内存中的记录集合，每个 (issuer, account) 恰好一条记录。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretStore {
    records: BTreeMap<RecordKey, SecretRecord>,
}

impl SecretStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 从文件加载存储
    ///
    /// 文件不存在时返回空存储（首次运行的引导路径，不是错误）。
    /// 内容损坏时返回 `CorruptStore` 错误，绝不静默退化为空存储。
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = match fs::read_to_string(path.as_ref()) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(Error::Store(StoreError::Io(e.to_string()))),
        };
        Self::from_json(&data)
    }

    /// 把存储保存到文件
    ///
    /// 先写同目录下的 `.tmp` 文件，再原子重命名覆盖目标路径，
    /// 保证调用方看不到写了一半的文档。父目录不存在时自动创建。
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::Store(StoreError::Io(e.to_string())))?;
        }

        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json).map_err(|e| Error::Store(StoreError::Io(e.to_string())))?;
        fs::rename(&tmp_path, path).map_err(|e| Error::Store(StoreError::Io(e.to_string())))?;

        Ok(())
    }

    /// 从 JSON 文档反序列化
    pub fn from_json(data: &str) -> Result<Self> {
        let document: StoreDocument = serde_json::from_str(data)
            .map_err(|e| Error::Store(StoreError::Corrupt(e.to_string())))?;

        let mut records = BTreeMap::new();
        for (issuer, accounts) in document.issuers {
            for (account, record) in accounts {
                // 记录内容必须与它在文档中的位置一致
                if record.issuer != issuer || record.account != account {
                    return Err(Error::Store(StoreError::Corrupt(format!(
                        "record for '{}'/'{}' does not match its position in the document",
                        issuer, account
                    ))));
                }
                records.insert(record.key(), record);
            }
        }

        Ok(Self { records })
    }

    /// 序列化为 JSON 文档
    pub fn to_json(&self) -> Result<String> {
        let mut issuers: BTreeMap<String, BTreeMap<String, SecretRecord>> = BTreeMap::new();
        for record in self.records.values() {
            issuers
                .entry(record.issuer.clone())
                .or_default()
                .insert(record.account.clone(), record.clone());
        }

        serde_json::to_string_pretty(&StoreDocument { issuers })
            .map_err(|e| Error::Store(StoreError::Io(e.to_string())))
    }

    /// 查找记录，返回不可变视图
    pub fn get(&self, issuer: &str, account: &str) -> Result<&SecretRecord> {
        self.records
            .get(&RecordKey::new(issuer, account))
            .ok_or_else(|| Error::not_found(issuer, account))
    }

    /// 插入或覆盖记录
    ///
    /// 同一 (issuer, account) 最多一条记录；覆盖不是错误，
    /// 但通过返回值让调用方能够审计。
    pub fn upsert(&mut self, record: SecretRecord) -> UpsertOutcome {
        match self.records.insert(record.key(), record) {
            Some(_) => UpsertOutcome::Overwritten,
            None => UpsertOutcome::Inserted,
        }
    }

    /// 删除记录，返回被删除的记录
    pub fn remove(&mut self, issuer: &str, account: &str) -> Result<SecretRecord> {
        self.records
            .remove(&RecordKey::new(issuer, account))
            .ok_or_else(|| Error::not_found(issuer, account))
    }

    /// 设置账户启用标志
    pub fn set_account_enabled(&mut self, issuer: &str, account: &str, enabled: bool) -> Result<()> {
        let record = self
            .records
            .get_mut(&RecordKey::new(issuer, account))
            .ok_or_else(|| Error::not_found(issuer, account))?;
        record.account_enabled = enabled;
        Ok(())
    }

    /// 设置 MFA 启用标志
    pub fn set_mfa_enabled(&mut self, issuer: &str, account: &str, enabled: bool) -> Result<()> {
        let record = self
            .records
            .get_mut(&RecordKey::new(issuer, account))
            .ok_or_else(|| Error::not_found(issuer, account))?;
        record.mfa_enabled = enabled;
        Ok(())
    }

    /// 记录数量
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 存储是否为空
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 遍历所有记录
    pub fn iter(&self) -> impl Iterator<Item = &SecretRecord> {
        self.records.values()
    }
}

/// 持久化文档的顶层形状：按签发方嵌套分组
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    issuers: BTreeMap<String, BTreeMap<String, SecretRecord>>,
}

/// 密钥字节的 Base64 序列化
mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(issuer: &str, account: &str) -> SecretRecord {
        SecretRecord::new(issuer, account, vec![0xAB; 20]).unwrap()
    }

    #[test]
    fn test_record_defaults() {
        let record = sample_record("acme", "alice");

        assert_eq!(record.digits, 6);
        assert_eq!(record.algorithm, OtpAlgorithm::SHA1);
        assert_eq!(record.time_step, 30);
        assert!(record.account_enabled);
        assert!(record.mfa_enabled);
    }

    #[test]
    fn test_record_rejects_empty_fields() {
        assert!(SecretRecord::new("", "alice", vec![0xAB; 20]).is_err());
        assert!(SecretRecord::new("acme", "", vec![0xAB; 20]).is_err());
        assert!(SecretRecord::new("acme", "alice", Vec::new()).is_err());
    }

    #[test]
    fn test_record_builder_validation() {
        let record = sample_record("acme", "alice");
        assert!(record.clone().with_digits(8).is_ok());
        assert!(record.clone().with_digits(5).is_err());
        assert!(record.clone().with_time_step(0).is_err());
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = SecretStore::new();

        let outcome = store.upsert(sample_record("acme", "alice"));
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let record = store.get("acme", "alice").unwrap();
        assert_eq!(record.issuer, "acme");
        assert_eq!(record.account, "alice");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = SecretStore::new();
        let result = store.get("acme", "nobody");

        assert!(matches!(
            result,
            Err(Error::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_upsert_overwrite_replaces_all_fields() {
        let mut store = SecretStore::new();
        store.upsert(sample_record("acme", "alice"));
        store.set_account_enabled("acme", "alice", false).unwrap();

        let replacement = SecretRecord::new("acme", "alice", vec![0xCD; 32])
            .unwrap()
            .with_digits(8)
            .unwrap()
            .with_algorithm(OtpAlgorithm::SHA256);
        let outcome = store.upsert(replacement);

        assert_eq!(outcome, UpsertOutcome::Overwritten);
        assert_eq!(store.len(), 1);

        // 覆盖替换全部字段，包括启用标志
        let record = store.get("acme", "alice").unwrap();
        assert_eq!(record.secret_key, vec![0xCD; 32]);
        assert_eq!(record.digits, 8);
        assert_eq!(record.algorithm, OtpAlgorithm::SHA256);
        assert!(record.account_enabled);
    }

    #[test]
    fn test_same_account_under_different_issuers() {
        let mut store = SecretStore::new();

        assert_eq!(
            store.upsert(sample_record("acme", "alice")),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert(sample_record("globex", "alice")),
            UpsertOutcome::Inserted
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut store = SecretStore::new();
        store.upsert(sample_record("acme", "alice"));

        let removed = store.remove("acme", "alice").unwrap();
        assert_eq!(removed.account, "alice");
        assert!(store.is_empty());

        assert!(store.remove("acme", "alice").is_err());
    }

    #[test]
    fn test_enablement_flags() {
        let mut store = SecretStore::new();
        store.upsert(sample_record("acme", "alice"));

        store.set_account_enabled("acme", "alice", false).unwrap();
        assert!(!store.get("acme", "alice").unwrap().account_enabled);

        store.set_mfa_enabled("acme", "alice", false).unwrap();
        assert!(!store.get("acme", "alice").unwrap().mfa_enabled);

        assert!(store.set_account_enabled("acme", "nobody", false).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut store = SecretStore::new();
        store.upsert(sample_record("acme", "alice"));
        store.upsert(
            sample_record("acme", "bob")
                .with_digits(8)
                .unwrap()
                .with_mfa_enabled(false),
        );
        store.upsert(sample_record("globex", "carol"));

        let json = store.to_json().unwrap();
        let restored = SecretStore::from_json(&json).unwrap();

        assert_eq!(restored, store);
    }

    #[test]
    fn test_document_shape_is_nested_by_issuer() {
        let mut store = SecretStore::new();
        store.upsert(sample_record("acme", "alice"));

        let json = store.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["issuers"]["acme"]["alice"]["secret_key"].is_string());
    }

    #[test]
    fn test_from_json_rejects_malformed_document() {
        let result = SecretStore::from_json("{ not json");
        assert!(matches!(
            result,
            Err(Error::Store(StoreError::Corrupt(_)))
        ));

        let result = SecretStore::from_json("");
        assert!(matches!(
            result,
            Err(Error::Store(StoreError::Corrupt(_)))
        ));
    }

    #[test]
    fn test_from_json_rejects_misplaced_record() {
        let mut store = SecretStore::new();
        store.upsert(sample_record("acme", "alice"));
        let json = store.to_json().unwrap();

        // 把记录挪到错误的账户键下
        let moved = json.replace("\"alice\": {", "\"mallory\": {");
        let result = SecretStore::from_json(&moved);
        assert!(matches!(
            result,
            Err(Error::Store(StoreError::Corrupt(_)))
        ));
    }

    #[test]
    fn test_from_json_accepts_empty_document() {
        let store = SecretStore::from_json("{}").unwrap();
        assert!(store.is_empty());
    }
}
