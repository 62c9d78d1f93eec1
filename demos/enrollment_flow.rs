//! 注册与验证流程示例
//!
//! 展示完整的生命周期：注册（确认后入库）、落盘、重新加载、
//! 认证门验证以及账户禁用。
//!
//! 运行: cargo run --example enrollment_flow

use totprs::audit::InMemoryAuditLogger;
use totprs::enroll::Enrollment;
use totprs::gate::ValidationGate;
use totprs::otp::totp::{TotpConfig, TotpEngine};
use totprs::provision;
use totprs::store::SecretStore;

/// 模拟用户手机上的认证器应用
struct AuthenticatorApp {
    secret: Vec<u8>,
    engine: TotpEngine,
}

impl AuthenticatorApp {
    /// 扫描供应 QR 码（这里直接解析 URI）
    fn scan(uri: &str) -> Self {
        let params = provision::parse_provisioning_uri(uri).expect("URI 解析失败");
        let config = TotpConfig::new()
            .with_digits(params.digits)
            .with_algorithm(params.algorithm)
            .with_time_step(params.period);
        Self {
            secret: params.secret,
            engine: TotpEngine::new(config).expect("配置非法"),
        }
    }

    /// 读取当前展示的验证码
    fn current_code(&self) -> String {
        self.engine.code_now(&self.secret).expect("验证码生成失败")
    }
}

fn main() {
    let store_path = std::env::temp_dir().join("totprs-demo-store.json");
    let audit = InMemoryAuditLogger::new();

    // ========================================================================
    // 1. 注册：生成密钥 -> 展示 QR -> 确认 -> 入库
    // ========================================================================
    println!("=== 1. 注册 ===");

    let mut store = SecretStore::load(&store_path).expect("加载存储失败");
    let mut enrollment =
        Enrollment::begin("acme", "alice@example.com").expect("无法开始注册");

    let uri = enrollment.provisioning_uri().expect("无法生成供应 URI");
    println!("供应 URI: {}", uri);

    let png = provision::qr_png(&uri).expect("QR 渲染失败");
    println!("QR PNG: {} 字节（交给外部查看器展示）", png.len());

    // 操作员扫描二维码后，输入认证器展示的验证码
    let app = AuthenticatorApp::scan(&uri);
    let code = app.current_code();
    println!("认证器展示: {}", code);

    let receipt = enrollment
        .confirm(&mut store, &audit, &code)
        .expect("确认失败");
    println!("注册完成: {}/{} ({:?})", receipt.issuer, receipt.account, receipt.outcome);

    // 一批变更后显式落盘
    store.save(&store_path).expect("保存存储失败");
    println!("存储已保存到 {:?}", store_path);

    // ========================================================================
    // 2. 验证：重新加载存储，走认证门
    // ========================================================================
    println!("\n=== 2. 验证 ===");

    let mut store = SecretStore::load(&store_path).expect("加载存储失败");
    let gate = ValidationGate::new();

    let outcome = gate
        .authenticate(&store, &audit, "acme", "alice@example.com", &app.current_code())
        .expect("认证出错");
    println!("正确验证码: {:?} (成功 = {})", outcome, outcome.is_success());

    let outcome = gate
        .authenticate(&store, &audit, "acme", "alice@example.com", "000000")
        .expect("认证出错");
    println!("错误验证码: {:?} (成功 = {})", outcome, outcome.is_success());

    // ========================================================================
    // 3. 管理操作：禁用账户
    // ========================================================================
    println!("\n=== 3. 禁用账户 ===");

    store
        .set_account_enabled("acme", "alice@example.com", false)
        .expect("账户不存在");

    match gate.authenticate(&store, &audit, "acme", "alice@example.com", &app.current_code()) {
        Err(e) => println!("禁用后认证: {}", e),
        Ok(outcome) => println!("意外结果: {:?}", outcome),
    }

    // ========================================================================
    // 4. 审计事件
    // ========================================================================
    println!("\n=== 4. 审计事件 ===");
    for event in audit.get_events() {
        println!(
            "[{}] {} {}/{}",
            event.severity,
            event.event_name(),
            event.issuer,
            event.account
        );
    }

    let _ = std::fs::remove_file(&store_path);
}
