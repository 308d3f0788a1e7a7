use crate::message::NotifyMessage;
use crate::notifier::{Notifier, NotifyResult};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use vigil_config::{EmailSettings, WebhookSettings};

/// 从通知 metadata 里取一个字段的展示文本
fn meta_text(metadata: &Value, key: &str) -> Option<String> {
    let value = metadata.get(key)?;
    Some(match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    })
}

/// 渲染升级通知的邮件正文
///
/// 告警快照的关键字段逐行展开，值班人员不用点开看板就能定位
/// 设备和阈值；没有 metadata 的普通通知退化为纯文本正文
fn render_email_body(message: &NotifyMessage) -> String {
    let mut body = String::new();
    body.push_str(&message.content);
    body.push('\n');

    if let Some(metadata) = &message.metadata {
        body.push('\n');
        for (label, key) in [
            ("Device", "device_id"),
            ("Warning kind", "warning_kind"),
            ("Escalation level", "escalation_level"),
            ("Measured value", "measured_value"),
            ("Threshold", "threshold"),
            ("Warning id", "warning_id"),
        ] {
            if let Some(text) = meta_text(metadata, key) {
                body.push_str(&format!("{}: {}\n", label, text));
            }
        }
    }

    body.push_str(&format!("\nTime: {}\n", message.timestamp.to_rfc3339()));
    body
}

// ============================================================================
// 邮件渠道
// ============================================================================

/// SMTP 升级通知
///
/// 一封邮件发给全部收件人；收件人列表为空视为投递失败（而不是
/// 静默丢弃），让条目带着可诊断的原因进入 failed 状态
pub struct EmailNotifier {
    settings: EmailSettings,
}

impl EmailNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{Message, SmtpTransport, Transport};

        if self.settings.to.is_empty() {
            return Ok(NotifyResult::failure("no email recipients configured"));
        }

        let mut builder = Message::builder()
            .from(self.settings.from.parse()?)
            .subject(&message.title)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.settings.to {
            builder = builder.to(recipient.parse()?);
        }
        let email = builder.body(render_email_body(message))?;

        let creds = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );
        let mailer = SmtpTransport::relay(&self.settings.smtp_host)?
            .credentials(creds)
            .port(self.settings.smtp_port)
            .build();

        match mailer.send(&email) {
            Ok(_) => Ok(NotifyResult::success()),
            Err(e) => Ok(NotifyResult::failure(format!("smtp send failed: {}", e))),
        }
    }

    fn name(&self) -> &str {
        "email"
    }
}

// ============================================================================
// Webhook 渠道
// ============================================================================

/// HTTP 回调升级通知
///
/// 向配置的 URL POST 一份结构化告警文档（标题、级别、告警快照
/// 字段），供告警网关或 IM 机器人二次路由；非 2xx 响应按投递
/// 失败处理
pub struct WebhookNotifier {
    settings: WebhookSettings,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(settings: WebhookSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    fn payload(message: &NotifyMessage) -> Value {
        json!({
            "title": message.title,
            "text": message.content,
            "level": message.level,
            "timestamp": message.timestamp,
            "alert": message.metadata,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult> {
        let mut request = self.client.post(&self.settings.url);
        for (key, value) in &self.settings.headers {
            request = request.header(key, value);
        }

        let response = request.json(&Self::payload(message)).send().await?;

        if response.status().is_success() {
            Ok(NotifyResult::success())
        } else {
            Ok(NotifyResult::failure(format!(
                "webhook returned status {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
