//! Synchronous chat-completion client for the narrative summary.
//!
//! Implements the Qianfan-style flow: exchange the configured AK/SK pair for
//! an OAuth token, then POST the role-tagged message list to the
//! ERNIE-Speed-8K chat endpoint and read the `result` field. The call is
//! blocking and idempotent from the caller's point of view — repeating it
//! just produces another candidate summary.

use crate::models::GradeClassStat;
use crate::report::Report;
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// One role-tagged message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    pub token_url: String,
    pub chat_url: String,
    http: HttpClient,
}

impl Default for ChatClient {
    fn default() -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("classpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client build");
        Self {
            token_url: "https://aip.baidubce.com/oauth/2.0/token".into(),
            chat_url:
                "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/ernie_speed"
                    .into(),
            http,
        }
    }
}

impl ChatClient {
    fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        // Small retry for transient failures (5xx / network errors).
        let mut last_err: Option<anyhow::Error> = None;
        for backoff_ms in [100u64, 300, 700] {
            match self.http.post(url).json(body).send() {
                Ok(r) if r.status().is_success() => {
                    return r.json().context("decode json");
                }
                Ok(r) if r.status().is_server_error() => { /* retry */ }
                Ok(r) => bail!("request failed with HTTP {}", r.status()),
                Err(e) => last_err = Some(e.into()),
            }
            std::thread::sleep(Duration::from_millis(backoff_ms));
        }
        bail!("network error: {:?}", last_err);
    }

    fn fetch_token(&self, api_key: &str, secret_key: &str) -> Result<String> {
        let url = format!(
            "{}?grant_type=client_credentials&client_id={}&client_secret={}",
            self.token_url,
            api_key.trim(),
            secret_key.trim()
        );
        let v = self
            .post_json(&url, &Value::Null)
            .context("请求访问令牌")?;
        if let Some(desc) = v.get("error_description").and_then(Value::as_str) {
            bail!("认证失败: {desc} (请检查 AK/SK 是否正确)");
        }
        v.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("响应中缺少 access_token")
    }

    /// Send the conversation and return the completion text.
    ///
    /// Errors here are transport/auth problems; the caller is expected to
    /// catch them and substitute a diagnostic placeholder rather than abort
    /// the report.
    pub fn complete(
        &self,
        api_key: &str,
        secret_key: &str,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let token = self.fetch_token(api_key, secret_key)?;
        let url = format!("{}?access_token={}", self.chat_url, token);
        let body = serde_json::json!({ "messages": messages });
        let v = self.post_json(&url, &body).context("请求对话接口")?;

        if let Some(msg) = v.get("error_msg").and_then(Value::as_str) {
            bail!("接口返回错误: {msg}");
        }
        v.get("result")
            .and_then(Value::as_str)
            .map(str::to_string)
            .with_context(|| format!("接口返回异常: {v}"))
    }
}

/// Whether the configured credential pair allows calling the service at all.
pub fn credentials_present(api_key: &str, secret_key: &str) -> bool {
    !api_key.trim().is_empty() && !secret_key.trim().is_empty()
}

/// Prompt for the automatic weekly summary, built from the assembled report.
pub fn summary_prompt(report: &Report) -> String {
    let focus = report
        .at_risk
        .as_ref()
        .map(|f: &GradeClassStat| f.class.as_str())
        .unwrap_or("无");
    format!(
        "周期：{}。全校数据：总课时{}，平均出勤{:.1}%，正确率{:.1}%。\n标杆：{}。关注：{}。\n请写一段简短教学周报总结（200字内），包含整体评价、表扬和建议。",
        report.period,
        report.current.hours,
        report.current.attendance * 100.0,
        report.current.correctness * 100.0,
        report.top.class,
        focus
    )
}

/// Run the narrative generation end to end, never failing the report.
///
/// Missing credentials short-circuit with an explanatory placeholder and no
/// network call; transport/auth errors become a diagnostic placeholder. When
/// `refine` is given, one extra round is sent with the first summary and the
/// revision instruction appended to the conversation.
pub fn generate_narrative(
    client: &ChatClient,
    api_key: &str,
    secret_key: &str,
    report: &Report,
    refine: Option<&str>,
) -> String {
    if !credentials_present(api_key, secret_key) {
        return "⚠️ 未配置 API Key，请联系管理员在后台设置。".to_string();
    }

    let mut messages = vec![ChatMessage::user(summary_prompt(report))];
    let first = match client.complete(api_key, secret_key, &messages) {
        Ok(text) => text,
        Err(e) => return format!("❌ AI 调用报错: {e:#}"),
    };

    let Some(instruction) = refine else {
        return first;
    };
    messages.push(ChatMessage::assistant(first.clone()));
    messages.push(ChatMessage::user(instruction));
    match client.complete(api_key, secret_key, &messages) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("修改摘要失败，保留首版: {e:#}");
            first
        }
    }
}
