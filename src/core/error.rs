//! 会话错误类型
//!
//! 管线（分析 / 问答）内部产生的所有错误都在管线边界被捕获，转为字符串写入 SessionState.error，不会向展示层抛出。

use thiserror::Error;

/// 会话管线中可能出现的错误（本地校验、传输、响应解析）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 未选择文档即开始分析；不发起任何网络请求
    #[error("Please upload a file.")]
    MissingInput,

    /// 非 2xx 状态码或网络层异常（含请求任务 panic / 被中止）
    #[error("{0}")]
    Transport(String),

    /// 响应体无法按约定解析；按传输类失败上报
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl SessionError {
    /// 非成功状态码，格式与 UI 上展示的一致：`HTTP error! Status: 500`
    pub fn http_status(status: u16) -> Self {
        SessionError::Transport(format!("HTTP error! Status: {}", status))
    }

    /// 写入 SessionState.error 的分析失败文案
    pub(crate) fn analysis_message(&self) -> String {
        match self {
            SessionError::MissingInput => self.to_string(),
            other => format!("Failed to analyze ToS: {}", other),
        }
    }

    /// 写入 SessionState.error 的问答失败文案
    pub(crate) fn chat_message(&self) -> String {
        format!("Failed to get response: {}", self)
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return SessionError::MalformedResponse(e.to_string());
        }
        match e.status() {
            Some(status) => SessionError::http_status(status.as_u16()),
            None => SessionError::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::MalformedResponse(e.to_string())
    }
}
