//! 状态定义：SessionState 与分析结果、对话轮次
//!
//! SessionState 是展示层唯一的数据来源；只由 Session 的组合迁移修改，展示层拿到的永远是一次完整迁移之后的快照。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::document::DocumentInfo;

/// 条款风险标签；兼容服务端的多种写法（Unfair/Warning、Fair/Neutral、Benign）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Risky", alias = "risky")]
    Risky,
    #[serde(
        rename = "Unfair",
        alias = "unfair",
        alias = "Warning",
        alias = "Unfair/Warning"
    )]
    Unfair,
    #[serde(
        rename = "Fair",
        alias = "fair",
        alias = "Neutral",
        alias = "Benign",
        alias = "Fair/Neutral"
    )]
    Fair,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Risky => "Risky",
            Label::Unfair => "Unfair",
            Label::Fair => "Fair",
        }
    }
}

/// 单个条款的分析结果；顺序即文档顺序
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_number: Option<u32>,
    #[serde(alias = "clauseText", alias = "text")]
    pub clause_text: String,
    pub label: Label,
    #[serde(default, alias = "riskCategory", alias = "category")]
    pub risk_category: String,
    #[serde(default, alias = "explanation")]
    pub reasoning: String,
}

/// 分析管线状态，任一时刻只处于其一
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AnalysisStatus {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// 问答管线状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChatStatus {
    Idle,
    Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// 对话中的一轮；只追加，不修改、不删除
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatTurn {
    pub id: i64,
    pub role: ChatRole,
    pub content: String,
    /// 服务端返回的支撑片段（原样保留，结构不透明）
    pub supporting_chunks: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// 生成基于时间且严格递增的轮次 ID（同一毫秒内多次调用时顺延）
#[derive(Debug, Default)]
pub struct TurnIdGenerator {
    last: i64,
}

impl TurnIdGenerator {
    pub fn next(&mut self, now: DateTime<Utc>) -> i64 {
        let id = now.timestamp_millis().max(self.last + 1);
        self.last = id;
        id
    }
}

/// 每类标签的条款数（结果视图标题栏）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub risky: usize,
    pub unfair: usize,
    pub fair: usize,
}

/// 会话共享状态
#[derive(Clone, Debug, Serialize)]
pub struct SessionState {
    pub session_id: String,
    pub document: Option<DocumentInfo>,
    /// 服务端为已分析文档分配的 ID，问答时作为 namespace 发送
    pub document_id: Option<String>,
    pub analysis_status: AnalysisStatus,
    pub results: Vec<AnalysisResult>,
    /// 临时错误横幅；下一次操作会覆盖或清除
    pub error: Option<String>,
    /// 只有成功提交结果后才为 true；与 results 是否为空无关
    pub has_analysis_results: bool,
    pub chat_visible: bool,
    pub chat_transcript: Vec<ChatTurn>,
    pub chat_status: ChatStatus,
    /// 问答输入缓冲；发送后清空
    pub chat_input: String,
}

pub(crate) fn new_session_id() -> String {
    format!("session_{}", uuid::Uuid::new_v4())
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: new_session_id(),
            document: None,
            document_id: None,
            analysis_status: AnalysisStatus::Idle,
            results: Vec::new(),
            error: None,
            has_analysis_results: false,
            chat_visible: false,
            chat_transcript: Vec::new(),
            chat_status: ChatStatus::Idle,
            chat_input: String::new(),
        }
    }
}

impl SessionState {
    pub fn is_analysis_pending(&self) -> bool {
        self.analysis_status == AnalysisStatus::Pending
    }

    pub fn is_chat_pending(&self) -> bool {
        self.chat_status == ChatStatus::Pending
    }

    /// 「开始分析」按钮是否可用：有文档且没有进行中的分析
    pub fn can_start_analysis(&self) -> bool {
        self.document.is_some() && !self.is_analysis_pending()
    }

    /// 问答输入是否可用
    pub fn can_send_chat(&self) -> bool {
        self.has_analysis_results && !self.is_chat_pending()
    }

    pub fn label_counts(&self) -> LabelCounts {
        self.results
            .iter()
            .fold(LabelCounts::default(), |mut acc, r| {
                match r.label {
                    Label::Risky => acc.risky += 1,
                    Label::Unfair => acc.unfair += 1,
                    Label::Fair => acc.fair += 1,
                }
                acc
            })
    }

    /// 校验跨字段不变量；返回第一条被破坏的描述
    pub fn check_invariants(&self) -> Result<(), String> {
        if !self.results.is_empty() && self.analysis_status != AnalysisStatus::Succeeded {
            return Err(format!(
                "results non-empty while status is {:?}",
                self.analysis_status
            ));
        }
        if self.has_analysis_results && self.analysis_status != AnalysisStatus::Succeeded {
            return Err(format!(
                "has_analysis_results while status is {:?}",
                self.analysis_status
            ));
        }
        if self.chat_visible && !self.has_analysis_results {
            return Err("chat visible without analysis results".to_string());
        }
        Ok(())
    }
}
