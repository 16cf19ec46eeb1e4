//! 会话：状态的唯一修改入口
//!
//! 每个管线拆成两段：begin_* 在任何 I/O 之前一次性完成进入 Pending 的组合迁移并返回请求；
//! commit_* 在 I/O 结束后一次性写入结果并退出 Pending。start_analysis / send_message 把两段串起来。

use chrono::Utc;

use crate::core::document::{Document, DocumentSource};
use crate::core::error::SessionError;
use crate::core::session_supervisor::{AnalysisTicket, ChatTicket, SessionSupervisor};
use crate::core::state::{
    new_session_id, AnalysisStatus, ChatRole, ChatStatus, ChatTurn, SessionState, TurnIdGenerator,
};
use crate::service::{AnalysisService, ChatAnswer, IngestOutcome};

/// 问答失败时追加到对话中的固定回复
pub const CHAT_APOLOGY: &str = "Sorry, I encountered an error while processing your question.";

/// 会话行为参数（来自配置 [session] 与 [service].namespace）
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub discard_superseded: bool,
    pub namespace: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            discard_superseded: true,
            namespace: None,
        }
    }
}

impl SessionSettings {
    pub fn from_config(cfg: &crate::config::AppConfig) -> Self {
        Self {
            discard_superseded: cfg.session.discard_superseded,
            namespace: cfg.service.namespace.clone(),
        }
    }
}

/// 已进入 Pending、待发出的分析请求
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub ticket: AnalysisTicket,
    pub document: Document,
}

/// 已追加用户轮次、待发出的问答请求
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub ticket: ChatTicket,
    pub question: String,
    pub namespace: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    source: DocumentSource,
    supervisor: SessionSupervisor,
    turn_ids: TurnIdGenerator,
    namespace_override: Option<String>,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            state: SessionState::default(),
            source: DocumentSource::new(),
            supervisor: SessionSupervisor::new(settings.discard_superseded),
            turn_ids: TurnIdGenerator::default(),
            namespace_override: settings.namespace,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// 结束当前会话：旧请求过期，对话与可见性重置，进行中的分析回到 Idle
    fn end_session(&mut self) {
        self.supervisor.end_session();
        self.state.session_id = new_session_id();
        self.state.results.clear();
        self.state.has_analysis_results = false;
        self.state.document_id = None;
        self.state.error = None;
        self.state.chat_visible = false;
        self.state.chat_transcript.clear();
        self.state.chat_status = ChatStatus::Idle;
        self.state.chat_input.clear();
        self.state.analysis_status = AnalysisStatus::Idle;
    }

    /// 选择新文档（整体替换），开启新会话
    pub fn select_document(&mut self, document: Document) {
        tracing::info!(
            "Document selected: {} ({} bytes, {:?})",
            document.filename,
            document.len(),
            document.mime_hint
        );
        self.end_session();
        self.source.select(document);
        self.state.document = self.source.info();
    }

    /// 移除当前文档，开启新会话
    pub fn remove_document(&mut self) {
        if let Some(doc) = self.source.remove() {
            tracing::info!("Document removed: {}", doc.filename);
        }
        self.end_session();
        self.state.document = None;
    }

    /// 分析第一段：校验文档并进入 Pending；无文档时写入错误且状态不变
    pub fn begin_analysis(&mut self) -> Result<AnalysisRequest, SessionError> {
        let Some(document) = self.source.snapshot() else {
            let err = SessionError::MissingInput;
            tracing::warn!("Analysis rejected: {}", err);
            self.state.error = Some(err.analysis_message());
            return Err(err);
        };

        let ticket = self.supervisor.issue_analysis();
        self.state.analysis_status = AnalysisStatus::Pending;
        self.state.error = None;
        self.state.has_analysis_results = false;
        self.state.results.clear();
        self.state.document_id = None;
        self.state.chat_visible = false;

        tracing::info!("Analysis started: {}", document.filename);
        Ok(AnalysisRequest { ticket, document })
    }

    /// 分析第二段：提交结果或失败；返回 false 表示响应已过期被丢弃
    pub fn commit_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<IngestOutcome, SessionError>,
    ) -> bool {
        if !self.supervisor.accepts_analysis(&ticket) {
            tracing::warn!("Discarding superseded analysis response");
            return false;
        }
        match outcome {
            Ok(outcome) => {
                tracing::info!("Analysis succeeded: {} clauses", outcome.results.len());
                self.state.results = outcome.results;
                self.state.document_id = outcome.document_id;
                self.state.has_analysis_results = true;
                self.state.analysis_status = AnalysisStatus::Succeeded;
            }
            Err(e) => {
                tracing::warn!("Analysis failed: {}", e);
                self.state.error = Some(e.analysis_message());
                self.state.results.clear();
                self.state.has_analysis_results = false;
                self.state.chat_visible = false;
                self.state.analysis_status = AnalysisStatus::Failed;
            }
        }
        true
    }

    /// 发起一次分析并等待结果；错误全部落入 SessionState.error，返回最终状态
    pub async fn start_analysis(&mut self, service: &dyn AnalysisService) -> AnalysisStatus {
        let request = match self.begin_analysis() {
            Ok(request) => request,
            Err(_) => return self.state.analysis_status,
        };
        let outcome = service.ingest(&request.document).await;
        self.commit_analysis(request.ticket, outcome);
        self.state.analysis_status
    }

    fn push_turn(&mut self, role: ChatRole, content: String, chunks: Vec<serde_json::Value>) {
        let now = Utc::now();
        let id = self.turn_ids.next(now);
        self.state.chat_transcript.push(ChatTurn {
            id,
            role,
            content,
            supporting_chunks: chunks,
            created_at: now,
        });
    }

    /// 问答第一段：空白输入直接忽略；否则立即追加用户轮次、清空输入并进入 Pending
    pub fn begin_chat(&mut self, text: &str) -> Option<ChatRequest> {
        let question = text.trim();
        if question.is_empty() {
            return None;
        }
        let question = question.to_string();
        self.push_turn(ChatRole::User, question.clone(), Vec::new());
        self.state.chat_input.clear();
        self.state.chat_status = ChatStatus::Pending;

        let namespace = self
            .namespace_override
            .clone()
            .or_else(|| self.state.document_id.clone());
        tracing::info!("Chat question sent ({} chars)", question.chars().count());
        Some(ChatRequest {
            ticket: self.supervisor.issue_chat(),
            question,
            namespace,
        })
    }

    /// 问答第二段：成功追加回答；失败同时写入错误横幅与固定致歉回复。返回 false 表示已过期丢弃
    pub fn commit_chat(
        &mut self,
        ticket: ChatTicket,
        outcome: Result<ChatAnswer, SessionError>,
    ) -> bool {
        if !self.supervisor.accepts_chat(&ticket) {
            tracing::warn!("Discarding chat response from an ended session");
            return false;
        }
        match outcome {
            Ok(answer) => {
                tracing::info!("Chat answered ({} chunks)", answer.chunks.len());
                self.push_turn(ChatRole::Assistant, answer.response, answer.chunks);
            }
            Err(e) => {
                tracing::warn!("Chat failed: {}", e);
                self.state.error = Some(e.chat_message());
                self.push_turn(ChatRole::Assistant, CHAT_APOLOGY.to_string(), Vec::new());
            }
        }
        self.state.chat_status = ChatStatus::Idle;
        true
    }

    /// 发送问题并等待回答；返回是否真正发出了请求
    pub async fn send_message(&mut self, service: &dyn AnalysisService, text: &str) -> bool {
        let Some(request) = self.begin_chat(text) else {
            return false;
        };
        let outcome = service
            .query(&request.question, request.namespace.as_deref())
            .await;
        self.commit_chat(request.ticket, outcome);
        true
    }

    /// 发送当前输入缓冲
    pub fn begin_chat_from_input(&mut self) -> Option<ChatRequest> {
        let text = self.state.chat_input.clone();
        self.begin_chat(&text)
    }

    pub fn set_chat_input(&mut self, text: impl Into<String>) {
        self.state.chat_input = text.into();
    }

    /// 打开 / 关闭问答面板；尚无分析结果时拒绝打开，返回是否生效
    pub fn set_chat_visible(&mut self, visible: bool) -> bool {
        if visible && !self.state.has_analysis_results {
            tracing::warn!("Chat requested before any analysis succeeded; ignoring");
            return false;
        }
        self.state.chat_visible = visible;
        true
    }

    pub fn toggle_chat(&mut self) -> bool {
        let visible = !self.state.chat_visible;
        self.set_chat_visible(visible)
    }

    pub fn dismiss_error(&mut self) {
        self.state.error = None;
    }

    /// 管线之外的本地错误（如读取文件失败），同样只写入错误横幅
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.state.error = Some(message.into());
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{AnalysisResult, Label};

    fn result(text: &str, label: Label) -> AnalysisResult {
        AnalysisResult {
            clause_number: None,
            clause_text: text.to_string(),
            label,
            risk_category: String::new(),
            reasoning: String::new(),
        }
    }

    fn analyzed_session() -> Session {
        let mut session = Session::default();
        session.select_document(Document::from_text("terms"));
        let req = session.begin_analysis().unwrap();
        session.commit_analysis(
            req.ticket,
            Ok(IngestOutcome {
                results: vec![result("a", Label::Risky)],
                document_id: Some("doc-7".into()),
            }),
        );
        session
    }

    #[test]
    fn test_begin_analysis_is_one_composite_transition() {
        let mut session = analyzed_session();
        session.set_chat_visible(true);
        session.state.error = Some("old".into());

        session.begin_analysis().unwrap();
        let s = session.state();
        assert_eq!(s.analysis_status, AnalysisStatus::Pending);
        assert!(s.results.is_empty());
        assert!(!s.has_analysis_results);
        assert!(!s.chat_visible);
        assert!(s.error.is_none());
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_missing_document_leaves_status_unchanged() {
        let mut session = Session::default();
        let err = session.begin_analysis().unwrap_err();
        assert_eq!(err, SessionError::MissingInput);
        assert_eq!(session.state().analysis_status, AnalysisStatus::Idle);
        assert_eq!(session.state().error.as_deref(), Some("Please upload a file."));
    }

    #[test]
    fn test_success_with_empty_results_still_has_results() {
        let mut session = Session::default();
        session.select_document(Document::from_text("terms"));
        let req = session.begin_analysis().unwrap();
        assert!(session.commit_analysis(req.ticket, Ok(IngestOutcome::default())));
        assert!(session.state().has_analysis_results);
        assert!(session.state().results.is_empty());
        assert_eq!(session.state().analysis_status, AnalysisStatus::Succeeded);
    }

    #[test]
    fn test_select_document_mid_request_discards_late_response() {
        let mut session = Session::default();
        session.select_document(Document::from_text("first"));
        let req = session.begin_analysis().unwrap();
        session.select_document(Document::from_text("second"));
        assert_eq!(session.state().analysis_status, AnalysisStatus::Idle);

        let applied = session.commit_analysis(
            req.ticket,
            Ok(IngestOutcome {
                results: vec![result("stale", Label::Fair)],
                document_id: None,
            }),
        );
        assert!(!applied);
        assert!(session.state().results.is_empty());
        assert!(!session.state().has_analysis_results);
    }

    #[test]
    fn test_last_write_wins_without_guard() {
        let mut session = Session::new(SessionSettings {
            discard_superseded: false,
            namespace: None,
        });
        session.select_document(Document::from_text("doc"));
        let first = session.begin_analysis().unwrap();
        let second = session.begin_analysis().unwrap();
        session.commit_analysis(
            second.ticket,
            Ok(IngestOutcome {
                results: vec![result("second", Label::Fair)],
                document_id: None,
            }),
        );
        session.commit_analysis(
            first.ticket,
            Ok(IngestOutcome {
                results: vec![result("first", Label::Risky)],
                document_id: None,
            }),
        );
        assert_eq!(session.state().results[0].clause_text, "first");
    }

    #[test]
    fn test_chat_visibility_gated_on_results() {
        let mut session = Session::default();
        assert!(!session.set_chat_visible(true));
        assert!(!session.toggle_chat());
        assert!(!session.state().chat_visible);

        let mut session = analyzed_session();
        assert!(session.toggle_chat());
        assert!(session.state().chat_visible);
        assert!(session.set_chat_visible(false));
        assert!(!session.state().chat_visible);
    }

    #[test]
    fn test_begin_chat_appends_user_turn_and_clears_input() {
        let mut session = analyzed_session();
        session.set_chat_input("  Is clause 1 risky?  ");
        let req = session.begin_chat_from_input().unwrap();
        assert_eq!(req.question, "Is clause 1 risky?");
        assert_eq!(req.namespace.as_deref(), Some("doc-7"));

        let s = session.state();
        assert_eq!(s.chat_transcript.len(), 1);
        assert_eq!(s.chat_transcript[0].role, ChatRole::User);
        assert!(s.chat_input.is_empty());
        assert_eq!(s.chat_status, ChatStatus::Pending);
    }

    #[test]
    fn test_namespace_override_wins() {
        let mut session = analyzed_session();
        session.namespace_override = Some("fixed".into());
        let req = session.begin_chat("q").unwrap();
        assert_eq!(req.namespace.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_whitespace_chat_is_ignored() {
        let mut session = analyzed_session();
        assert!(session.begin_chat(" \n\t ").is_none());
        assert!(session.state().chat_transcript.is_empty());
        assert_eq!(session.state().chat_status, ChatStatus::Idle);
    }

    #[test]
    fn test_chat_reply_after_session_end_is_dropped() {
        let mut session = analyzed_session();
        let req = session.begin_chat("question").unwrap();
        session.remove_document();
        assert_eq!(session.state().chat_status, ChatStatus::Idle);
        assert!(session.state().chat_transcript.is_empty());

        let applied = session.commit_chat(
            req.ticket,
            Ok(ChatAnswer {
                response: "late".into(),
                chunks: Vec::new(),
            }),
        );
        assert!(!applied);
        assert!(session.state().chat_transcript.is_empty());
    }

    #[test]
    fn test_turn_ids_are_unique_and_ordered() {
        let mut session = analyzed_session();
        for q in ["one", "two"] {
            let req = session.begin_chat(q).unwrap();
            session.commit_chat(
                req.ticket,
                Ok(ChatAnswer {
                    response: "ok".into(),
                    chunks: Vec::new(),
                }),
            );
        }
        let ids: Vec<i64> = session.state().chat_transcript.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_remove_document_resets_failed_session() {
        let mut session = Session::default();
        session.select_document(Document::from_text("doc"));
        let req = session.begin_analysis().unwrap();
        session.commit_analysis(req.ticket, Err(SessionError::http_status(500)));
        assert_eq!(session.state().analysis_status, AnalysisStatus::Failed);

        session.remove_document();
        assert_eq!(session.state().analysis_status, AnalysisStatus::Idle);
        assert!(session.state().error.is_none());
        assert!(session.state().document.is_none());
    }
}
