//! 会话编排器：主控循环
//!
//! 单个后台任务独占 Session，select! 同时消费用户命令与网络完成事件；所有状态迁移都在这一个任务里发生。
//! 发起请求时先提交第一段迁移并广播快照，再把网络调用 spawn 出去，循环继续处理命令；
//! 调用结束（包括 panic）后以完成事件回到循环，提交第二段迁移并再次广播。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config::AppConfig;
use crate::core::document::Document;
use crate::core::error::SessionError;
use crate::core::session::{AnalysisRequest, ChatRequest, Session, SessionSettings};
use crate::core::session_supervisor::{AnalysisTicket, ChatTicket};
use crate::core::state::SessionState;
use crate::service::{create_service_from_config, AnalysisService, ChatAnswer, IngestOutcome};

/// 从展示层发往编排器的用户意图
#[derive(Debug, Clone)]
pub enum Command {
    /// 从磁盘选择文档
    SelectDocument(PathBuf),
    /// 以粘贴文本作为文档
    SelectText(String),
    RemoveDocument,
    StartAnalysis,
    /// 更新问答输入缓冲
    SetChatInput(String),
    /// 直接发送一条问题
    SendMessage(String),
    /// 发送当前输入缓冲
    SubmitChat,
    SetChatVisible(bool),
    ToggleChat,
    DismissError,
    Quit,
}

/// 网络调用结束后回到主循环的事件
enum Completion {
    Analysis(AnalysisTicket, Result<IngestOutcome, SessionError>),
    Chat(ChatTicket, Result<ChatAnswer, SessionError>),
}

fn task_failure(e: tokio::task::JoinError) -> SessionError {
    SessionError::Transport(format!("request task failed: {}", e))
}

fn spawn_analysis(
    service: Arc<dyn AnalysisService>,
    request: AnalysisRequest,
    done_tx: mpsc::UnboundedSender<Completion>,
) {
    let AnalysisRequest { ticket, document } = request;
    tokio::spawn(async move {
        // 内层任务隔离 panic，保证一定有完成事件退出 Pending
        let call = tokio::spawn(async move { service.ingest(&document).await });
        let outcome = call.await.unwrap_or_else(|e| Err(task_failure(e)));
        let _ = done_tx.send(Completion::Analysis(ticket, outcome));
    });
}

fn spawn_chat(
    service: Arc<dyn AnalysisService>,
    request: ChatRequest,
    done_tx: mpsc::UnboundedSender<Completion>,
) {
    let ChatRequest {
        ticket,
        question,
        namespace,
    } = request;
    tokio::spawn(async move {
        let call =
            tokio::spawn(async move { service.query(&question, namespace.as_deref()).await });
        let outcome = call.await.unwrap_or_else(|e| Err(task_failure(e)));
        let _ = done_tx.send(Completion::Chat(ticket, outcome));
    });
}

/// 启动会话任务：返回命令发送端与状态接收端
pub fn spawn_session(
    service: Arc<dyn AnalysisService>,
    settings: SessionSettings,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<SessionState>) {
    let mut session = Session::new(settings);

    // 两通道：UI -> Core 命令；Core -> UI 状态快照
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(session.snapshot());
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    // 所有发送端都已关闭，退出循环
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        Command::SelectDocument(path) => match Document::from_path(&path).await {
                            Ok(doc) => session.select_document(doc),
                            Err(e) => {
                                tracing::warn!("Failed to read {}: {}", path.display(), e);
                                session.report_error(format!("Failed to read file: {}", e));
                            }
                        },
                        Command::SelectText(text) => {
                            session.select_document(Document::from_text(text));
                        }
                        Command::RemoveDocument => session.remove_document(),
                        Command::StartAnalysis => {
                            if let Ok(request) = session.begin_analysis() {
                                spawn_analysis(service.clone(), request, done_tx.clone());
                            }
                        }
                        Command::SetChatInput(text) => session.set_chat_input(text),
                        Command::SendMessage(text) => {
                            if let Some(request) = session.begin_chat(&text) {
                                spawn_chat(service.clone(), request, done_tx.clone());
                            }
                        }
                        Command::SubmitChat => {
                            if let Some(request) = session.begin_chat_from_input() {
                                spawn_chat(service.clone(), request, done_tx.clone());
                            }
                        }
                        Command::SetChatVisible(visible) => {
                            session.set_chat_visible(visible);
                        }
                        Command::ToggleChat => {
                            session.toggle_chat();
                        }
                        Command::DismissError => session.dismiss_error(),
                        Command::Quit => break,
                    }
                    let _ = state_tx.send(session.snapshot());
                }
                Some(done) = done_rx.recv() => {
                    let applied = match done {
                        Completion::Analysis(ticket, outcome) => session.commit_analysis(ticket, outcome),
                        Completion::Chat(ticket, outcome) => session.commit_chat(ticket, outcome),
                    };
                    if applied {
                        let _ = state_tx.send(session.snapshot());
                    }
                }
            }
        }
        tracing::info!("Session loop stopped");
    });

    (cmd_tx, state_rx)
}

/// 按配置创建服务并启动会话；服务不可达只记录警告
pub async fn create_session(
    cfg: &AppConfig,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<SessionState>) {
    let service = create_service_from_config(&cfg.service);
    match service.ping().await {
        Ok(()) => tracing::info!("Analysis service reachable"),
        Err(e) => tracing::warn!("Analysis service not reachable yet: {}", e),
    }
    spawn_session(service, SessionSettings::from_config(cfg))
}
