//! 事件处理
//!
//! 轮询 crossterm 键盘事件，将快捷键转为 Command（StartAnalysis/RemoveDocument/ToggleChat/DismissError/Quit），
//! 其余按键交给 run_app 拼输入缓冲。当前状态下不可用的控件（如分析进行中再次开始分析）不会发出命令。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::{Command, SessionState};

/// 应用事件：来自快捷键的 Command 或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Key(KeyEvent),
}

/// 快捷键映射；返回 None 表示普通按键
pub fn shortcut(key: &KeyEvent) -> Option<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => Some(Command::Quit),
        KeyCode::Char('r') if ctrl => Some(Command::StartAnalysis),
        KeyCode::Char('d') if ctrl => Some(Command::RemoveDocument),
        KeyCode::Char('t') if ctrl => Some(Command::ToggleChat),
        KeyCode::Esc => Some(Command::DismissError),
        _ => None,
    }
}

/// 当前状态下该命令对应的控件是否可用；管线 Pending 时禁用触发控件
pub fn allowed(cmd: &Command, state: &SessionState) -> bool {
    match cmd {
        Command::StartAnalysis => state.can_start_analysis(),
        Command::SendMessage(_) | Command::SubmitChat => state.can_send_chat(),
        Command::ToggleChat | Command::SetChatVisible(true) => state.has_analysis_results,
        _ => true,
    }
}

/// 事件处理器：持有 cmd_tx，poll 时读键盘，快捷键直接转发给编排器
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self, state: &SessionState) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key, state));
                }
            }
        }
        Ok(None)
    }

    /// 快捷键在可用时转发；被禁用的快捷键吞掉，返回 None
    pub fn handle_key(&self, key: KeyEvent, state: &SessionState) -> Option<AppEvent> {
        match shortcut(&key) {
            Some(cmd) => {
                if !self.send_if_allowed(cmd.clone(), state) {
                    return None;
                }
                Some(AppEvent::Command(cmd))
            }
            None => Some(AppEvent::Key(key)),
        }
    }

    pub fn send(&self, cmd: Command) {
        let _ = self.cmd_tx.send(cmd);
    }

    /// 仅在控件可用时发送；返回是否已发送
    pub fn send_if_allowed(&self, cmd: Command, state: &SessionState) -> bool {
        if !allowed(&cmd, state) {
            tracing::debug!("Ignoring {:?}: control disabled", cmd);
            return false;
        }
        self.send(cmd);
        true
    }
}
