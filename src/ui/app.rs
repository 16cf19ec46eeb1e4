//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将按键与快捷键转为 Command 发送给编排器，
//! 每帧用 draw 渲染 SessionState 与本地输入缓冲。这里不做任何状态迁移，只读状态、发意图。

use std::io::{self, Stdout};
use std::path::PathBuf;

use crossterm::event::KeyCode;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, SessionState};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::{draw, ViewState};

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    mut state_rx: watch::Receiver<SessionState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = EventHandler::new(cmd_tx);
    let mut view = ViewState::default();
    let mut last_transcript_len = 0usize;
    let mut last_session_id = String::new();

    loop {
        let state = state_rx.borrow_and_update().clone();

        // 会话结束：核心已清空 chat_input，本地缓冲与滚动位置随之重置
        if state.session_id != last_session_id {
            last_session_id = state.session_id.clone();
            view.chat_input.clear();
            view.chat_scroll = 0;
            view.results_scroll = 0;
        }

        if state.chat_transcript.len() != last_transcript_len {
            last_transcript_len = state.chat_transcript.len();
            view.chat_scroll = usize::MAX;
        }

        if let Ok(Some(ev)) = event_handler.poll(&state) {
            match ev {
                AppEvent::Command(Command::Quit) => break,
                AppEvent::Command(_) => {}
                AppEvent::Key(key) if state.chat_visible => {
                    let locked = state.is_chat_pending();
                    match key.code {
                        KeyCode::Enter if state.can_send_chat() => {
                            if view.chat_input.trim().is_empty() {
                                view.chat_input.clear();
                                event_handler.send(Command::SetChatInput(String::new()));
                            } else {
                                let text = std::mem::take(&mut view.chat_input);
                                event_handler.send_if_allowed(Command::SendMessage(text), &state);
                            }
                        }
                        KeyCode::Backspace if !locked => {
                            view.chat_input.pop();
                            event_handler.send(Command::SetChatInput(view.chat_input.clone()));
                        }
                        KeyCode::Char(c) if !locked => {
                            view.chat_input.push(c);
                            event_handler.send(Command::SetChatInput(view.chat_input.clone()));
                        }
                        KeyCode::Up => view.chat_scroll = view.chat_scroll.saturating_sub(1),
                        KeyCode::Down => view.chat_scroll = view.chat_scroll.saturating_add(1),
                        KeyCode::PageUp => view.results_scroll = view.results_scroll.saturating_sub(10),
                        KeyCode::PageDown => view.results_scroll = view.results_scroll.saturating_add(10),
                        _ => {}
                    }
                }
                AppEvent::Key(key) => match key.code {
                    KeyCode::Enter => {
                        let path = view.path_input.trim().to_string();
                        if !path.is_empty() {
                            view.path_input.clear();
                            view.results_scroll = 0;
                            event_handler.send(Command::SelectDocument(PathBuf::from(path)));
                        }
                    }
                    KeyCode::Backspace => {
                        view.path_input.pop();
                    }
                    KeyCode::Char(c) => view.path_input.push(c),
                    KeyCode::Up => view.results_scroll = view.results_scroll.saturating_sub(1),
                    KeyCode::Down => view.results_scroll = view.results_scroll.saturating_add(1),
                    KeyCode::PageUp => view.results_scroll = view.results_scroll.saturating_sub(10),
                    KeyCode::PageDown => view.results_scroll = view.results_scroll.saturating_add(10),
                    KeyCode::Home => view.results_scroll = 0,
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| draw(f, &state, &view, &mut scroll_info))?;
        let (total_lines, viewport_height) = scroll_info;
        let max_scroll = total_lines.saturating_sub(viewport_height);
        if state.chat_visible {
            view.chat_scroll = view.chat_scroll.min(max_scroll);
        } else if state.has_analysis_results {
            view.results_scroll = view.results_scroll.min(max_scroll);
        }

        tokio::task::yield_now().await;
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
