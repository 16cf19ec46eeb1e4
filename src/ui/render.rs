//! 界面渲染
//!
//! 根据 SessionState 绘制：标题栏显示分析 / 问答状态，主体为输入视图或结果视图（按标签着色），
//! 打开问答时右侧为对话面板，底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::core::{AnalysisStatus, ChatRole, ChatStatus, Label, SessionState};

/// 单条对话在 UI 中显示的最大字符数
const MAX_DISPLAY_CHARS: usize = 1200;

/// 展示层本地状态：输入缓冲与滚动位置
#[derive(Debug, Default, Clone)]
pub struct ViewState {
    /// 文件路径输入
    pub path_input: String,
    /// 问答输入（同步到 SessionState.chat_input）
    pub chat_input: String,
    pub results_scroll: usize,
    pub chat_scroll: usize,
}

/// 对过长内容做折叠：保留前 N 字 + 省略提示
fn truncate_for_display(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= MAX_DISPLAY_CHARS {
        return content.to_string();
    }
    let head: String = chars.iter().take(MAX_DISPLAY_CHARS).collect();
    format!("{}\n... [已省略，共 {} 字]", head, chars.len())
}

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn label_color(label: Label) -> Color {
    match label {
        Label::Risky => Color::Red,
        Label::Unfair => Color::Yellow,
        Label::Fair => Color::Gray,
    }
}

fn status_label(state: &SessionState) -> String {
    let analysis = match state.analysis_status {
        AnalysisStatus::Idle => "待分析",
        AnalysisStatus::Pending => "分析中…",
        AnalysisStatus::Succeeded => "分析完成",
        AnalysisStatus::Failed => "分析失败",
    };
    if state.chat_status == ChatStatus::Pending {
        format!("{} │ 回答中…", analysis)
    } else {
        analysis.to_string()
    }
}

/// 输入视图：当前文档与操作提示
fn input_lines(state: &SessionState) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        "Upload a Terms of Service document to identify risky or unfair clauses.",
        Style::default().fg(Color::Gray),
    ))];
    lines.push(Line::from(""));
    match &state.document {
        Some(doc) => lines.push(Line::from(vec![
            Span::styled("Selected: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                doc.filename.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  ({} bytes, {:?})", doc.size, doc.mime_hint)),
        ])),
        None => lines.push(Line::from("No document selected (.txt, .pdf, .html, .htm)")),
    }
    if state.is_analysis_pending() {
        lines.push(Line::from(Span::styled(
            "Analyzing document...",
            Style::default().fg(Color::Yellow),
        )));
    }
    lines
}

/// 结果视图：标签统计 + 逐条款（文档顺序）
fn result_lines(state: &SessionState, width: usize) -> Vec<Line<'static>> {
    let counts = state.label_counts();
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("Risky {}", counts.risky),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("Unfair {}", counts.unfair),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(format!("Fair {}", counts.fair), Style::default().fg(Color::Gray)),
    ])];
    if state.results.is_empty() {
        lines.push(Line::from("No clauses were returned for this document."));
    }
    for (idx, r) in state.results.iter().enumerate() {
        lines.push(Line::from(""));
        let number = r.clause_number.map(|n| n as usize).unwrap_or(idx + 1);
        let color = label_color(r.label);
        let header = format!("Clause {}: ", number);
        for (i, line) in wrap_text(&r.clause_text, width.max(20)).into_iter().enumerate() {
            let pref = if i == 0 { header.clone() } else { " ".repeat(header.len()) };
            lines.push(Line::from(vec![
                Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(line),
            ]));
        }
        let mut verdict = r.label.as_str().to_string();
        if !r.risk_category.is_empty() {
            verdict = format!("{} [{}]", verdict, r.risk_category);
        }
        let reasoning = format!("{}: {}", verdict, r.reasoning);
        for line in wrap_text(&reasoning, width.max(20)) {
            lines.push(Line::from(Span::styled(line, Style::default().fg(color))));
        }
    }
    lines
}

/// 对话面板内容
fn chat_lines(state: &SessionState, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if state.chat_transcript.is_empty() {
        lines.push(Line::from("Ready to discuss the analysis!"));
        lines.push(Line::from(Span::styled(
            "Example: \"What are the main risks in this document?\"",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (idx, turn) in state.chat_transcript.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        let (prefix, color) = match turn.role {
            ChatRole::User => ("You ", Color::Cyan),
            ChatRole::Assistant => ("Bot ", Color::Green),
        };
        let text = truncate_for_display(&turn.content);
        for (i, line) in wrap_text(&text, width.max(20)).into_iter().enumerate() {
            let pref = if i == 0 { prefix } else { "    " };
            lines.push(Line::from(vec![
                Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(line),
            ]));
        }
        if !turn.supporting_chunks.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("    Based on {} relevant sections", turn.supporting_chunks.len()),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    if state.is_chat_pending() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Bot Analyzing...",
            Style::default().fg(Color::Yellow),
        )));
    }
    lines
}

/// 绘制带滚动条的段落；返回 (总行数, 可视高度)
fn render_scrolled(
    f: &mut Frame,
    area: Rect,
    block: Block,
    lines: Vec<Line<'static>>,
    scroll: usize,
) -> (usize, usize) {
    let content_height = area.height.saturating_sub(2) as usize; // 边框
    let total_lines = lines.len();
    let scroll_offset = scroll.min(total_lines.saturating_sub(content_height));

    let inner = block.inner(area);
    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }
    (total_lines, content_height)
}

/// 绘制一帧；将当前焦点面板的 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(f: &mut Frame, state: &SessionState, view: &ViewState, out: &mut (usize, usize)) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(4)])
        .split(f.area());

    let title = format!(" ToS Analyzer │ {} ", status_label(state));
    let main_block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    if !state.has_analysis_results {
        *out = render_scrolled(f, chunks[0], main_block, input_lines(state), 0);
    } else if state.chat_visible {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[0]);
        let width = panes[0].width.saturating_sub(3) as usize;
        render_scrolled(
            f,
            panes[0],
            main_block,
            result_lines(state, width),
            view.results_scroll,
        );
        let chat_block = Block::default()
            .title(" Discussion ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let width = panes[1].width.saturating_sub(3) as usize;
        *out = render_scrolled(f, panes[1], chat_block, chat_lines(state, width), view.chat_scroll);
    } else {
        let width = chunks[0].width.saturating_sub(3) as usize;
        *out = render_scrolled(
            f,
            chunks[0],
            main_block,
            result_lines(state, width),
            view.results_scroll,
        );
    }

    let chatting = state.chat_visible;
    let locked = if chatting {
        state.is_chat_pending()
    } else {
        state.is_analysis_pending()
    };
    let prompt = if let Some(err) = &state.error {
        format!(" 错误: {} ", err.chars().take(60).collect::<String>())
    } else if locked {
        " 等待回复… ".to_string()
    } else if chatting {
        " 提问 ".to_string()
    } else {
        " 文件路径 ".to_string()
    };
    let border_color = if state.error.is_some() {
        Color::Red
    } else {
        Color::Blue
    };
    let hint = if chatting {
        " Enter 发送 │ ↑↓ 滚动 │ Ctrl+T 关闭问答 │ Esc 关闭错误 │ Ctrl+Q 退出 "
    } else if state.has_analysis_results {
        " Enter 选择文件 │ Ctrl+R 重新分析 │ Ctrl+T 问答 │ Ctrl+D 移除 │ Ctrl+Q 退出 "
    } else {
        " Enter 选择文件 │ Ctrl+R 开始分析 │ Ctrl+D 移除 │ Esc 关闭错误 │ Ctrl+Q 退出 "
    };
    let input_block = Block::default()
        .title(prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let buffer = if chatting {
        view.chat_input.as_str()
    } else {
        view.path_input.as_str()
    };
    let input = Paragraph::new(buffer.to_string())
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });
    f.render_widget(input, chunks[1]);
}
