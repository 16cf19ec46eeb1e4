//! 会话监管：会话代数与过期请求判定
//!
//! 网络请求无法取消；每次发起请求时领取一张带代数的票据，会话结束或重新分析时代数前进。
//! 开启 discard_superseded 时，票据已过期的响应被丢弃；关闭时按完成顺序后写覆盖。

/// 分析请求票据：发起时的分析代数 + 会话代数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub(crate) analysis_generation: u64,
    pub(crate) session_generation: u64,
}

/// 问答请求票据：发起时的会话代数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatTicket {
    pub(crate) session_generation: u64,
}

#[derive(Debug)]
pub struct SessionSupervisor {
    /// 选择 / 移除文档时前进
    session_generation: u64,
    /// 每次开始分析、以及会话结束时前进
    analysis_generation: u64,
    discard_superseded: bool,
}

impl SessionSupervisor {
    pub fn new(discard_superseded: bool) -> Self {
        Self {
            session_generation: 0,
            analysis_generation: 0,
            discard_superseded,
        }
    }

    /// 结束当前会话；之前发出的所有请求随之过期
    pub fn end_session(&mut self) {
        self.session_generation += 1;
        self.analysis_generation += 1;
    }

    pub fn issue_analysis(&mut self) -> AnalysisTicket {
        self.analysis_generation += 1;
        AnalysisTicket {
            analysis_generation: self.analysis_generation,
            session_generation: self.session_generation,
        }
    }

    pub fn issue_chat(&self) -> ChatTicket {
        ChatTicket {
            session_generation: self.session_generation,
        }
    }

    /// 该分析响应是否应当提交
    pub fn accepts_analysis(&self, ticket: &AnalysisTicket) -> bool {
        !self.discard_superseded
            || (ticket.analysis_generation == self.analysis_generation
                && ticket.session_generation == self.session_generation)
    }

    pub fn accepts_chat(&self, ticket: &ChatTicket) -> bool {
        !self.discard_superseded || ticket.session_generation == self.session_generation
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new(true)
    }
}
