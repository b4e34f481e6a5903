//! 请求顺序保护
//!
//! 每次发起请求领取一张票，只有和最新一次请求对应的结果会被接受；
//! 旧请求的结果（包括错误）直接丢弃，不需要取消信号

use std::sync::atomic::{AtomicU64, Ordering};

/// 请求票据
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

#[derive(Debug, Default)]
pub struct RequestGuard {
    latest: AtomicU64,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发起新请求，之前的票全部失效
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}
