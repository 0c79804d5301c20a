//! 驱动层时序配置

use std::time::Duration;

/// 固定等待时长配置
///
/// 所有等待都是固定时长休眠，不是事件驱动；对无效等待的唯一约束是
/// 会话的重试计数上限与轮询超时次数。
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// 重试间隔：EOT 恢复与畸形响应重发共用（默认 100 ms）
    pub retry_delay: Duration,
    /// 到位轮询间隔（默认 100 ms）
    pub poll_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl DriverConfig {
    /// 零延迟配置（测试用，避免真实休眠）
    pub fn immediate() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}
