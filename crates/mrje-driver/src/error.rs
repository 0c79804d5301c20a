//! 驱动层错误类型定义

use mrje_protocol::ProtocolError;
use mrje_serial::ChannelError;
use thiserror::Error;

use crate::positioning::MoveStep;

/// 传输会话错误
///
/// 会话在自身的有界预算内重试，只有耗尽预算后才向上暴露终态错误；
/// 编码侧的 `InvalidFrameInput`（经 `Frame` 变体）是调用方错误，不重试。
#[derive(Error, Debug)]
pub enum SessionError {
    /// 串口通道错误
    #[error("Serial channel error: {0}")]
    Channel(#[from] ChannelError),

    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Frame(#[from] ProtocolError),

    /// 连续多轮未收到任何数据
    #[error("No response from amplifier after {attempts} attempts")]
    NoResponse { attempts: u32 },

    /// 连续收到多个校验失败/否定应答的响应
    #[error("Too many malformed responses ({attempts} attempts)")]
    TooManyMalformedResponses { attempts: u32 },
}

/// 定位移动失败
///
/// 携带失败的步骤与清理（退出测试模式 + EOT）是否成功，便于调用方
/// 判断放大器当前所处的状态。
#[derive(Error, Debug)]
#[error("Move aborted at step {step} (cleanup_ok: {cleanup_ok})")]
pub struct MoveError {
    /// 失败的步骤
    pub step: MoveStep,
    /// 尽力清理是否全部成功
    pub cleanup_ok: bool,
    #[source]
    pub source: SessionError,
}
