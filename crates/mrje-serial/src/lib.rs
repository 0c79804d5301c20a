//! # MRJE Serial
//!
//! 串口通道抽象层，为传输会话提供统一的字节流接口。
//!
//! ## 模块
//!
//! - `PortChannel`: 基于 `serialport` 的真实串口实现
//! - `MockChannel`: 无硬件依赖的测试通道（`mock` feature）
//!
//! 链路参数是固定的外部配置（9600 波特、8 数据位、偶校验、1 停止位、
//! 无流控），不由协议引擎协商。

use thiserror::Error;

mod port;
pub use port::PortChannel;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::MockChannel;

/// 通道层统一错误类型
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),
    #[error("Device error: {message}")]
    Device { message: String },
}

/// 字节导向的双工通道
///
/// 传输会话在一次移动期间独占持有通道。可用性检查是单次非阻塞查询，
/// 而非无限等待：查询时没有数据即视为本轮"未收到"。
pub trait SerialChannel {
    /// 将字节序列完整写入通道
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;

    /// 当前接收缓冲中可读的字节数（单次查询，不等待）
    fn bytes_available(&mut self) -> Result<usize, ChannelError>;

    /// 读出当前已缓冲的全部字节
    fn read_available(&mut self) -> Result<Vec<u8>, ChannelError>;
}
