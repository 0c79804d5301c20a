//! # MRJE Driver
//!
//! MR-JE 伺服放大器的驱动层，包括：
//!
//! - 传输会话（`session`）：单次请求/响应交换与有界重试/EOT 恢复
//! - 定位控制器（`positioning`）：绝对定位移动序列与到位轮询
//! - 钩子系统（`hooks`）：发送/接收观测与故障恢复扩展点
//!
//! # 并发模型
//!
//! 单线程、同步、阻塞：一条指令完整解决（帧往返或重试耗尽）后才发出
//! 下一条，帧之间没有流水。串口通道在一次移动期间由一个会话独占。

pub mod config;
mod error;
pub mod hooks;
pub mod positioning;
pub mod session;

pub use config::DriverConfig;
pub use error::{MoveError, SessionError};
pub use hooks::{HookRegistry, SessionHook};
pub use positioning::{Direction, MoveOutcome, MoveRequest, MoveStep, PositioningController};
pub use session::TransmissionSession;
