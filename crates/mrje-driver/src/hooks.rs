//! 钩子系统
//!
//! 本模块提供会话级回调，用于观测每一次发送与每一段接收缓冲（诊断），
//! 以及在交换耗尽重试预算时触发故障恢复扩展点。
//!
//! # 使用示例
//!
//! ```
//! use mrje_driver::hooks::{HookRegistry, SessionHook};
//! use std::sync::Arc;
//!
//! struct Dump;
//!
//! impl SessionHook for Dump {
//!     fn on_frame_sent(&self, bytes: &[u8]) {
//!         eprintln!("tx: {} bytes", bytes.len());
//!     }
//! }
//!
//! let mut hooks = HookRegistry::new();
//! hooks.add_hook(Arc::new(Dump));
//! hooks.frame_sent(&[0x04]);
//! ```

use std::sync::Arc;

use crate::error::SessionError;

/// 会话回调 Trait
///
/// 所有方法默认空实现，按需选择性覆盖。回调在会话线程内同步调用，
/// 实现不应阻塞。
pub trait SessionHook: Send + Sync {
    /// 每次向通道写入一帧（含 EOT 控制字节）后调用
    fn on_frame_sent(&self, bytes: &[u8]) {
        let _ = bytes;
    }

    /// 每次从通道读出接收缓冲后调用（无论解码成败）
    fn on_buffer_received(&self, bytes: &[u8]) {
        let _ = bytes;
    }

    /// 交换耗尽重试预算、即将以终态错误中止时调用
    ///
    /// 故障恢复扩展点：除被调用外没有约定的默认行为。
    fn on_exchange_failed(&self, error: &SessionError) {
        let _ = error;
    }
}

/// 钩子注册表
///
/// 使用 `Arc` 使回调可被多处共享；注册表本身由会话独占持有。
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn SessionHook>>,
}

impl HookRegistry {
    pub const fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// 添加回调
    pub fn add_hook(&mut self, hook: Arc<dyn SessionHook>) {
        self.hooks.push(hook);
    }

    /// 移除所有回调
    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// 触发所有发送回调
    pub fn frame_sent(&self, bytes: &[u8]) {
        for hook in self.hooks.iter() {
            hook.on_frame_sent(bytes);
        }
    }

    /// 触发所有接收回调
    pub fn buffer_received(&self, bytes: &[u8]) {
        for hook in self.hooks.iter() {
            hook.on_buffer_received(bytes);
        }
    }

    /// 触发所有故障回调
    pub fn exchange_failed(&self, error: &SessionError) {
        for hook in self.hooks.iter() {
            hook.on_exchange_failed(error);
        }
    }
}
