//! 传输会话
//!
//! 一次逻辑上的请求/响应交换：编码并写入指令帧，查询通道可用数据，
//! 解码验证响应，并实现有界的类型化重试与 EOT 恢复策略。
//!
//! # 重试策略
//!
//! 两个独立计数器，均在每次 `exchange` 开始时清零：
//!
//! - **畸形响应计数**：收到数据但校验失败/否定应答/残缺。达到上限
//!   前，固定短延迟后重发原帧。
//! - **无响应计数**：查询时通道中没有数据。达到上限前，发送 EOT
//!   控制字节提示放大器刷新输出缓冲，固定延迟后重发原帧。
//!
//! 任一计数器达到上限（3 次）即触发故障钩子并以终态错误中止。

use mrje_protocol::{CommandFrame, DEFAULT_STATION, EOT, Response, decode};
use mrje_serial::SerialChannel;
use tracing::{debug, trace, warn};

use crate::config::DriverConfig;
use crate::error::SessionError;
use crate::hooks::HookRegistry;

/// 每个计数器的重试上限
pub const MAX_ATTEMPTS: u32 = 3;

/// 传输会话
///
/// 在一次移动期间独占持有字节通道；不跨移动保留任何可变状态。
pub struct TransmissionSession<C: SerialChannel> {
    channel: C,
    station: u8,
    config: DriverConfig,
    hooks: HookRegistry,
}

impl<C: SerialChannel> TransmissionSession<C> {
    /// 以默认配置与默认站号创建会话
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, DriverConfig::default())
    }

    /// 以指定时序配置创建会话
    pub fn with_config(channel: C, config: DriverConfig) -> Self {
        Self {
            channel,
            station: DEFAULT_STATION,
            config,
            hooks: HookRegistry::new(),
        }
    }

    /// 时序配置
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 钩子注册表
    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// 底层通道
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// 交还底层通道
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// 执行一次请求/响应交换
    ///
    /// # 错误
    ///
    /// - `SessionError::Frame`: 输入违反编码约定（不重试）
    /// - `SessionError::NoResponse`: 连续 3 轮通道中无数据
    /// - `SessionError::TooManyMalformedResponses`: 连续 3 个无效响应
    /// - `SessionError::Channel`: 通道 IO 失败
    pub fn exchange(
        &mut self,
        command: &str,
        data_no: &str,
        payload: &str,
    ) -> Result<Response, SessionError> {
        let frame = CommandFrame::with_station(self.station, command, data_no, payload)?;
        let wire = frame.encode();

        let mut malformed: u32 = 0;
        let mut no_response: u32 = 0;

        self.send(&wire)?;
        loop {
            if self.channel.bytes_available()? > 0 {
                let buf = self.channel.read_available()?;
                trace!(buffer = %hex::encode(&buf), "received buffer");
                self.hooks.buffer_received(&buf);

                match decode(&buf) {
                    Ok(response) => {
                        debug!(command, data_no, "exchange successful");
                        return Ok(response);
                    },
                    Err(err) => {
                        malformed += 1;
                        warn!(error = %err, attempt = malformed, "received invalid response");
                        if malformed >= MAX_ATTEMPTS {
                            let err = SessionError::TooManyMalformedResponses {
                                attempts: malformed,
                            };
                            self.hooks.exchange_failed(&err);
                            return Err(err);
                        }
                        spin_sleep::sleep(self.config.retry_delay);
                        self.send(&wire)?;
                    },
                }
            } else {
                no_response += 1;
                if no_response >= MAX_ATTEMPTS {
                    warn!(command, data_no, "no response from amplifier");
                    let err = SessionError::NoResponse {
                        attempts: no_response,
                    };
                    self.hooks.exchange_failed(&err);
                    return Err(err);
                }
                // 提示放大器重发/复位其输出缓冲，随后重发原帧
                self.send_eot()?;
                spin_sleep::sleep(self.config.retry_delay);
                self.send(&wire)?;
            }
        }
    }

    /// 发送 EOT 控制字节（协议级刷新）
    pub fn send_eot(&mut self) -> Result<(), SessionError> {
        self.send(&[EOT])
    }

    fn send(&mut self, wire: &[u8]) -> Result<(), SessionError> {
        trace!(frame = %hex::encode(wire), "send frame");
        self.channel.write_all(wire)?;
        self.hooks.frame_sent(wire);
        Ok(())
    }
}
