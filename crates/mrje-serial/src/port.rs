//! `serialport` 串口通道实现
//!
//! MR-JE 放大器侧的通讯参数在放大器参数中固定设定，主机侧必须与之
//! 一致：9600 波特、8 数据位、偶校验、1 停止位、无流控。
//!
//! ## 限制
//!
//! - 端口路径由调用方提供（如 `/dev/ttyUSB0`、`COM2`）
//! - 端口在 `PortChannel` 被 drop 时关闭，所有退出路径都会释放

use std::io::Read;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::trace;

use crate::{ChannelError, SerialChannel};

/// 固定波特率
pub const BAUD_RATE: u32 = 9600;

/// 真实串口通道
pub struct PortChannel {
    port: Box<dyn SerialPort>,
    path: String,
}

impl PortChannel {
    /// 以固定链路参数打开串口
    ///
    /// # 错误
    ///
    /// - `ChannelError::Device`: 端口不存在、被占用或参数不被支持
    pub fn open(path: impl Into<String>) -> Result<Self, ChannelError> {
        let path = path.into();
        let port = serialport::new(path.as_str(), BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| ChannelError::Device {
                message: format!("Failed to open serial port '{}': {}", path, e),
            })?;
        trace!(port = %path, baud = BAUD_RATE, "serial port opened (8E1, no flow control)");
        Ok(Self { port, path })
    }

    /// 端口路径
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SerialChannel for PortChannel {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        use std::io::Write;
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ChannelError> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_available(&mut self) -> Result<Vec<u8>, ChannelError> {
        let n = self.bytes_available()?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; n];
        self.port.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for PortChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortChannel")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
