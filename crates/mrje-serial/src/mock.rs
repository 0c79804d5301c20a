//! Mock 串口通道（无硬件依赖）
//!
//! 记录每一次写入，并按脚本提供接收缓冲：既可预先排队应答，也可注册
//! 一个按写入内容动态生成应答的回调。用于会话与定位控制器的测试。

use std::collections::VecDeque;

use crate::{ChannelError, SerialChannel};

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

/// 脚本化测试通道
pub struct MockChannel {
    writes: Vec<Vec<u8>>,
    inbound: VecDeque<Vec<u8>>,
    responder: Option<Responder>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            inbound: VecDeque::new(),
            responder: None,
        }
    }

    /// 以动态应答回调构建通道
    ///
    /// 每次写入后调用回调一次；返回 `Some(buf)` 时将 `buf` 排入接收
    /// 队列，返回 `None` 时本次写入不产生应答。
    pub fn with_responder(
        responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    ) -> Self {
        Self {
            writes: Vec::new(),
            inbound: VecDeque::new(),
            responder: Some(Box::new(responder)),
        }
    }

    /// 预先排队一段接收缓冲
    pub fn push_reply(&mut self, buf: impl Into<Vec<u8>>) {
        self.inbound.push_back(buf.into());
    }

    /// 全部写入记录（按发生顺序）
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialChannel for MockChannel {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.writes.push(bytes.to_vec());
        if let Some(responder) = self.responder.as_mut() {
            if let Some(reply) = responder(bytes) {
                self.inbound.push_back(reply);
            }
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ChannelError> {
        Ok(self.inbound.front().map_or(0, Vec::len))
    }

    fn read_available(&mut self) -> Result<Vec<u8>, ChannelError> {
        Ok(self.inbound.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_writes_and_serves_queued_replies() {
        let mut channel = MockChannel::new();
        channel.push_reply(b"ok".to_vec());

        channel.write_all(b"hello").unwrap();
        assert_eq!(channel.writes(), &[b"hello".to_vec()]);

        assert_eq!(channel.bytes_available().unwrap(), 2);
        assert_eq!(channel.read_available().unwrap(), b"ok");
        assert_eq!(channel.bytes_available().unwrap(), 0);
        assert!(channel.read_available().unwrap().is_empty());
    }

    #[test]
    fn test_mock_responder_generates_reply_per_write() {
        let mut channel = MockChannel::with_responder(|bytes| {
            if bytes == b"ping" {
                Some(b"pong".to_vec())
            } else {
                None
            }
        });

        channel.write_all(b"ping").unwrap();
        channel.write_all(b"other").unwrap();

        assert_eq!(channel.read_available().unwrap(), b"pong");
        assert_eq!(channel.bytes_available().unwrap(), 0);
    }
}
