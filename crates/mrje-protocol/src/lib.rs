//! # MRJE Protocol
//!
//! MR-JE 伺服放大器串口协议定义（无硬件依赖）
//!
//! 实现三菱通用 AC 伺服协议的 ASCII 帧编解码：
//!
//! - `CommandFrame`: 指令帧构建（含输入校验与编码）
//! - `decode`: 响应帧扫描、校验和验证、应答判定
//! - `checksum`: 加和校验（低 8 位，两位大写十六进制）
//!
//! ## 帧格式
//!
//! 指令帧（主机 → 放大器）：
//!
//! ```text
//! SOH  station  command(2)  STX  data_no(2)  payload(2n)  ETX  checksum(2)
//! ```
//!
//! 校验和覆盖 station 至 ETX（含）之间的全部字节。
//!
//! 响应帧（放大器 → 主机）：
//!
//! ```text
//! STX  station  status  data(n)  ETX  checksum(2)
//! ```
//!
//! status 为 `'A'` 表示正常应答；校验和覆盖 STX 之后至 ETX（含）。
//! payload 与 data 均为大写十六进制 ASCII 字符，保留字节
//! （SOH/STX/ETX/EOT）在结构上不会出现在数据区内。

use thiserror::Error;

/// 帧起始标记（Start of Head）
pub const SOH: u8 = 0x01;
/// 数据区起始标记（Start of Text）
pub const STX: u8 = 0x02;
/// 数据区结束标记（End of Text）
pub const ETX: u8 = 0x03;
/// 传输结束控制字节，用于提示放大器刷新/重发输出缓冲
pub const EOT: u8 = 0x04;
/// 正常应答状态字节
pub const ACK: u8 = b'A';
/// 默认站号（点对点链路上放大器固定为 0 号站）
pub const DEFAULT_STATION: u8 = b'0';

/// 累计位置响应（指令 `01`/数据号 `80`）中位置字段在 data 区内的范围。
///
/// data 区共 12 个十六进制字符：前 4 位为状态显示，后 8 位为累计位置。
pub const POSITION_FIELD: core::ops::Range<usize> = 4..12;

/// 协议编解码错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 指令帧输入违反十六进制/长度约定（调用方错误，不重试）
    #[error("Invalid frame input for {field}: {value:?}")]
    InvalidFrameInput { field: &'static str, value: String },

    /// 接收缓冲中没有完整的帧（缺少 ETX 或其后的两个校验字节）
    #[error("Incomplete frame in receive buffer")]
    FrameIncomplete,

    /// 校验和不匹配
    #[error("Frame checksum mismatch: expected {expected}, got {actual}")]
    FrameCorrupt { expected: String, actual: String },

    /// 放大器返回否定应答（status 字节非 `'A'`）
    #[error("Negative acknowledge from amplifier (status byte 0x{status:02X})")]
    FrameNegativeAck { status: u8 },
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn is_upper_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'A'..=b'F').contains(&b)
}

/// 计算加和校验：`span` 所有字节之和的低 8 位，渲染为两位大写十六进制。
pub fn checksum(span: &[u8]) -> [u8; 2] {
    let sum: u32 = span.iter().map(|&b| u32::from(b)).sum();
    let low = (sum & 0xFF) as u8;
    [
        HEX_UPPER[usize::from(low >> 4)],
        HEX_UPPER[usize::from(low & 0x0F)],
    ]
}

/// 指令帧
///
/// 一次请求/响应交换中主机侧的完整指令：站号、指令码、数据号与
/// 十六进制 payload。构造时校验输入约定，编码本身不会失败。
///
/// # 示例
///
/// ```
/// use mrje_protocol::CommandFrame;
///
/// // 进入测试定位模式
/// let frame = CommandFrame::new("8B", "00", "0002").unwrap();
/// let wire = frame.encode();
/// assert_eq!(wire[0], 0x01); // SOH
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    station: u8,
    command: [u8; 2],
    data_no: [u8; 2],
    payload: Vec<u8>,
}

impl CommandFrame {
    /// 以默认站号构建指令帧
    pub fn new(command: &str, data_no: &str, payload: &str) -> Result<Self, ProtocolError> {
        Self::with_station(DEFAULT_STATION, command, data_no, payload)
    }

    /// 以指定站号构建指令帧
    ///
    /// # 错误
    ///
    /// 任一字段违反约定时返回 `ProtocolError::InvalidFrameInput`：
    /// - `station` 必须是单个 ASCII 数字
    /// - `command` / `data_no` 必须是恰好 2 位大写十六进制字符
    /// - `payload` 必须为空或偶数长度的大写十六进制字符串（字节对齐）
    pub fn with_station(
        station: u8,
        command: &str,
        data_no: &str,
        payload: &str,
    ) -> Result<Self, ProtocolError> {
        if !station.is_ascii_digit() {
            return Err(ProtocolError::InvalidFrameInput {
                field: "station",
                value: (station as char).to_string(),
            });
        }
        let command = two_hex("command", command)?;
        let data_no = two_hex("data_no", data_no)?;
        if payload.len() % 2 != 0 || !payload.bytes().all(is_upper_hex) {
            return Err(ProtocolError::InvalidFrameInput {
                field: "payload",
                value: payload.to_string(),
            });
        }

        Ok(Self {
            station,
            command,
            data_no,
            payload: payload.as_bytes().to_vec(),
        })
    }

    /// 站号
    pub fn station(&self) -> u8 {
        self.station
    }

    /// 指令码（2 位十六进制）
    pub fn command(&self) -> &str {
        // 构造时已校验为 ASCII
        core::str::from_utf8(&self.command).unwrap_or("??")
    }

    /// 数据号（2 位十六进制）
    pub fn data_no(&self) -> &str {
        core::str::from_utf8(&self.data_no).unwrap_or("??")
    }

    /// 编码为线上字节序列（含 SOH 头与校验和）
    ///
    /// 确定性、无副作用；同一帧多次编码产生完全相同的字节。
    pub fn encode(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(11 + self.payload.len());
        msg.push(SOH);
        msg.push(self.station);
        msg.extend_from_slice(&self.command);
        msg.push(STX);
        msg.extend_from_slice(&self.data_no);
        msg.extend_from_slice(&self.payload);
        msg.push(ETX);
        let ck = checksum(&msg[1..]);
        msg.extend_from_slice(&ck);
        msg
    }
}

fn two_hex(field: &'static str, value: &str) -> Result<[u8; 2], ProtocolError> {
    let bytes = value.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(|&b| is_upper_hex(b)) {
        return Err(ProtocolError::InvalidFrameInput {
            field,
            value: value.to_string(),
        });
    }
    Ok([bytes[0], bytes[1]])
}

/// 已验证的响应帧
///
/// `decode` 成功后得到：校验和已匹配且 status 为正常应答。
/// `data` 是 status 字节与 ETX 之间的原始字符（不含两者）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// 站号回显
    pub station: u8,
    /// 状态字节（恒为 `'A'`，保留供诊断输出）
    pub status: u8,
    /// 数据区字符
    pub data: Vec<u8>,
}

impl Response {
    /// 累计位置响应中的 8 位十六进制位置字段
    ///
    /// 对 data 区做边界检查：响应短于固定布局时返回
    /// `ProtocolError::FrameIncomplete`，而不是盲目切片。
    pub fn position_field(&self) -> Result<&[u8], ProtocolError> {
        self.data
            .get(POSITION_FIELD)
            .ok_or(ProtocolError::FrameIncomplete)
    }
}

/// 从接收缓冲中解析一个响应帧
///
/// 扫描 STX 并在其后寻找 ETX，捕获区间为 STX 至 ETX 加上紧随的两个
/// 校验字节。若在遇到 ETX 之前出现新的 STX，丢弃已积累的字节并从新
/// 标记重新捕获，以便从接收缓冲中相互重叠/残缺的帧里恢复。
///
/// # 错误
///
/// - `FrameIncomplete`: 缓冲中没有 "STX … ETX + 2 校验字节" 的完整捕获
/// - `FrameCorrupt`: 计算校验和与接收校验和不一致
/// - `FrameNegativeAck`: status 字节不是 `'A'`
pub fn decode(raw: &[u8]) -> Result<Response, ProtocolError> {
    let mut start = None;
    let mut end = None;
    for (i, &b) in raw.iter().enumerate() {
        if b == STX {
            // 新 STX：重新开始捕获
            start = Some(i);
        } else if b == ETX && start.is_some() {
            end = Some(i);
            break;
        }
    }
    let (Some(s), Some(e)) = (start, end) else {
        return Err(ProtocolError::FrameIncomplete);
    };
    let received = raw.get(e + 1..e + 3).ok_or(ProtocolError::FrameIncomplete)?;

    // 校验和覆盖 STX 之后至 ETX（含）
    let span = &raw[s..=e];
    let expected = checksum(&span[1..]);
    if received != expected {
        return Err(ProtocolError::FrameCorrupt {
            expected: String::from_utf8_lossy(&expected).into_owned(),
            actual: String::from_utf8_lossy(received).into_owned(),
        });
    }

    // 最短有效捕获：STX + station + status + ETX
    if span.len() < 4 {
        return Err(ProtocolError::FrameIncomplete);
    }
    let station = span[1];
    let status = span[2];
    if status != ACK {
        return Err(ProtocolError::FrameNegativeAck { status });
    }

    Ok(Response {
        station,
        status,
        data: span[3..span.len() - 1].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造一个校验和正确的正常应答响应
    fn ack_response(data: &str) -> Vec<u8> {
        let mut buf = vec![STX, b'0', ACK];
        buf.extend_from_slice(data.as_bytes());
        buf.push(ETX);
        let ck = checksum(&buf[1..]);
        buf.extend_from_slice(&ck);
        buf
    }

    #[test]
    fn test_checksum_low_byte_rendering() {
        // 和为 0x1D1，取低字节 0xD1
        assert_eq!(checksum(&[0xD1, 0x00, 0x01, 0x00, 0xFF]), *b"D1");
        // 低字节小于 0x10 时必须渲染前导零
        assert_eq!(checksum(&[0x0A]), *b"0A");
        assert_eq!(checksum(&[]), *b"00");
    }

    #[test]
    fn test_encode_enter_test_mode_golden() {
        // 逐字节对照手算结果：01 '0' '8' 'B' 02 '0' '0' '0' '0' '0' '2' 03 'D' '1'
        let frame = CommandFrame::new("8B", "00", "0002").unwrap();
        let mut expected = vec![SOH];
        expected.extend_from_slice(b"08B");
        expected.push(STX);
        expected.extend_from_slice(b"000002");
        expected.push(ETX);
        expected.extend_from_slice(b"D1");
        assert_eq!(frame.encode(), expected);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = CommandFrame::new("01", "80", "").unwrap();
        let wire = frame.encode();
        assert_eq!(wire[0], SOH);
        assert_eq!(&wire[1..4], b"001");
        assert_eq!(wire[4], STX);
        assert_eq!(&wire[5..7], b"80");
        assert_eq!(wire[7], ETX);
        assert_eq!(wire[8..10], checksum(&wire[1..8]));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let frame = CommandFrame::new("A0", "10", "01F4").unwrap();
        assert_eq!(frame.encode(), frame.encode());
    }

    #[test]
    fn test_invalid_frame_input() {
        assert!(matches!(
            CommandFrame::new("8", "00", ""),
            Err(ProtocolError::InvalidFrameInput { field: "command", .. })
        ));
        assert!(matches!(
            CommandFrame::new("8B", "0g", ""),
            Err(ProtocolError::InvalidFrameInput { field: "data_no", .. })
        ));
        // payload 奇数长度（非字节对齐）
        assert!(matches!(
            CommandFrame::new("8B", "00", "002"),
            Err(ProtocolError::InvalidFrameInput { field: "payload", .. })
        ));
        // payload 小写十六进制不接受
        assert!(matches!(
            CommandFrame::new("8B", "00", "00ff"),
            Err(ProtocolError::InvalidFrameInput { field: "payload", .. })
        ));
        assert!(matches!(
            CommandFrame::with_station(b'x', "8B", "00", ""),
            Err(ProtocolError::InvalidFrameInput { field: "station", .. })
        ));
    }

    #[test]
    fn test_decode_valid_response() {
        let resp = decode(&ack_response("0000FFFF8000")).unwrap();
        assert_eq!(resp.station, b'0');
        assert_eq!(resp.status, ACK);
        assert_eq!(resp.data, b"0000FFFF8000");
        assert_eq!(resp.position_field().unwrap(), b"FFFF8000");
    }

    #[test]
    fn test_decode_empty_data() {
        let resp = decode(&ack_response("")).unwrap();
        assert!(resp.data.is_empty());
        assert_eq!(resp.position_field(), Err(ProtocolError::FrameIncomplete));
    }

    #[test]
    fn test_decode_restarts_capture_on_new_stx() {
        // 残缺帧的前半部分遗留在缓冲中，随后到达完整帧：
        // 捕获必须在新 STX 处重新开始
        let mut buf = vec![STX, b'0', b'A', b'1', b'2'];
        buf.extend_from_slice(&ack_response("00AA"));
        let resp = decode(&buf).unwrap();
        assert_eq!(resp.data, b"00AA");
    }

    #[test]
    fn test_decode_skips_leading_garbage() {
        let mut buf = vec![0x00, 0xFF, EOT];
        buf.extend_from_slice(&ack_response("0002"));
        assert_eq!(decode(&buf).unwrap().data, b"0002");
    }

    #[test]
    fn test_decode_incomplete() {
        // 无 ETX
        assert_eq!(
            decode(&[STX, b'0', b'A', b'1']),
            Err(ProtocolError::FrameIncomplete)
        );
        // ETX 在 STX 之前，且其后没有新的完整帧
        assert_eq!(
            decode(&[ETX, b'1', b'2', STX, b'0']),
            Err(ProtocolError::FrameIncomplete)
        );
        // ETX 后校验字节不足
        let full = ack_response("00");
        assert_eq!(
            decode(&full[..full.len() - 1]),
            Err(ProtocolError::FrameIncomplete)
        );
        // 空缓冲
        assert_eq!(decode(&[]), Err(ProtocolError::FrameIncomplete));
    }

    #[test]
    fn test_decode_corrupt_checksum() {
        let mut buf = ack_response("0102");
        let last = buf.len() - 1;
        buf[last] = if buf[last] == b'0' { b'1' } else { b'0' };
        assert!(matches!(decode(&buf), Err(ProtocolError::FrameCorrupt { .. })));
    }

    #[test]
    fn test_decode_negative_ack() {
        // status 字节非 'A'，校验和本身正确
        let mut buf = vec![STX, b'0', b'E', b'0', b'1', ETX];
        let ck = checksum(&buf[1..]);
        buf.extend_from_slice(&ck);
        assert_eq!(
            decode(&buf),
            Err(ProtocolError::FrameNegativeAck { status: b'E' })
        );
    }

    #[test]
    fn test_single_bit_corruption_never_accepted() {
        // 捕获区间及校验字节内任何单比特翻转都不得通过验证
        let valid = ack_response("0000FFFF8000");
        assert!(decode(&valid).is_ok());

        for i in 0..valid.len() {
            for bit in 0..8 {
                let mut corrupted = valid.clone();
                corrupted[i] ^= 1 << bit;
                assert!(
                    decode(&corrupted).is_err(),
                    "false accept at byte {} bit {}",
                    i,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_roundtrip_command_through_response_codec() {
        // 指令帧的数据区与响应帧共用同一套校验和约定：
        // 用响应布局承载同样的 payload 验证编解码互逆
        let payload = "00001388";
        let resp = decode(&ack_response(payload)).unwrap();
        assert_eq!(resp.data, payload.as_bytes());
    }
}
