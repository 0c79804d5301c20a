//! 定位控制器
//!
//! 把一次移动请求实现为通过传输会话的有序指令交换序列（测试定位
//! 模式），随后轮询累计位置确认到位。
//!
//! 序列是线性状态机，除成败传播外没有分支：任一步骤的交换失败都是
//! 致命的，但在重新抛出之前始终尽力执行两步收尾（退出测试模式 +
//! EOT），使放大器回到安全的非测试状态。
//!
//! 轮询超时不是错误：移动以 `arrived = false` 报告。

use std::time::Duration;

use mrje_protocol::Response;
use mrje_serial::SerialChannel;
use tracing::{debug, info, trace, warn};

use crate::config::DriverConfig;
use crate::error::{MoveError, SessionError};
use crate::session::TransmissionSession;

/// 编码器分辨率：每转 2^17 脉冲
const PULSES_PER_REV: f64 = 131072.0;

/// 复位累计位置 / 启动移动所需的固定确认码
const CONFIRM_CODE: &str = "1EA5";

/// 旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    Counterclockwise,
}

/// 一次绝对定位移动的完整请求
///
/// 每次调用构造一次、整体消费，不跨移动共享任何可变状态。角度与
/// 配置的合法性由调用方在构造前保证。
#[derive(Debug, Clone)]
pub struct MoveRequest {
    /// 目标角度（0–360 度）
    pub target_angle: f64,
    /// 旋转方向
    pub direction: Direction,
    /// 速度（rpm）
    pub speed_rpm: u16,
    /// 加速时间（ms）
    pub acc_time_ms: u32,
    /// 到位轮询的最大次数
    pub timeout_polls: u32,
}

impl MoveRequest {
    /// 角度折算的脉冲距离（无符号幅值）
    pub fn pulse_distance(&self) -> u32 {
        (self.target_angle / 360.0 * PULSES_PER_REV).round() as u32
    }

    /// 带符号目标位置的 32 位二进制补码表示
    ///
    /// 顺时针为负方向：与放大器上报的累计位置同一约定。
    pub fn signed_target(&self) -> u32 {
        let distance = self.pulse_distance() as i32;
        let signed = match self.direction {
            Direction::Clockwise => distance.wrapping_neg(),
            Direction::Counterclockwise => distance,
        };
        signed as u32
    }
}

/// 移动结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// 是否在轮询预算内到达目标
    pub arrived: bool,
    /// 实际消耗的轮询次数
    pub polls: u32,
}

/// 定位序列中的步骤（用于失败报告）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStep {
    EnterTestMode,
    SetSpeed,
    SetAccelTime,
    SetDistance,
    SetDirection,
    ArmServo,
    PrimeStatusRead,
    ResetCumulativePosition,
    Start,
    PollArrival,
    ExitTestMode,
    SendEot,
}

impl std::fmt::Display for MoveStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MoveStep::EnterTestMode => "EnterTestMode",
            MoveStep::SetSpeed => "SetSpeed",
            MoveStep::SetAccelTime => "SetAccelTime",
            MoveStep::SetDistance => "SetDistance",
            MoveStep::SetDirection => "SetDirection",
            MoveStep::ArmServo => "ArmServo",
            MoveStep::PrimeStatusRead => "PrimeStatusRead",
            MoveStep::ResetCumulativePosition => "ResetCumulativePosition",
            MoveStep::Start => "Start",
            MoveStep::PollArrival => "PollArrival",
            MoveStep::ExitTestMode => "ExitTestMode",
            MoveStep::SendEot => "SendEot",
        };
        f.write_str(name)
    }
}

/// 定位控制器
pub struct PositioningController<C: SerialChannel> {
    session: TransmissionSession<C>,
    poll_interval: Duration,
}

impl<C: SerialChannel> PositioningController<C> {
    /// 包装一个传输会话；轮询间隔取自会话的时序配置
    pub fn new(session: TransmissionSession<C>) -> Self {
        let poll_interval = session.config().poll_interval;
        Self {
            session,
            poll_interval,
        }
    }

    /// 底层会话
    pub fn session_mut(&mut self) -> &mut TransmissionSession<C> {
        &mut self.session
    }

    /// 交还底层会话
    pub fn into_session(self) -> TransmissionSession<C> {
        self.session
    }

    /// 执行一次绝对定位移动并确认到位
    ///
    /// 返回到位与否及实际轮询次数。轮询超时以 `arrived = false` 报告，
    /// 不作为错误；任一交换失败则在尽力收尾后以 `MoveError` 上报失败
    /// 的步骤与清理结果。
    pub fn turn(&mut self, request: &MoveRequest) -> Result<MoveOutcome, MoveError> {
        info!(
            angle = request.target_angle,
            direction = ?request.direction,
            "starting positioning move"
        );

        match self.run_sequence(request) {
            Ok(outcome) => {
                // 步骤 11-12：无论到位与否都退出测试模式并发送 EOT
                if let Err(source) = self.session.exchange("8B", "00", "0000") {
                    let cleanup_ok = self.session.send_eot().is_ok();
                    return Err(MoveError {
                        step: MoveStep::ExitTestMode,
                        cleanup_ok,
                        source,
                    });
                }
                if let Err(source) = self.session.send_eot() {
                    return Err(MoveError {
                        step: MoveStep::SendEot,
                        cleanup_ok: false,
                        source,
                    });
                }
                if outcome.arrived {
                    info!(polls = outcome.polls, "target arrived");
                } else {
                    warn!(polls = outcome.polls, "target not arrived within poll timeout");
                }
                Ok(outcome)
            },
            Err((step, source)) => {
                let cleanup_ok = self.cleanup();
                Err(MoveError {
                    step,
                    cleanup_ok,
                    source,
                })
            },
        }
    }

    /// 步骤 1–10
    fn run_sequence(
        &mut self,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, (MoveStep, SessionError)> {
        let speed = format!("{:04X}", request.speed_rpm);
        let acc_time = format!("{:08X}", request.acc_time_ms);
        let distance = format!("{:08X}", request.pulse_distance());
        let direction = match request.direction {
            Direction::Clockwise => "0001",
            Direction::Counterclockwise => "0000",
        };
        let target = format!("{:08X}", request.signed_target());

        self.step(MoveStep::EnterTestMode, "8B", "00", "0002")?;
        self.step(MoveStep::SetSpeed, "A0", "10", &speed)?;
        self.step(MoveStep::SetAccelTime, "A0", "11", &acc_time)?;
        self.step(MoveStep::SetDistance, "A0", "20", &distance)?;
        self.step(MoveStep::SetDirection, "A0", "21", direction)?;
        // 使能 SON 以及正/负限位信号
        self.step(MoveStep::ArmServo, "92", "00", "00000007")?;
        // 读一次累计位置，清掉陈旧的状态显示
        self.step(MoveStep::PrimeStatusRead, "01", "80", "")?;
        self.step(MoveStep::ResetCumulativePosition, "81", "00", CONFIRM_CODE)?;
        self.step(MoveStep::Start, "A0", "40", CONFIRM_CODE)?;

        self.poll_arrival(request.timeout_polls, &target)
    }

    fn step(
        &mut self,
        step: MoveStep,
        command: &str,
        data_no: &str,
        payload: &str,
    ) -> Result<Response, (MoveStep, SessionError)> {
        debug!(%step, command, data_no, payload, "positioning step");
        self.session
            .exchange(command, data_no, payload)
            .map_err(|source| (step, source))
    }

    /// 步骤 10：轮询累计位置直至到位或超出轮询预算
    fn poll_arrival(
        &mut self,
        timeout_polls: u32,
        target: &str,
    ) -> Result<MoveOutcome, (MoveStep, SessionError)> {
        let mut polls = 0;
        while polls < timeout_polls {
            let response = self.step(MoveStep::PollArrival, "01", "80", "")?;
            polls += 1;

            let position = response
                .position_field()
                .map_err(|e| (MoveStep::PollArrival, SessionError::Frame(e)))?;
            if position == target.as_bytes() {
                return Ok(MoveOutcome {
                    arrived: true,
                    polls,
                });
            }
            trace!(
                position = %String::from_utf8_lossy(position),
                target,
                poll = polls,
                "not arrived yet"
            );
            spin_sleep::sleep(self.poll_interval);
        }
        Ok(MoveOutcome {
            arrived: false,
            polls,
        })
    }

    /// 失败后的尽力收尾：退出测试模式 + EOT
    fn cleanup(&mut self) -> bool {
        warn!("move failed, attempting best-effort cleanup");
        let exit_ok = self.session.exchange("8B", "00", "0000").is_ok();
        let eot_ok = self.session.send_eot().is_ok();
        exit_ok && eot_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(angle: f64, direction: Direction) -> MoveRequest {
        MoveRequest {
            target_angle: angle,
            direction,
            speed_rpm: 500,
            acc_time_ms: 5000,
            timeout_polls: 50,
        }
    }

    #[test]
    fn test_pulse_distance_rounding() {
        assert_eq!(request(90.0, Direction::Clockwise).pulse_distance(), 32768);
        assert_eq!(
            request(180.0, Direction::Counterclockwise).pulse_distance(),
            65536
        );
        assert_eq!(request(360.0, Direction::Clockwise).pulse_distance(), 131072);
        assert_eq!(request(0.0, Direction::Clockwise).pulse_distance(), 0);
        // 非整除角度取最近脉冲
        assert_eq!(request(1.0, Direction::Clockwise).pulse_distance(), 364);
    }

    #[test]
    fn test_signed_target_twos_complement() {
        // 顺时针 90 度：-32768 的补码
        assert_eq!(
            request(90.0, Direction::Clockwise).signed_target(),
            0xFFFF_8000
        );
        // 逆时针 180 度：+65536
        assert_eq!(
            request(180.0, Direction::Counterclockwise).signed_target(),
            0x0001_0000
        );
    }

    #[test]
    fn test_move_step_display() {
        assert_eq!(MoveStep::Start.to_string(), "Start");
        assert_eq!(
            MoveStep::ResetCumulativePosition.to_string(),
            "ResetCumulativePosition"
        );
    }
}
