//! # MRJE CLI
//!
//! MR-JE 伺服定位命令行工具。
//!
//! ## 双模式
//!
//! ### One-shot 模式（适合脚本）
//!
//! ```bash
//! mrje-cli turn --angle 90 --clockwise
//! ```
//!
//! ### Shell 模式（适合调试，串口只打开一次）
//!
//! ```bash
//! $ mrje-cli shell
//! mrje> 90 1
//! mrje> 180 0
//! mrje> quit
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use mrje_driver::{Direction, MoveRequest, PositioningController, TransmissionSession};
use mrje_serial::PortChannel;

mod settings;
mod shell;

use settings::Settings;

/// MRJE CLI - MR-JE 伺服定位命令行工具
#[derive(Parser, Debug)]
#[command(name = "mrje-cli")]
#[command(about = "Command-line interface for MR-JE servo positioning", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/mrje/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 执行一次定位移动
    Turn {
        #[command(flatten)]
        args: TurnArgs,
    },

    /// 启动交互式 Shell
    Shell,

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct TurnArgs {
    /// 目标角度（0–360 度）
    #[arg(long)]
    angle: f64,

    /// 顺时针旋转（缺省为逆时针）
    #[arg(long)]
    clockwise: bool,

    /// 覆盖配置文件中的串口路径
    #[arg(long)]
    port: Option<String>,

    /// 覆盖速度（rpm）
    #[arg(long)]
    speed_rpm: Option<u16>,

    /// 覆盖加速时间（ms）
    #[arg(long)]
    acc_time_ms: Option<u32>,

    /// 覆盖到位轮询次数
    #[arg(long)]
    timeout_polls: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 显示当前配置
    Show,
    /// 显示配置文件路径
    Path,
}

/// 打开串口并构建定位控制器
///
/// 串口是作用域资源：控制器在任何退出路径上被 drop 时关闭端口。
fn open_controller(settings: &Settings) -> Result<PositioningController<PortChannel>> {
    let channel = PortChannel::open(&settings.port)
        .with_context(|| format!("Failed to open port {}", settings.port))?;
    Ok(PositioningController::new(TransmissionSession::new(
        channel,
    )))
}

/// 执行一次移动并报告结果
fn run_move(
    controller: &mut PositioningController<PortChannel>,
    settings: &Settings,
    angle: f64,
    clockwise: bool,
) -> Result<()> {
    let request = MoveRequest {
        target_angle: angle,
        direction: if clockwise {
            Direction::Clockwise
        } else {
            Direction::Counterclockwise
        },
        speed_rpm: settings.speed_rpm,
        acc_time_ms: settings.acc_time_ms,
        timeout_polls: settings.timeout_polls,
    };

    let outcome = controller.turn(&request)?;
    if outcome.arrived {
        println!("Target arrived after {} polls.", outcome.polls);
    } else {
        warn!(polls = outcome.polls, "target not arrived within poll timeout");
        println!("Target NOT arrived within {} polls.", outcome.polls);
    }
    Ok(())
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mrje_cli=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(settings::default_config_path);
    let mut settings = settings::load(&config_path)?;

    match cli.command {
        Commands::Turn { args } => {
            anyhow::ensure!(
                (0.0..=360.0).contains(&args.angle),
                "angle must be within 0..=360 degrees, got {}",
                args.angle
            );
            if let Some(port) = args.port {
                settings.port = port;
            }
            if let Some(speed) = args.speed_rpm {
                settings.speed_rpm = speed;
            }
            if let Some(acc) = args.acc_time_ms {
                settings.acc_time_ms = acc;
            }
            if let Some(timeout) = args.timeout_polls {
                settings.timeout_polls = timeout;
            }

            let mut controller = open_controller(&settings)?;
            run_move(&mut controller, &settings, args.angle, args.clockwise)
        },

        Commands::Shell => shell::run_shell(&settings),

        Commands::Config(ConfigCommand::Show) => {
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        },

        Commands::Config(ConfigCommand::Path) => {
            println!("{}", config_path.display());
            Ok(())
        },
    }
}
