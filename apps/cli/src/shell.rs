//! 交互式 Shell
//!
//! 串口在整个 shell 会话期间打开一次，每行命令执行一次定位移动。

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::settings::Settings;
use crate::{open_controller, run_move};

/// 解析 `"<degree> <clockwise>"` 命令行
///
/// degree 为 0–360 的角度，clockwise 为 1（顺时针）或 0（逆时针）。
fn parse_turn_line(line: &str) -> Result<(f64, bool)> {
    let mut parts = line.split_whitespace();
    let (Some(degree), Some(clockwise), None) = (parts.next(), parts.next(), parts.next()) else {
        anyhow::bail!("expected \"<degree> <clockwise>\"");
    };
    let degree: f64 = degree
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid degree {:?}", degree))?;
    anyhow::ensure!(
        (0.0..=360.0).contains(&degree),
        "degree must be within 0..=360"
    );
    let clockwise = match clockwise {
        "1" => true,
        "0" => false,
        other => anyhow::bail!("clockwise must be 1 or 0, got {:?}", other),
    };
    Ok((degree, clockwise))
}

pub fn run_shell(settings: &Settings) -> Result<()> {
    let mut controller = open_controller(settings)?;
    let mut editor = DefaultEditor::new()?;

    println!("Enter \"<degree> <clockwise>\" (degree: 0-360, clockwise: 1/0) or \"quit\".");
    loop {
        match editor.readline("mrje> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" {
                    break;
                }
                let _ = editor.add_history_entry(line);
                match parse_turn_line(line) {
                    Ok((degree, clockwise)) => {
                        if let Err(err) = run_move(&mut controller, settings, degree, clockwise) {
                            eprintln!("Move failed: {:#}", err);
                        }
                    },
                    Err(err) => eprintln!("{}", err),
                }
            },
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
