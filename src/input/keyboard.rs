//! Terminal keyboard source
//!
//! A terminal only reports whole lines, so every submitted line counts as one key
//! release. Empty lines are Enter, `w`/`s` navigate.

use super::{InputEvent, Key};
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maps one submitted terminal line to the key it stands for
pub fn key_from_line(line: &str) -> Key {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Key::Enter;
    }
    if line.trim().is_empty() {
        return Key::Space;
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "w" | "up" => Key::Up,
        "s" | "down" => Key::Down,
        other => Key::Char(other.chars().next().unwrap_or(' ')),
    }
}

/// Spawns the stdin reader thread
///
/// Reading stdin blocks, so the reader lives on its own detached thread and never
/// holds up runtime shutdown. It stops after the next line once `shutdown` fires.
pub fn spawn_stdin_reader(
    event_sender: mpsc::Sender<InputEvent>,
    shutdown: CancellationToken,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    info!("Starting terminal keyboard reader");
    std::thread::Builder::new()
        .name("keyboard-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                if shutdown.is_cancelled() {
                    break;
                }
                match line {
                    Ok(line) => {
                        let key = key_from_line(&line);
                        debug!("Terminal key released: {:?}", key);
                        if event_sender.blocking_send(InputEvent::key_released(key)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            info!("Keyboard reader stopped");
        })
}
