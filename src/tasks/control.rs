use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::ControlCommand;

/// Reads one command per line from `input` and forwards the parsed commands.
/// Returns when the input closes, the receiver goes away, or on cancellation.
pub async fn run<R>(input: R, to_frames: Sender<ControlCommand>, cancel: CancellationToken) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting control task");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("control input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match ControlCommand::parse(&line) {
                    Some(cmd) => {
                        info!(?cmd, "control command");
                        if to_frames.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    None => warn!(
                        line = line.trim(),
                        "unknown command (next, prev, reset, pause, play, toggle, auto on|off, shuffle)"
                    ),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn forwards_known_commands_until_eof() {
        let input = BufReader::new(&b"next\n\nbogus\nauto off\nshuffle\n"[..]);
        let (tx, mut rx) = mpsc::channel(8);
        run(input, tx, CancellationToken::new()).await.unwrap();

        let mut got = Vec::new();
        while let Some(cmd) = rx.recv().await {
            got.push(cmd);
        }
        assert_eq!(
            got,
            vec![
                ControlCommand::Next,
                ControlCommand::AutoAdvance(false),
                ControlCommand::Shuffle
            ]
        );
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let (_keep_open, reader) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run(BufReader::new(reader), tx, cancel).await.unwrap();
    }
}
