//! Interactive read-reply loop

use super::TurnExecutor;
use crate::session::Session;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Typed alone on a line (any case), ends the session
pub const EXIT_COMMAND: &str = "exit";

const PROMPT: &str = "You: ";

/// What happened over a whole session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub turns: usize,
    pub failed_turns: usize,
}

/// Read lines from `input` and answer each one until the exit command or
/// end of input.
///
/// A failed turn is reported on `output` and the loop keeps going; only I/O
/// errors on the streams themselves end it early. Blank lines are skipped.
/// Bytes that are not valid UTF-8 become U+FFFD rather than ending the session.
pub async fn run_session<R, W>(
    executor: &TurnExecutor,
    session: &mut Session,
    mut input: R,
    mut output: W,
) -> std::io::Result<LoopSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut summary = LoopSummary::default();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            output.write_all(b"\n").await?;
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let text = line.trim();
        if text.eq_ignore_ascii_case(EXIT_COMMAND) {
            break;
        }
        if text.is_empty() {
            continue;
        }

        summary.turns += 1;
        let rendered = match executor.execute_turn(session, text).await {
            Ok(reply) => format!("Assistant: {reply}\n"),
            Err(e) => {
                summary.failed_turns += 1;
                format!("Error: {e}\n")
            }
        };
        output.write_all(rendered.as_bytes()).await?;
    }

    output.flush().await?;
    tracing::info!(
        session_id = %session.id(),
        turns = summary.turns,
        failed_turns = summary.failed_turns,
        messages = session.len(),
        "Session ended"
    );
    Ok(summary)
}
