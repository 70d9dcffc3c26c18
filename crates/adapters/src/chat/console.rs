//! Console transport: commands from stdin, replies on stdout

use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tootbridge_domain::{ChatError, ChatTransport, InboundMessage};

/// Channel name attached to every console message
pub const CONSOLE_CHANNEL: &str = "console";

/// Line-oriented transport over any async reader/writer pair
pub struct ConsoleTransport<R, W> {
    lines: Mutex<Lines<BufReader<R>>>,
    writer: Mutex<W>,
}

impl ConsoleTransport<Stdin, Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: Mutex::new(BufReader::new(reader).lines()),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_message(&self) -> Result<Option<InboundMessage>, ChatError> {
        let mut lines = self.lines.lock().await;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(InboundMessage::new(line, CONSOLE_CHANNEL)));
            }
        }

        Ok(None)
    }

    async fn send_message(&self, _channel: &str, text: &str) -> Result<(), ChatError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_non_empty_lines_until_eof() {
        let input: &[u8] = b"post new <http://x>\n\n   \npost publish 1\r\n";
        let console = ConsoleTransport::new(input, Vec::new());

        let first = console.next_message().await.unwrap();
        let second = console.next_message().await.unwrap();
        let end = console.next_message().await.unwrap();

        assert_eq!(
            first,
            Some(InboundMessage::new("post new <http://x>", CONSOLE_CHANNEL))
        );
        assert_eq!(
            second,
            Some(InboundMessage::new("post publish 1", CONSOLE_CHANNEL))
        );
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_send_writes_one_line_per_reply() {
        let input: &[u8] = b"";
        let console = ConsoleTransport::new(input, Vec::new());

        console.send_message("console", "[STATUS] one").await.unwrap();
        console.send_message("console", "[ERROR] two").await.unwrap();

        let output = String::from_utf8(console.into_writer()).unwrap();
        assert_eq!(output, "[STATUS] one\n[ERROR] two\n");
    }
}
