use async_trait::async_trait;
use eyre::Result;
use std::io::Write;

use super::render::write_transcript;
use super::{ClientContext, Command};

/// Print the conversation stored for the current session.
pub struct HistoryCommand {
    pub context: ClientContext,
}

#[async_trait]
impl Command for HistoryCommand {
    async fn execute(&self) -> Result<()> {
        let mut conversation = self.context.conversation().await?;
        conversation.resume().await;

        let mut stdout = std::io::stdout();
        match conversation.session_id() {
            None => writeln!(stdout, "No stored session.")?,
            Some(session_id) => {
                writeln!(stdout, "Session {session_id}\n")?;
                write_transcript(&mut stdout, &conversation.state().messages)?;
            }
        }
        Ok(())
    }
}
