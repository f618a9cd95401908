use async_trait::async_trait;
use eyre::{Result, bail};
use tracing::debug;

use super::render::ask_and_print;
use super::{ClientContext, Command};
use chatq_core::app::SendOutcome;
use chatq_core::app::domain::ExchangeOutcome;

/// Ask one question within the stored session and exit.
pub struct AskCommand {
    pub context: ClientContext,
    pub question: String,
    /// Print tokens as they arrive rather than the whole answer at the end.
    pub stream: bool,
}

#[async_trait]
impl Command for AskCommand {
    async fn execute(&self) -> Result<()> {
        let mut conversation = self.context.conversation().await?;
        if let Some(session_id) = conversation.restore_session().await {
            debug!(%session_id, "Continuing stored session");
        }

        match ask_and_print(&mut conversation, &self.question, self.stream).await? {
            SendOutcome::Finished(ExchangeOutcome::Completed | ExchangeOutcome::Abandoned) => {
                Ok(())
            }
            SendOutcome::Finished(ExchangeOutcome::Failed) => {
                bail!("The assistant could not answer; see the log for details")
            }
            SendOutcome::Rejected => bail!("A question is required"),
        }
    }
}
