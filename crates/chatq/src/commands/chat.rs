use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use super::render::{ask_and_print, write_transcript};
use super::{ClientContext, Command};
use chatq_core::app::domain::FeedbackKind;
use chatq_core::app::{Conversation, FeedbackOutcome};

const HELP: &str = "\
Type a question and press Enter. Commands:
  /good [comment]    rate the last answer as helpful
  /bad [comment]     rate the last answer as not helpful
  /handoff <email>   ask a person to follow up by email
  /reset             forget the current session
  /quit              leave";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Question(String),
    Feedback {
        kind: FeedbackKind,
        comment: Option<String>,
    },
    Handoff {
        email: String,
    },
    Reset,
    Help,
    Quit,
    Invalid(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Question(line.to_string());
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        match name {
            "good" => Self::Feedback {
                kind: FeedbackKind::Positive,
                comment: argument,
            },
            "bad" => Self::Feedback {
                kind: FeedbackKind::Negative,
                comment: argument,
            },
            "handoff" => match argument {
                Some(email) => Self::Handoff { email },
                None => Self::Invalid("usage: /handoff <email>".to_string()),
            },
            "reset" => Self::Reset,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command /{other}; try /help")),
        }
    }
}

pub struct ChatCommand {
    pub context: ClientContext,
}

#[async_trait]
impl Command for ChatCommand {
    async fn execute(&self) -> Result<()> {
        let mut conversation = self.context.conversation().await?;
        conversation.resume().await;

        let mut stdout = std::io::stdout();
        if conversation.state().messages.is_empty() {
            writeln!(stdout, "{HELP}\n")?;
        } else {
            write_transcript(&mut stdout, &conversation.state().messages)?;
            writeln!(stdout)?;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            write!(stdout, "> ")?;
            stdout.flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                writeln!(stdout)?;
                break;
            };

            match ChatInput::parse(&line) {
                ChatInput::Empty => {}
                ChatInput::Question(question) => {
                    ask_and_print(&mut conversation, &question, true).await?;
                }
                ChatInput::Feedback { kind, comment } => {
                    let reply = rate_last_answer(&mut conversation, kind, comment).await;
                    writeln!(stdout, "{reply}")?;
                }
                ChatInput::Handoff { email } => {
                    match conversation.request_handoff(None, &email, None).await {
                        Ok(ticket) => writeln!(
                            stdout,
                            "Handoff requested (ticket #{}). Someone will contact {email}.",
                            ticket.id
                        )?,
                        Err(e) => writeln!(stdout, "Handoff failed: {e}")?,
                    }
                }
                ChatInput::Reset => {
                    conversation.reset_session().await;
                    writeln!(stdout, "Session cleared; the next question starts a new one.")?;
                }
                ChatInput::Help => writeln!(stdout, "{HELP}")?,
                ChatInput::Quit => break,
                ChatInput::Invalid(reason) => writeln!(stdout, "{reason}")?,
            }
        }

        info!(session_id = ?conversation.session_id(), "Chat ended");
        Ok(())
    }
}

async fn rate_last_answer(
    conversation: &mut Conversation,
    kind: FeedbackKind,
    comment: Option<String>,
) -> String {
    let Some(index) = conversation.state().last_rateable_index() else {
        return "There is no answer to rate yet.".to_string();
    };
    match conversation.submit_feedback(index, kind, comment).await {
        FeedbackOutcome::Recorded => "Thanks for the feedback.".to_string(),
        FeedbackOutcome::Rejected(rejection) => format!("Feedback not sent: {rejection}."),
        FeedbackOutcome::Failed => "Could not send feedback; please try again.".to_string(),
    }
}
