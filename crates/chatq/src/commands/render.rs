//! Plain-text rendering of exchanges and transcripts.

use eyre::Result;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use chatq_core::app::domain::{ExchangeOutcome, Message, Role, StreamEvent};
use chatq_core::app::{Conversation, SendOutcome};

/// Run one exchange and print the reply, token by token when `stream` is
/// set. Ctrl+C abandons the exchange but keeps the program running.
pub async fn ask_and_print(
    conversation: &mut Conversation,
    question: &str,
    stream: bool,
) -> Result<SendOutcome> {
    let first_new = conversation.state().messages.len();

    let token = CancellationToken::new();
    let interrupt = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let outcome = if stream {
        let mut live = std::io::stdout();
        conversation
            .send_with(question, token, |event, _| {
                if let StreamEvent::Token { text } = event
                    && let Err(e) = write!(live, "{text}").and_then(|()| live.flush())
                {
                    debug!(error = %e, "Could not echo token");
                }
            })
            .await
    } else {
        conversation.ask(question, token).await
    };
    watcher.abort();

    if outcome == SendOutcome::Rejected {
        debug!("Question not sent");
    }
    let new_messages = conversation.state().messages.get(first_new..).unwrap_or_default();
    write_outcome(&mut std::io::stdout(), new_messages, outcome, stream)?;
    Ok(outcome)
}

/// Print the end of an exchange: the answer unless it was already echoed,
/// then its sources and any notices. `new_messages` starts at the question.
pub fn write_outcome(
    out: &mut impl Write,
    new_messages: &[Message],
    outcome: SendOutcome,
    echoed: bool,
) -> std::io::Result<()> {
    let answer = new_messages.get(1);
    let content = answer.map_or("", |a| a.content.as_str());
    if echoed && outcome != SendOutcome::Rejected {
        writeln!(out)?;
    }
    match outcome {
        SendOutcome::Rejected => {
            writeln!(out, "(nothing sent: empty question or an answer still pending)")?;
            return Ok(());
        }
        SendOutcome::Finished(ExchangeOutcome::Completed) => {
            if !echoed {
                writeln!(out, "{content}")?;
            }
        }
        SendOutcome::Finished(ExchangeOutcome::Failed) => writeln!(out, "{content}")?,
        SendOutcome::Finished(ExchangeOutcome::Abandoned) => writeln!(out, "(cancelled)")?,
    }

    if let Some(answer) = answer {
        write_sources(out, answer)?;
    }
    for notice in new_messages.iter().skip(2) {
        writeln!(out, "{}", notice.content)?;
    }
    Ok(())
}

pub fn write_sources(out: &mut impl Write, message: &Message) -> std::io::Result<()> {
    if message.sources.is_empty() {
        return Ok(());
    }
    writeln!(out, "Sources:")?;
    for source in &message.sources {
        match &source.url {
            Some(url) => writeln!(out, "  - [{}] {} ({})", source.kind, source.title, url)?,
            None => writeln!(out, "  - [{}] {}", source.kind, source.title)?,
        }
    }
    Ok(())
}

pub fn write_transcript(out: &mut impl Write, messages: &[Message]) -> std::io::Result<()> {
    for message in messages {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        match message.feedback {
            Some(kind) => writeln!(out, "{speaker}: {} [{kind}]", message.content)?,
            None => writeln!(out, "{speaker}: {}", message.content)?,
        }
    }
    Ok(())
}
