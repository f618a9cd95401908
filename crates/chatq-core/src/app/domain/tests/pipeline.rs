#[cfg(test)]
mod tests {
    use crate::api::sse::FrameDecoder;
    use crate::app::domain::action::Action;
    use crate::app::domain::effect::Effect;
    use crate::app::domain::event::{Interpretation, StreamEvent, interpret};
    use crate::app::domain::reduce::reduce;
    use crate::app::domain::state::{
        ConversationState, ExchangeId, ExchangeOutcome, HANDOFF_NOTICE, Role,
    };

    /// Send `question`, feed `chunks` as the response body, then end the
    /// stream cleanly. Returns the exchange id and all effects.
    fn run_exchange(
        state: &mut ConversationState,
        question: &str,
        chunks: &[&str],
    ) -> (ExchangeId, Vec<Effect>) {
        let mut effects = reduce(
            state,
            Action::Send {
                text: question.to_string(),
                user_email: None,
            },
        );
        let exchange = match effects.first() {
            Some(Effect::OpenStream { exchange, .. }) => *exchange,
            other => panic!("expected OpenStream, got {other:?}"),
        };

        let mut decoder = FrameDecoder::new();
        for chunk in chunks {
            for frame in decoder.push(chunk.as_bytes()) {
                if let Interpretation::Event(event) = interpret(&frame) {
                    effects.extend(reduce(state, Action::Stream { exchange, event }));
                }
            }
        }
        decoder.finish();
        effects.extend(reduce(
            state,
            Action::Stream {
                exchange,
                event: StreamEvent::Complete,
            },
        ));

        (exchange, effects)
    }

    #[test]
    fn hello_world_is_reassembled_exactly() {
        let mut state = ConversationState::new();
        run_exchange(
            &mut state,
            "greet me",
            &["event:token\ndata:Hello\n\nevent:token\ndata: world\n\n"],
        );

        assert_eq!(state.messages[1].content, "Hello world");
        assert!(!state.is_loading());
    }

    #[test]
    fn whitespace_only_token_survives_every_stage() {
        let mut state = ConversationState::new();
        run_exchange(
            &mut state,
            "q",
            &[
                "event:token\ndata:a\n\n",
                "event:token\ndata: \n\n",
                "event:token\ndata:b\n\n",
            ],
        );

        assert_eq!(state.messages[1].content, "a b");
    }

    #[test]
    fn malformed_metadata_does_not_abort_stream() {
        let mut state = ConversationState::new();
        let (_, effects) = run_exchange(
            &mut state,
            "q",
            &["event:metadata\ndata:{broken\n\nevent:token\ndata:still here\n\n"],
        );

        assert_eq!(state.messages[1].content, "still here");
        assert_eq!(state.session_id, None);
        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, Effect::PersistSessionId { .. }))
        );
    }

    #[test]
    fn full_reply_with_metadata_and_message_id() {
        let mut state = ConversationState::new();
        let wire = "event:token\ndata:Wir haben\n\n\
                    event:token\ndata: bis 18 Uhr geöffnet.\n\n\
                    event:metadata\ndata:{\"sessionId\":\"s-9\",\"confidenceScore\":0.8,\"sources\":[{\"type\":\"FAQ\",\"title\":\"Öffnungszeiten\",\"id\":2}],\"handoffTriggered\":false}\n\n\
                    event:messageId\ndata:{\"messageId\":31}\n\n";
        let (exchange, effects) = run_exchange(&mut state, "Öffnungszeiten?", &[wire]);

        let answer = &state.messages[1];
        assert_eq!(answer.content, "Wir haben bis 18 Uhr geöffnet.");
        assert_eq!(answer.id, Some(31));
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].title, "Öffnungszeiten");
        assert_eq!(state.session_id.as_deref(), Some("s-9"));
        assert!(effects.contains(&Effect::PersistSessionId {
            session_id: "s-9".to_string()
        }));
        assert_eq!(
            state.outcome_of(exchange),
            Some(ExchangeOutcome::Completed)
        );
    }

    #[test]
    fn handoff_notice_is_a_separate_message() {
        let mut state = ConversationState::new();
        run_exchange(
            &mut state,
            "Mitarbeiter bitte",
            &[
                "event:token\ndata:Ich leite\n\n",
                "event:metadata\ndata:{\"sessionId\":\"s\",\"handoffTriggered\":true,\"confidenceScore\":0.0}\n\n",
                "event:token\ndata: weiter.\n\n",
            ],
        );

        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.messages[1].content, "Ich leite weiter.");
        assert_eq!(state.messages[2].role, Role::Assistant);
        assert_eq!(state.messages[2].content, HANDOFF_NOTICE);
    }

    #[test]
    fn trailing_partial_frame_is_never_applied() {
        let mut state = ConversationState::new();
        run_exchange(
            &mut state,
            "q",
            &["event:token\ndata:done\n\nevent:token\ndata:cut off"],
        );
        assert_eq!(state.messages[1].content, "done");
    }

    #[test]
    fn session_from_metadata_is_sent_with_next_question() {
        let mut state = ConversationState::new();
        run_exchange(
            &mut state,
            "first",
            &["event:metadata\ndata:{\"sessionId\":\"s-77\",\"handoffTriggered\":false}\n\n"],
        );

        let effects = reduce(
            &mut state,
            Action::Send {
                text: "second".to_string(),
                user_email: None,
            },
        );
        let [Effect::OpenStream { request, .. }] = effects.as_slice() else {
            panic!("expected OpenStream, got {effects:?}");
        };
        assert_eq!(request.session_id.as_deref(), Some("s-77"));
    }
}
