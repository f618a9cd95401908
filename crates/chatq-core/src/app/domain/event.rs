use crate::api::sse::Frame;
use crate::api::types::{MessageIdPayload, MetadataPayload};

/// Everything a streaming exchange can tell the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of reply text, appended verbatim.
    Token { text: String },
    Metadata(MetadataPayload),
    MessageIdAssigned { id: i64 },
    /// The transport ended cleanly.
    Complete,
    /// The transport failed.
    Error { description: String },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::Metadata(_) => "metadata",
            Self::MessageIdAssigned { .. } => "messageId",
            Self::Complete => "complete",
            Self::Error { .. } => "error",
        }
    }
}

/// Event types the backend declares on frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Token,
    Metadata,
    MessageId,
    Unrecognized,
}

impl FrameKind {
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            "token" => Self::Token,
            "metadata" => Self::Metadata,
            "messageId" => Self::MessageId,
            _ => Self::Unrecognized,
        }
    }
}

/// Result of reading one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Event(StreamEvent),
    /// Unknown event type; skipped without error.
    Ignored,
    /// Known event type whose payload did not parse; dropped, the stream
    /// goes on.
    Malformed { details: String },
}

pub fn interpret(frame: &Frame) -> Interpretation {
    match FrameKind::from_event_type(&frame.event_type) {
        FrameKind::Token => Interpretation::Event(StreamEvent::Token {
            text: frame.data.clone(),
        }),
        FrameKind::Metadata => match serde_json::from_str::<MetadataPayload>(frame.data.trim()) {
            Ok(metadata) => Interpretation::Event(StreamEvent::Metadata(metadata)),
            Err(e) => Interpretation::Malformed {
                details: e.to_string(),
            },
        },
        FrameKind::MessageId => match serde_json::from_str::<MessageIdPayload>(frame.data.trim()) {
            Ok(payload) => Interpretation::Event(StreamEvent::MessageIdAssigned {
                id: payload.message_id,
            }),
            Err(e) => Interpretation::Malformed {
                details: e.to_string(),
            },
        },
        FrameKind::Unrecognized => Interpretation::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::SourceReference;
    use rstest::rstest;

    fn frame(event_type: &str, data: &str) -> Frame {
        Frame {
            event_type: event_type.to_string(),
            data: data.to_string(),
        }
    }

    #[rstest]
    #[case(" ")]
    #[case("")]
    #[case("  leading and trailing  ")]
    #[case("{\"looks\":\"like json\"}")]
    fn token_payload_passes_through_unchanged(#[case] data: &str) {
        assert_eq!(
            interpret(&frame("token", data)),
            Interpretation::Event(StreamEvent::Token {
                text: data.to_string()
            })
        );
    }

    #[test]
    fn metadata_payload_is_parsed_after_trimming() {
        let interpretation = interpret(&frame(
            "metadata",
            r#" {"sessionId":"s-1","confidenceScore":0.8,"sources":[{"type":"FAQ","title":"Hours","id":3}],"handoffTriggered":false} "#,
        ));
        let Interpretation::Event(StreamEvent::Metadata(metadata)) = interpretation else {
            panic!("expected metadata, got {interpretation:?}");
        };
        assert_eq!(metadata.session_id, "s-1");
        assert_eq!(
            metadata.sources,
            Some(vec![SourceReference {
                kind: "FAQ".to_string(),
                title: "Hours".to_string(),
                url: None,
                id: 3,
            }])
        );
        assert!(!metadata.handoff_triggered);
    }

    #[test]
    fn message_id_payload_is_parsed() {
        assert_eq!(
            interpret(&frame("messageId", "{\"messageId\":77}")),
            Interpretation::Event(StreamEvent::MessageIdAssigned { id: 77 })
        );
    }

    #[rstest]
    #[case("metadata", "{not json")]
    #[case("metadata", "{\"confidenceScore\":0.5}")]
    #[case("messageId", "{\"messageId\":\"seven\"}")]
    #[case("messageId", "")]
    fn unparseable_payload_is_malformed(#[case] event_type: &str, #[case] data: &str) {
        assert!(matches!(
            interpret(&frame(event_type, data)),
            Interpretation::Malformed { .. }
        ));
    }

    #[rstest]
    #[case("message")]
    #[case("ping")]
    #[case("Token")]
    fn unknown_event_type_is_ignored(#[case] event_type: &str) {
        assert_eq!(interpret(&frame(event_type, "x")), Interpretation::Ignored);
    }
}
