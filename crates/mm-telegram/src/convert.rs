//! Telegram `Message` -> [`IncomingMessage`].

use teloxide::types::{Message, MessageEntityKind};

use mm_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::{Attachment, Author, IncomingMessage},
};

/// Snapshot the parts of a Telegram message the monitor cares about.
///
/// Content is the text, or the caption for media messages. Mentions are read
/// from both text and caption entities.
pub fn incoming_from_telegram(msg: &Message) -> IncomingMessage {
    let content = msg.text().or_else(|| msg.caption()).unwrap_or_default();

    let mut incoming = IncomingMessage::new(
        MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        },
        content,
    );

    if let Some(user) = msg.from() {
        incoming = incoming.with_author(Author {
            user_id: UserId(user.id.0 as i64),
            username: user.username.clone(),
        });
    }

    incoming.attachments = attachments(msg);

    let entities = msg
        .parse_entities()
        .into_iter()
        .chain(msg.parse_caption_entities())
        .flatten();
    for entity in entities {
        match entity.kind() {
            MessageEntityKind::Mention => {
                let name = entity.text().trim_start_matches('@');
                if !name.is_empty() {
                    incoming.mentions.push(name.to_string());
                }
            }
            MessageEntityKind::TextMention { user } => {
                incoming.mentioned_members.push(UserId(user.id.0 as i64));
            }
            _ => {}
        }
    }

    incoming
}

/// Media carried by the message, named so the extension can be checked.
///
/// Kinds Telegram never names (photos, voice notes, video notes) and nameless
/// uploads get a synthetic name with the format Telegram re-encodes them to.
fn attachments(msg: &Message) -> Vec<Attachment> {
    let mut out = Vec::new();

    if let Some(doc) = msg.document() {
        out.push(named(doc.file_name.as_deref(), "document"));
    }
    if msg.photo().is_some() {
        out.push(Attachment::new("photo.jpg"));
    }
    if let Some(video) = msg.video() {
        out.push(named(video.file_name.as_deref(), "video.mp4"));
    }
    if let Some(animation) = msg.animation() {
        out.push(named(animation.file_name.as_deref(), "animation.mp4"));
    }
    if let Some(audio) = msg.audio() {
        out.push(named(audio.file_name.as_deref(), "audio.mp3"));
    }
    if msg.voice().is_some() {
        out.push(Attachment::new("voice.ogg"));
    }
    if msg.video_note().is_some() {
        out.push(Attachment::new("video_note.mp4"));
    }

    out
}

fn named(file_name: Option<&str>, fallback: &str) -> Attachment {
    match file_name {
        Some(name) if !name.trim().is_empty() => Attachment::new(name),
        _ => Attachment::new(fallback),
    }
}
