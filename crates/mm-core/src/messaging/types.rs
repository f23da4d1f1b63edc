use crate::domain::{MessageRef, UserId};

/// Cross-messenger incoming message model.
///
/// Built by the adapter from whatever the chat backend delivers; the validator
/// only looks at `content`, `attachments`, `mentions` and `mentioned_members`.
/// Everything else is metadata for the audit log.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub msg: MessageRef,
    pub author: Option<Author>,
    /// Raw text (or media caption). Empty when the message carries none.
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// Direct `@username` mentions, without the leading `@`.
    pub mentions: Vec<String>,
    /// Mentions that resolve to a known chat member.
    pub mentioned_members: Vec<UserId>,
}

impl IncomingMessage {
    pub fn new(msg: MessageRef, content: impl Into<String>) -> Self {
        Self {
            msg,
            author: None,
            content: content.into(),
            attachments: Vec::new(),
            mentions: Vec::new(),
            mentioned_members: Vec::new(),
        }
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_attachment(mut self, file_name: impl Into<String>) -> Self {
        self.attachments.push(Attachment::new(file_name));
        self
    }

    pub fn with_mention(mut self, username: impl Into<String>) -> Self {
        self.mentions.push(username.into());
        self
    }

    pub fn with_mentioned_member(mut self, user_id: UserId) -> Self {
        self.mentioned_members.push(user_id);
        self
    }

    /// Text split on single spaces.
    ///
    /// Trailing empty tokens are dropped, so `"a "` is one token and `""` is none.
    /// Leading and inner empty tokens (from repeated spaces) are kept.
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.content.split(' ').collect();
        while tokens.last().is_some_and(|t| t.is_empty()) {
            tokens.pop();
        }
        tokens
    }

    pub fn has_mentions(&self) -> bool {
        !self.mentions.is_empty() || !self.mentioned_members.is_empty()
    }

    pub fn attachment_names(&self) -> Vec<String> {
        self.attachments.iter().map(|a| a.file_name.clone()).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub user_id: UserId,
    pub username: Option<String>,
}

impl Author {
    /// `@username` when known, otherwise the numeric id.
    pub fn display(&self) -> String {
        match &self.username {
            Some(u) => format!("@{u}"),
            None => self.user_id.0.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Lower-cased text after the final `.` of the file name.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}
