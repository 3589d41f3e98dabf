use crate::UserId;

/// Transport-independent inbound text message
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub text: String,
}

impl NormalizedMessage {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: None,
            text: text.into(),
        }
    }
}

/// Work the channel has to carry out after sending the replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Poll the content API and edit the last reply with the outcome
    WakeApi,
}

/// Replies to send back, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResult {
    pub replies: Vec<String>,
    pub follow_up: Option<FollowUp>,
}

impl DispatchResult {
    /// Nothing to send (not a command we handle)
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            replies: vec![text.into()],
            follow_up: None,
        }
    }

    pub fn then(mut self, text: impl Into<String>) -> Self {
        self.replies.push(text.into());
        self
    }

    pub fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty() && self.follow_up.is_none()
    }
}

/// A `/command arg arg ...` message split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// Lower-cased command word without the slash or `@botname`
    pub name: String,
    pub args: Vec<&'a str>,
}

/// Parse a slash command. Returns None for ordinary text.
pub fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let mut words = text.split_whitespace();
    let head = words.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }

    Some(ParsedCommand {
        name: name.to_lowercase(),
        args: words.collect(),
    })
}
