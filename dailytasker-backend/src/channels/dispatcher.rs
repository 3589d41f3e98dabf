use std::sync::Arc;
use std::time::Duration;

use crate::channels::types::parse_command;
use crate::channels::{DispatchResult, FollowUp, NormalizedMessage};
use crate::content_api::{ContentApiClient, ContentError};
use crate::documents::{self, ExtractError};
use crate::notes::{NoteError, NoteStore};
use crate::sessions::PendingUploads;
use crate::subscriptions::SubscriptionStore;
use crate::UserId;

const START_TEXT: &str = "Bot is online!\n\
Welcome to DailyTasker\n\
Use the following commands:\n\
/joke - Get a random joke\n\
/quote - Get a random quote daily\n\
/note - A note-taking functionality\n\
/summary - Summarize a PDF Document\n\
/wake - Wake up the joke/quote API\n\
/id - Show your chat ID";

const NOTE_USAGE: &str = "Note Management Commands:\n\
/note create <Note Name> - Create a new note\n\
/note add <Note Name> <Item> - Add an item to a note\n\
/note show <Note Name> - Show all items in a note\n\
/note list - List all notes\n\
/note edit <Note Name> <Item Number> <New Text> - Edit an item in a note\n\
/note remove <Note Name> <Item Number> - Remove an item from a note\n\
/note delete <Note Name> - Delete an entire note";

const QUOTE_WELCOME: &str = "Welcome to the Daily Quote Service!\n\n\
This is a subscription-based service that sends you an inspiring quote every morning.\n\n\
You can manage your subscription using the following commands:\n\
/quote subscribe - Subscribe to daily quotes\n\
/quote unsubscribe - Unsubscribe from daily quotes\n\
/quote status - Check your subscription status";

const QUOTE_INVALID: &str = "Invalid command. Use:\n\
/quote subscribe - Subscribe to daily quote\n\
/quote unsubscribe - Unsubscribe from daily quote\n\
/quote status - Check your subscription status";

const STORAGE_FAILURE: &str =
    "Sorry, your data could not be read or saved right now. Please try again later.";
const INVALID_INDEX: &str = "Item number must be a valid integer.";

/// Routes parsed commands to the stores and the content API and renders
/// the replies. Knows nothing about the chat transport.
pub struct CommandDispatcher {
    notes: Arc<NoteStore>,
    subscriptions: Arc<SubscriptionStore>,
    content: Arc<ContentApiClient>,
    uploads: Arc<PendingUploads>,
    pdftotext_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(
        notes: Arc<NoteStore>,
        subscriptions: Arc<SubscriptionStore>,
        content: Arc<ContentApiClient>,
        uploads: Arc<PendingUploads>,
        pdftotext_timeout: Duration,
    ) -> Self {
        Self {
            notes,
            subscriptions,
            content,
            uploads,
            pdftotext_timeout,
        }
    }

    pub fn content(&self) -> &Arc<ContentApiClient> {
        &self.content
    }

    /// Dispatch a text message and return the replies to send
    pub async fn dispatch(&self, message: &NormalizedMessage) -> DispatchResult {
        let Some(command) = parse_command(&message.text) else {
            return DispatchResult::ignored();
        };

        log::debug!(
            "[DISPATCH] /{} from {} ({}, {} args)",
            command.name,
            message.user_id,
            message.user_name.as_deref().unwrap_or("unknown"),
            command.args.len()
        );

        let user_id = message.user_id;
        match command.name.as_str() {
            "start" => DispatchResult::reply(START_TEXT),
            "joke" => self.handle_joke().await,
            "quote" => self.handle_quote(user_id, &command.args),
            "note" => self.handle_note(user_id, &command.args),
            "summary" => {
                let expired = self.uploads.purge_expired();
                self.uploads.arm(user_id);
                log::debug!(
                    "[DISPATCH] Upload armed for {} ({} pending, {} expired)",
                    user_id,
                    self.uploads.len(),
                    expired
                );
                DispatchResult::reply("Please send me a PDF file, and I'll summarize it.")
            }
            "id" => DispatchResult::reply(format!("Your chat ID is: {}", user_id)),
            "wake" => DispatchResult::reply("Waking up the API... This may take up to a minute.")
                .with_follow_up(FollowUp::WakeApi),
            _ => DispatchResult::ignored(),
        }
    }

    /// Whether a document from this user should be summarized (consumes the `/summary` slot)
    pub fn accept_upload(&self, user_id: UserId) -> bool {
        self.uploads.take(user_id)
    }

    /// Extract and summarize an uploaded PDF
    pub async fn summarize_document(&self, data: &[u8]) -> String {
        match documents::extract_text(data, self.pdftotext_timeout).await {
            Ok(text) => format!("Summary:\n{}", documents::summarize(&text)),
            Err(ExtractError::NoText) => {
                "Could not extract readable text from this PDF.".to_string()
            }
            Err(e) => {
                log::warn!("[DISPATCH] PDF extraction failed: {}", e);
                "Error extracting text from PDF.".to_string()
            }
        }
    }

    async fn handle_joke(&self) -> DispatchResult {
        match self.content.fetch_joke().await {
            Ok(joke) => DispatchResult::reply(joke),
            Err(ContentError::Unavailable(_)) => {
                DispatchResult::reply("Failed to fetch a joke. Try again later.")
            }
            Err(e) => {
                log::warn!("[DISPATCH] Joke request failed: {}", e);
                DispatchResult::reply("Error fetching joke. Please try again later.")
            }
        }
    }

    fn handle_quote(&self, user_id: UserId, args: &[&str]) -> DispatchResult {
        let Some(sub) = args.first() else {
            return DispatchResult::reply(QUOTE_WELCOME);
        };

        let result = match sub.to_lowercase().as_str() {
            "subscribe" => self.subscriptions.subscribe(user_id).map(|added| {
                if added {
                    "You have successfully subscribed to the daily quote!"
                } else {
                    "You are already subscribed."
                }
            }),
            "unsubscribe" => self.subscriptions.unsubscribe(user_id).map(|removed| {
                if removed {
                    "You have successfully unsubscribed from the daily quote."
                } else {
                    "You are not subscribed to the daily quote."
                }
            }),
            "status" => self.subscriptions.is_subscribed(user_id).map(|subscribed| {
                if subscribed {
                    "You are currently subscribed to the daily quote."
                } else {
                    "You are not subscribed to the daily quote. Use /quote subscribe to subscribe."
                }
            }),
            _ => return DispatchResult::reply(QUOTE_INVALID),
        };

        match result {
            Ok(text) => DispatchResult::reply(text),
            Err(e) => {
                log::error!("[DISPATCH] Subscription storage error for {}: {}", user_id, e);
                DispatchResult::reply(STORAGE_FAILURE)
            }
        }
    }

    fn handle_note(&self, user_id: UserId, args: &[&str]) -> DispatchResult {
        let Some((sub, rest)) = args.split_first() else {
            return DispatchResult::reply(NOTE_USAGE);
        };

        let result = match sub.to_lowercase().as_str() {
            "create" => self.note_create(user_id, rest),
            "add" => self.note_add(user_id, rest),
            "show" => self.note_show(user_id, rest),
            "list" => self.render_list(user_id).map(DispatchResult::reply),
            "edit" => self.note_edit(user_id, rest),
            "remove" => self.note_remove(user_id, rest),
            "delete" => self.note_delete(user_id, rest),
            _ => Ok(DispatchResult::reply(
                "Invalid subcommand. Use /note to see available commands.",
            )),
        };

        match result {
            Ok(reply) => reply,
            Err(NoteError::Storage(e)) => {
                log::error!("[DISPATCH] Note storage error for {}: {}", user_id, e);
                DispatchResult::reply(STORAGE_FAILURE)
            }
            Err(e) => DispatchResult::reply(e.to_string()),
        }
    }

    fn note_create(&self, user_id: UserId, args: &[&str]) -> Result<DispatchResult, NoteError> {
        if args.is_empty() {
            return Ok(DispatchResult::reply("Usage: /note create <Note Name>"));
        }
        let name = args.join(" ");
        self.notes.create_note(user_id, &name)?;
        Ok(DispatchResult::reply(format!("Note '{}' created successfully!", name)))
    }

    fn note_add(&self, user_id: UserId, args: &[&str]) -> Result<DispatchResult, NoteError> {
        if args.len() < 2 {
            return Ok(DispatchResult::reply("Usage: /note add <Note Name> <Item>"));
        }
        let name = args[0];
        let item = args[1..].join(" ");
        self.notes.add_item(user_id, name, &item)?;
        Ok(DispatchResult::reply(format!("Added '{}' to '{}'.", item, name))
            .then(self.render_note(user_id, name)?))
    }

    fn note_show(&self, user_id: UserId, args: &[&str]) -> Result<DispatchResult, NoteError> {
        if args.is_empty() {
            return Ok(DispatchResult::reply("Usage: /note show <Note Name>"));
        }
        let name = args.join(" ");
        Ok(DispatchResult::reply(self.render_note(user_id, &name)?))
    }

    fn note_edit(&self, user_id: UserId, args: &[&str]) -> Result<DispatchResult, NoteError> {
        if args.len() < 3 {
            return Ok(DispatchResult::reply(
                "Usage: /note edit <Note Name> <Item Number> <New Text>",
            ));
        }
        let name = args[0];
        let Ok(index) = args[1].parse::<i64>() else {
            return Ok(DispatchResult::reply(INVALID_INDEX));
        };
        let new_text = args[2..].join(" ");
        self.notes.edit_item(user_id, name, index, &new_text)?;
        Ok(DispatchResult::reply(format!("Updated item {} in '{}'.", index, name))
            .then(self.render_note(user_id, name)?))
    }

    fn note_remove(&self, user_id: UserId, args: &[&str]) -> Result<DispatchResult, NoteError> {
        if args.len() < 2 {
            return Ok(DispatchResult::reply("Usage: /note remove <Note Name> <Item Number>"));
        }
        let name = args[0];
        let Ok(index) = args[1].parse::<i64>() else {
            return Ok(DispatchResult::reply(INVALID_INDEX));
        };
        let removed = self.notes.remove_item(user_id, name, index)?;
        Ok(DispatchResult::reply(format!("Removed '{}' from '{}'.", removed, name))
            .then(self.render_note(user_id, name)?))
    }

    fn note_delete(&self, user_id: UserId, args: &[&str]) -> Result<DispatchResult, NoteError> {
        if args.is_empty() {
            return Ok(DispatchResult::reply("Usage: /note delete <Note Name>"));
        }
        let name = args.join(" ");
        self.notes.delete_note(user_id, &name)?;
        Ok(DispatchResult::reply(format!("Deleted note '{}'.", name))
            .then(self.render_list(user_id)?))
    }

    fn render_note(&self, user_id: UserId, name: &str) -> Result<String, NoteError> {
        let items = self.notes.show_note(user_id, name)?;
        if items.is_empty() {
            Ok(format!("'{}' is empty.", name))
        } else {
            Ok(format!("📜 {}:\n{}", name, items.join("\n")))
        }
    }

    fn render_list(&self, user_id: UserId) -> Result<String, NoteError> {
        let names = self.notes.list_notes(user_id)?;
        if names.is_empty() {
            Ok("No notes available.".to_string())
        } else {
            Ok(format!("📝 Notes:\n{}", names.join("\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentApiConfig;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER: UserId = 555;

    struct Harness {
        _dir: TempDir,
        dispatcher: CommandDispatcher,
        notes_path: std::path::PathBuf,
    }

    fn harness_with_api(base_url: &str) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let notes_path = dir.path().join("notes.json");
        let content = ContentApiClient::new(ContentApiConfig {
            base_url: base_url.to_string(),
            joke_warmup: Duration::ZERO,
            quote_warmup: Duration::ZERO,
            ..ContentApiConfig::default()
        });
        let dispatcher = CommandDispatcher::new(
            Arc::new(NoteStore::new(&notes_path)),
            Arc::new(SubscriptionStore::new(dir.path().join("subs.json"))),
            Arc::new(content),
            Arc::new(PendingUploads::new(Duration::from_secs(60))),
            Duration::from_secs(5),
        );
        Harness {
            _dir: dir,
            dispatcher,
            notes_path,
        }
    }

    fn harness() -> Harness {
        harness_with_api("http://127.0.0.1:9")
    }

    async fn send(h: &Harness, text: &str) -> Vec<String> {
        h.dispatcher
            .dispatch(&NormalizedMessage::new(USER, text))
            .await
            .replies
    }

    #[tokio::test]
    async fn test_note_conversation() {
        let h = harness();

        assert_eq!(
            send(&h, "/note create groceries").await,
            vec!["Note 'groceries' created successfully!"]
        );
        assert_eq!(
            send(&h, "/note add groceries milk").await,
            vec!["Added 'milk' to 'groceries'.", "📜 groceries:\n1. milk"]
        );
        send(&h, "/note add groceries eggs").await;
        assert_eq!(
            send(&h, "/note edit groceries 1 oat milk").await,
            vec![
                "Updated item 1 in 'groceries'.",
                "📜 groceries:\n1. oat milk\n2. eggs"
            ]
        );
        assert_eq!(
            send(&h, "/note remove groceries 1").await,
            vec!["Removed 'oat milk' from 'groceries'.", "📜 groceries:\n1. eggs"]
        );
        assert_eq!(send(&h, "/note list").await, vec!["📝 Notes:\ngroceries"]);
        assert_eq!(
            send(&h, "/note delete groceries").await,
            vec!["Deleted note 'groceries'.", "No notes available."]
        );
        assert_eq!(
            send(&h, "/note show groceries").await,
            vec!["Note 'groceries' does not exist!"]
        );
    }

    #[tokio::test]
    async fn test_multi_word_names_for_create_and_show() {
        let h = harness();
        send(&h, "/note create weekend plans").await;
        assert_eq!(send(&h, "/note show weekend plans").await, vec!["'weekend plans' is empty."]);
        assert_eq!(send(&h, "/note create weekend plans").await, vec!["'weekend plans' already exists!"]);
    }

    #[tokio::test]
    async fn test_note_validation_never_touches_storage() {
        let h = harness();

        assert_eq!(send(&h, "/note").await, vec![NOTE_USAGE]);
        assert_eq!(send(&h, "/note create").await, vec!["Usage: /note create <Note Name>"]);
        assert_eq!(send(&h, "/note add onlyname").await, vec!["Usage: /note add <Note Name> <Item>"]);
        assert_eq!(send(&h, "/note edit n x new").await, vec![INVALID_INDEX]);
        assert_eq!(send(&h, "/note remove n two").await, vec![INVALID_INDEX]);
        assert_eq!(
            send(&h, "/note frobnicate").await,
            vec!["Invalid subcommand. Use /note to see available commands."]
        );
        assert!(!h.notes_path.exists());
    }

    #[tokio::test]
    async fn test_out_of_range_index_reports_invalid() {
        let h = harness();
        send(&h, "/note create n").await;
        send(&h, "/note add n only").await;

        let replies = send(&h, "/note edit n 5 nope").await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("Item 5 does not exist in 'n'"));
        assert_eq!(send(&h, "/note show n").await, vec!["📜 n:\n1. only"]);
    }

    #[tokio::test]
    async fn test_corrupt_notes_file_reports_storage_failure() {
        let h = harness();
        std::fs::write(&h.notes_path, "garbage").unwrap();

        assert_eq!(send(&h, "/note list").await, vec![STORAGE_FAILURE]);
        assert_eq!(send(&h, "/note create x").await, vec![STORAGE_FAILURE]);
        assert_eq!(std::fs::read_to_string(&h.notes_path).unwrap(), "garbage");
    }

    #[tokio::test]
    async fn test_quote_subscription_flow() {
        let h = harness();

        assert_eq!(send(&h, "/quote").await, vec![QUOTE_WELCOME]);
        assert_eq!(
            send(&h, "/quote status").await,
            vec!["You are not subscribed to the daily quote. Use /quote subscribe to subscribe."]
        );
        assert_eq!(
            send(&h, "/quote subscribe").await,
            vec!["You have successfully subscribed to the daily quote!"]
        );
        assert_eq!(send(&h, "/quote subscribe").await, vec!["You are already subscribed."]);
        assert_eq!(
            send(&h, "/quote status").await,
            vec!["You are currently subscribed to the daily quote."]
        );
        assert_eq!(
            send(&h, "/quote unsubscribe").await,
            vec!["You have successfully unsubscribed from the daily quote."]
        );
        assert_eq!(
            send(&h, "/quote unsubscribe").await,
            vec!["You are not subscribed to the daily quote."]
        );
        assert_eq!(send(&h, "/quote daily").await, vec![QUOTE_INVALID]);
    }

    #[tokio::test]
    async fn test_simple_commands() {
        let h = harness();
        assert_eq!(send(&h, "/start").await, vec![START_TEXT]);
        assert_eq!(send(&h, "/id").await, vec!["Your chat ID is: 555"]);
        assert!(send(&h, "just chatting").await.is_empty());
        assert!(send(&h, "/unknown").await.is_empty());

        let wake = h
            .dispatcher
            .dispatch(&NormalizedMessage::new(USER, "/wake"))
            .await;
        assert_eq!(wake.follow_up, Some(FollowUp::WakeApi));
        assert_eq!(wake.replies.len(), 1);
    }

    #[tokio::test]
    async fn test_summary_arms_one_upload() {
        let h = harness();
        assert!(!h.dispatcher.accept_upload(USER));

        send(&h, "/summary").await;
        assert!(h.dispatcher.accept_upload(USER));
        assert!(!h.dispatcher.accept_upload(USER));
    }

    #[tokio::test]
    async fn test_summarize_rejects_non_pdf() {
        let h = harness();
        assert_eq!(
            h.dispatcher.summarize_document(b"hello").await,
            "Error extracting text from PDF."
        );
    }

    #[tokio::test]
    async fn test_joke_replies() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "joke": "knock knock" })),
            )
            .mount(&mock_server)
            .await;

        let h = harness_with_api(&mock_server.uri());
        assert_eq!(send(&h, "/joke").await, vec!["knock knock"]);

        let down = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&down)
            .await;
        let h = harness_with_api(&down.uri());
        assert_eq!(send(&h, "/joke").await, vec!["Failed to fetch a joke. Try again later."]);

        let h = harness();
        assert_eq!(send(&h, "/joke").await, vec!["Error fetching joke. Please try again later."]);
    }
}
