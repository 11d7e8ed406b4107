//! Vault wizard flows driven through a full bot with a scripted model.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use valet_config::ValetConfig;
use valet_core::Bot;
use valet_modules::VaultModule;
use valet_protocol::{ChatReply, Input, Permissions, ToolCallRequest};
use valet_storage::{AssistantStore, SqliteStore};
use valet_test_utils::ScriptedChat;

fn vault_bot(replies: Vec<ChatReply>) -> (Bot, Arc<ScriptedChat>) {
    let chat = Arc::new(ScriptedChat::new(replies));
    let store: Arc<dyn AssistantStore> =
        Arc::new(SqliteStore::open_in_memory().expect("sqlite store"));
    let config = ValetConfig::builder()
        .module_setting("vault_base_url", "https://vault.example")
        .build();
    let bot = Bot::create(
        "assistant",
        Permissions::ALL,
        Arc::new(config),
        chat.clone(),
        store,
    )
    .expect("create bot");
    bot.add_conversation("t1").expect("add conversation");
    bot.register_module(Arc::new(VaultModule::new()));
    (bot, chat)
}

fn start_reply(function: &str) -> ChatReply {
    ChatReply::with_tool_calls(
        "",
        vec![ToolCallRequest::function("call-1", function, "{}")],
    )
}

async fn send(bot: &Bot, message: &str) -> valet_protocol::Output {
    bot.send_message("t1", Input::new(message, Permissions::ALL))
        .await
        .expect("turn")
}

#[tokio::test]
async fn create_wizard_collects_title_then_path() {
    let (bot, chat) = vault_bot(vec![start_reply("vault_create")]);

    let output = send(&bot, "Create a new password profile").await;
    assert_eq!(
        output.message,
        "New password profile started. Please enter the title: "
    );

    let output = send(&bot, "email").await;
    assert_eq!(
        output.message,
        "Value saved successfully. Please enter the path:"
    );

    // Neither wizard turn reached the model.
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn invalid_field_reprompts_the_same_step() {
    let (bot, _chat) = vault_bot(vec![start_reply("vault_create")]);
    send(&bot, "Create a new password profile").await;

    let output = send(&bot, "my email").await;
    assert_eq!(output.error.as_deref(), Some("invalid title"));

    // The retry lands on the same field.
    let output = send(&bot, "email").await;
    assert_eq!(
        output.message,
        "Value saved successfully. Please enter the path:"
    );

    let output = send(&bot, "Not A Path").await;
    assert_eq!(output.error.as_deref(), Some("invalid path"));
    let output = send(&bot, "/mail/personal/").await;
    assert_eq!(
        output.message,
        "Value saved successfully. Please enter the username:"
    );
}

#[tokio::test]
async fn create_wizard_reaches_confirmation_and_can_be_abandoned() {
    let (bot, chat) = vault_bot(vec![start_reply("vault_create")]);
    send(&bot, "Create a new password profile").await;

    send(&bot, "email").await;
    send(&bot, "/mail/").await;
    send(&bot, "user@example.com").await;
    send(&bot, "hunter2").await;
    send(&bot, "https://mail.example").await;
    let output = send(&bot, "none").await;

    assert!(output.message.contains("Title: email"));
    assert!(output.message.contains("Path: /mail/"));
    assert!(output.message.contains("Is this the profile you want to save?"));

    let output = send(&bot, "no thanks").await;
    assert_eq!(output.message, "Password profile creation abandoned.");
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn delete_wizard_confirms_with_the_title() {
    let (bot, _chat) = vault_bot(vec![start_reply("vault_delete")]);

    let output = send(&bot, "Delete a password profile").await;
    assert_eq!(
        output.message,
        "Delete password profile started. Please enter the title: "
    );

    let output = send(&bot, "email").await;
    assert_eq!(
        output.message,
        "Value saved successfully. Please enter the path:"
    );

    let output = send(&bot, "/mail/").await;
    assert_eq!(output.message, "Are you sure you want to delete email?");

    let output = send(&bot, "no").await;
    assert_eq!(output.message, "Password profile deletion abandoned.");
}

#[tokio::test]
async fn stop_cancels_a_running_wizard() {
    let (bot, chat) = vault_bot(vec![
        start_reply("vault_create"),
        ChatReply::text("back to chat"),
    ]);
    send(&bot, "Create a new password profile").await;
    send(&bot, "email").await;

    let output = send(&bot, "actually, cancel that").await;
    assert_eq!(output.message, "Operation stopped");

    // The wizard is gone; normal dialogue resumes.
    let output = send(&bot, "hello?").await;
    assert_eq!(output.message, "back to chat");
    assert_eq!(chat.calls(), 2);
}

#[tokio::test]
async fn unconfigured_vault_service_surfaces_a_capability_error() {
    let chat = Arc::new(ScriptedChat::new(vec![start_reply("vault_get")]));
    let store: Arc<dyn AssistantStore> =
        Arc::new(SqliteStore::open_in_memory().expect("sqlite store"));
    let bot = Bot::create(
        "assistant",
        Permissions::ALL,
        Arc::new(ValetConfig::default()),
        chat,
        store,
    )
    .expect("create bot");
    bot.add_conversation("t1").expect("add conversation");
    bot.register_module(Arc::new(VaultModule::new()));

    let output = send(&bot, "send me my vault").await;
    assert_eq!(output.error.as_deref(), Some("vault service is not configured"));
}
