//! Continuation-queue wizard tests: stepwise field collection with no model
//! round-trips between steps.

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use valet_config::ValetConfig;
use valet_core::{Bot, CapabilityModule, HandlerResult, ModuleContext};
use valet_protocol::{
    ChatProvider, ChatReply, Input, Output, Permissions, ToolCallRequest, ToolSchema,
};
use valet_storage::{AssistantStore, SqliteStore};
use valet_test_utils::ScriptedChat;

/// Two-field wizard: collects a title and a body, then asks to confirm.
struct NoteModule;

const FIELDS: &[&str] = &["title", "body"];

#[async_trait]
impl CapabilityModule for NoteModule {
    fn name(&self) -> &str {
        "note"
    }

    fn permissions(&self) -> Permissions {
        Permissions::PRIVATE_MODULES
    }

    fn schemas(&self) -> Vec<ToolSchema> {
        vec![ToolSchema::new(
            "note_create",
            "Start creating a note",
            json!({"type": "object"}),
        )]
    }

    async fn handle(
        &self,
        function: &str,
        ctx: &ModuleContext,
        _input: &Input,
    ) -> Option<HandlerResult> {
        if function != "note_create" {
            return None;
        }
        ctx.set_var("note_fields", json!([]));
        ctx.push_step(self.name(), "collect");
        Some(HandlerResult::Direct(Output::text(
            "New note started. Please enter the title:",
        )))
    }

    async fn resume(&self, step: &str, ctx: &ModuleContext, input: &Input) -> Output {
        match step {
            "collect" => {
                if input.message.trim().is_empty() {
                    ctx.push_step(self.name(), "collect");
                    return Output::error("value cannot be empty");
                }
                let mut fields = ctx
                    .var("note_fields")
                    .and_then(|value| value.as_array().cloned())
                    .unwrap_or_default();
                fields.push(json!(input.message));
                let collected = fields.len();
                ctx.set_var("note_fields", json!(fields));

                if collected < FIELDS.len() {
                    ctx.push_step(self.name(), "collect");
                    Output::text(format!(
                        "Value saved successfully. Please enter the {}:",
                        FIELDS[collected]
                    ))
                } else {
                    ctx.push_step(self.name(), "confirm");
                    Output::text("Save this note?")
                }
            }
            "confirm" => {
                if valet_core::intent::is_confirmation(&input.message) {
                    Output::text("Note saved successfully!")
                } else {
                    Output::text("Note abandoned.")
                }
            }
            other => Output::error(format!("unknown step {other}")),
        }
    }
}

/// Module that enqueues three tagged steps up front and records the order
/// they resume in.
struct SequenceModule {
    resumed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl CapabilityModule for SequenceModule {
    fn name(&self) -> &str {
        "sequence"
    }

    fn permissions(&self) -> Permissions {
        Permissions::PRIVATE_MODULES
    }

    fn schemas(&self) -> Vec<ToolSchema> {
        vec![ToolSchema::new(
            "sequence_start",
            "Start the step sequence",
            json!({"type": "object"}),
        )]
    }

    async fn handle(
        &self,
        function: &str,
        ctx: &ModuleContext,
        _input: &Input,
    ) -> Option<HandlerResult> {
        if function != "sequence_start" {
            return None;
        }
        ctx.push_step(self.name(), "s1");
        ctx.push_step(self.name(), "s2");
        ctx.push_step(self.name(), "s3");
        Some(HandlerResult::Direct(Output::text("sequence started")))
    }

    async fn resume(&self, step: &str, _ctx: &ModuleContext, _input: &Input) -> Output {
        self.resumed.lock().push(step.to_string());
        Output::text(format!("ran {step}"))
    }
}

fn wizard_bot(chat: Arc<dyn ChatProvider>) -> Bot {
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
    bot
}

fn start_note_reply() -> ChatReply {
    ChatReply::with_tool_calls(
        "",
        vec![ToolCallRequest::function("call-1", "note_create", "{}")],
    )
}

#[tokio::test]
async fn wizard_collects_fields_without_model_round_trips() {
    let chat = Arc::new(ScriptedChat::new(vec![start_note_reply()]));
    let bot = wizard_bot(chat.clone());
    bot.register_module(Arc::new(NoteModule));

    let output = bot
        .send_message("t1", Input::new("Create a new note", Permissions::ALL))
        .await
        .expect("start wizard");
    assert_eq!(output.message, "New note started. Please enter the title:");
    assert_eq!(chat.calls(), 1);

    let output = bot
        .send_message("t1", Input::new("groceries", Permissions::ALL))
        .await
        .expect("first field");
    assert_eq!(
        output.message,
        "Value saved successfully. Please enter the body:"
    );

    let output = bot
        .send_message("t1", Input::new("milk and eggs", Permissions::ALL))
        .await
        .expect("second field");
    assert_eq!(output.message, "Save this note?");

    let output = bot
        .send_message("t1", Input::new("yes", Permissions::ALL))
        .await
        .expect("confirm");
    assert_eq!(output.message, "Note saved successfully!");

    // Only the wizard-starting turn reached the model.
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn steps_resume_in_fifo_order_once_each() {
    let chat = Arc::new(ScriptedChat::new(vec![ChatReply::with_tool_calls(
        "",
        vec![ToolCallRequest::function("call-1", "sequence_start", "{}")],
    )]));
    let bot = wizard_bot(chat.clone());
    let resumed = Arc::new(Mutex::new(Vec::new()));
    bot.register_module(Arc::new(SequenceModule {
        resumed: resumed.clone(),
    }));

    bot.send_message("t1", Input::new("go", Permissions::ALL))
        .await
        .expect("start");
    for _ in 0..3 {
        bot.send_message("t1", Input::new("next", Permissions::ALL))
            .await
            .expect("step");
    }

    assert_eq!(
        resumed.lock().clone(),
        vec!["s1".to_string(), "s2".to_string(), "s3".to_string()]
    );
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn stop_clears_the_whole_queue() {
    let chat = Arc::new(ScriptedChat::new(vec![
        ChatReply::with_tool_calls(
            "",
            vec![ToolCallRequest::function("call-1", "sequence_start", "{}")],
        ),
        ChatReply::text("back to normal"),
    ]));
    let bot = wizard_bot(chat.clone());
    let resumed = Arc::new(Mutex::new(Vec::new()));
    bot.register_module(Arc::new(SequenceModule {
        resumed: resumed.clone(),
    }));

    bot.send_message("t1", Input::new("go", Permissions::ALL))
        .await
        .expect("start");

    let output = bot
        .send_message("t1", Input::new("stop", Permissions::ALL))
        .await
        .expect("stop");
    assert_eq!(output.message, "Operation stopped");
    assert_eq!(resumed.lock().len(), 0);

    // The queue is gone: the next input goes straight to the model.
    let output = bot
        .send_message("t1", Input::new("hello again", Permissions::ALL))
        .await
        .expect("normal turn");
    assert_eq!(output.message, "back to normal");
    assert_eq!(chat.calls(), 2);
}

#[tokio::test]
async fn step_errors_ride_inside_the_output() {
    let chat = Arc::new(ScriptedChat::new(vec![start_note_reply()]));
    let bot = wizard_bot(chat.clone());
    bot.register_module(Arc::new(NoteModule));

    bot.send_message("t1", Input::new("Create a new note", Permissions::ALL))
        .await
        .expect("start wizard");

    // An invalid field is a capability error, not a turn abort; the step
    // re-enqueued itself so the next input retries the same field.
    let output = bot
        .send_message("t1", Input::new("   ", Permissions::ALL))
        .await
        .expect("invalid field");
    assert_eq!(output.error.as_deref(), Some("value cannot be empty"));

    let output = bot
        .send_message("t1", Input::new("groceries", Permissions::ALL))
        .await
        .expect("retry");
    assert_eq!(
        output.message,
        "Value saved successfully. Please enter the body:"
    );
    assert_eq!(chat.calls(), 1);
}
