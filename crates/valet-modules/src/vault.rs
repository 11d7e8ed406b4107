//! Credential-vault module.
//!
//! `vault_get` fetches the vault database and returns it as a file payload.
//! `vault_create`, `vault_update`, and `vault_delete` run stepwise wizards:
//! the model only ever starts them, and every field afterwards is collected
//! from raw user input through the continuation queue.

use async_trait::async_trait;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use valet_core::{CapabilityModule, HandlerResult, ModuleContext, intent};
use valet_protocol::{Input, Output, Payload, Permissions, ToolSchema};

const VAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Prompts for the fields collected after the title, in collection order.
const FIELD_PROMPTS: &[&str] = &[
    "path",
    "username",
    "password",
    "URL",
    "notes (type 'none' if empty)",
];

const PROFILE_VAR: &str = "vault_profile";
const INDEX_VAR: &str = "vault_index";

/// One credential profile as the vault service stores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct VaultProfile {
    path: String,
    title: String,
    username: String,
    password: String,
    url: String,
    notes: String,
}

/// Status envelope the vault service answers with.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    error: bool,
    #[serde(default)]
    message: String,
}

/// Which wizard a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
    Delete,
}

impl Mode {
    fn collect_tag(self) -> &'static str {
        match self {
            Mode::Create => "create_step",
            Mode::Update => "update_step",
            Mode::Delete => "delete_step",
        }
    }

    fn confirm_tag(self) -> &'static str {
        match self {
            Mode::Create => "create_confirm",
            Mode::Update => "update_confirm",
            Mode::Delete => "delete_confirm",
        }
    }

    fn start_message(self) -> &'static str {
        match self {
            Mode::Create => "New password profile started. Please enter the title: ",
            Mode::Update => "Updated password profile started. Please enter the title: ",
            Mode::Delete => "Delete password profile started. Please enter the title: ",
        }
    }

    fn abandon_message(self) -> &'static str {
        match self {
            Mode::Create => "Password profile creation abandoned.",
            Mode::Update => "Password profile update abandoned.",
            Mode::Delete => "Password profile deletion abandoned.",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            Mode::Create => "Password profile created successfully!",
            Mode::Update => "Password profile updated successfully!",
            Mode::Delete => "Password profile deleted successfully!",
        }
    }
}

/// Vault capability module.
#[derive(Debug, Default)]
pub struct VaultModule {
    client: reqwest::Client,
}

impl VaultModule {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the vault database file for the user.
    async fn fetch_database(&self, ctx: &ModuleContext) -> Output {
        let Some(base_url) = ctx.setting("vault_base_url") else {
            return Output::error("vault service is not configured");
        };
        let token = ctx.setting("vault_token").unwrap_or_default();

        let response = match self
            .client
            .get(base_url)
            .header("token", token)
            .timeout(VAULT_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("vault fetch failed: {err}");
                return Output::error("error fetching vault database");
            }
        };

        match response.bytes().await {
            Ok(content) if !content.is_empty() => Output::with_payload(
                "File successfully sent!",
                Payload::File {
                    name: "vault.kdbx".to_string(),
                    content: content.to_vec(),
                },
            ),
            _ => Output::error("error reading vault database file"),
        }
    }

    /// Seed wizard state and enqueue the first collection step.
    fn start(&self, ctx: &ModuleContext, mode: Mode) -> Output {
        ctx.set_var(PROFILE_VAR, json!(VaultProfile::default()));
        ctx.set_var(INDEX_VAR, json!(0));
        ctx.push_step(self.name(), mode.collect_tag());
        Output::text(mode.start_message())
    }

    /// Collect one field of the profile, then prompt for the next field or
    /// hand over to the confirmation step.
    fn collect(&self, ctx: &ModuleContext, input: &Input, mode: Mode) -> Output {
        let Some(mut profile) = load_profile(ctx) else {
            return Output::error("cannot read saved vault profile");
        };
        let Some(idx) = load_index(ctx) else {
            return Output::error("cannot read saved vault index");
        };

        if let Err(err) = apply_field(&mut profile, idx, &input.message) {
            // Same step again so the user can retry the field.
            ctx.push_step(self.name(), mode.collect_tag());
            return Output::error(err);
        }
        ctx.set_var(PROFILE_VAR, json!(profile));

        let last_field = match mode {
            // Delete only needs title and path to identify the profile.
            Mode::Delete => 1,
            Mode::Create | Mode::Update => FIELD_PROMPTS.len(),
        };
        if idx < last_field {
            ctx.set_var(INDEX_VAR, json!(idx + 1));
            ctx.push_step(self.name(), mode.collect_tag());
            return Output::text(format!(
                "Value saved successfully. Please enter the {}:",
                FIELD_PROMPTS[idx]
            ));
        }

        ctx.push_step(self.name(), mode.confirm_tag());
        match mode {
            Mode::Delete => Output::text(format!(
                "Are you sure you want to delete {}?",
                profile.title
            )),
            Mode::Create | Mode::Update => Output::text(confirm_message(&profile)),
        }
    }

    /// Ask the vault service to apply the collected profile.
    async fn confirm(&self, ctx: &ModuleContext, input: &Input, mode: Mode) -> Output {
        if !intent::is_confirmation(&input.message) {
            return Output::text(mode.abandon_message());
        }
        let Some(profile) = load_profile(ctx) else {
            return Output::error("cannot read saved vault profile");
        };
        let Some(base_url) = ctx.setting("vault_base_url") else {
            return Output::error("vault service is not configured");
        };
        let token = ctx.setting("vault_token").unwrap_or_default();

        let request = match mode {
            Mode::Create => self.client.post(base_url),
            Mode::Update => self.client.put(base_url),
            Mode::Delete => self.client.delete(base_url),
        };
        let response = match request
            .header("token", token)
            .timeout(VAULT_TIMEOUT)
            .json(&profile)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("vault write failed: {err}");
                return Output::error("error reaching vault service");
            }
        };

        let status: ApiStatus = match response.json().await {
            Ok(status) => status,
            Err(err) => {
                warn!("vault response unreadable: {err}");
                return Output::error("vault service response is not formatted correctly");
            }
        };

        if status.error {
            // Service-side failure: keep the confirmation pending and let
            // the user retry.
            ctx.push_step(self.name(), mode.confirm_tag());
            return Output::text("There was an error saving your password. Try again?")
                .with_error(status.message);
        }

        Output::text(mode.success_message())
    }
}

#[async_trait]
impl CapabilityModule for VaultModule {
    fn name(&self) -> &str {
        "vault"
    }

    fn permissions(&self) -> Permissions {
        Permissions::PRIVATE_MODULES
    }

    fn schemas(&self) -> Vec<ToolSchema> {
        let no_args = json!({"type": "object", "properties": {}});
        vec![
            ToolSchema::new(
                "vault_get",
                "Send the user their password vault database file",
                no_args.clone(),
            ),
            ToolSchema::new(
                "vault_create",
                "Start creating a new password profile in the user's vault",
                no_args.clone(),
            ),
            ToolSchema::new(
                "vault_update",
                "Start updating an existing password profile in the user's vault",
                no_args.clone(),
            ),
            ToolSchema::new(
                "vault_delete",
                "Start deleting a password profile from the user's vault",
                no_args,
            ),
        ]
    }

    async fn handle(
        &self,
        function: &str,
        ctx: &ModuleContext,
        _input: &Input,
    ) -> Option<HandlerResult> {
        let output = match function {
            "vault_get" => self.fetch_database(ctx).await,
            "vault_create" => self.start(ctx, Mode::Create),
            "vault_update" => self.start(ctx, Mode::Update),
            "vault_delete" => self.start(ctx, Mode::Delete),
            _ => return None,
        };
        Some(HandlerResult::Direct(output))
    }

    async fn resume(&self, step: &str, ctx: &ModuleContext, input: &Input) -> Output {
        match step {
            "create_step" => self.collect(ctx, input, Mode::Create),
            "update_step" => self.collect(ctx, input, Mode::Update),
            "delete_step" => self.collect(ctx, input, Mode::Delete),
            "create_confirm" => self.confirm(ctx, input, Mode::Create).await,
            "update_confirm" => self.confirm(ctx, input, Mode::Update).await,
            "delete_confirm" => self.confirm(ctx, input, Mode::Delete).await,
            other => Output::error(format!("module vault has no step '{other}'")),
        }
    }
}

fn load_profile(ctx: &ModuleContext) -> Option<VaultProfile> {
    ctx.var(PROFILE_VAR)
        .and_then(|value| serde_json::from_value(value).ok())
}

fn load_index(ctx: &ModuleContext) -> Option<usize> {
    ctx.var(INDEX_VAR)
        .and_then(|value| value.as_u64())
        .map(|idx| idx as usize)
}

/// Store one raw input into the profile field at `idx`.
fn apply_field(profile: &mut VaultProfile, idx: usize, value: &str) -> Result<(), String> {
    match idx {
        0 => {
            if !valid_title(value) {
                return Err("invalid title".to_string());
            }
            profile.title = value.to_string();
        }
        1 => {
            if !valid_path(value) {
                return Err("invalid path".to_string());
            }
            profile.path = value.to_string();
        }
        2 => profile.username = value.to_string(),
        3 => profile.password = value.to_string(),
        4 => profile.url = value.to_string(),
        5 => profile.notes = if value == "none" { String::new() } else { value.to_string() },
        _ => return Err("no field left to collect".to_string()),
    }
    Ok(())
}

/// Titles are single words: no whitespace or punctuation.
fn valid_title(title: &str) -> bool {
    let Ok(regex) = Regex::new(r"\W") else {
        return false;
    };
    !title.is_empty() && !regex.is_match(title)
}

/// Paths look like `/folder/sub-folder/`.
fn valid_path(path: &str) -> bool {
    let Ok(regex) = Regex::new(r"^(/[a-z-]+)+/?$") else {
        return false;
    };
    regex.is_match(path)
}

fn confirm_message(profile: &VaultProfile) -> String {
    format!(
        "Value saved successfully.\n\n\
         Title: {}\n\
         Path: {}\n\
         Username: {}\n\
         Password: {}\n\
         URL: {}\n\
         Notes:\n{}\n\n\
         Is this the profile you want to save?",
        profile.title, profile.path, profile.username, profile.password, profile.url, profile.notes
    )
}

#[cfg(test)]
mod tests {
    use super::{VaultProfile, apply_field, valid_path, valid_title};
    use pretty_assertions::assert_eq;

    #[test]
    fn titles_are_single_words() {
        assert!(valid_title("email"));
        assert!(valid_title("work_email"));
        assert!(!valid_title("my email"));
        assert!(!valid_title("email!"));
        assert!(!valid_title(""));
    }

    #[test]
    fn paths_are_slash_separated_lowercase() {
        assert!(valid_path("/mail"));
        assert!(valid_path("/mail/personal/"));
        assert!(valid_path("/my-accounts/mail"));
        assert!(!valid_path("mail"));
        assert!(!valid_path("/Mail"));
        assert!(!valid_path("//mail"));
    }

    #[test]
    fn notes_treat_none_as_empty() {
        let mut profile = VaultProfile::default();
        apply_field(&mut profile, 5, "none").expect("apply");
        assert_eq!(profile.notes, "");
        apply_field(&mut profile, 5, "shared with team").expect("apply");
        assert_eq!(profile.notes, "shared with team");
    }

    #[test]
    fn out_of_range_field_is_an_error() {
        let mut profile = VaultProfile::default();
        assert!(apply_field(&mut profile, 9, "x").is_err());
    }
}
