//! Profile configuration module: writes user preferences into bot memory.

use async_trait::async_trait;
use serde_json::json;
use valet_core::{CapabilityModule, HandlerResult, ModuleContext};
use valet_protocol::{Input, Permissions, ToolSchema};

/// Lets the model record the user's timezone, city, and temperature unit.
#[derive(Debug, Default)]
pub struct ProfileModule;

impl ProfileModule {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CapabilityModule for ProfileModule {
    fn name(&self) -> &str {
        "profile"
    }

    fn permissions(&self) -> Permissions {
        Permissions::PRIVATE_MODULES
    }

    fn schemas(&self) -> Vec<ToolSchema> {
        vec![
            ToolSchema::new(
                "set_timezone",
                "Set the user's preferred timezone to a value supplied by the user",
                json!({
                    "type": "object",
                    "properties": {
                        "timezone": {
                            "type": "string",
                            "description": "The timezone corresponding to the IANA Time Zone Database, ex: America/New_York",
                        },
                    },
                    "required": ["timezone"],
                }),
            ),
            ToolSchema::new(
                "set_city",
                "Set the user's preferred city location to a value supplied by the user",
                json!({
                    "type": "object",
                    "properties": {
                        "city": {"type": "string", "description": "The city, ex: Raleigh"},
                    },
                    "required": ["city"],
                }),
            ),
            ToolSchema::new(
                "set_temperature_unit",
                "Record the user's preferred temperature unit",
                json!({
                    "type": "object",
                    "properties": {
                        "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]},
                    },
                    "required": ["unit"],
                }),
            ),
        ]
    }

    async fn handle(
        &self,
        function: &str,
        ctx: &ModuleContext,
        input: &Input,
    ) -> Option<HandlerResult> {
        let result = match function {
            "set_timezone" => match input.param_str("timezone") {
                Some(timezone) if !timezone.is_empty() => {
                    let timezone = timezone.to_string();
                    ctx.update_memory(|memory| memory.timezone = timezone);
                    json!({"message": "successfully saved timezone"})
                }
                _ => json!({"error": "timezone not formatted correctly"}),
            },
            "set_city" => match input.param_str("city") {
                Some(city) if !city.is_empty() => {
                    let city = city.to_string();
                    ctx.update_memory(|memory| memory.city = city);
                    json!({"message": "successfully saved city"})
                }
                _ => json!({"error": "city not formatted correctly"}),
            },
            "set_temperature_unit" => match input.param_str("unit") {
                Some(unit) if unit == "celsius" || unit == "fahrenheit" => {
                    let unit = unit.to_string();
                    ctx.update_memory(|memory| memory.temperature_unit = unit);
                    json!({"message": "successfully saved unit"})
                }
                _ => json!({"error": "unit not formatted correctly"}),
            },
            _ => return None,
        };
        Some(HandlerResult::Data(result))
    }
}

#[cfg(test)]
mod tests {
    use super::ProfileModule;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use valet_core::{CapabilityModule, HandlerResult};
    use valet_protocol::{Input, Permissions};

    fn input_with(params: serde_json::Value) -> Input {
        let mut input = Input::new("", Permissions::ALL);
        input.parameters = params.as_object().expect("object").clone();
        input
    }

    fn context() -> valet_core::ModuleContext {
        valet_core::ModuleContext::detached(std::collections::HashMap::new())
    }

    #[tokio::test]
    async fn set_city_writes_memory() {
        let module = ProfileModule::new();
        let ctx = context();

        let result = module
            .handle("set_city", &ctx, &input_with(json!({"city": "Raleigh"})))
            .await
            .expect("claimed");
        assert_eq!(
            result,
            HandlerResult::Data(json!({"message": "successfully saved city"}))
        );
        assert_eq!(ctx.memory().city, "Raleigh");
    }

    #[tokio::test]
    async fn missing_parameter_is_a_payload_error() {
        let module = ProfileModule::new();
        let ctx = context();

        let result = module
            .handle("set_timezone", &ctx, &input_with(json!({})))
            .await
            .expect("claimed");
        assert_eq!(
            result,
            HandlerResult::Data(json!({"error": "timezone not formatted correctly"}))
        );
        assert_eq!(ctx.memory().timezone, "");
    }

    #[tokio::test]
    async fn invalid_unit_is_rejected() {
        let module = ProfileModule::new();
        let ctx = context();

        let result = module
            .handle(
                "set_temperature_unit",
                &ctx,
                &input_with(json!({"unit": "kelvin"})),
            )
            .await
            .expect("claimed");
        assert_eq!(
            result,
            HandlerResult::Data(json!({"error": "unit not formatted correctly"}))
        );
    }

    #[tokio::test]
    async fn unknown_function_is_not_claimed() {
        let module = ProfileModule::new();
        let ctx = context();
        let result = module.handle("set_volume", &ctx, &input_with(json!({}))).await;
        assert_eq!(result, None);
    }
}
