//! Tool-call dispatch: deduplication, module routing, and short-circuits.

use crate::error::CoreError;
use crate::module::{HandlerResult, ModuleContext, ModuleRegistry};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashSet;
use valet_protocol::{Input, Output, ToolCallRequest};

/// A textual tool result queued for the model's second round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ToolReply {
    pub(crate) call_id: String,
    pub(crate) function: String,
    pub(crate) content: String,
}

/// What one model response's tool calls resolved to.
#[derive(Debug)]
pub(crate) enum DispatchOutcome {
    /// A handler produced a finished output; dispatch stopped there and the
    /// remaining calls must be truncated.
    Direct {
        call_id: String,
        function: String,
        output: Output,
    },
    /// Textual results to feed back to the model, one per claimed call.
    Replies(Vec<ToolReply>),
}

/// Routes deduplicated tool calls to registered modules.
pub(crate) struct ToolDispatcher {
    registry: ModuleRegistry,
}

impl ToolDispatcher {
    pub(crate) fn new(registry: ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Dispatch each call in order. Modules are probed in registration
    /// order; a module whose permission bits are disjoint from the masked
    /// input permissions is skipped without being consulted. A call no
    /// module claims produces no reply at all.
    pub(crate) async fn dispatch(
        &self,
        calls: &[ToolCallRequest],
        ctx: &ModuleContext,
        input: &mut Input,
    ) -> Result<DispatchOutcome, CoreError> {
        let modules = self.registry.all();
        let mut replies = Vec::new();

        for call in calls {
            input.parameters = decode_arguments(call)?;

            let mut claimed = false;
            for module in &modules {
                if !input.permissions.intersects(module.permissions()) {
                    continue;
                }
                let Some(result) = module.handle(&call.function, ctx, input).await else {
                    continue;
                };
                claimed = true;
                match result {
                    HandlerResult::Direct(output) => {
                        debug!(
                            "handler short-circuited dispatch (module={}, function={})",
                            module.name(),
                            call.function
                        );
                        return Ok(DispatchOutcome::Direct {
                            call_id: call.id.clone(),
                            function: call.function.clone(),
                            output,
                        });
                    }
                    HandlerResult::Data(value) => {
                        replies.push(ToolReply {
                            call_id: call.id.clone(),
                            function: call.function.clone(),
                            content: value.to_string(),
                        });
                    }
                }
                break;
            }

            if !claimed {
                warn!("no module claimed tool call (function={})", call.function);
            }
        }

        Ok(DispatchOutcome::Replies(replies))
    }
}

/// Drop repeated requests for the same function, keeping first-seen order.
pub(crate) fn dedupe_calls(calls: &[ToolCallRequest]) -> Vec<ToolCallRequest> {
    let mut seen = HashSet::new();
    calls
        .iter()
        .filter(|call| seen.insert(call.function.clone()))
        .cloned()
        .collect()
}

fn decode_arguments(call: &ToolCallRequest) -> Result<Map<String, Value>, CoreError> {
    if call.arguments.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value =
        serde_json::from_str(&call.arguments).map_err(|err| CoreError::BadToolArguments {
            function: call.function.clone(),
            message: err.to_string(),
        })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::BadToolArguments {
            function: call.function.clone(),
            message: format!("expected an object, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{DispatchOutcome, ToolDispatcher, dedupe_calls};
    use crate::continuation::{ContinuationQueue, VariableBag};
    use crate::module::{CapabilityModule, HandlerResult, ModuleContext, ModuleRegistry};
    use async_trait::async_trait;
    use parking_lot::RwLock;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;
    use valet_protocol::{Input, Output, Permissions, ToolCallRequest, ToolSchema};
    use valet_storage::MemoryRecord;

    struct EchoModule {
        permissions: Permissions,
        direct: bool,
    }

    #[async_trait]
    impl CapabilityModule for EchoModule {
        fn name(&self) -> &str {
            "echo"
        }

        fn permissions(&self) -> Permissions {
            self.permissions
        }

        fn schemas(&self) -> Vec<ToolSchema> {
            Vec::new()
        }

        async fn handle(
            &self,
            function: &str,
            _ctx: &ModuleContext,
            input: &Input,
        ) -> Option<HandlerResult> {
            if function != "echo_value" {
                return None;
            }
            if self.direct {
                return Some(HandlerResult::Direct(Output::text("done")));
            }
            Some(HandlerResult::Data(
                json!({"value": input.param_str("value")}),
            ))
        }
    }

    fn context() -> ModuleContext {
        ModuleContext::new(
            Arc::new(RwLock::new(MemoryRecord::empty(Uuid::new_v4()))),
            VariableBag::default(),
            ContinuationQueue::default(),
            Arc::new(HashMap::new()),
        )
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let calls = vec![
            ToolCallRequest::function("call-1", "get_current_weather", "{}"),
            ToolCallRequest::function("call-2", "set_city", "{}"),
            ToolCallRequest::function("call-3", "get_current_weather", "{}"),
        ];
        let unique = dedupe_calls(&calls);
        let names: Vec<&str> = unique.iter().map(|call| call.function.as_str()).collect();
        assert_eq!(names, vec!["get_current_weather", "set_city"]);
        assert_eq!(unique[0].id, "call-1");
    }

    #[tokio::test]
    async fn data_results_become_replies() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule {
            permissions: Permissions::PRIVATE_MODULES,
            direct: false,
        }));
        let dispatcher = ToolDispatcher::new(registry);
        let mut input = Input::new("", Permissions::ALL);

        let calls = vec![ToolCallRequest::function(
            "call-1",
            "echo_value",
            r#"{"value": "ping"}"#,
        )];
        let outcome = dispatcher
            .dispatch(&calls, &context(), &mut input)
            .await
            .expect("dispatch");

        match outcome {
            DispatchOutcome::Replies(replies) => {
                assert_eq!(replies.len(), 1);
                assert_eq!(replies[0].call_id, "call-1");
                assert_eq!(replies[0].content, r#"{"value":"ping"}"#);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn direct_result_stops_dispatch() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule {
            permissions: Permissions::PRIVATE_MODULES,
            direct: true,
        }));
        let dispatcher = ToolDispatcher::new(registry);
        let mut input = Input::new("", Permissions::ALL);

        let calls = vec![
            ToolCallRequest::function("call-1", "echo_value", "{}"),
            ToolCallRequest::function("call-2", "echo_value_other", "{}"),
        ];
        let outcome = dispatcher
            .dispatch(&calls, &context(), &mut input)
            .await
            .expect("dispatch");

        match outcome {
            DispatchOutcome::Direct { call_id, output, .. } => {
                assert_eq!(call_id, "call-1");
                assert_eq!(output.message, "done");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn permission_mismatch_skips_the_module() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule {
            permissions: Permissions::PRIVATE_MODULES,
            direct: false,
        }));
        let dispatcher = ToolDispatcher::new(registry);
        let mut input = Input::new("", Permissions::PUBLIC_MODULES);

        let calls = vec![ToolCallRequest::function("call-1", "echo_value", "{}")];
        let outcome = dispatcher
            .dispatch(&calls, &context(), &mut input)
            .await
            .expect("dispatch");

        match outcome {
            DispatchOutcome::Replies(replies) => assert_eq!(replies, Vec::new()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_arguments_abort_dispatch() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule {
            permissions: Permissions::PRIVATE_MODULES,
            direct: false,
        }));
        let dispatcher = ToolDispatcher::new(registry);
        let mut input = Input::new("", Permissions::ALL);

        let calls = vec![ToolCallRequest::function("call-1", "echo_value", "not json")];
        let err = dispatcher
            .dispatch(&calls, &context(), &mut input)
            .await
            .expect_err("malformed");
        assert!(matches!(
            err,
            crate::error::CoreError::BadToolArguments { .. }
        ));
    }
}
