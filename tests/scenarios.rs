//! End-to-end scenarios across the whole workspace, driven by scripted
//! message senders — no API keys, no network.

use async_trait::async_trait;
use gambit::prelude::*;
use gambit_blackboard::IT;
use gambit_types::{ContentBlock, LlmError, ToolCallId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ScriptedSender — canned replies, no network
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ScriptedSender {
    replies: Mutex<VecDeque<SenderReply>>,
}

impl ScriptedSender {
    fn new(replies: Vec<SenderReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl MessageSender for ScriptedSender {
    async fn send(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<SenderReply, LlmError> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedSender: no more replies queued"))
    }
}

fn text_reply(text: &str) -> SenderReply {
    SenderReply::single(Message::assistant(text), TokenUsage::new(10, 5))
}

fn tool_use_reply(id: &str, name: &str, input: serde_json::Value) -> SenderReply {
    SenderReply::single(
        Message {
            role: gambit_types::Role::Assistant,
            content: vec![ContentBlock::ToolUse {
                id: ToolCallId::new(id),
                name: name.into(),
                input,
            }],
        },
        TokenUsage::new(10, 15),
    )
}

fn llm_with(sender: Arc<ScriptedSender>) -> Arc<LlmOperations> {
    Arc::new(LlmOperations::over(Arc::new(
        ModelRegistry::new().with_best(sender),
    )))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Domain types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize, Deserialize)]
struct Frog {
    name: String,
}

impl TypeNamed for Frog {
    fn type_name() -> &'static str {
        "Frog"
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Prince {
    name: String,
}

impl TypeNamed for Prince {
    fn type_name() -> &'static str {
        "Prince"
    }
}

fn frog_agent() -> AgentDefinition {
    AgentDefinition::new("frogger")
        .with_planner(PlannerKind::Supervisor)
        .with_goal(Goal::new("prince", "Prince").describe("turn the input into royalty"))
        .with_action(
            Action::new(
                "turnIntoFrog",
                executor_fn(|ctx| {
                    let input: Result<UserInput, _> = ctx.first_input_as();
                    Box::pin(async move {
                        let input = input?;
                        Ok(ActionStep::done(TypedValue::of(&Frog {
                            name: input.content,
                        })?))
                    })
                }),
            )
            .with_input(UserInput::type_name())
            .with_named_output("frog", Frog::type_name())
            .with_cost(Decimal::ONE),
        )
        .with_action(
            Action::new(
                "turnIntoPrince",
                executor_fn(|ctx| {
                    let frog: Result<Frog, _> = ctx.first_input_as();
                    Box::pin(async move {
                        let frog = frog?;
                        Ok(ActionStep::done(TypedValue::of(&Prince {
                            name: format!("Prince from {}", frog.name),
                        })?))
                    })
                }),
            )
            .with_input(Frog::type_name())
            .with_named_output("prince", Prince::type_name())
            .with_cost(Decimal::ONE)
            .achieves("prince"),
        )
}

fn kermit_bindings() -> Vec<(String, TypedValue)> {
    vec![(
        IT.to_string(),
        TypedValue::of(&UserInput::new("Kermit")).unwrap(),
    )]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenarios
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn two_step_supervisor_turns_kermit_into_a_prince() {
    // The scripted model orchestrates: call turnIntoFrog, then stop. The
    // goal action runs separately once its Frog input exists.
    let sender = ScriptedSender::new(vec![
        tool_use_reply("t1", "turnIntoFrog", json!({})),
        text_reply("done"),
    ]);
    let mut process = AgentProcess::new(
        frog_agent(),
        kermit_bindings(),
        llm_with(sender),
        EventBus::new(),
        ProcessOptions::default(),
    );
    let report = process.run().await;

    assert_eq!(report.status, ProcessStatus::Completed);
    let frog = report
        .board
        .iter()
        .find(|e| e.value.conforms("Frog"))
        .expect("frog on board");
    assert_eq!(frog.value.value["name"], "Kermit");
    let prince = report
        .board
        .iter()
        .find(|e| e.value.conforms("Prince"))
        .expect("prince on board");
    assert_eq!(prince.value.value["name"], "Prince from Kermit");

    // Both actions ran through the dispatcher, visibly.
    assert_eq!(report.actions_run, vec!["turnIntoFrog", "turnIntoPrince"]);
    assert!(report.events.iter().any(|e| matches!(
        &e.kind,
        EventKind::ToolCallRequest { tool, .. } if tool == "turnIntoFrog"
    )));
    assert_eq!(report.last_message.as_ref().map(Message::text).as_deref(), Some("done"));
}

#[tokio::test]
async fn supervisor_replan_signal_reenters_the_loop() {
    // A tool raising the replan signal escapes the decorator chain and the
    // tool loop untouched; the process re-plans (stays RUNNING) and the
    // next supervisor round completes the work.
    struct ReplanOnce {
        fired: Mutex<bool>,
    }

    let agent = {
        let fired = Arc::new(ReplanOnce {
            fired: Mutex::new(false),
        });
        AgentDefinition::new("replanner")
            .with_planner(PlannerKind::Supervisor)
            .with_goal(Goal::new("prince", "Prince"))
            .with_action(
                Action::new(
                    "turnIntoFrog",
                    executor_fn(move |ctx| {
                        let fired = fired.clone();
                        let input: Result<UserInput, _> = ctx.first_input_as();
                        Box::pin(async move {
                            let mut fired = fired.fired.lock().unwrap();
                            if !*fired {
                                *fired = true;
                                return Ok(ActionStep::Replan {
                                    reason: "pond was dry".into(),
                                });
                            }
                            let input = input?;
                            Ok(ActionStep::done(TypedValue::of(&Frog {
                                name: input.content,
                            })?))
                        })
                    }),
                )
                .with_input(UserInput::type_name())
                .with_named_output("frog", Frog::type_name()),
            )
            .with_action(
                Action::new(
                    "turnIntoPrince",
                    executor_fn(|ctx| {
                        let frog: Result<Frog, _> = ctx.first_input_as();
                        Box::pin(async move {
                            let frog = frog?;
                            Ok(ActionStep::done(TypedValue::of(&Prince {
                                name: format!("Prince from {}", frog.name),
                            })?))
                        })
                    }),
                )
                .with_input(Frog::type_name())
                .with_named_output("prince", Prince::type_name())
                .achieves("prince"),
            )
    };

    let sender = ScriptedSender::new(vec![
        // Round one: the tool call raises the replan signal.
        tool_use_reply("t1", "turnIntoFrog", json!({})),
        // Round two: try again, then stop.
        tool_use_reply("t2", "turnIntoFrog", json!({})),
        text_reply("done"),
    ]);
    let mut process = AgentProcess::new(
        agent,
        kermit_bindings(),
        llm_with(sender),
        EventBus::new(),
        ProcessOptions::default(),
    );
    let report = process.run().await;

    assert_eq!(report.status, ProcessStatus::Completed);
    // The signal was recorded as an event, not wrapped into a failure.
    assert!(report.events.iter().any(|e| matches!(
        &e.kind,
        EventKind::ReplanRequested { reason } if reason == "pond was dry"
    )));
}

#[tokio::test]
async fn supervisor_user_input_signal_suspends_then_resumes() {
    // turnIntoFrog refuses to run until a FrogName preference is bound,
    // raising the user-input signal through the decorator chain, the tool
    // loop, and the supervisor — which parks the process.
    let agent = AgentDefinition::new("asker")
        .with_planner(PlannerKind::Supervisor)
        .with_goal(Goal::new("prince", "Prince"))
        .with_action(
            Action::new(
                "turnIntoFrog",
                executor_fn(|ctx| {
                    let name = ctx
                        .board
                        .iter()
                        .find(|e| e.value.conforms("FrogName"))
                        .and_then(|e| e.value.value.as_str().map(str::to_string));
                    Box::pin(async move {
                        match name {
                            None => Ok(ActionStep::AwaitUserInput {
                                prompt: "what is the frog's name?".into(),
                            }),
                            Some(name) => {
                                Ok(ActionStep::done(TypedValue::of(&Frog { name })?))
                            }
                        }
                    })
                }),
            )
            .with_input(UserInput::type_name())
            .with_named_output("frog", Frog::type_name()),
        )
        .with_action(
            Action::new(
                "turnIntoPrince",
                executor_fn(|ctx| {
                    let frog: Result<Frog, _> = ctx.first_input_as();
                    Box::pin(async move {
                        let frog = frog?;
                        Ok(ActionStep::done(TypedValue::of(&Prince {
                            name: format!("Prince from {}", frog.name),
                        })?))
                    })
                }),
            )
            .with_input(Frog::type_name())
            .with_named_output("prince", Prince::type_name())
            .achieves("prince"),
        );

    let sender = ScriptedSender::new(vec![
        // Round one: the action call raises the user-input signal.
        tool_use_reply("t1", "turnIntoFrog", json!({})),
        // After resume: try again, then stop.
        tool_use_reply("t2", "turnIntoFrog", json!({})),
        text_reply("done"),
    ]);
    let mut process = AgentProcess::new(
        agent,
        kermit_bindings(),
        llm_with(sender),
        EventBus::new(),
        ProcessOptions::default(),
    );

    let report = process.run().await;
    assert_eq!(report.status, ProcessStatus::WaitingForInput);
    assert!(report.events.iter().any(|e| matches!(
        &e.kind,
        EventKind::ProcessWaiting { prompt } if prompt == "what is the frog's name?"
    )));

    process
        .resume(vec![(
            "frog_name".to_string(),
            TypedValue::raw("FrogName", json!("Kermit")),
        )])
        .unwrap();
    let report = process.run().await;
    assert_eq!(report.status, ProcessStatus::Completed);
}

#[tokio::test]
async fn event_listeners_observe_identical_ordered_streams() {
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u64>>,
    }
    impl EventListener for Recorder {
        fn on_event(&self, event: &AgentEvent) -> Result<(), gambit_events::EventError> {
            self.seen.lock().unwrap().push(event.seq);
            Ok(())
        }
    }

    let bus = EventBus::new();
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());
    let first_dyn: Arc<dyn EventListener> = first.clone();
    let second_dyn: Arc<dyn EventListener> = second.clone();
    bus.subscribe(&first_dyn);
    bus.subscribe(&second_dyn);

    let sender = ScriptedSender::new(vec![
        tool_use_reply("t1", "turnIntoFrog", json!({})),
        text_reply("done"),
    ]);
    let mut process = AgentProcess::new(
        frog_agent(),
        kermit_bindings(),
        llm_with(sender),
        bus,
        ProcessOptions::default(),
    );
    process.run().await;

    let first_seen = first.seen.lock().unwrap().clone();
    let second_seen = second.seen.lock().unwrap().clone();
    assert!(!first_seen.is_empty());
    assert_eq!(first_seen, second_seen);
    let mut sorted = first_seen.clone();
    sorted.sort_unstable();
    assert_eq!(first_seen, sorted);
}

#[tokio::test]
async fn decorated_tool_name_survives_the_chain() {
    struct Probe;
    impl ToolDyn for Probe {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("probe", "A probe")
        }
        fn call<'a>(
            &'a self,
            _input: serde_json::Value,
            _ctx: &'a ToolContext,
        ) -> gambit_types::BoxFuture<'a, Result<ToolResult, gambit_types::ToolError>> {
            Box::pin(async { Ok(ToolResult::text("ok")) })
        }
    }

    let decorated = decorate_tool(Arc::new(Probe), &DecorationConfig::bare());
    assert_eq!(decorated.definition().name, "probe");
}
