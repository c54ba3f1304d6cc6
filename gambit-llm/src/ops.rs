//! The structured-output call path: resolve tools, prompt, retry, time out,
//! validate, fold, and report.

use crate::retry::RetryPolicy;
use crate::sender::{MessageSender, ModelProvider, fold_candidates, role_label};
use crate::validation::{
    SchemaValidator, ValidationPromptGenerator, extract_json, output_schema,
};
use gambit_events::{EventKind, ProcessEmitter};
use gambit_tool::{DecorationConfig, decorate_tool};
use gambit_types::{
    LlmError, LlmInteraction, Message, TokenUsage, ToolDefinition, ToolDyn,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Resolves tool-group references into concrete tools.
pub trait ToolGroupResolver: Send + Sync {
    /// The tools belonging to `group`. Unknown groups resolve empty.
    fn resolve(&self, group: &str) -> Vec<Arc<dyn ToolDyn>>;
}

/// A resolver that knows no groups.
pub struct NoToolGroups;

impl ToolGroupResolver for NoToolGroups {
    fn resolve(&self, _group: &str) -> Vec<Arc<dyn ToolDyn>> {
        Vec::new()
    }
}

/// The outcome of [`LlmOperations::create_object_if_possible`] — a failure
/// value instead of an error, for callers that treat "could not produce the
/// object" as data.
#[derive(Debug)]
pub enum StructuredOutcome<T> {
    /// The object was produced.
    Success(T),
    /// The call failed; here is why.
    Failure {
        /// Display form of the underlying error.
        message: String,
    },
}

impl<T> StructuredOutcome<T> {
    /// The success value, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            StructuredOutcome::Success(value) => Some(value),
            StructuredOutcome::Failure { .. } => None,
        }
    }
}

/// Per-call environment: where events go, how tools get decorated, and the
/// cancellation token checked before every attempt.
#[derive(Clone)]
pub struct LlmCallContext {
    /// Event source for request/response events.
    pub emitter: ProcessEmitter,
    /// Decoration applied to every tool resolved for the interaction.
    pub decoration: DecorationConfig,
    /// Cooperative cancellation.
    pub cancellation: CancellationToken,
}

impl LlmCallContext {
    /// A context that emits through `emitter` with bare decoration and a
    /// fresh cancellation token.
    #[must_use]
    pub fn new(emitter: ProcessEmitter) -> Self {
        Self {
            emitter,
            decoration: DecorationConfig::bare(),
            cancellation: CancellationToken::new(),
        }
    }
}

/// Executes structured-output LLM calls.
pub struct LlmOperations {
    provider: Arc<dyn ModelProvider>,
    groups: Arc<dyn ToolGroupResolver>,
    retry: RetryPolicy,
}

impl LlmOperations {
    /// Operations over `provider` with the given group resolver and retry
    /// policy.
    #[must_use]
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        groups: Arc<dyn ToolGroupResolver>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            groups,
            retry,
        }
    }

    /// Operations with no tool groups and the default retry policy.
    #[must_use]
    pub fn over(provider: Arc<dyn ModelProvider>) -> Self {
        Self::new(provider, Arc::new(NoToolGroups), RetryPolicy::default())
    }

    /// The sender serving `interaction`.
    pub fn sender_for(
        &self,
        interaction: &LlmInteraction,
    ) -> Result<Arc<dyn MessageSender>, LlmError> {
        self.provider.sender_for(&interaction.options)
    }

    /// Resolve and decorate every tool the interaction offers, direct tools
    /// first, then group members in reference order.
    #[must_use]
    pub fn resolve_tools(
        &self,
        interaction: &LlmInteraction,
        decoration: &DecorationConfig,
    ) -> Vec<Arc<dyn ToolDyn>> {
        let mut tools: Vec<Arc<dyn ToolDyn>> = Vec::new();
        for tool in &interaction.tools {
            tools.push(decorate_tool(Arc::clone(tool), decoration));
        }
        for group in &interaction.tool_groups {
            let mut config = decoration.clone();
            config.group = Some(group.clone());
            for tool in self.groups.resolve(group) {
                tools.push(decorate_tool(tool, &config));
            }
        }
        tools
    }

    /// Produce a `T` from the model, or fail loudly.
    ///
    /// When the interaction has validation enabled and the candidate
    /// violates the output type's constraints, exactly one additional
    /// attempt is made with a violations report appended to the prompt;
    /// remaining violations fail the call with
    /// [`LlmError::InvalidStructuredOutput`].
    pub async fn create_object<T>(
        &self,
        messages: Vec<Message>,
        interaction: &LlmInteraction,
        ctx: &LlmCallContext,
    ) -> Result<T, LlmError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let tools = self.resolve_tools(interaction, &ctx.decoration);
        let definitions: Vec<ToolDefinition> = tools.iter().map(|t| t.definition()).collect();

        ctx.emitter.emit(EventKind::LlmRequest {
            interaction: interaction.id.clone(),
            model: role_label(&interaction.options.role).to_string(),
        });

        let schema = output_schema::<T>();
        let validator = SchemaValidator::new(&schema)?;

        let mut conversation = messages;
        if interaction.validate {
            conversation.push(ValidationPromptGenerator::shape_message(&schema));
        }

        let sender = self.sender_for(interaction)?;
        let start = Instant::now();
        let mut usage = TokenUsage::default();

        let mut candidate = self
            .json_with_retry(&sender, &conversation, &definitions, interaction, ctx, &mut usage)
            .await?;

        if interaction.validate {
            let violations = validator.violations(&candidate);
            if !violations.is_empty() {
                tracing::debug!(
                    interaction = %interaction.id,
                    violations = violations.len(),
                    "structured output violated constraints; making one corrective attempt"
                );
                conversation.push(ValidationPromptGenerator::violations_message(&violations));
                candidate = self
                    .json_with_retry(
                        &sender,
                        &conversation,
                        &definitions,
                        interaction,
                        ctx,
                        &mut usage,
                    )
                    .await?;
                let remaining = validator.violations(&candidate);
                if !remaining.is_empty() {
                    return Err(LlmError::InvalidStructuredOutput {
                        violations: remaining,
                        candidate,
                    });
                }
            }
        }

        let object: T =
            serde_json::from_value(candidate).map_err(|e| LlmError::Parse(e.to_string()))?;

        ctx.emitter.emit(EventKind::LlmResponse {
            interaction: interaction.id.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            usage,
        });
        Ok(object)
    }

    /// Produce plain assistant text from the model — the unvalidated
    /// sibling of [`create_object`](Self::create_object), with the same
    /// retry, timeout, folding, and event behavior.
    pub async fn generate_text(
        &self,
        messages: Vec<Message>,
        interaction: &LlmInteraction,
        ctx: &LlmCallContext,
    ) -> Result<Message, LlmError> {
        let tools = self.resolve_tools(interaction, &ctx.decoration);
        let definitions: Vec<ToolDefinition> = tools.iter().map(|t| t.definition()).collect();

        ctx.emitter.emit(EventKind::LlmRequest {
            interaction: interaction.id.clone(),
            model: role_label(&interaction.options.role).to_string(),
        });
        let sender = self.sender_for(interaction)?;
        let start = Instant::now();
        let mut usage = TokenUsage::default();

        let mut attempt: u32 = 0;
        let message = loop {
            if ctx.cancellation.is_cancelled() {
                return Err(LlmError::Interrupted);
            }
            attempt += 1;

            let timeout = interaction.options.timeout;
            let result = match tokio::time::timeout(timeout, sender.send(&messages, &definitions))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(timeout)),
            };
            match result {
                Ok(reply) => {
                    usage.accumulate(&reply.usage);
                    break fold_candidates(&reply.candidates);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        interaction = %interaction.id,
                        attempt,
                        error = %e,
                        ?delay,
                        "retrying llm call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        ctx.emitter.emit(EventKind::LlmResponse {
            interaction: interaction.id.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            usage,
        });
        Ok(message)
    }

    /// Like [`create_object`](Self::create_object), but returns a failure
    /// value rather than an error.
    pub async fn create_object_if_possible<T>(
        &self,
        messages: Vec<Message>,
        interaction: &LlmInteraction,
        ctx: &LlmCallContext,
    ) -> StructuredOutcome<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        match self.create_object(messages, interaction, ctx).await {
            Ok(value) => StructuredOutcome::Success(value),
            Err(e) => {
                tracing::warn!(interaction = %interaction.id, error = %e, "create_object failed");
                StructuredOutcome::Failure {
                    message: e.to_string(),
                }
            }
        }
    }

    /// One logical JSON-producing call: retried per policy, each attempt
    /// bounded by the interaction timeout.
    async fn json_with_retry(
        &self,
        sender: &Arc<dyn MessageSender>,
        messages: &[Message],
        tools: &[ToolDefinition],
        interaction: &LlmInteraction,
        ctx: &LlmCallContext,
        usage: &mut TokenUsage,
    ) -> Result<serde_json::Value, LlmError> {
        let mut attempt: u32 = 0;
        loop {
            if ctx.cancellation.is_cancelled() {
                return Err(LlmError::Interrupted);
            }
            attempt += 1;

            match self
                .one_attempt(sender, messages, tools, interaction, usage)
                .await
            {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        interaction = %interaction.id,
                        attempt,
                        error = %e,
                        ?delay,
                        "retrying llm call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A single attempt: timeout-bounded send, candidate folding, text
    /// extraction, JSON parse. The in-flight call is dropped (cancelled)
    /// when the timeout elapses.
    async fn one_attempt(
        &self,
        sender: &Arc<dyn MessageSender>,
        messages: &[Message],
        tools: &[ToolDefinition],
        interaction: &LlmInteraction,
        usage: &mut TokenUsage,
    ) -> Result<serde_json::Value, LlmError> {
        let timeout = interaction.options.timeout;
        let reply = match tokio::time::timeout(timeout, sender.send(messages, tools)).await {
            Ok(result) => result?,
            Err(_) => return Err(LlmError::Timeout(timeout)),
        };
        usage.accumulate(&reply.usage);

        let message = fold_candidates(&reply.candidates);
        extract_json(&message.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::sender::SenderReply;
    use gambit_events::{AgentEvent, EventBus, EventListener};
    use gambit_types::{LlmOptions, ProcessId};
    use schemars::JsonSchema;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Person {
        #[allow(dead_code)]
        name: String,
        #[schemars(range(min = 1))]
        age: i64,
    }

    struct ScriptedSender {
        replies: Mutex<VecDeque<Result<SenderReply, LlmError>>>,
        calls: AtomicUsize,
        last_messages: Mutex<Vec<Message>>,
    }

    impl ScriptedSender {
        fn new(replies: Vec<Result<SenderReply, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                last_messages: Mutex::new(Vec::new()),
            }
        }

        fn text_reply(text: &str) -> Result<SenderReply, LlmError> {
            Ok(SenderReply::single(
                Message::assistant(text),
                TokenUsage::new(10, 5),
            ))
        }
    }

    #[async_trait]
    impl MessageSender for ScriptedSender {
        async fn send(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<SenderReply, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock().unwrap() = messages.to_vec();
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedSender: no more replies queued")
        }
    }

    struct SingleModel(Arc<ScriptedSender>);

    impl ModelProvider for SingleModel {
        fn sender_for(
            &self,
            _options: &LlmOptions,
        ) -> Result<Arc<dyn MessageSender>, LlmError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<AgentEvent>>,
    }

    impl EventListener for Recorder {
        fn on_event(&self, event: &AgentEvent) -> Result<(), gambit_events::EventError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn context() -> (LlmCallContext, Arc<Recorder>) {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder::default());
        let listener: Arc<dyn EventListener> = recorder.clone();
        bus.subscribe(&listener);
        (
            LlmCallContext::new(ProcessEmitter::new(bus, ProcessId::new("p-1"))),
            recorder,
        )
    }

    fn ops_with(sender: Arc<ScriptedSender>) -> LlmOperations {
        LlmOperations::new(
            Arc::new(SingleModel(sender)),
            Arc::new(NoToolGroups),
            RetryPolicy {
                initial_backoff: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
        )
    }

    fn interaction() -> LlmInteraction {
        LlmInteraction::new("i-1", LlmOptions::best())
    }

    #[tokio::test]
    async fn create_object_happy_path() {
        let sender = Arc::new(ScriptedSender::new(vec![ScriptedSender::text_reply(
            r#"{"name": "Al", "age": 30}"#,
        )]));
        let ops = ops_with(sender.clone());
        let (ctx, recorder) = context();

        let person: Person = ops
            .create_object(vec![Message::user("who?")], &interaction(), &ctx)
            .await
            .unwrap();

        assert_eq!(person.age, 30);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);

        let events = recorder.events.lock().unwrap();
        assert!(matches!(events[0].kind, EventKind::LlmRequest { .. }));
        assert!(matches!(
            events[1].kind,
            EventKind::LlmResponse { usage, .. } if usage == TokenUsage::new(10, 5)
        ));
    }

    #[tokio::test]
    async fn validation_retries_exactly_once_with_violation_report() {
        let sender = Arc::new(ScriptedSender::new(vec![
            ScriptedSender::text_reply(r#"{"name": "Al", "age": -1}"#),
            ScriptedSender::text_reply(r#"{"name": "Al", "age": 30}"#),
        ]));
        let ops = ops_with(sender.clone());
        let (ctx, _recorder) = context();

        let person: Person = ops
            .create_object(vec![Message::user("who?")], &interaction(), &ctx)
            .await
            .unwrap();

        assert_eq!(person.age, 30);
        // Exactly two LLM calls were made.
        assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
        // The second prompt carried a violation report mentioning the field.
        let prompt = sender.last_messages.lock().unwrap();
        let report = prompt
            .iter()
            .map(Message::text)
            .collect::<Vec<_>>()
            .join("\n");
        assert!(report.contains("age"));
        assert!(report.contains("violated"));
    }

    #[tokio::test]
    async fn persistent_violations_fail_with_candidate() {
        let sender = Arc::new(ScriptedSender::new(vec![
            ScriptedSender::text_reply(r#"{"name": "Al", "age": -1}"#),
            ScriptedSender::text_reply(r#"{"name": "Al", "age": -2}"#),
        ]));
        let ops = ops_with(sender.clone());
        let (ctx, _recorder) = context();

        let err = ops
            .create_object::<Person>(vec![Message::user("who?")], &interaction(), &ctx)
            .await
            .unwrap_err();

        match err {
            LlmError::InvalidStructuredOutput { violations, candidate } => {
                assert!(violations[0].contains("age"));
                assert_eq!(candidate["age"], serde_json::json!(-2));
            }
            other => panic!("expected InvalidStructuredOutput, got {other:?}"),
        }
        // No further attempts after the single corrective one.
        assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let sender = Arc::new(ScriptedSender::new(vec![
            Err(LlmError::Transport("connection reset".into())),
            ScriptedSender::text_reply("not json at all"),
            ScriptedSender::text_reply(r#"{"name": "Al", "age": 30}"#),
        ]));
        let ops = ops_with(sender.clone());
        let (ctx, _recorder) = context();

        let person: Person = ops
            .create_object(vec![Message::user("who?")], &interaction(), &ctx)
            .await
            .unwrap();
        assert_eq!(person.age, 30);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retriable_errors_surface_unwrapped() {
        let sender = Arc::new(ScriptedSender::new(vec![Err(LlmError::NoSuitableModel(
            "best".into(),
        ))]));
        let ops = ops_with(sender.clone());
        let (ctx, _recorder) = context();

        let err = ops
            .create_object::<Person>(vec![Message::user("who?")], &interaction(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NoSuitableModel(_)));
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_interrupts_before_attempt() {
        let sender = Arc::new(ScriptedSender::new(vec![]));
        let ops = ops_with(sender.clone());
        let (ctx, _recorder) = context();
        ctx.cancellation.cancel();

        let err = ops
            .create_object::<Person>(vec![Message::user("who?")], &interaction(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Interrupted));
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn if_possible_returns_failure_value() {
        let sender = Arc::new(ScriptedSender::new(vec![Err(LlmError::NoSuitableModel(
            "best".into(),
        ))]));
        let ops = ops_with(sender);
        let (ctx, _recorder) = context();

        let outcome: StructuredOutcome<Person> = ops
            .create_object_if_possible(vec![Message::user("who?")], &interaction(), &ctx)
            .await;
        match outcome {
            StructuredOutcome::Failure { message } => {
                assert!(message.contains("no suitable model"));
            }
            StructuredOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn generate_text_retries_and_folds() {
        let sender = Arc::new(ScriptedSender::new(vec![
            Err(LlmError::Transport("reset".into())),
            Ok(SenderReply {
                candidates: vec![Message::assistant("hello "), Message::assistant("world")],
                usage: TokenUsage::new(4, 2),
            }),
        ]));
        let ops = ops_with(sender.clone());
        let (ctx, recorder) = context();

        let message = ops
            .generate_text(vec![Message::user("hi")], &interaction(), &ctx)
            .await
            .unwrap();

        assert_eq!(message.text(), "hello world");
        assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
        let events = recorder.events.lock().unwrap();
        assert!(matches!(
            events[1].kind,
            EventKind::LlmResponse { usage, .. } if usage == TokenUsage::new(4, 2)
        ));
    }

    #[tokio::test]
    async fn validation_disabled_skips_shape_prompt() {
        let sender = Arc::new(ScriptedSender::new(vec![ScriptedSender::text_reply(
            // Violates the constraint, but validation is off.
            r#"{"name": "Al", "age": -1}"#,
        )]));
        let ops = ops_with(sender.clone());
        let (ctx, _recorder) = context();

        let person: Person = ops
            .create_object(
                vec![Message::user("who?")],
                &interaction().without_validation(),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(person.age, -1);

        let prompt = sender.last_messages.lock().unwrap();
        assert_eq!(prompt.len(), 1);
    }
}
