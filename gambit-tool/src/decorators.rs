//! The standard decorator chain.
//!
//! Every tool handed to a model is wrapped in the same six layers so
//! decorators compose deterministically. Listed outermost first:
//!
//! 1. **process binding** — installs the calling process into the ambient
//!    [`ToolContext`] for the duration of the call
//! 2. **exception suppression** — converts failures into a `WARNING:` text
//!    result the model can react to
//! 3. **output transformation** — applies a configured string transformer
//!    (truncation, redaction) to result text
//! 4. **event publication** — admission delay, then request/response events
//! 5. **observability** — a tracing span covering the call
//! 6. **metadata enrichment** — group attribution plus failure logging
//!
//! Control-flow signals ([`ToolError::Signal`]) pass through every layer
//! unchanged.

use crate::middleware::{DecoratedTool, Next, ToolMiddleware};
use crate::scheduler::{NoDelay, OperationScheduler};
use gambit_events::{EventKind, ProcessEmitter};
use gambit_types::{
    BoxFuture, ProcessScope, ToolCall, ToolContext, ToolDyn, ToolError, ToolResult,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Transforms tool result text before it re-enters the conversation.
pub trait OutputTransformer: Send + Sync {
    /// Produce the transformed text.
    fn transform(&self, tool: &str, text: &str) -> String;
}

/// Truncates result text to a maximum number of characters.
#[derive(Debug, Clone, Copy)]
pub struct TruncatingTransformer {
    /// Maximum characters to keep.
    pub max_chars: usize,
}

impl OutputTransformer for TruncatingTransformer {
    fn transform(&self, _tool: &str, text: &str) -> String {
        if text.chars().count() <= self.max_chars {
            return text.to_string();
        }
        let kept: String = text.chars().take(self.max_chars).collect();
        format!("{kept}… [truncated]")
    }
}

/// Everything needed to assemble the standard chain for one tool.
#[derive(Clone, Default)]
pub struct DecorationConfig {
    /// Owning tool group, recorded in the tool's metadata.
    pub group: Option<String>,
    /// Event source; without one, no events are published.
    pub emitter: Option<ProcessEmitter>,
    /// Admission scheduler; `None` means no delay.
    pub scheduler: Option<Arc<dyn OperationScheduler>>,
    /// Output transformer; `None` leaves results untouched.
    pub transformer: Option<Arc<dyn OutputTransformer>>,
    /// Process to bind into the ambient context during calls.
    pub process: Option<Arc<dyn ProcessScope>>,
}

impl DecorationConfig {
    /// A config that decorates with observability only.
    #[must_use]
    pub fn bare() -> Self {
        Self::default()
    }
}

/// Wrap `tool` in the standard chain.
#[must_use]
pub fn decorate_tool(tool: Arc<dyn ToolDyn>, config: &DecorationConfig) -> Arc<dyn ToolDyn> {
    let mut chain: Vec<Arc<dyn ToolMiddleware>> = Vec::with_capacity(6);

    if let Some(process) = &config.process {
        chain.push(Arc::new(ProcessBindingLayer {
            scope: Arc::clone(process),
        }));
    }
    chain.push(Arc::new(SuppressExceptionsLayer));
    if let Some(transformer) = &config.transformer {
        chain.push(Arc::new(TransformOutputLayer {
            transformer: Arc::clone(transformer),
        }));
    }
    if let Some(emitter) = &config.emitter {
        chain.push(Arc::new(PublishEventsLayer {
            emitter: emitter.clone(),
            scheduler: config
                .scheduler
                .clone()
                .unwrap_or_else(|| Arc::new(NoDelay)),
        }));
    }
    chain.push(Arc::new(ObserveLayer));
    chain.push(Arc::new(EnrichMetadataLayer));

    let mut decorated = DecoratedTool::new(tool, chain);
    if let Some(group) = &config.group {
        decorated = decorated.with_group(group.clone());
    }
    Arc::new(decorated)
}

// --- Layer 1: process binding --------------------------------------------

/// Installs the calling process into the ambient context for the duration
/// of the call. The rebound context lives only for this call frame, so the
/// previous ambient process is restored on every exit path.
struct ProcessBindingLayer {
    scope: Arc<dyn ProcessScope>,
}

impl ToolMiddleware for ProcessBindingLayer {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let bound = ctx.bound_to(Arc::clone(&self.scope));
            next.run(call, bound).await
        })
    }
}

// --- Layer 2: exception suppression --------------------------------------

/// Converts any tool failure into a text result the model can see.
/// Control-flow signals are re-raised untouched.
struct SuppressExceptionsLayer;

impl ToolMiddleware for SuppressExceptionsLayer {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            match next.run(call, ctx).await {
                Ok(result) => Ok(result),
                Err(ToolError::Signal(signal)) => Err(ToolError::Signal(signal)),
                Err(e) => Ok(ToolResult::text(format!(
                    "WARNING: Tool '{}' failed with exception: {e}",
                    call.name
                ))),
            }
        })
    }
}

// --- Layer 3: output transformation --------------------------------------

/// Applies the configured string transformer to result text.
struct TransformOutputLayer {
    transformer: Arc<dyn OutputTransformer>,
}

impl ToolMiddleware for TransformOutputLayer {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let result = next.run(call, ctx).await?;
            Ok(match result {
                ToolResult::Text { content } => {
                    let transformed = self.transformer.transform(&call.name, &content);
                    log_savings(&call.name, content.len(), transformed.len());
                    ToolResult::Text {
                        content: transformed,
                    }
                }
                ToolResult::WithArtifact { content, artifact } => {
                    let transformed = self.transformer.transform(&call.name, &content);
                    log_savings(&call.name, content.len(), transformed.len());
                    ToolResult::WithArtifact {
                        content: transformed,
                        artifact,
                    }
                }
                other @ ToolResult::Error { .. } => other,
            })
        })
    }
}

fn log_savings(tool: &str, before: usize, after: usize) {
    if after < before {
        tracing::debug!(tool, saved_bytes = before - after, "tool output transformed");
    }
}

// --- Layer 4: event publication ------------------------------------------

/// Consults the scheduler for an admission delay, then publishes a
/// request/response event pair around the call.
struct PublishEventsLayer {
    emitter: ProcessEmitter,
    scheduler: Arc<dyn OperationScheduler>,
}

impl ToolMiddleware for PublishEventsLayer {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let delay = self.scheduler.delay_before(&call.name);
            if !delay.is_zero() {
                tracing::debug!(tool = %call.name, ?delay, "admission delay before tool call");
                tokio::time::sleep(delay).await;
            }

            self.emitter.emit(EventKind::ToolCallRequest {
                tool: call.name.clone(),
                input: call.input.clone(),
            });

            let start = Instant::now();
            let outcome = next.run(call, ctx).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &outcome {
                Ok(result) => self.emitter.emit(EventKind::ToolCallResponse {
                    tool: call.name.clone(),
                    outcome: result.content_str().to_string(),
                    is_error: result.is_error(),
                    elapsed_ms,
                }),
                Err(e) => self.emitter.emit(EventKind::ToolCallResponse {
                    tool: call.name.clone(),
                    outcome: e.to_string(),
                    is_error: true,
                    elapsed_ms,
                }),
            }
            outcome
        })
    }
}

// --- Layer 5: observability ----------------------------------------------

/// Wraps the call in a tracing span tagging tool name, input, and status.
/// The span closes when the future resolves, on every exit path.
struct ObserveLayer;

impl ToolMiddleware for ObserveLayer {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        let span = tracing::debug_span!(
            "tool.execute",
            tool = %call.name,
            input = %call.input,
            status = tracing::field::Empty,
        );
        Box::pin(
            async move {
                let outcome = next.run(call, ctx).await;
                let span = tracing::Span::current();
                match &outcome {
                    Ok(result) if result.is_error() => span.record("status", "error"),
                    Ok(_) => span.record("status", "ok"),
                    Err(ToolError::Signal(_)) => span.record("status", "signal"),
                    Err(_) => span.record("status", "failed"),
                };
                outcome
            }
            .instrument(span),
        )
    }
}

// --- Layer 6: metadata enrichment ----------------------------------------

/// Innermost layer: logs failures with group attribution and re-raises
/// everything unchanged. Group metadata itself is attached by
/// [`DecoratedTool::with_group`].
struct EnrichMetadataLayer;

impl ToolMiddleware for EnrichMetadataLayer {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            match next.run(call, ctx).await {
                Err(e) if !e.is_signal() => {
                    tracing::warn!(tool = %call.name, error = %e, "tool raised");
                    Err(e)
                }
                other => other,
            }
        })
    }
}
