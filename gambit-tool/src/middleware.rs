//! The tool middleware pipeline.
//!
//! The pattern is axum's `from_fn` — each middleware receives a [`Next`]
//! that it can call to continue the chain, or skip to short-circuit. A
//! [`DecoratedTool`] packages a chain with its inner tool and is itself a
//! [`ToolDyn`], so decorated tools compose and nest freely.
//!
//! The [`ToolContext`] travels by value: a middleware may hand a rebound
//! copy to the rest of the chain (that is how the process-binding layer
//! installs the ambient process), and the rebinding ends when the frame
//! returns — on every exit path, success or failure.

use gambit_types::{
    BoxFuture, ToolCall, ToolContext, ToolDefinition, ToolDyn, ToolError, ToolMetadata, ToolResult,
};
use std::sync::Arc;

/// Middleware that wraps tool execution.
///
/// Each middleware receives the call, context, and a [`Next`] to continue
/// the chain. Middleware can:
/// - Inspect the call before passing it on
/// - Short-circuit by returning without calling `next.run()`
/// - Inspect or rewrite the result after the tool executes
///
/// Uses boxed futures for dyn-compatibility (heterogeneous chains).
pub trait ToolMiddleware: Send + Sync {
    /// Process a tool call, optionally delegating to the next layer.
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>>;
}

/// The remaining middleware chain plus the underlying tool.
///
/// Consumed on call to prevent double-invoke.
pub struct Next<'a> {
    tool: &'a dyn ToolDyn,
    chain: &'a [Arc<dyn ToolMiddleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(tool: &'a dyn ToolDyn, chain: &'a [Arc<dyn ToolMiddleware>]) -> Self {
        Self { tool, chain }
    }

    /// Continue the chain, eventually calling the tool.
    pub async fn run(self, call: &'a ToolCall, ctx: ToolContext) -> Result<ToolResult, ToolError> {
        if let Some((head, tail)) = self.chain.split_first() {
            let next = Next::new(self.tool, tail);
            head.process(call, ctx, next).await
        } else {
            // End of chain — call the actual tool
            self.tool.call(call.input.clone(), &ctx).await
        }
    }
}

/// A tool wrapped in a middleware chain, itself usable as a tool.
///
/// The chain runs in list order: `chain[0]` is the outermost wrapper. The
/// decorated tool reports the inner tool's definition unchanged (no layer
/// here renames) and may override group metadata.
pub struct DecoratedTool {
    inner: Arc<dyn ToolDyn>,
    chain: Vec<Arc<dyn ToolMiddleware>>,
    group: Option<String>,
}

impl DecoratedTool {
    /// Wrap `inner` in `chain`, outermost first.
    #[must_use]
    pub fn new(inner: Arc<dyn ToolDyn>, chain: Vec<Arc<dyn ToolMiddleware>>) -> Self {
        Self {
            inner,
            chain,
            group: None,
        }
    }

    /// Attach owning tool-group metadata.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

impl ToolDyn for DecoratedTool {
    fn definition(&self) -> ToolDefinition {
        self.inner.definition()
    }

    fn metadata(&self) -> ToolMetadata {
        let mut meta = self.inner.metadata();
        if self.group.is_some() {
            meta.group = self.group.clone();
        }
        meta
    }

    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let call = ToolCall {
                id: gambit_types::ToolCallId::new(""),
                name: self.inner.definition().name,
                input,
            };
            let next = Next::new(self.inner.as_ref(), &self.chain);
            next.run(&call, ctx.clone()).await
        })
    }
}

/// Wrapper that implements [`ToolMiddleware`] for a closure returning a
/// boxed future.
struct MiddlewareFn<F> {
    f: F,
}

impl<F> ToolMiddleware for MiddlewareFn<F>
where
    F: for<'a> Fn(
            &'a ToolCall,
            ToolContext,
            Next<'a>,
        ) -> BoxFuture<'a, Result<ToolResult, ToolError>>
        + Send
        + Sync,
{
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        (self.f)(call, ctx, next)
    }
}

/// Create middleware from a closure (like axum's `from_fn`).
///
/// The closure must return a `Box::pin(async move { ... })` future.
#[must_use]
pub fn tool_middleware_fn<F>(f: F) -> impl ToolMiddleware
where
    F: for<'a> Fn(
            &'a ToolCall,
            ToolContext,
            Next<'a>,
        ) -> BoxFuture<'a, Result<ToolResult, ToolError>>
        + Send
        + Sync,
{
    MiddlewareFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echoes input back")
        }
        fn call<'a>(
            &'a self,
            input: serde_json::Value,
            _ctx: &'a ToolContext,
        ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
            Box::pin(async move { Ok(ToolResult::text(input.to_string())) })
        }
    }

    /// Middleware that records the order it was entered in.
    struct Tagger {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ToolMiddleware for Tagger {
        fn process<'a>(
            &'a self,
            call: &'a ToolCall,
            ctx: ToolContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.tag);
                next.run(call, ctx).await
            })
        }
    }

    #[tokio::test]
    async fn chain_runs_in_list_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn ToolMiddleware>> = vec![
            Arc::new(Tagger { tag: "outer", log: log.clone() }),
            Arc::new(Tagger { tag: "inner", log: log.clone() }),
        ];
        let tool = DecoratedTool::new(Arc::new(EchoTool), chain);
        let ctx = ToolContext::detached();

        let result = tool.call(json!({"a": 1}), &ctx).await.unwrap();
        assert_eq!(result.content_str(), r#"{"a":1}"#);
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_tool() {
        let blocker = tool_middleware_fn(|_call, _ctx, _next| {
            Box::pin(async { Ok(ToolResult::text("blocked")) })
        });
        let tool = DecoratedTool::new(Arc::new(EchoTool), vec![Arc::new(blocker)]);
        let ctx = ToolContext::detached();

        let result = tool.call(json!({}), &ctx).await.unwrap();
        assert_eq!(result.content_str(), "blocked");
    }

    #[test]
    fn decorated_tool_preserves_name() {
        let tool = DecoratedTool::new(Arc::new(EchoTool), vec![]);
        assert_eq!(tool.definition().name, "echo");
    }

    #[test]
    fn group_metadata_override() {
        let tool = DecoratedTool::new(Arc::new(EchoTool), vec![]).with_group("demo");
        assert_eq!(tool.metadata().group.as_deref(), Some("demo"));
    }
}
