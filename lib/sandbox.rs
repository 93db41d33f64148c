//! Isolated runtime for `function` executors.
//!
//! Each invocation gets its own QuickJS runtime with a memory cap, a stack
//! cap and an interrupt handler enforcing the deadline and cancellation. The
//! engine has no process, filesystem or module loader. The only capabilities
//! a function sees are `context.utils.log` and `context.utils.fetch`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rquickjs::{CatchResultExt, Context, Ctx, Function, Module, Runtime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::constants::{
    DEFAULT_FUNCTION_MEMORY_LIMIT, DEFAULT_FUNCTION_STACK_LIMIT, DEFAULT_FUNCTION_TIMEOUT_MS,
};
use crate::error::ExecutionError;
use crate::template::render_value;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Tracing target for `context.utils.log` output.
pub const FUNCTION_LOG_TARGET: &str = "ext_registry::function";

/// Builds the frozen `utils` object from the two native host functions.
const UTILS_FACTORY: &str = r#"
(function (hostLog, hostFetch) {
  const show = (v) => {
    if (typeof v === "string") return v;
    try { return JSON.stringify(v); } catch (_) { return String(v); }
  };
  const log = (...args) => { hostLog(args.map(show).join(" ")); };
  const fetch = (url, init) => {
    const opts = init || {};
    let body = opts.body;
    if (body !== undefined && body !== null && typeof body !== "string") body = JSON.stringify(body);
    const raw = JSON.parse(hostFetch(JSON.stringify({
      url: String(url),
      method: opts.method || "GET",
      headers: opts.headers || {},
      body: body === undefined ? null : body,
    })));
    if (raw.error) throw new Error(raw.error);
    const text = raw.body;
    return Object.freeze({
      status: raw.status,
      ok: raw.status >= 200 && raw.status < 300,
      headers: Object.freeze(raw.headers),
      text: () => text,
      json: () => JSON.parse(text),
    });
  };
  return Object.freeze({ log, fetch });
})
"#;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Resource bounds for one function run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub timeout: Duration,
    pub memory_limit: usize,
    pub max_stack: usize,
}

/// Function runner shared by the executor engine.
#[derive(Debug, Clone)]
pub struct Sandbox {
    limits: SandboxLimits,
    client: reqwest::Client,
}

/// A single function invocation, moved onto a blocking thread.
struct Job {
    code: String,
    params: String,
    context: String,
    limits: SandboxLimits,
    cancel: CancellationToken,
    fetch: HostFetch,
}

/// Native side of `utils.fetch`.
#[derive(Clone)]
struct HostFetch {
    handle: Handle,
    client: reqwest::Client,
    deadline: Instant,
    cancel: CancellationToken,
}

#[derive(Deserialize)]
struct FetchRequest {
    url: String,
    method: String,
    #[serde(default)]
    headers: BTreeMap<String, Value>,
    body: Option<String>,
}

/// Where a function run failed.
enum Failure {
    Parse(String),
    Runtime(String),
}

#[derive(Serialize)]
struct FetchResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    body: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Sandbox {
    pub fn new(limits: SandboxLimits, client: reqwest::Client) -> Self {
        Self { limits, client }
    }

    pub fn limits(&self) -> SandboxLimits {
        self.limits
    }

    /// Run `code` with `params` and `context`, returning the JSON result.
    ///
    /// The function runs on a blocking thread; a hang or crash there never
    /// stalls the async runtime. `undefined` results become `null`.
    pub async fn run(
        &self,
        code: &str,
        params: &Value,
        context: &Value,
        cancel: CancellationToken,
    ) -> Result<Value, ExecutionError> {
        if cancel.is_cancelled() {
            return Err(ExecutionError::cancelled());
        }

        let deadline = Instant::now() + self.limits.timeout;
        let job = Job {
            code: strip_source(code).to_string(),
            params: params.to_string(),
            context: context.to_string(),
            limits: self.limits,
            cancel: cancel.clone(),
            fetch: HostFetch {
                handle: Handle::current(),
                client: self.client.clone(),
                deadline,
                cancel,
            },
        };

        let output = tokio::task::spawn_blocking(move || job.execute())
            .await
            .map_err(|e| ExecutionError::runtime(format!("function task failed: {}", e)))??;

        match output {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                ExecutionError::runtime(format!("function returned a non-JSON value: {}", e))
            }),
            None => Ok(Value::Null),
        }
    }
}

impl Job {
    fn execute(self) -> Result<Option<String>, ExecutionError> {
        let timed_out = Arc::new(AtomicBool::new(false));
        let deadline = self.fetch.deadline;

        let rt = Runtime::new().map_err(|e| ExecutionError::runtime(e.to_string()))?;
        rt.set_memory_limit(self.limits.memory_limit);
        rt.set_max_stack_size(self.limits.max_stack);
        {
            let timed_out = timed_out.clone();
            let cancel = self.cancel.clone();
            rt.set_interrupt_handler(Some(Box::new(move || {
                if cancel.is_cancelled() {
                    return true;
                }
                if Instant::now() >= deadline {
                    timed_out.store(true, Ordering::Relaxed);
                    return true;
                }
                false
            })));
        }

        let context = Context::full(&rt).map_err(|e| ExecutionError::runtime(e.to_string()))?;

        let outcome = context.with(|ctx| {
            let func = ctx
                .eval::<Function, _>(format!("(\n{}\n)", self.code))
                .catch(&ctx)
                .map_err(|e| Failure::Parse(e.to_string()))?;
            self.call(&ctx, func)
                .catch(&ctx)
                .map_err(|e| Failure::Runtime(e.to_string()))
        });

        match outcome {
            Ok(output) => Ok(output),
            Err(_) if self.cancel.is_cancelled() => Err(ExecutionError::cancelled()),
            Err(_) if timed_out.load(Ordering::Relaxed) || Instant::now() >= deadline => {
                Err(ExecutionError::timeout(format!(
                    "function exceeded its time limit of {}ms",
                    self.limits.timeout.as_millis()
                )))
            }
            Err(Failure::Parse(message)) => Err(ExecutionError::parse(message)),
            Err(Failure::Runtime(message)) => Err(ExecutionError::runtime(message)),
        }
    }

    fn call<'js>(&self, ctx: &Ctx<'js>, func: Function<'js>) -> rquickjs::Result<Option<String>> {
        let utils = self.build_utils(ctx)?;

        let params = ctx.json_parse(self.params.as_str())?;
        let context = ctx.json_parse(self.context.as_str())?;
        if let Some(obj) = context.as_object() {
            obj.set("utils", utils)?;
        }

        let result: rquickjs::Value = func.call((params, context))?;
        let result = match result.as_promise() {
            Some(promise) => promise.finish::<rquickjs::Value>()?,
            None => result.clone(),
        };

        match ctx.json_stringify(result)? {
            Some(json) => Ok(Some(json.to_string()?)),
            None => Ok(None),
        }
    }

    fn build_utils<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<rquickjs::Value<'js>> {
        let log = Function::new(ctx.clone(), |message: String| {
            tracing::info!(target: FUNCTION_LOG_TARGET, "{}", message);
        })?;

        let fetch = self.fetch.clone();
        let fetch = Function::new(ctx.clone(), move |request: String| fetch.call(&request))?;

        let factory: Function = ctx.eval(UTILS_FACTORY)?;
        factory.call((log, fetch))
    }
}

impl HostFetch {
    /// Perform a fetch for the script, returning a JSON response or `{error}`.
    fn call(&self, request: &str) -> String {
        let outcome = match serde_json::from_str::<FetchRequest>(request) {
            Ok(request) => self.handle.block_on(self.send(request)),
            Err(e) => Err(format!("invalid fetch request: {}", e)),
        };

        match outcome {
            Ok(response) => serde_json::to_string(&response)
                .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string()),
            Err(message) => serde_json::json!({ "error": message }).to_string(),
        }
    }

    async fn send(&self, request: FetchRequest) -> Result<FetchResponse, String> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err("function time limit reached".into());
        }

        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| format!("invalid method `{}`", request.method))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(remaining);
        for (name, value) in &request.headers {
            builder = builder.header(name, render_value(value));
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(FetchResponse {
                status,
                headers,
                body,
            })
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err("fetch cancelled".into()),
            result = exchange => result.map_err(|e| format!("fetch failed: {}", e)),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_FUNCTION_TIMEOUT_MS),
            memory_limit: DEFAULT_FUNCTION_MEMORY_LIMIT,
            max_stack: DEFAULT_FUNCTION_STACK_LIMIT,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Compile `code` as a function expression without running it.
pub fn check_syntax(code: &str) -> Result<(), String> {
    let rt = Runtime::new().map_err(|e| e.to_string())?;
    let context = Context::full(&rt).map_err(|e| e.to_string())?;
    context.with(|ctx| {
        let source = format!("export default (\n{}\n);", strip_source(code));
        Module::declare(ctx.clone(), "function.js", source)
            .catch(&ctx)
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
}

/// Trim whitespace and one trailing `;` from function source.
pub(crate) fn strip_source(code: &str) -> &str {
    let code = code.trim();
    code.strip_suffix(';').map(str::trim_end).unwrap_or(code)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionReason;
    use serde_json::json;

    fn sandbox(timeout_ms: u64) -> Sandbox {
        Sandbox::new(
            SandboxLimits {
                timeout: Duration::from_millis(timeout_ms),
                ..Default::default()
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_strip_source_shared_with_validator() {
        assert_eq!(strip_source("  (p) => p ;  "), "(p) => p");
        assert_eq!(strip_source("() => 1"), "() => 1");

        // The validator and the runtime see the same source.
        let code = "(params) => params.a;\n";
        assert!(check_syntax(code).is_ok());
        assert!(crate::validate::validate_function(code).is_valid());
    }

    #[test]
    fn test_check_syntax() {
        assert!(check_syntax("(params, context) => params.a + 1").is_ok());
        assert!(check_syntax("async function (p) { return await p; }").is_ok());
        assert!(check_syntax("(params) => {").is_err());
        assert!(check_syntax("(params) => return 1").is_err());
    }

    #[tokio::test]
    async fn test_run_returns_json() {
        let result = sandbox(1000)
            .run(
                "(params, context) => ({ sum: params.a + params.b, ws: context.session.workspaceId })",
                &json!({"a": 2, "b": 3}),
                &json!({"session": {"workspaceId": "w1"}, "request": {}}),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"sum": 5, "ws": "w1"}));
    }

    #[tokio::test]
    async fn test_run_async_function() {
        let result = sandbox(1000)
            .run(
                "async (params) => { const v = await Promise.resolve(params.x); return v * 2; }",
                &json!({"x": 21}),
                &json!({}),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn test_undefined_result_is_null() {
        let result = sandbox(1000)
            .run("() => undefined", &json!({}), &json!({}), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_throw_maps_to_runtime() {
        let err = sandbox(1000)
            .run(
                "() => { throw new Error('boom'); }",
                &json!({}),
                &json!({}),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.reason, ExecutionReason::Runtime);
        assert!(err.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_no_host_access() {
        for code in [
            "() => process.env",
            "() => require('fs').readFileSync('/etc/passwd')",
        ] {
            let err = sandbox(1000)
                .run(code, &json!({}), &json!({}), CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(err.reason, ExecutionReason::Runtime, "{}", code);
        }
    }

    #[tokio::test]
    async fn test_infinite_loop_times_out() {
        let started = Instant::now();
        let err = sandbox(200)
            .run("() => { while (true) {} }", &json!({}), &json!({}), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.reason, ExecutionReason::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_aborts_run() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = sandbox(10_000)
            .run("() => { for (;;) {} }", &json!({}), &json!({}), cancel)
            .await
            .unwrap_err();
        assert_eq!(err.reason, ExecutionReason::Cancelled);
    }

    #[tokio::test]
    async fn test_utils_log_and_frozen() {
        let result = sandbox(1000)
            .run(
                "(params, context) => { context.utils.log('hello', { a: 1 }); return Object.isFrozen(context.utils); }",
                &json!({}),
                &json!({"session": {}, "request": {}}),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, json!(true));
    }
}
