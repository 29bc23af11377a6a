//! Integration tests for interception logging
//!
//! These tests drive a small service through the public API: a registry of
//! directives, the ambient trace id scope, masking of sensitive payloads and
//! both the synchronous and asynchronous entry points.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use interlog::prelude::*;
use interlog::{ArgumentFormatter, FormatterRegistry, KeyValueFormatter, with_task_trace_id};

// =============================================================================
// Test Service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Account {
    id: u32,
    owner: String,
    api_key: String,
}

#[derive(Debug, PartialEq)]
enum AccountError {
    NotFound(u32),
    Locked,
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::NotFound(id) => write!(f, "account {id} not found"),
            AccountError::Locked => write!(f, "account locked"),
        }
    }
}

impl Classify for AccountError {
    fn error_kind(&self) -> ErrorKind {
        match self {
            AccountError::NotFound(_) => ErrorKind::from_static("account.not_found"),
            AccountError::Locked => ErrorKind::from_static("account.locked"),
        }
    }
}

struct AccountService {
    interceptor: Arc<Interceptor>,
    registry: DirectiveRegistry,
}

impl AccountService {
    fn load(&self, id: u32) -> Result<Account, AccountError> {
        self.interceptor.intercept_registered(
            &self.registry,
            &CallSite::new("AccountService", "load"),
            Some(vec![Value::from(id)]),
            || match id {
                0 => Err(AccountError::NotFound(id)),
                13 => Err(AccountError::Locked),
                _ => Ok(Account {
                    id,
                    owner: "alice".to_string(),
                    api_key: "sk-live-123".to_string(),
                }),
            },
        )
    }

    async fn rename(&self, id: u32, owner: &str) -> Result<String, AccountError> {
        self.interceptor
            .intercept_registered_async(
                &self.registry,
                &CallSite::new("AccountService", "rename"),
                Some(vec![Value::from(id), Value::from(owner)]),
                async move { Ok(owner.to_uppercase()) },
            )
            .await
    }

    fn ping(&self) -> Result<&'static str, AccountError> {
        self.interceptor.intercept_registered(
            &self.registry,
            &CallSite::new("AccountService", "ping"),
            None,
            || Ok("pong"),
        )
    }
}

fn service(sink: MemorySink) -> AccountService {
    let interceptor = Interceptor::builder()
        .with_config(InterceptorConfig::new().with_slow_call_threshold(None))
        .with_sink(sink)
        .build()
        .expect("default configuration is valid");

    let registry = DirectiveRegistry::new()
        .with_method(
            "AccountService",
            "load",
            Directive::new()
                .with_log_args(true)
                .with_log_result(true)
                .with_log_execution_time(false)
                .with_exit_message("Loaded account #{result.id} for #{result.owner}")
                .with_handler(
                    HandlerRule::new("account.locked", LogLevel::Warn)
                        .with_message("Account #{args[0]} is locked"),
                )
                .with_handler(HandlerRule::new("account", LogLevel::Info)),
        )
        .with_class(
            "AccountService",
            Directive::new()
                .with_tag("accounts")
                .with_condition("#{methodName != 'load'}")
                .with_exit_message("#{className}.#{methodName} ok"),
        )
        .with_ignored("AccountService", "ping");

    AccountService {
        interceptor: Arc::new(interceptor),
        registry,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_sync_calls_log_masked_payloads_with_trace_id() {
    let sink = MemorySink::new();
    let service = service(sink.clone());

    let account = {
        let _scope = TraceScope::enter(TraceId::new("req-42"));
        service.load(7).unwrap()
    };
    assert_eq!(account.api_key, "sk-live-123");

    let events = sink.events();
    assert_eq!(events.len(), 1, "class directive is gated off for load");
    let event = &events[0];
    assert_eq!(event.trace_id, "req-42");
    assert_eq!(event.message, "Loaded account 7 for alice");
    assert_eq!(
        event.details,
        r#"TraceId: req-42 | Args: [7] | Result: {"id":7,"owner":"alice","api_key":"***"}"#
    );
    assert!(!event.text.contains("sk-live-123"));
}

#[test]
fn test_handler_rules_per_error_kind() {
    let sink = MemorySink::new();
    let service = service(sink.clone());

    assert_eq!(service.load(13), Err(AccountError::Locked));
    assert_eq!(service.load(0), Err(AccountError::NotFound(0)));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].level, LogLevel::Warn);
    assert_eq!(events[0].message, "Account 13 is locked");
    assert_eq!(events[1].level, LogLevel::Info);
    assert_eq!(events[1].message, "Failed: load");
    assert!(events[1].details.ends_with("Exception: account.not_found: account 0 not found"));
    assert!(events.iter().all(|e| e.trace_id == "MISSING-TRACE-ID"));
}

#[test]
fn test_ignored_methods_run_silently() {
    let sink = MemorySink::new();
    let service = service(sink.clone());
    assert_eq!(service.ping(), Ok("pong"));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_async_calls_use_task_trace_id() {
    let sink = MemorySink::new();
    let service = service(sink.clone());

    let renamed = with_task_trace_id(TraceId::new("task-1"), service.rename(3, "bob"))
        .await
        .unwrap();
    assert_eq!(renamed, "BOB");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].trace_id, "task-1");
    assert_eq!(events[0].message, "AccountService.rename ok");
    assert_eq!(events[0].tags.iter().collect::<Vec<_>>(), vec!["accounts"]);
}

#[test]
fn test_json_sink_and_formatters_are_usable_standalone() {
    let interceptor = Interceptor::builder().with_sink(JsonSink).build().unwrap();
    let out: Result<u8, AccountError> = interceptor.intercept(
        &CallSite::new("Standalone", "run"),
        &Directive::new().into(),
        None,
        || Ok(1),
    );
    assert_eq!(out, Ok(1));

    let registry = FormatterRegistry::new();
    registry.register(KeyValueFormatter::new().with_separator(";"));
    let args = [Value::from("a"), Value::from(2)];
    assert_eq!(registry.get(Some("key-value")).format_args(&args), "arg0=a;arg1=2");
}
