//! Integration tests for the chat REPL
//!
//! The REPL is driven from an in-memory script; approvals are answered
//! either inline (prompt mode) or through /approve and /deny (defer mode).

use edith_engine::approval::{ApprovalMode, ChannelApprovalGate};
use edith_engine::config::Config;
use edith_engine::handlers::{
    approval_gate, build_orchestrator, drive_turn, run_chat, OutputFormat,
};
use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

fn config(mode: ApprovalMode) -> Config {
    let mut config = Config::default();
    config.orchestrator.approval_mode = mode;
    config
}

#[tokio::test]
async fn test_prompt_mode_answers_inline() {
    let config = config(ApprovalMode::Prompt);
    let (gate, prompts) = approval_gate(&config.orchestrator);
    let orchestrator = build_orchestrator(&config, gate);

    let script = "post this to linkedin\nyes\nopen the website\nno\n/history\n/quit\n";
    let mut out = Vec::<u8>::new();
    run_chat(
        &orchestrator,
        prompts,
        "s1",
        script.as_bytes(),
        &mut out,
        OutputFormat::Text,
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Approve step 'linkedin_post' (linkedin.create_post)?"));
    assert!(out.contains("Step 1: linkedin_post completed."));
    assert!(out.contains("Approve step 'browser_navigate' (browser.navigate)?"));
    assert!(out.contains("Action cancelled pending user approval."));
    assert!(out.contains("1. post this to linkedin (1 tool result(s))"));
    assert!(!out.contains("2. open the website"));
}

#[tokio::test]
async fn test_defer_mode_resumes_by_id() {
    let config = config(ApprovalMode::Defer);
    let (gate, prompts) = approval_gate(&config.orchestrator);
    assert!(prompts.is_none());
    let orchestrator = build_orchestrator(&config, gate);

    let mut out = Vec::<u8>::new();
    run_chat(
        &orchestrator,
        None,
        "s1",
        "open the website\n/pending\n".as_bytes(),
        &mut out,
        OutputFormat::Text,
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Awaiting approval for step 1: browser_navigate."));
    assert!(out.contains("step 1: browser_navigate (browser.navigate) [session s1]"));

    let pending = orchestrator.pending_approvals().await;
    assert_eq!(pending.len(), 1);
    let id = pending[0].correlation_id.clone();
    assert!(out.contains(&format!("Use /approve {} or /deny {}.", id, id)));

    let mut out = Vec::<u8>::new();
    run_chat(
        &orchestrator,
        None,
        "s1",
        format!("/approve {}\n/approve {}\n/pending\n", id, id).as_bytes(),
        &mut out,
        OutputFormat::Text,
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Step 1: browser_navigate completed."));
    assert!(out.contains(&format!("Error: No pending approval with correlation id: {}", id)));
    assert!(out.contains("No pending approvals."));
}

#[tokio::test]
async fn test_commands_and_json_output() {
    let config = Config::default();
    let (gate, prompts) = approval_gate(&config.orchestrator);
    let orchestrator = build_orchestrator(&config, gate);

    let mut out = Vec::<u8>::new();
    run_chat(
        &orchestrator,
        prompts,
        "s1",
        "\n/dance\n/deny\n/history\n".as_bytes(),
        &mut out,
        OutputFormat::Text,
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Unknown command: /dance."));
    assert!(out.contains("Usage: /deny <id>"));
    assert!(out.contains("No history for session s1."));

    let mut out = Vec::<u8>::new();
    run_chat(
        &orchestrator,
        None,
        "s1",
        "check my email\n".as_bytes(),
        &mut out,
        OutputFormat::Json,
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    let start = out.find('{').unwrap();
    let end = out.rfind('}').unwrap();
    let response: serde_json::Value = serde_json::from_str(&out[start..=end]).unwrap();
    assert_eq!(response["summary"], "Step 1: gmail_list completed.");
    assert_eq!(response["status"]["state"], "completed");
    assert_eq!(response["plan"]["steps"][0]["tool"], "gmail.list_unread");
}

#[tokio::test]
async fn test_unanswered_prompt_expires_without_input() {
    let (gate, prompts) = ChannelApprovalGate::new(Duration::from_millis(50));
    let orchestrator = build_orchestrator(&Config::default(), Arc::new(gate));
    let mut prompts = Some(prompts);

    // Input stays open but nobody types
    let (_keyboard, stdin) = tokio::io::duplex(64);
    let mut lines = BufReader::new(stdin).lines();
    let mut out = Vec::<u8>::new();

    let turn = orchestrator.handle_message("post this to linkedin", "s1");
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        drive_turn(turn, &mut prompts, &mut lines, &mut out),
    )
    .await
    .expect("turn should end once the approval wait expires")
    .unwrap();

    assert!(matches!(
        result,
        Err(EngineError::ApprovalTimeout { ref step, .. }) if step == "linkedin_post"
    ));
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Approve step 'linkedin_post' (linkedin.create_post)?"));
    assert!(orchestrator.history("s1").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_deferred_approval_expires() {
    let mut config = config(ApprovalMode::Defer);
    config.orchestrator.approval_timeout_secs = 1;
    let (gate, _) = approval_gate(&config.orchestrator);
    let orchestrator = build_orchestrator(&config, gate);

    let parked = orchestrator
        .handle_message("open the website", "s1")
        .await
        .unwrap();
    assert!(parked.summary.starts_with("Awaiting approval"));
    let id = orchestrator.pending_approvals().await[0].correlation_id.clone();

    tokio::time::advance(Duration::from_secs(2)).await;

    let mut out = Vec::<u8>::new();
    run_chat(
        &orchestrator,
        None,
        "s1",
        format!("/approve {}\n/pending\n", id).as_bytes(),
        &mut out,
        OutputFormat::Text,
    )
    .await
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Error: Approval for step 'browser_navigate' not received within 1s"));
    assert!(out.contains("No pending approvals."));
    assert!(!out.contains("browser_navigate completed"));
}
