//! Heartbeat, deferred work, eval settlement, uploads, and teardown.

mod common;

use std::time::Duration;

use common::{page, page_with_config, parse_frame, path};
use livepage::{ClientConfig, EvalOutcome};
use serde_json::json;

#[test]
fn heartbeat_keeps_cadence_across_late_ticks() {
    let (mut p, t0) = page_with_config(ClientConfig {
        heartbeat_interval_ms: 1_000,
        ..ClientConfig::default()
    });

    // A late tick emits the overdue beat and re-arms from the original
    // deadline, not from the tick time.
    p.tick(t0 + Duration::from_millis(1_400));
    assert_eq!(p.drain_outbound(), vec!["[6]".to_string()]);
    p.tick(t0 + Duration::from_millis(2_000));
    assert_eq!(p.drain_outbound(), vec!["[6]".to_string()]);
}

#[test]
fn destroy_stops_heartbeat_and_unbinds_listeners() {
    let (mut p, t0) = page_with_config(ClientConfig {
        heartbeat_interval_ms: 100,
        ..ClientConfig::default()
    });
    p.handle_frame(r#"[2, "click", false, "0", "0"]"#, t0);

    p.destroy();
    p.tick(t0 + Duration::from_secs(5));
    assert!(p.drain_outbound().is_empty());
    assert!(!p.fire_event(&path("0"), "click", json!({}), t0).matched);
}

#[test]
fn focus_waits_for_the_next_tick() {
    let (mut p, t0) = page();
    p.handle_frame(r#"[4, 0, "1", "1_1", 0, "input"]"#, t0);
    p.handle_frame(r#"[5, "1_1"]"#, t0);
    assert!(p.host().focused.is_empty());

    p.tick(t0);
    assert_eq!(p.host().focused, vec![path("1_1")]);
}

#[test]
fn synchronous_eval_answers_immediately() {
    let (mut p, t0) = page();
    p.host_mut().eval_outcome = Some(EvalOutcome::Value(json!({"sum": 3})));
    p.handle_frame(r#"[10, "7", "1 + 2"]"#, t0);
    assert_eq!(
        parse_frame(&p.drain_outbound()[0]),
        json!([4, "7:0", {"sum": 3}])
    );
}

#[test]
fn synchronous_eval_errors_use_the_rejected_status() {
    let (mut p, t0) = page();
    p.host_mut().eval_outcome = Some(EvalOutcome::Error("ReferenceError: x".to_string()));
    p.handle_frame(r#"[10, "7", "x"]"#, t0);
    assert_eq!(
        parse_frame(&p.drain_outbound()[0]),
        json!([4, "7:1", "ReferenceError: x"])
    );
}

#[test]
fn pending_eval_settles_later_through_the_ordered_queue() {
    let (mut p, t0) = page();
    p.handle_frame(r#"[10, "7", "later()"]"#, t0);
    assert!(p.drain_outbound().is_empty());

    // Other traffic emitted in between stays ahead of the settlement.
    p.invoke_custom_callback("ping", "1");
    p.complete_eval("7", Ok(json!(null)));

    let frames: Vec<_> = p.drain_outbound().iter().map(|f| parse_frame(f)).collect();
    assert_eq!(frames[0], json!([1, "ping:1"]));
    assert_eq!(frames[1], json!([4, "7:0", null]));
}

#[test]
fn form_upload_sends_the_collected_fields() {
    let (mut p, t0) = page();
    p.handle_frame(
        r#"[4,
            0, "1", "1_1", 0, "form",
            0, "1_1", "1_1_1", 0, "input",
            3, "1_1_1", 0, "name", "login", false,
            3, "1_1_1", 0, "value", "ada", true,
            0, "1_1", "1_1_2", 0, "input",
            3, "1_1_2", 0, "name", "pass", false
        ]"#,
        t0,
    );
    p.handle_frame(r#"[7, "1_1", "form-9"]"#, t0);

    let uploads = &p.host().form_uploads;
    assert_eq!(uploads.len(), 1);
    let (form_path, descriptor, fields) = &uploads[0];
    assert_eq!(form_path, &path("1_1"));
    assert_eq!(descriptor, "form-9");
    assert_eq!(fields.get("login"), Some(&"ada".to_string()));
    // A field with no live value still uploads, as empty.
    assert_eq!(fields.get("pass"), Some(&"".to_string()));
}

#[test]
fn file_transfer_commands_reach_the_host() {
    let (mut p, t0) = page();
    p.handle_frame(r#"[4, 0, "1", "1_1", 0, "input"]"#, t0);
    p.handle_frame(r#"[12, "1_1", "u1"]"#, t0);
    p.handle_frame(r#"[13, "1_1", "u1", "photo.png"]"#, t0);

    assert_eq!(p.host().file_listings, vec![(path("1_1"), "u1".to_string())]);
    assert_eq!(
        p.host().file_uploads,
        vec![(path("1_1"), "u1".to_string(), "photo.png".to_string())]
    );
}

#[test]
fn a_vanished_file_is_skipped_without_halting() {
    let (mut p, t0) = page();
    p.host_mut().missing_file = Some("gone.txt".to_string());
    p.handle_frame(r#"[4, 0, "1", "1_1", 0, "input"]"#, t0);
    p.handle_frame(r#"[13, "1_1", "u1", "gone.txt"]"#, t0);
    p.handle_frame(r#"[13, "1_1", "u1", "kept.txt"]"#, t0);

    assert_eq!(
        p.host().file_uploads,
        vec![(path("1_1"), "u1".to_string(), "kept.txt".to_string())]
    );
}

#[test]
fn reload_css_is_forwarded() {
    let (mut p, t0) = page();
    p.handle_frame("[8]", t0);
    assert_eq!(p.host().css_reloads, 1);
}

#[test]
fn history_notification_and_push_state_dedupe() {
    let (mut p, t0) = page();
    p.host_mut().location.path = "/here".to_string();

    p.handle_frame(r#"[6, 4, "/here"]"#, t0);
    assert!(p.host().set_locations.is_empty());

    p.notify_history_change();
    assert_eq!(parse_frame(&p.drain_outbound()[0]), json!([3, "/here"]));
}
