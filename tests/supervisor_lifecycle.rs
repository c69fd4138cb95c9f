// tests/supervisor_lifecycle.rs
#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use scriptd::console::LogView;
use scriptd::exec::{EventReceiver, StartOutcome, StopOutcome, Supervisor, SupervisorEvent, event_channel};
use scriptd::registry::ScriptDefinition;
use scriptd::types::ScriptId;
use scriptd_test_utils::events::{FINISH_WAIT, collect_until_finished, drain_now, kinds, log_text};
use scriptd_test_utils::init_tracing;
use scriptd_test_utils::scripts::{ScriptDir, registry_of};

type TestResult = Result<(), Box<dyn Error>>;

fn supervise(definitions: Vec<ScriptDefinition>) -> (Supervisor, EventReceiver) {
    let (tx, rx) = event_channel();
    let supervisor = Supervisor::spawn(registry_of(definitions), tx);
    (supervisor, rx)
}

/// Read events until a `Log` for `id` contains `needle`.
async fn wait_for_output(rx: &mut EventReceiver, id: &ScriptId, needle: &str) -> Vec<SupervisorEvent> {
    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + FINISH_WAIT;
    loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .unwrap_or_else(|_| panic!("never saw {needle:?}; got {seen:?}"))
            .expect("event channel closed");
        seen.push(event);
        if log_text(&seen, id).contains(needle) {
            return seen;
        }
    }
}

fn finished_exit(events: &[SupervisorEvent]) -> scriptd::exec::ExitReport {
    match events.last() {
        Some(SupervisorEvent::Finished { exit, .. }) => *exit,
        other => panic!("expected Finished last, got {other:?}"),
    }
}

#[tokio::test]
async fn started_precedes_output_and_finished_comes_once() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("hello.sh", "echo out\necho err >&2\n");
    let def = dir.definition("Hello", "hello.sh", "RUN_HELLO");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    assert_eq!(sup.start(&id, None).await?, StartOutcome::Started);
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;

    let kinds = kinds(&events);
    assert_eq!(kinds.first(), Some(&"started"));
    assert_eq!(kinds.iter().filter(|k| **k == "finished").count(), 1);
    assert!(!kinds.contains(&"setup_error"));

    let text = log_text(&events, &id);
    assert!(text.starts_with("--- starting script: hello.sh ---\n"), "{text:?}");
    assert!(text.contains("out\n"));
    assert!(text.contains("err\n"), "stderr is captured too");
    assert!(text.ends_with("\n--- script finished (exit code: 0, status: normal exit) ---\n"));

    let exit = finished_exit(&events);
    assert!(exit.is_clean());
    assert!(exit.success());

    assert!(!sup.is_running(&id).await?);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(drain_now(&mut rx).is_empty(), "nothing after Finished");
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_still_a_normal_exit() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("exit3.sh", "echo bye\nexit 3\n");
    let def = dir.definition("Exit", "exit3.sh", "RUN_EXIT");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    sup.start(&id, None).await?;
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;

    match events.last() {
        Some(SupervisorEvent::Finished { summary, exit, .. }) => {
            assert_eq!(exit.code, Some(3));
            assert!(exit.is_clean());
            assert!(!exit.killed);
            assert!(!exit.success());
            assert_eq!(summary, "exit3.sh finished (exit code: 3, status: normal exit)");
        }
        other => panic!("expected Finished, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn start_while_running_toggles_the_script_off() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("loop.sh", "echo ready\nexec sleep 30\n");
    let def = dir.definition("Loop", "loop.sh", "RUN_LOOP");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    assert_eq!(sup.start(&id, None).await?, StartOutcome::Started);
    wait_for_output(&mut rx, &id, "ready\n").await;

    let running = sup.running().await?;
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].display_name, "Loop");
    assert!(running[0].pid.is_some());

    assert_eq!(
        sup.start(&id, None).await?,
        StartOutcome::AlreadyRunningToggledOff
    );
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;

    assert!(log_text(&events, &id).contains("--- stopping script: loop.sh ---\n"));
    let exit = finished_exit(&events);
    assert!(!exit.is_clean(), "killed, not exited: {exit}");
    assert!(exit.killed);
    assert_eq!(exit.signal, Some(9));
    assert!(sup.running().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn explicit_stop_and_stop_of_idle_script() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("loop.sh", "echo ready\nexec sleep 30\n");
    let def = dir.definition("Loop", "loop.sh", "RUN_LOOP");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    assert_eq!(sup.stop(&id).await?, StopOutcome::NotRunning);
    assert!(drain_now(&mut rx).is_empty(), "stopping an idle script emits nothing");

    sup.start(&id, None).await?;
    wait_for_output(&mut rx, &id, "ready\n").await;

    assert_eq!(sup.stop(&id).await?, StopOutcome::Stopped);
    // A second stop while the kill is in flight is not an error.
    assert_eq!(sup.stop(&id).await?, StopOutcome::Stopped);

    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;
    assert!(!finished_exit(&events).is_clean());
    assert!(!sup.is_running(&id).await?);
    Ok(())
}

#[tokio::test]
async fn unknown_id_is_not_found_without_events() -> TestResult {
    init_tracing();
    let (sup, mut rx) = supervise(vec![]);

    let outcome = sup.start(&ScriptId::new("/no/such/script.sh"), None).await?;
    assert_eq!(outcome, StartOutcome::NotFound);
    assert!(drain_now(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_script_file_is_a_setup_error() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let def = dir.definition("Ghost", "ghost.sh", "RUN_GHOST");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    match sup.start(&id, None).await? {
        StartOutcome::LaunchError(message) => assert!(message.contains("not found"), "{message}"),
        other => panic!("expected LaunchError, got {other:?}"),
    }

    let events = drain_now(&mut rx);
    assert_eq!(kinds(&events), vec!["setup_error"]);
    assert!(!sup.is_running(&id).await?);
    Ok(())
}

#[tokio::test]
async fn unlaunchable_interpreter_is_a_setup_error() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("ok.sh", "echo hi\n");
    let def = dir
        .definition("Broken", "ok.sh", "RUN_BROKEN")
        .with_interpreter(Some("/nonexistent/interpreter".to_string()));
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    match sup.start(&id, None).await? {
        StartOutcome::LaunchError(message) => {
            assert!(message.starts_with("cannot launch 'ok.sh'"), "{message}")
        }
        other => panic!("expected LaunchError, got {other:?}"),
    }
    assert_eq!(kinds(&drain_now(&mut rx)), vec!["setup_error"]);
    Ok(())
}

#[tokio::test]
async fn arguments_follow_the_script_path() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("args.sh", "printf '%s|' \"$0\" \"$@\"\n");
    let mut def = dir.definition("Args", "args.sh", "RUN_ARGS");
    def.default_args = vec!["a".to_string(), "b c".to_string()];
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    sup.start(&id, None).await?;
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;
    assert!(
        log_text(&events, &id).contains(&format!("{}|a|b c|", id)),
        "default args are used when none are given"
    );

    sup.start(&id, Some(vec!["--only".to_string()])).await?;
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;
    let text = log_text(&events, &id);
    assert!(text.contains(&format!("{}|--only|", id)), "{text:?}");
    assert!(!text.contains("b c"));
    Ok(())
}

#[tokio::test]
async fn child_output_encoding_is_forced_to_utf8() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("env.sh", "printf '%s/%s\\n' \"$PYTHONIOENCODING\" \"$PYTHONUTF8\"\n");
    let def = dir.definition("Env", "env.sh", "RUN_ENV");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    sup.start(&id, None).await?;
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;
    assert!(log_text(&events, &id).contains("utf-8/1\n"));
    Ok(())
}

#[tokio::test]
async fn undecodable_output_is_replaced() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("bytes.sh", "printf '\\377abc\\n'\n");
    let def = dir.definition("Bytes", "bytes.sh", "RUN_BYTES");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    sup.start(&id, None).await?;
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;
    assert!(log_text(&events, &id).contains("\u{FFFD}abc\n"));
    Ok(())
}

#[tokio::test]
async fn carriage_returns_reach_the_log_view_untouched() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("cr.sh", "printf 'A\\n'\nprintf '\\rB'\nprintf '\\rB  \\n'\n");
    let def = dir.definition("Progress", "cr.sh", "RUN_CR");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    sup.start(&id, None).await?;
    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;
    assert!(log_text(&events, &id).contains("A\n\rB\rB  \n"));

    let mut view = LogView::new();
    for event in events.iter() {
        if let SupervisorEvent::Log { text, .. } = event {
            view.apply(text);
        }
    }
    let lines: Vec<&str> = view.lines().collect();
    let a = lines.iter().position(|l| *l == "A").expect("line A");
    assert_eq!(lines[a + 1], "B  ");
    assert!(!lines.contains(&"B"), "the progress frame was overwritten");
    Ok(())
}

#[tokio::test]
async fn concurrent_starts_never_run_two_copies() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("loop.sh", "exec sleep 30\n");
    let def = dir.definition("Loop", "loop.sh", "RUN_LOOP");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let sup = sup.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move { sup.start(&id, None).await }));
    }
    let mut started = 0;
    for handle in handles {
        if handle.await?? == StartOutcome::Started {
            started += 1;
        }
    }
    assert!(started >= 1);

    sup.stop_all().await?;

    // Every Started must be closed by a Finished before the next one.
    let mut open = false;
    let mut finished = 0;
    while finished < started {
        let event = tokio::time::timeout(FINISH_WAIT, rx.recv())
            .await?
            .expect("event channel closed");
        match event {
            SupervisorEvent::Started { .. } => {
                assert!(!open, "second process started while one was running");
                open = true;
            }
            SupervisorEvent::Finished { .. } => {
                assert!(open);
                open = false;
                finished += 1;
            }
            _ => {}
        }
    }
    assert!(sup.running().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn dropping_every_handle_kills_running_scripts() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.write("loop.sh", "echo ready\nexec sleep 30\n");
    let def = dir.definition("Loop", "loop.sh", "RUN_LOOP");
    let id = def.id.clone();
    let (sup, mut rx) = supervise(vec![def]);

    sup.start(&id, None).await?;
    wait_for_output(&mut rx, &id, "ready\n").await;
    drop(sup);

    let events = collect_until_finished(&mut rx, &id, FINISH_WAIT).await;
    assert!(!finished_exit(&events).is_clean());

    // The supervisor loop exits and closes the event channel.
    let closed = tokio::time::timeout(FINISH_WAIT, async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok());
    Ok(())
}
