// tests/running_set.rs

use tokio::sync::oneshot;

use scriptd::exec::running_set::{RunningProcess, RunningSet, StopDecision};
use scriptd::types::ScriptId;

fn process(set: &mut RunningSet, id: &str) -> (RunningProcess, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    let run_id = set.next_run_id();
    let p = RunningProcess::new(
        ScriptId::new(id),
        "Test".to_string(),
        "test.sh".to_string(),
        Some(42),
        run_id,
        tx,
    );
    (p, rx)
}

#[test]
fn insert_refuses_a_second_entry_for_the_same_id() {
    let mut set = RunningSet::new();
    let (first, _rx1) = process(&mut set, "/a.sh");
    let (second, _rx2) = process(&mut set, "/a.sh");

    assert!(set.insert(first).is_ok());
    assert!(set.insert(second).is_err());
    assert_eq!(set.len(), 1);
}

#[test]
fn stop_hands_out_the_handle_exactly_once() {
    let mut set = RunningSet::new();
    let id = ScriptId::new("/a.sh");
    let (p, mut rx) = process(&mut set, "/a.sh");
    set.insert(p).unwrap();

    match set.request_stop(&id) {
        StopDecision::Stop { handle, file_name } => {
            assert_eq!(file_name, "test.sh");
            handle.send(()).unwrap();
        }
        other => panic!("expected Stop, got {:?}", other),
    }
    assert!(rx.try_recv().is_ok());

    assert!(matches!(set.request_stop(&id), StopDecision::AlreadyStopping));
    assert!(set.get(&id).unwrap().is_stopping());
    assert!(set.stoppable_ids().is_empty());
    // Still present until reaped.
    assert!(set.contains(&id));
}

#[test]
fn stop_of_unknown_id_is_not_running() {
    let mut set = RunningSet::new();
    assert!(matches!(
        set.request_stop(&ScriptId::new("/x.sh")),
        StopDecision::NotRunning
    ));
}

#[test]
fn reap_only_removes_the_matching_run() {
    let mut set = RunningSet::new();
    let id = ScriptId::new("/a.sh");
    let (p, _rx) = process(&mut set, "/a.sh");
    let run_id = p.run_id;
    set.insert(p).unwrap();

    assert!(set.reap(&id, run_id + 100).is_none(), "stale run id");
    assert!(set.contains(&id));

    let reaped = set.reap(&id, run_id).expect("matching run");
    assert_eq!(reaped.pid, Some(42));
    assert!(set.is_empty());

    assert!(set.reap(&id, run_id).is_none(), "reaping twice is a no-op");
}

#[test]
fn snapshot_lists_entries_sorted_by_id() {
    let mut set = RunningSet::new();
    let (b, _rb) = process(&mut set, "/b.sh");
    let (a, _ra) = process(&mut set, "/a.sh");
    set.insert(b).unwrap();
    set.insert(a).unwrap();

    let ids: Vec<_> = set.snapshot().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![ScriptId::new("/a.sh"), ScriptId::new("/b.sh")]);
}
