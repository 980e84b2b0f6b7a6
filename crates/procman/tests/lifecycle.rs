//! Lifecycle and sweep behaviour against an in-memory launcher

mod common;

use common::{Behavior, FakeLauncher, manager_with, meta, wait_for_state};
use futures::future::join_all;
use procman::process_launcher::{ExitStatus, Signal};
use procman::{Action, Error, PlainTable, ProcessManager, ProcessState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[smol_potat::test]
async fn test_operations_on_unknown_name() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);

    assert!(matches!(manager.start_process("ghost").await, Err(Error::NotFound { .. })));
    assert!(matches!(manager.stop_process("ghost").await, Err(Error::NotFound { .. })));
    assert!(matches!(manager.kill_process("ghost").await, Err(Error::NotFound { .. })));
    assert!(matches!(manager.remove_process("ghost").await, Err(Error::NotFound { .. })));
    assert!(manager.lookup("ghost").await.unwrap_err().is_not_found());
    assert!(manager.metadata("ghost").await.unwrap_err().is_not_found());
}

#[smol_potat::test]
async fn test_register_rejects_duplicates() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);

    manager.register("node", meta("node-bin")).await.unwrap();
    let err = manager.register("node", meta("other")).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRegistered { ref name } if name == "node"));

    // Original metadata survives
    let metadata = manager.metadata("node").await.unwrap();
    assert_eq!(metadata.executable.to_str(), Some("node-bin"));
}

#[smol_potat::test]
async fn test_start_and_stop() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();

    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.state, ProcessState::Stopped);
    assert!(!entry.has_handle);

    manager.start_process("node").await.unwrap();
    let entry = manager.lookup("node").await.unwrap();
    let process = launcher.last("node-bin").unwrap();
    assert_eq!(entry.state, ProcessState::Running);
    assert!(entry.has_handle);
    assert_eq!(entry.pid, Some(process.pid()));
    assert!(entry.started_at.is_some());

    manager.stop_process("node").await.unwrap();
    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.state, ProcessState::Stopped);
    assert!(!entry.has_handle);
    assert_eq!(entry.pid, None);
    assert_eq!(process.signals(), vec![Signal::Terminate]);
    assert!(process.has_exited());
}

#[smol_potat::test]
async fn test_kill_sends_sigkill() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    manager.kill_process("node").await.unwrap();

    let process = launcher.last("node-bin").unwrap();
    assert_eq!(process.signals(), vec![Signal::Kill]);
    assert_eq!(
        manager.lookup("node").await.unwrap().state,
        ProcessState::Stopped
    );
}

#[smol_potat::test]
async fn test_double_start_does_not_spawn_twice() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();

    manager.start_process("node").await.unwrap();
    let err = manager.start_process("node").await.unwrap_err();

    match err {
        Error::InvalidState {
            name,
            state,
            operation,
        } => {
            assert_eq!(name, "node");
            assert_eq!(state, ProcessState::Running);
            assert_eq!(operation, Action::Start);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(launcher.launch_count("node-bin"), 1);
}

#[smol_potat::test]
async fn test_stop_when_stopped_is_invalid() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();

    let err = manager.stop_process("node").await.unwrap_err();
    assert!(err.is_invalid_state());
    let err = manager.kill_process("node").await.unwrap_err();
    assert!(err.is_invalid_state());
}

#[smol_potat::test]
async fn test_restart_spawns_new_process() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();

    manager.start_process("node").await.unwrap();
    let first = manager.lookup("node").await.unwrap().pid;
    manager.stop_process("node").await.unwrap();
    manager.start_process("node").await.unwrap();
    let second = manager.lookup("node").await.unwrap().pid;

    assert_eq!(launcher.launch_count("node-bin"), 2);
    assert_ne!(first, second);
}

#[smol_potat::test]
async fn test_spawn_failure_leaves_entry_stopped() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("missing-bin", Behavior::FailSpawn);
    let manager = manager_with(&launcher);
    manager.register("node", meta("missing-bin")).await.unwrap();

    let err = manager.start_process("node").await.unwrap_err();
    assert!(matches!(err, Error::SpawnFailed { ref name, .. } if name == "node"));

    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.state, ProcessState::Stopped);
    assert!(!entry.has_handle);
    assert!(entry.last_error.unwrap().contains("missing-bin"));
}

#[smol_potat::test]
async fn test_stop_of_exited_process_is_stale() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("short-bin", Behavior::AlreadyExited);
    let manager = manager_with(&launcher);
    manager.register("node", meta("short-bin")).await.unwrap();

    // The launch succeeds, the process is just gone by the time we stop it
    manager.start_process("node").await.unwrap();
    let err = manager.stop_process("node").await.unwrap_err();
    assert!(matches!(err, Error::StaleProcess { ref name } if name == "node"));

    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.state, ProcessState::Stopped);
    assert!(!entry.has_handle);
    assert!(entry.last_error.is_some());

    // The entry can be started again
    manager.start_process("node").await.unwrap();
}

#[smol_potat::test]
async fn test_process_exiting_on_its_own_is_stale() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    launcher.last("node-bin").unwrap().exit(ExitStatus {
        code: Some(1),
        signal: None,
    });

    let err = manager.kill_process("node").await.unwrap_err();
    assert!(matches!(err, Error::StaleProcess { .. }));
    assert!(launcher.last("node-bin").unwrap().signals().is_empty());
}

#[smol_potat::test]
async fn test_signal_failure_keeps_entry_running() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("guarded-bin", Behavior::FailSignal);
    let manager = manager_with(&launcher);
    manager.register("node", meta("guarded-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    let err = manager.stop_process("node").await.unwrap_err();
    assert!(matches!(err, Error::SignalFailed { ref name, .. } if name == "node"));

    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.state, ProcessState::Running);
    assert!(entry.has_handle);
    assert!(entry.is_consistent());
}

#[smol_potat::test]
async fn test_stop_escalates_to_kill_after_timeout() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("stubborn-bin", Behavior::IgnoreTerminate);
    let manager = manager_with(&launcher);
    manager.register("node", meta("stubborn-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    manager.stop_process("node").await.unwrap();

    let process = launcher.last("stubborn-bin").unwrap();
    assert_eq!(process.signals(), vec![Signal::Terminate, Signal::Kill]);
    assert_eq!(
        process.exit_status().and_then(|s| s.signal),
        Some(Signal::Kill.number())
    );
    assert_eq!(
        manager.lookup("node").await.unwrap().state,
        ProcessState::Stopped
    );
}

#[smol_potat::test]
async fn test_operations_rejected_while_stopping() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("stubborn-bin", Behavior::IgnoreTerminate);
    common::init_tracing();
    let manager = ProcessManager::builder()
        .launcher(launcher.clone())
        .stop_timeout(None)
        .build();
    manager.register("node", meta("stubborn-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    let stopper = {
        let manager = manager.clone();
        smol::spawn(async move { manager.stop_process("node").await })
    };
    assert!(wait_for_state(&manager, "node", ProcessState::Stopping, Duration::from_secs(5)).await);

    let entry = manager.lookup("node").await.unwrap();
    assert!(entry.has_handle);
    assert!(entry.is_consistent());

    let err = manager.stop_process("node").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            state: ProcessState::Stopping,
            operation: Action::Stop,
            ..
        }
    ));
    assert!(manager.start_process("node").await.unwrap_err().is_invalid_state());
    assert!(manager.kill_process("node").await.unwrap_err().is_invalid_state());

    launcher.last("stubborn-bin").unwrap().exit(ExitStatus {
        code: Some(0),
        signal: None,
    });
    stopper.await.unwrap();

    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.state, ProcessState::Stopped);
    assert_eq!(launcher.launch_count("stubborn-bin"), 1);
}

#[smol_potat::test]
async fn test_remove_rejected_while_stopping() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("stubborn-bin", Behavior::IgnoreTerminate);
    common::init_tracing();
    let manager = ProcessManager::builder()
        .launcher(launcher.clone())
        .stop_timeout(None)
        .build();
    manager.register("node", meta("stubborn-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    let stopper = {
        let manager = manager.clone();
        smol::spawn(async move { manager.stop_process("node").await })
    };
    assert!(wait_for_state(&manager, "node", ProcessState::Stopping, Duration::from_secs(5)).await);

    let err = manager.remove_process("node").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            state: ProcessState::Stopping,
            operation: Action::Remove,
            ..
        }
    ));

    // The live process is still tracked
    let table = manager.process_table(PlainTable::default()).await;
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0][1], "stopping");
    let process = launcher.last("stubborn-bin").unwrap();
    assert!(!process.has_exited());

    process.exit(ExitStatus {
        code: Some(0),
        signal: None,
    });
    stopper.await.unwrap();

    manager.remove_process("node").await.unwrap();
    assert!(manager.process_table(PlainTable::default()).await.rows.is_empty());
}

#[smol_potat::test]
async fn test_entry_observable_while_starting() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();
    let release = launcher.hold_launches();

    let starter = {
        let manager = manager.clone();
        smol::spawn(async move { manager.start_process("node").await })
    };
    assert!(wait_for_state(&manager, "node", ProcessState::Starting, Duration::from_secs(5)).await);

    // Reads are served while the spawn is in flight
    assert!(manager.metadata("node").await.is_ok());
    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.pid, None);
    assert!(entry.is_consistent());
    let table = manager.process_table(PlainTable::default()).await;
    assert_eq!(table.rows[0][1], "starting");

    let err = manager.start_process("node").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            state: ProcessState::Starting,
            operation: Action::Start,
            ..
        }
    ));
    assert!(manager.stop_process("node").await.unwrap_err().is_invalid_state());
    let err = manager.remove_process("node").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            state: ProcessState::Starting,
            operation: Action::Remove,
            ..
        }
    ));

    release.send(()).await.unwrap();
    starter.await.unwrap();

    let entry = manager.lookup("node").await.unwrap();
    assert_eq!(entry.state, ProcessState::Running);
    assert!(entry.has_handle);
    assert_eq!(launcher.launch_count("node-bin"), 1);
}

#[smol_potat::test]
async fn test_remove_running_process() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    manager.remove_process("node").await.unwrap();

    assert!(manager.lookup("node").await.unwrap_err().is_not_found());
    assert!(manager.process_table(PlainTable::default()).await.rows.is_empty());
    let process = launcher.last("node-bin").unwrap();
    assert_eq!(process.signals(), vec![Signal::Terminate]);
    assert!(process.has_exited());

    // The name is free again
    manager.register("node", meta("node-bin")).await.unwrap();
}

#[smol_potat::test]
async fn test_remove_proceeds_when_stop_fails() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("guarded-bin", Behavior::FailSignal);
    let manager = manager_with(&launcher);
    manager.register("node", meta("guarded-bin")).await.unwrap();
    manager.start_process("node").await.unwrap();

    manager.remove_process("node").await.unwrap();

    assert!(manager.lookup("node").await.unwrap_err().is_not_found());
    // Dropping the handle took the process down
    assert!(launcher.last("guarded-bin").unwrap().has_exited());
}

#[smol_potat::test]
async fn test_stop_all_reports_every_failure() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("a-bin", Behavior::FailSignal);
    let manager = manager_with(&launcher);
    manager.register("c", meta("c-bin")).await.unwrap();
    manager.register("b", meta("b-bin")).await.unwrap();
    manager.register("a", meta("a-bin")).await.unwrap();
    manager.start_process("a").await.unwrap();
    manager.start_process("c").await.unwrap();

    let report = manager.stop_all_processes().await;

    assert_eq!(report.action(), Action::Stop);
    assert_eq!(report.succeeded(), ["c".to_string()]);
    assert_eq!(report.skipped(), ["b".to_string()]);
    assert_eq!(report.failures().len(), 1);

    let first = report.first().unwrap();
    assert_eq!(first.name, "a");
    assert!(matches!(first.error, Error::SignalFailed { .. }));
    assert!(first.to_string().starts_with("Error on process 'a':"));

    // The failure on "a" did not stop the sweep from reaching "c"
    assert_eq!(manager.lookup("c").await.unwrap().state, ProcessState::Stopped);
    assert_eq!(manager.lookup("a").await.unwrap().state, ProcessState::Running);
    assert!(report.into_result().is_err());
}

#[smol_potat::test]
async fn test_start_all_skips_running_entries() {
    let launcher = FakeLauncher::new();
    launcher.set_behavior("b-bin", Behavior::FailSpawn);
    let manager = manager_with(&launcher);
    for name in ["a", "b", "c"] {
        manager
            .register(name, meta(&format!("{}-bin", name)))
            .await
            .unwrap();
    }
    manager.start_process("c").await.unwrap();

    let report = manager.start_all_processes().await;

    assert_eq!(report.succeeded(), ["a".to_string()]);
    assert_eq!(report.skipped(), ["c".to_string()]);
    assert_eq!(report.first().map(|f| f.name.as_str()), Some("b"));
    assert_eq!(launcher.launch_count("c-bin"), 1);
    assert_eq!(manager.lookup("a").await.unwrap().state, ProcessState::Running);
    assert_eq!(manager.lookup("b").await.unwrap().state, ProcessState::Stopped);
}

#[smol_potat::test]
async fn test_kill_all_and_empty_sweeps() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);

    let report = manager.kill_all_processes().await;
    assert!(report.is_success());
    assert!(report.succeeded().is_empty());

    manager.register("a", meta("a-bin")).await.unwrap();
    manager.register("b", meta("b-bin")).await.unwrap();
    assert!(manager.start_all_processes().await.is_success());

    let report = manager.kill_all_processes().await;
    assert!(report.is_success());
    assert_eq!(report.succeeded().len(), 2);
    assert_eq!(launcher.last("a-bin").unwrap().signals(), vec![Signal::Kill]);
    assert_eq!(launcher.last("b-bin").unwrap().signals(), vec![Signal::Kill]);
}

#[smol_potat::test]
async fn test_process_table_is_ordered_by_name() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    for name in ["zeta", "alpha", "mid"] {
        manager.register(name, meta("node-bin")).await.unwrap();
    }
    manager.start_process("mid").await.unwrap();

    let table = manager.process_table(PlainTable::default()).await;
    assert_eq!(table.header, vec!["NAME", "STATE", "PID", "UPTIME"]);

    let names: Vec<&str> = table.rows.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    assert_eq!(table.rows[0][1], "stopped");
    assert_eq!(table.rows[0][2], "-");
    assert_eq!(table.rows[1][1], "running");
    assert_ne!(table.rows[1][2], "-");

    // Same contents render the same way every time
    let again = manager.process_table(PlainTable::default()).await;
    assert_eq!(
        again.rows.iter().map(|r| &r[..3]).collect::<Vec<_>>(),
        table.rows.iter().map(|r| &r[..3]).collect::<Vec<_>>()
    );

    let rendered = manager
        .process_table(comfy_table::Table::new())
        .await
        .to_string();
    assert!(rendered.find("alpha").unwrap() < rendered.find("zeta").unwrap());
}

#[smol_potat::test]
async fn test_concurrent_operations_keep_handles_consistent() {
    let launcher = FakeLauncher::new();
    let manager = manager_with(&launcher);
    manager.register("node", meta("node-bin")).await.unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let manager = manager.clone();
        let done = done.clone();
        smol::spawn(async move {
            let mut samples = 0;
            loop {
                let finished = done.load(Ordering::SeqCst);
                for entry in manager.snapshot().await {
                    assert!(entry.is_consistent(), "inconsistent entry: {:?}", entry);
                }
                for row in manager.process_table(PlainTable::default()).await.rows {
                    match row[1].as_str() {
                        "stopped" | "starting" => assert_eq!(row[2], "-", "row: {:?}", row),
                        _ => assert_ne!(row[2], "-", "row: {:?}", row),
                    }
                }
                samples += 1;
                if finished {
                    return samples;
                }
                smol::future::yield_now().await;
            }
        })
    };

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let manager = manager.clone();
            smol::spawn(async move {
                let action = if i % 2 == 0 { Action::Start } else { Action::Stop };
                let result = match action {
                    Action::Start => manager.start_process("node").await,
                    _ => manager.stop_process("node").await,
                };
                (action, result.is_ok())
            })
        })
        .collect();

    let results = join_all(tasks).await;
    done.store(true, Ordering::SeqCst);
    assert!(observer.await >= 1);

    let starts = results
        .iter()
        .filter(|(action, ok)| *action == Action::Start && *ok)
        .count();

    assert!(starts >= 1);
    assert_eq!(starts, launcher.launch_count("node-bin"));
    for entry in manager.snapshot().await {
        assert!(entry.is_consistent());
    }
}
