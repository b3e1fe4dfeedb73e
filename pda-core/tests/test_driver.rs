//! CdbDriver のテスト
//!
//! cdb の代わりに、`-logo` で指定されたファイルへ `-c` のコマンドを
//! 1つずつ書き出すシェルスクリプトを使います。
#![cfg(unix)]

use pda_core::{CdbDriver, CommandRunner, DebuggerCommand, DebuggerError, RunOptions};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// スクリプトの書き込み中に別スレッドが fork すると ETXTBSY になるため、起動を直列化する
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

const FAKE_CDB: &str = r#"#!/bin/sh
log=""
cmds=""
while [ $# -gt 0 ]; do
    case "$1" in
        -logo) log="$2"; shift 2 ;;
        -c) cmds="$2"; shift 2 ;;
        *) shift ;;
    esac
done

{
    echo "Microsoft (R) Windows Debugger Version 10.0.19041.685 X86"
    echo "CommandLine: cdb -c \"$cmds\""
    echo "Loading Dump File"
    echo "0:000> $cmds"
    set -f
    IFS=';'
    for cmd in $cmds; do
        case "$cmd" in
            ".echo "*) echo "${cmd#.echo }" ;;
            q) echo "quit:" ;;
            *) echo "output of $cmd" ;;
        esac
    done
} > "$log"
"#;

fn write_script(dir: &Path, name: &str, body: &str, executable: bool) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mode = if executable { 0o755 } else { 0o644 };
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    path
}

fn driver(path: &Path) -> CdbDriver {
    CdbDriver::new(path, "crash.dmp", "syms", None)
        .unwrap()
        .with_poll_interval(Duration::from_millis(5))
}

#[test]
fn test_driver_settings() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let cdb = write_script(dir.path(), "cdb", FAKE_CDB, true);
    let driver = driver(&cdb);
    assert_eq!(driver.debugger_path(), cdb.as_path());
    assert_eq!(driver.crash_dump(), Path::new("crash.dmp"));
    assert_eq!(driver.symbols(), "syms");
}

#[test]
fn test_unbounded_timeout_runs_to_completion() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let cdb = write_script(dir.path(), "cdb", FAKE_CDB, true);

    let output = driver(&cdb)
        .run_commands(&[DebuggerCommand::StackTrace], &RunOptions::batch(Duration::MAX))
        .unwrap();
    assert!(output.contains("output of kcn"));
}

#[test]
fn test_marked_output() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let cdb = write_script(dir.path(), "cdb", FAKE_CDB, true);

    let output = driver(&cdb)
        .run_commands(
            &[DebuggerCommand::SwitchFrame(1), DebuggerCommand::DumpLocals],
            &RunOptions::batch(Duration::from_secs(30)),
        )
        .unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 6, "unexpected output: {}", output);
    assert!(lines[0].starts_with("== Start Calling .frame 0x1 ["));
    assert_eq!(lines[1], "output of .frame 0x1");
    assert!(lines[2].starts_with("== End Calling .frame 0x1 ["));
    assert!(lines[3].starts_with("== Start Calling dv /t * ["));
    assert_eq!(lines[4], "output of dv /t *");
    assert!(lines[5].starts_with("== End Calling dv /t * ["));
    assert!(!output.contains("Microsoft"));
    assert!(!output.contains(".ecxr"));
    assert!(!output.contains("quit:"));
}

#[test]
fn test_unmarked_output_is_returned_whole() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let cdb = write_script(dir.path(), "cdb", FAKE_CDB, true);

    let options = RunOptions {
        markers: false,
        ..RunOptions::batch(Duration::from_secs(30))
    };
    let output = driver(&cdb).run_commands(&[DebuggerCommand::StackTrace], &options).unwrap();

    assert!(output.starts_with("Microsoft"));
    assert!(output.contains("output of .ecxr"));
    assert!(output.contains("output of kcn"));
    assert!(output.trim_end().ends_with("quit:"));
}

#[test]
fn test_timeout_terminates_debugger() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let pid_file = dir.path().join("pid");
    let body = format!("#!/bin/sh\necho $$ > '{}'\nsleep 30\nsleep 30\n", pid_file.display());
    let cdb = write_script(dir.path(), "cdb", &body, true);

    let start = Instant::now();
    let err = driver(&cdb)
        .run_commands(&[DebuggerCommand::Analyze], &RunOptions::batch(Duration::from_millis(500)))
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(20));
    match &err {
        DebuggerError::Timeout { commands, timeout } => {
            assert!(commands.contains("!analyze -v"));
            assert_eq!(*timeout, Duration::from_millis(500));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(err.is_retryable());

    // 子プロセスは回収済み（ゾンビも残らない）
    if cfg!(target_os = "linux") {
        if let Ok(pid) = fs::read_to_string(&pid_file) {
            let proc_dir = PathBuf::from(format!("/proc/{}", pid.trim()));
            assert!(!proc_dir.exists(), "debugger process {} still exists", pid.trim());
        }
    }
}

#[test]
fn test_nonzero_exit() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let cdb = write_script(dir.path(), "cdb", "#!/bin/sh\nexit 3\n", true);

    let err = driver(&cdb)
        .run_commands(&[DebuggerCommand::StackTrace], &RunOptions::batch(Duration::from_secs(30)))
        .unwrap_err();

    match err {
        DebuggerError::ProcessFailed { code, args } => {
            assert_eq!(code, Some(3));
            assert_eq!(args[0], cdb.display().to_string());
            assert!(args.iter().any(|a| a == "-logo"));
            assert!(args.last().unwrap().contains("kcn"));
        }
        other => panic!("expected process failure, got {:?}", other),
    }
}

#[test]
fn test_missing_debugger() {
    let dir = TempDir::new().unwrap();
    let err = CdbDriver::new(dir.path().join("cdb.exe"), "crash.dmp", "syms", None).unwrap_err();
    assert!(matches!(err, DebuggerError::EnvironmentMissing { .. }));
    assert!(err.to_string().starts_with("Could not find debugger"));
}

#[test]
fn test_non_executable_debugger() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let cdb = write_script(dir.path(), "cdb", FAKE_CDB, false);

    let err = driver(&cdb)
        .run_commands(&[DebuggerCommand::StackTrace], &RunOptions::batch(Duration::from_secs(30)))
        .unwrap_err();
    assert!(matches!(err, DebuggerError::Spawn { .. }), "got {:?}", err);
}
