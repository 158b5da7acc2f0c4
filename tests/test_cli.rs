#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Mutex, MutexGuard};

/// 写脚本时若其他测试线程正在 fork，exec 可能返回 ETXTBSY，所以逐个执行
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const SKYLAKE_OUTPUT: &str = "COLLECT_GCC_OPTIONS='-march=native' '-mtune=native' '-E' '-v'
 /usr/lib/gcc/x86_64-linux-gnu/12/cc1 -E -quiet -v - -march=skylake -mavx2 -mno-sse4a --param=l1-cache-size=32 -mtune=skylake -dumpbase -";

fn skylake_compiler(dir: &Path) -> PathBuf {
    write_script(dir, "gcc", &format!("cat >&2 <<'EOF'\n{SKYLAKE_OUTPUT}\nEOF\nexit 0"))
}

/// 运行命令行程序；CC 与 RUST_LOG 被清掉，保证结果只取决于参数
fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_resolve-march-native"))
        .args(args)
        .env_remove("CC")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run resolve-march-native")
}

fn cc_arg(path: &Path) -> String {
    format!("--cc={}", path.display())
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn test_gcc_format_is_default() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let cc = skylake_compiler(dir.path());

    let out = run(&[&cc_arg(&cc)]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    // 相同的 -mtune 与 -mno-* 默认被去掉
    assert_eq!(stdout(&out), "-march=skylake -mavx2 --param=l1-cache-size=32\n");
    assert_eq!(stderr(&out), "");
}

#[test]
fn test_plain_format_with_keep_flags() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let cc = skylake_compiler(dir.path());

    let out = run(&[
        &cc_arg(&cc),
        "--format=plain",
        "--keep-identical-mtune",
        "--keep-mno-flags",
        "--without-params",
    ]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "-march=skylake\n-mtune=skylake\n-mavx2\n-mno-sse4a\n"
    );
}

#[test]
fn test_json_format() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let cc = skylake_compiler(dir.path());

    let out = run(&[&cc_arg(&cc), "--format=json"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["arch_flag"], "-march=skylake");
    assert!(value["tune_flag"].is_null());
    assert_eq!(value["other_flags"][0], "-mavx2");
}

#[test]
fn test_missing_compiler_exits_1() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-gcc");

    let out = run(&[&cc_arg(&missing)]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stdout(&out), "");
    assert!(stderr(&out).starts_with("Error: compiler not found"), "{}", stderr(&out));
}

#[test]
fn test_failing_compiler_exits_2() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let cc = write_script(
        dir.path(),
        "gcc",
        "echo \"gcc: error: unrecognized command-line option '-march=native'\" >&2\nexit 1",
    );

    let out = run(&[&cc_arg(&cc)]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(stdout(&out), "");
    let err = stderr(&out);
    assert!(err.starts_with("Error: invoking"), "{err}");
    assert!(err.contains("unrecognized command-line option"), "{err}");
}

#[test]
fn test_hung_compiler_times_out_with_exit_2() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let cc = write_script(dir.path(), "gcc", "exec sleep 60");

    let out = run(&[&cc_arg(&cc), "--timeout=0.3"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("timed out"), "{}", stderr(&out));
}

#[test]
fn test_unrecognized_output_exits_3() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let cc = write_script(dir.path(), "gcc", "echo 'clang version 17.0.6' >&2");

    let out = run(&[&cc_arg(&cc)]);
    assert_eq!(out.status.code(), Some(3));
    assert_eq!(stdout(&out), "");
    assert!(stderr(&out).starts_with("Error: "), "{}", stderr(&out));
}

#[test]
fn test_usage_error_exits_64() {
    let _lock = serial();
    let out = run(&["--bogus"]);
    assert_eq!(out.status.code(), Some(64));
    assert_eq!(stdout(&out), "");
    assert!(!stderr(&out).is_empty());

    let out = run(&["--format=yaml"]);
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn test_help_and_version_exit_0() {
    let _lock = serial();
    let out = run(&["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("--cc"));

    let out = run(&["--version"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains(env!("CARGO_PKG_VERSION")));
}
