//! End-to-end tests running the `tlog-extract` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use logformat::{encode_log_blocks, write_utf};
use tempfile::tempdir;
use tfile::{Compression, TFileWriter};

fn utf(s: &str) -> Vec<u8> {
    let mut out = Vec::new();
    write_utf(&mut out, s).unwrap();
    out
}

fn write_sample_archive(path: &Path) {
    let mut w = TFileWriter::new(Vec::new(), Compression::Gz);
    // YARN stores the version as a bare int, not a string.
    w.append_chunked(&utf("VERSION"), &1i32.to_be_bytes(), 4096).unwrap();
    w.append_chunked(&utf("APPLICATION_OWNER"), &utf("alice"), 4096)
        .unwrap();
    let blocks = encode_log_blocks(vec![
        ("stdout", &b"hello world"[..]),
        ("stderr", &b""[..]),
    ])
    .unwrap();
    w.append_chunked(&utf("container_001"), &blocks, 4096).unwrap();
    fs::write(path, w.finish().unwrap()).unwrap();
}

fn run(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tlog-extract"))
        .args(args)
        .env_remove("TLOG_CONTAINER_PREFIX")
        .env_remove("TLOG_WRITE_BUFFER_KB")
        .env("TLOG_LOG", "info")
        .output()
        .expect("failed to spawn tlog-extract")
}

#[test]
fn extracts_archive() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("app.tfile");
    let out = dir.path().join("out");
    write_sample_archive(&archive);

    let output = run(&[archive.as_path(), out.as_path()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(fs::read(out.join("container_001/stdout")).unwrap(), b"hello world");
    assert_eq!(fs::read(out.join("container_001/stderr")).unwrap(), b"");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 containers, 2 files, 11 bytes"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(": VERSION="));
    assert!(stderr.contains("APPLICATION_OWNER=alice"));
}

#[test]
fn missing_arguments_exit_with_usage() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("app.tfile");

    for args in [vec![], vec![archive.as_path()]] {
        let output = run(&args);
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Usage"), "stderr: {}", stderr);
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn bad_archive_fails_with_context() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("app.tfile");
    fs::write(&archive, b"definitely not a tfile, just some text").unwrap();
    let out = dir.path().join("out");

    let output = run(&[archive.as_path(), out.as_path()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to extract"), "stderr: {}", stderr);
    assert!(stderr.contains("not a TFile"), "stderr: {}", stderr);
    assert!(!out.exists());
}

#[test]
fn invalid_configuration_is_rejected() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("app.tfile");
    let out = dir.path().join("out");
    write_sample_archive(&archive);

    let output = Command::new(env!("CARGO_BIN_EXE_tlog-extract"))
        .arg(&archive)
        .arg(&out)
        .env("TLOG_WRITE_BUFFER_KB", "lots")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("TLOG_WRITE_BUFFER_KB"));
    assert!(!out.exists());
}

#[test]
fn custom_prefix_from_environment() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("app.tfile");
    let out = dir.path().join("out");
    write_sample_archive(&archive);

    let output = Command::new(env!("CARGO_BIN_EXE_tlog-extract"))
        .arg(&archive)
        .arg(&out)
        .env("TLOG_CONTAINER_PREFIX", "APPLICATION_")
        .output()
        .unwrap();

    // APPLICATION_OWNER now has to be a block stream, and "alice" is not one.
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("APPLICATION_OWNER"));
}
