use super::helpers::*;
use crate::*;
use config::ExtractorConfig;
use logformat::FrameError;
use std::fs;
use std::io;
use tempfile::tempdir;
use tfile::{Compression, TFileError, DEFAULT_MIN_BLOCK_SIZE};

fn header(name: &str, len: &str) -> Vec<u8> {
    let mut out = utf(name);
    out.extend(utf(len));
    out
}

// --------------------- Framing ---------------------

#[test]
fn short_payload_is_framing_error() {
    let dir = tempdir().unwrap();
    let mut value = header("stdout", "10");
    value.extend_from_slice(b"short");
    let input = write_archive(dir.path(), &archive(&[Rec::Raw("container_1", value)]));
    let out = dir.path().join("out");

    let err = local().extract(&input, &out).unwrap_err();

    match err {
        ExtractError::Framing { key, source } => {
            assert_eq!(key, "container_1");
            assert!(matches!(
                source,
                FrameError::TruncatedPayload {
                    declared: 10,
                    actual: 5,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // What was copied before the failure stays on disk.
    assert_eq!(fs::read(out.join("container_1/stdout")).unwrap(), b"short");
}

#[test]
fn eof_inside_length_field_is_framing_error() {
    let dir = tempdir().unwrap();
    let mut value = utf("stdout");
    value.extend_from_slice(&[0x00]);
    let input = write_archive(dir.path(), &archive(&[Rec::Raw("container_1", value)]));

    let err = local()
        .extract(&input, &dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Framing {
            source: FrameError::Truncated {
                field: "declared length"
            },
            ..
        }
    ));
}

#[test]
fn non_numeric_length_is_framing_error() {
    let dir = tempdir().unwrap();
    let input = write_archive(
        dir.path(),
        &archive(&[Rec::Raw("container_1", header("stdout", "ten"))]),
    );

    let err = local()
        .extract(&input, &dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Framing {
            source: FrameError::InvalidLength { .. },
            ..
        }
    ));
}

#[test]
fn records_before_a_bad_one_are_extracted() {
    let dir = tempdir().unwrap();
    let input = write_archive(
        dir.path(),
        &archive(&[
            Rec::Logs("container_1", vec![("stdout", &b"fine"[..])]),
            Rec::Raw("container_2", header("stdout", "99")),
        ]),
    );
    let out = dir.path().join("out");

    assert!(local().extract(&input, &out).is_err());
    assert_eq!(fs::read(out.join("container_1/stdout")).unwrap(), b"fine");
}

// --------------------- Unsafe names ---------------------

#[test]
fn key_with_separator_is_rejected() {
    let dir = tempdir().unwrap();
    let input = write_archive(
        dir.path(),
        &archive(&[Rec::Logs("container_1/../../escape", vec![("stdout", &b"x"[..])])]),
    );
    let out = dir.path().join("out");

    let err = local().extract(&input, &out).unwrap_err();

    assert!(matches!(err, ExtractError::UnsafePath(ref key) if key == "container_1/../../escape"));
    assert!(!dir.path().join("escape").exists());
    assert!(read_tree(&out).is_empty());
}

#[test]
fn block_name_escaping_the_container_is_rejected() {
    let dir = tempdir().unwrap();
    let input = write_archive(
        dir.path(),
        &archive(&[Rec::Logs("container_1", vec![("../escape", &b"x"[..])])]),
    );
    let out = dir.path().join("out");

    let err = local().extract(&input, &out).unwrap_err();

    match err {
        ExtractError::Output { path, source } => {
            assert_eq!(path, out.join("container_1"));
            assert_eq!(source.kind(), io::ErrorKind::InvalidInput);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!out.join("escape").exists());
}

// --------------------- Archive & output failures ---------------------

#[test]
fn missing_archive_is_io_error() {
    let dir = tempdir().unwrap();
    let err = local()
        .extract(&dir.path().join("nope.tfile"), &dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn non_tfile_input_is_archive_error() {
    let dir = tempdir().unwrap();
    let input = write_archive(dir.path(), b"plain text, not an archive at all");

    let err = local()
        .extract(&input, &dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::Archive(TFileError::NotTFile(_))));
}

#[test]
fn truncated_metadata_value_is_io_error() {
    let dir = tempdir().unwrap();
    let input = write_archive(
        dir.path(),
        &archive(&[Rec::Raw("VERSION", vec![0x00, 0x05, b'1'])]),
    );

    let err = local()
        .extract(&input, &dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
}

#[test]
fn output_failure_names_the_file() {
    let dir = tempdir().unwrap();
    let bytes = archive(&[Rec::Logs("container_1", vec![("stdout", &b"x"[..])])]);
    let extractor = LogExtractor::new(ExtractorConfig::default(), MemInput(bytes), ReadOnlyFs);
    let out = dir.path().join("out");

    let err = extractor.extract(&out, &out).unwrap_err();

    match err {
        ExtractError::Output { path, source } => {
            assert_eq!(path, out.join("container_1").join("stdout"));
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn archive_read_failure_inside_payload_is_not_an_output_error() {
    let dir = tempdir().unwrap();
    let payload = b"0123456789abcdef".repeat(16);
    let bytes = archive_with(
        &[Rec::Logs("container_1", vec![("stdout", payload.as_slice())])],
        Compression::None,
        DEFAULT_MIN_BLOCK_SIZE,
    );
    let start = bytes
        .windows(16)
        .position(|w| w == &payload[..16])
        .unwrap() as u64;
    let input = FailingInput {
        bytes,
        fail_at: start + 8,
    };
    let extractor = LogExtractor::new(ExtractorConfig::default(), input, LocalFs::default());
    let out = dir.path().join("out");

    let err = extractor.extract(&out, &out).unwrap_err();

    match err {
        ExtractError::Framing {
            key,
            source: FrameError::Io(e),
        } => {
            assert_eq!(key, "container_1");
            assert_eq!(e.kind(), io::ErrorKind::Other);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn errors_render_with_context() {
    let err = ExtractError::UnsafePath("..".to_string());
    assert_eq!(err.to_string(), "unsafe record key \"..\"");

    let err = ExtractError::Framing {
        key: "container_1".to_string(),
        source: FrameError::Truncated {
            field: "block name",
        },
    };
    assert_eq!(
        err.to_string(),
        "container container_1: stream ended inside the block name"
    );
}
