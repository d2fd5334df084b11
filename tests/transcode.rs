//! Converter subprocess behavior, exercised against small shell-script
//! stand-ins for ffmpeg. The argument profile is fixed
//! (`-nostdin -y -i <in> -c:a libopus <out>`), so a stand-in sees the
//! input path as `$4` and the output path as `$7`.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use opusbot::bot::transcode::{ProcessError, Transcoder};

fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn test_successful_conversion_produces_output() {
    let temp = TempDir::new().unwrap();
    let script = write_script(&temp, "fake-ffmpeg", r#"cp "$4" "$7""#);

    let input = temp.path().join("input_1_1");
    let output = temp.path().join("output_1_1.opus");
    std::fs::write(&input, b"media bytes").unwrap();

    let transcoder = Transcoder::new(script.to_string_lossy().to_string());
    transcoder.convert_to_opus(&input, &output).await.unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), b"media bytes");
}

#[tokio::test]
async fn test_nonzero_exit_captures_stderr() {
    let temp = TempDir::new().unwrap();
    let script = write_script(&temp, "fake-ffmpeg", "echo 'no such codec' >&2\nexit 3");

    let transcoder = Transcoder::new(script.to_string_lossy().to_string());
    let err = transcoder
        .convert_to_opus(&temp.path().join("in"), &temp.path().join("out"))
        .await
        .unwrap_err();

    match err {
        ProcessError::Exit {
            code, diagnostics, ..
        } => {
            assert_eq!(code, 3);
            assert!(diagnostics.stderr.contains("no such codec"));
        }
        other => panic!("expected Exit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deadline_terminates_subprocess() {
    let temp = TempDir::new().unwrap();
    let script = write_script(&temp, "fake-ffmpeg", "sleep 5");

    let transcoder = Transcoder::new(script.to_string_lossy().to_string())
        .with_deadline(Duration::from_millis(100));

    let started = Instant::now();
    let err = transcoder
        .convert_to_opus(&temp.path().join("in"), &temp.path().join("out"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::DeadlineExceeded { .. }));
    // The child must be killed, not waited for.
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_probe_distinguishes_present_and_broken() {
    let temp = TempDir::new().unwrap();

    let ok = write_script(&temp, "ok-ffmpeg", "exit 0");
    Transcoder::new(ok.to_string_lossy().to_string())
        .probe()
        .await
        .unwrap();

    let broken = write_script(&temp, "broken-ffmpeg", "exit 1");
    let err = Transcoder::new(broken.to_string_lossy().to_string())
        .probe()
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Exit { code: 1, .. }));
}
