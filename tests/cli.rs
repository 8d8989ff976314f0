use assert_cmd::Command;
use predicates::prelude::*;

fn transcriber() -> Command {
    let mut cmd = Command::cargo_bin("transcriber").unwrap();
    cmd.env_remove("TRANSCRIBER_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    transcriber()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("video-id"));
}

#[test]
fn video_id_accepts_url_shapes() {
    for input in [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
        "https://youtu.be/dQw4w9WgXcQ",
        "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        "dQw4w9WgXcQ",
    ] {
        transcriber()
            .args(["video-id", input])
            .assert()
            .success()
            .stdout("dQw4w9WgXcQ\n");
    }
}

#[test]
fn video_id_rejects_invalid_input() {
    transcriber()
        .args(["video-id", "https://example.com/not-a-video"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid YouTube URL"));
}

#[test]
fn config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    transcriber()
        .args(["config", "--init", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));
    assert!(path.exists());

    transcriber()
        .args(["config", "--show", "--config"])
        .arg(&path)
        .env_remove("YT_BACKEND")
        .assert()
        .success()
        .stdout(predicate::str::contains("Languages: en, he"))
        .stdout(predicate::str::contains("Retry: 3 attempts"));

    // Refuses to overwrite
    transcriber()
        .args(["config", "--init", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "retry:\n  max_attempts: 0\n").unwrap();

    transcriber()
        .args(["config", "--show", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_attempts"));
}

#[test]
fn transcribe_rejects_invalid_url_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "youtube:\n  backend: innertube\n").unwrap();

    transcriber()
        .args(["--quiet", "transcribe", "not a youtube link", "--config"])
        .arg(&path)
        .env_remove("YT_COOKIES_PATH")
        .env_remove("YT_BACKEND")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid YouTube URL"));
}
