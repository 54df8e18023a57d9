#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{json_output, vitrine_cmd};

async fn mount_head(server: &MockServer, route: &str, content_type: &str) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", content_type))
        .mount(server)
        .await;
}

#[tokio::test]
async fn resolve_falls_back_to_another_extension() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let server = MockServer::start().await;
    mount_head(&server, "/galeria/look.webp", "image/webp").await;

    let report = json_output(vitrine_cmd(data_dir.path()).args([
        "resolve",
        &server.uri(),
        "/galeria/look.jpg",
        "--network",
        "4g",
    ]));

    let asset = &report["assets"][0];
    assert_eq!(asset["requested"], "/galeria/look.jpg");
    assert_eq!(asset["url"], "/galeria/look.webp");
    assert_eq!(asset["status"], "resolved");
    assert_eq!(report["tier"], "high");
    assert_eq!(report["queue"]["max_concurrent"], 20);
    Ok(())
}

#[tokio::test]
async fn resolved_hint_is_reused_by_the_next_run() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/galeria/vestido.jpg"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    for _ in 0..2 {
        let report = json_output(vitrine_cmd(data_dir.path()).args([
            "resolve",
            &server.uri(),
            "/galeria/vestido.jpg",
        ]));
        assert_eq!(report["assets"][0]["url"], "/galeria/vestido.jpg");
    }

    let stats = json_output(vitrine_cmd(data_dir.path()).args(["cache", "stats"]));
    assert_eq!(stats["resolved"], 1);
    assert_eq!(stats["key"], "image_cache_v1");

    // Mock expectations are verified when the server drops.
    Ok(())
}

#[tokio::test]
async fn missing_image_degrades_to_placeholder() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let server = MockServer::start().await;

    let report = json_output(vitrine_cmd(data_dir.path()).args([
        "resolve",
        &server.uri(),
        "/galeria/sumiu.jpg",
    ]));

    let asset = &report["assets"][0];
    assert_eq!(asset["url"], "/placeholder.svg");
    assert_eq!(asset["status"], "failed");

    // Failures are not persisted.
    let stats = json_output(vitrine_cmd(data_dir.path()).args(["cache", "stats"]));
    assert_eq!(stats["resolved"], 0);
    Ok(())
}

#[tokio::test]
async fn missing_video_fails_the_command() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let server = MockServer::start().await;
    mount_head(&server, "/videos/desfile.webm", "video/webm").await;

    vitrine_cmd(data_dir.path())
        .args([
            "resolve",
            &server.uri(),
            "/videos/desfile.mp4",
            "/videos/sumiu.mp4",
            "--kind",
            "video",
            "--format",
            "json",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("/videos/desfile.webm"))
        .stderr(predicate::str::contains("1 of 2 video asset(s)"));
    Ok(())
}

#[tokio::test]
async fn wrong_media_family_is_not_a_hit() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let server = MockServer::start().await;
    // An HTML error page served with 200 must not count as the photo.
    mount_head(&server, "/galeria/look.jpg", "text/html").await;
    mount_head(&server, "/galeria/look.png", "image/png").await;

    let report = json_output(vitrine_cmd(data_dir.path()).args([
        "resolve",
        &server.uri(),
        "/galeria/look.jpg",
    ]));
    assert_eq!(report["assets"][0]["url"], "/galeria/look.png");
    Ok(())
}

#[tokio::test]
async fn report_flag_includes_load_samples() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let server = MockServer::start().await;
    mount_head(&server, "/a.jpg", "image/jpeg").await;
    mount_head(&server, "/b.jpg", "image/jpeg").await;

    let report = json_output(vitrine_cmd(data_dir.path()).args([
        "resolve",
        &server.uri(),
        "/a.jpg",
        "/b.jpg",
        "--report",
    ]));
    assert_eq!(report["metrics"]["image_load_ms"]["count"], 2);
    Ok(())
}

#[tokio::test]
async fn text_output_marks_fallbacks() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let server = MockServer::start().await;
    mount_head(&server, "/galeria/look.webp", "image/webp").await;

    vitrine_cmd(data_dir.path())
        .args(["resolve", &server.uri(), "/galeria/look.jpg", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/galeria/look.jpg -> /galeria/look.webp"));
    Ok(())
}
