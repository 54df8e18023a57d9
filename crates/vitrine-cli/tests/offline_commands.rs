#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

mod common;
use common::{json_output, vitrine_cmd};

const CATALOG: &str = r#"[
    {"id": 1, "nome": "Vestido Elegance", "categoria": "vestidos", "preco": "R$ 189,90",
     "imagem": "/galeria/vestido-elegance.jpg", "descricao": "Vestido midi em tecido fluido"},
    {"id": 2, "nome": "Blusa Sophistique", "categoria": "blusas", "preco": "R$ 89,90",
     "imagem": "/galeria/blusa.jpg", "descricao": "Blusa social em crepe"},
    {"id": 3, "nome": "Vestido Aurora", "categoria": "vestidos", "preco": "R$ 219,90",
     "imagem": "/galeria/aurora.jpg", "descricao": "Longo com fenda"}
]"#;

#[test]
fn candidates_lists_fallbacks_in_order() {
    let data_dir = tempdir().unwrap();
    let list = json_output(vitrine_cmd(data_dir.path()).args(["candidates", "/galeria/look.jpg"]));

    let candidates: Vec<&str> = list["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert_eq!(candidates[0], "/galeria/look.jpg");
    assert_eq!(candidates[1], "/galeria/look.webp");
    assert!(candidates.contains(&"/lovable-uploads/galeria/look.jpg"));
    assert_eq!(list["name"], "look.jpg");
}

#[test]
fn profile_maps_connectivity_to_tiers() {
    let data_dir = tempdir().unwrap();

    let slow = json_output(vitrine_cmd(data_dir.path()).args(["profile", "--network", "2g"]));
    assert_eq!(slow["tier"], "low");
    assert_eq!(slow["max_concurrency"], 2);
    assert_eq!(slow["should_preload"], false);

    let unknown = json_output(vitrine_cmd(data_dir.path()).arg("profile"));
    assert_eq!(unknown["tier"], "medium");
    assert_eq!(unknown["max_concurrency"], 6);

    let saver = json_output(
        vitrine_cmd(data_dir.path()).args(["profile", "--network", "4g", "--save-data"]),
    );
    assert_eq!(saver["tier"], "low");
}

#[test]
fn config_file_overrides_tier_table() {
    let data_dir = tempdir().unwrap();
    let config = data_dir.path().join("config.toml");
    fs::write(
        &config,
        "[network.high]\nmax_concurrency = 24\nvideo_concurrency = 4\npreload_distance_px = 300\n",
    )
    .unwrap();

    let profile = json_output(vitrine_cmd(data_dir.path()).args([
        "profile",
        "--network",
        "4g",
        "--config",
        config.to_str().unwrap(),
    ]));
    assert_eq!(profile["max_concurrency"], 24);
    assert_eq!(profile["video_concurrency"], 4);
}

#[test]
fn gallery_filters_and_plans_priorities() {
    let data_dir = tempdir().unwrap();
    let catalog = data_dir.path().join("catalogo.json");
    fs::write(&catalog, CATALOG).unwrap();

    let entries = json_output(vitrine_cmd(data_dir.path()).args([
        "gallery",
        catalog.to_str().unwrap(),
        "--category",
        "vestidos",
        "--eager",
        "1",
    ]));
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], 1);
    assert_eq!(entries[0]["priority"], 10);
    assert_eq!(entries[1]["id"], 3);
    assert_eq!(entries[1]["priority"], 5);
    assert!(entries[0].get("resolved").is_none());
}

#[test]
fn gallery_adds_inquiry_links() {
    let data_dir = tempdir().unwrap();
    let catalog = data_dir.path().join("catalogo.json");
    fs::write(&catalog, CATALOG).unwrap();

    let entries = json_output(vitrine_cmd(data_dir.path()).args([
        "gallery",
        catalog.to_str().unwrap(),
        "--search",
        "blusa",
        "--contact",
        "55 62 99451-8406",
    ]));
    let link = entries[0]["inquiry"].as_str().unwrap();
    assert!(link.starts_with("https://wa.me/5562994518406?text="));
    assert!(link.contains("Blusa"));
}

#[test]
fn gallery_reports_unreadable_catalog() {
    let data_dir = tempdir().unwrap();
    vitrine_cmd(data_dir.path())
        .args(["gallery", "/nonexistent/catalogo.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read catalog"));
}

#[test]
fn carousel_window_wraps_around() {
    let data_dir = tempdir().unwrap();
    let window = json_output(
        vitrine_cmd(data_dir.path()).args(["carousel", "5", "--current", "0", "--radius", "1"]),
    );
    let indices: Vec<u64> = window
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![4, 0, 1]);
    assert_eq!(window[1]["priority"], 10);
}

#[test]
fn cache_clear_on_empty_store() {
    let data_dir = tempdir().unwrap();
    let cleared = json_output(vitrine_cmd(data_dir.path()).args(["cache", "clear"]));
    assert_eq!(cleared["cleared"], 0);

    vitrine_cmd(data_dir.path())
        .args(["cache", "clear", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 0 cached entries"));
}
