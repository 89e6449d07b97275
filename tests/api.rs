use std::{fs, path::Path};

use assert_cmd::Command;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use citibike_risk::{api, config::Settings};
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn write_inputs(data: &Path) {
    fs::create_dir_all(data.join("clean")).unwrap();
    fs::create_dir_all(data.join("trips/2024/05")).unwrap();
    fs::write(
        data.join("clean/stations.csv"),
        "station_id,station_name,latitude,longitude\nA,Alpha,0.0,0.0\nB,Beta,0.0,0.01\n",
    )
    .unwrap();
    fs::write(
        data.join("trips/2024/05/trips.csv"),
        "started_at,start_station_id\n2024-05-01 08:00:00,A\n2024-05-01 09:00:00,B\n2024-05-02 08:00:00,A\n",
    )
    .unwrap();
    fs::write(
        data.join("clean/collisions.csv"),
        "collision_id,latitude,longitude,timestamp,cyclists_injured,cyclists_killed,others_injured,others_killed\n\
         1,0.0,0.001,2024-05-01 17:00,1,0,0,0\n",
    )
    .unwrap();
}

/// Run `score` into a fresh outputs dir and return settings pointing at it.
fn scored(extra: &[&str]) -> (TempDir, Settings) {
    let dir = tempdir().unwrap();
    let settings = Settings {
        data_dir: dir.path().join("data"),
        outputs_dir: dir.path().join("outputs"),
    };
    write_inputs(&settings.data_dir);
    Command::cargo_bin("citibike-risk")
        .unwrap()
        .current_dir(dir.path())
        .env("DATA_DIR", &settings.data_dir)
        .env("OUTPUTS_DIR", &settings.outputs_dir)
        .args(["score", "--eb-k", "10", "--time-bucket", "date"])
        .args(extra)
        .assert()
        .success();
    (dir, settings)
}

async fn get_json(settings: &Settings, uri: &str) -> Value {
    let response = api::router(settings.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn summary(settings: &Settings) -> Value {
    serde_json::from_str(
        &fs::read_to_string(settings.outputs_dir.join("run_summary.json")).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn absent_cell_answers_with_global_mean() {
    let (_dir, settings) = scored(&[]);
    let mean = summary(&settings)["cell_prior"]["mean"].as_f64().unwrap();

    let cell = get_json(&settings, "/stations/B/buckets/2024-05-02").await;
    assert_eq!(cell["observed"], false);
    assert_eq!(cell["exposure"], 0);
    assert!((cell["smoothed_risk"].as_f64().unwrap() - mean).abs() < 1e-12);
}

#[tokio::test]
async fn observed_cell_matches_scored_table() {
    let (_dir, settings) = scored(&[]);

    let cell = get_json(&settings, "/stations/A/buckets/2024-05-01").await;
    assert_eq!(cell["observed"], true);
    assert_eq!(cell["exposure"], 1);
    assert_eq!(cell["hazard"], 1.0);

    let listed = get_json(&settings, "/cells?station=A").await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|c| c["time_bucket"] == "2024-05-01"
        && c["smoothed_risk"] == cell["smoothed_risk"]));
}

#[tokio::test]
async fn parquet_outputs_are_served() {
    let (_dir, settings) = scored(&["--parquet"]);
    assert!(settings.outputs_dir.join("risk_cells.parquet").exists());
    assert!(!settings.outputs_dir.join("risk_cells.csv").exists());

    let cells = get_json(&settings, "/cells").await;
    assert_eq!(cells.as_array().unwrap().len(), 3);
    let stations = get_json(&settings, "/stations").await;
    assert_eq!(stations.as_array().unwrap().len(), 2);

    let cell = get_json(&settings, "/stations/A/buckets/2024-05-01").await;
    assert_eq!(cell["observed"], true);
    assert_eq!(cell["exposure"], 1);
}

#[tokio::test]
async fn missing_outputs_list_as_empty() {
    let dir = tempdir().unwrap();
    let settings = Settings {
        data_dir: dir.path().join("data"),
        outputs_dir: dir.path().join("outputs"),
    };
    let cells = get_json(&settings, "/cells").await;
    assert_eq!(cells, Value::Array(Vec::new()));
}
