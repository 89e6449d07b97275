use std::{fs, path::Path};

use citibike_risk::{
    data::{
        collisions::load_collisions,
        stations::{derive_stations, load_stations},
        trips::{discover_trip_files, load_trips},
        Station,
    },
    error::RiskError,
};
use tempfile::tempdir;

const TRIP_HEADER: &str =
    "ride_id,started_at,start_station_name,start_station_id,start_lat,start_lng,member_casual";

fn write(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn risk_error(err: anyhow::Error) -> RiskError {
    err.downcast::<RiskError>().expect("a RiskError")
}

#[test]
fn discovers_only_valid_year_month_partitions() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(&root.join("2024/05/part-1.csv"), TRIP_HEADER);
    write(&root.join("2024/05/part-0.csv"), TRIP_HEADER);
    write(&root.join("2024/13/bad-month.csv"), TRIP_HEADER);
    write(&root.join("notes/05/skip.csv"), TRIP_HEADER);
    write(&root.join("2024/05/readme.txt"), "ignored");
    write(&root.join("flat.csv"), TRIP_HEADER);

    let files = discover_trip_files(root).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["2024/05/part-0.csv", "2024/05/part-1.csv", "flat.csv"]);
}

#[test]
fn loads_trips_and_rejects_unknown_stations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trips.csv");
    write(
        &path,
        &format!(
            "{TRIP_HEADER}\n\
             r1,2024-05-01 08:01:02.123,W 4 St,5329.03,40.73,-74.00,member\n\
             r2,2024-05-01 09:30:00,W 4 St,5329.03,40.73,-74.00,casual\n"
        ),
    );
    let stations = vec![Station::new("5329.03", 40.73, -74.0)];
    let trips = load_trips(&[path.clone()], &stations).unwrap();
    assert_eq!(trips.len(), 2);
    assert_eq!(trips[0].start_station_id, "5329.03");

    let err = risk_error(load_trips(&[path], &[Station::new("other", 40.0, -74.0)]).unwrap_err());
    assert!(matches!(err, RiskError::InvalidInputRow { table: "trips", row: 1, .. }));
}

#[test]
fn rejects_unparseable_trip_timestamp() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trips.csv");
    write(
        &path,
        &format!("{TRIP_HEADER}\nr1,yesterday,W 4 St,S1,40.73,-74.00,member\n"),
    );
    let err = risk_error(load_trips(&[path], &[Station::new("S1", 40.73, -74.0)]).unwrap_err());
    assert!(matches!(err, RiskError::InvalidInputRow { table: "trips", .. }));
}

#[test]
fn collision_validation_catches_bad_rows() {
    let dir = tempdir().unwrap();
    let header = "collision_id,latitude,longitude,timestamp,cyclists_injured,cyclists_killed,others_injured,others_killed";

    let ok = dir.path().join("ok.csv");
    write(&ok, &format!("{header}\n1,40.7,-74.0,2024-05-01 08:00,1,0,2,0\n"));
    let collisions = load_collisions(&ok).unwrap();
    assert_eq!(collisions[0].others_injured, 2);

    let negative = dir.path().join("negative.csv");
    write(&negative, &format!("{header}\n1,40.7,-74.0,2024-05-01 08:00,-1,0,0,0\n"));
    assert!(matches!(
        risk_error(load_collisions(&negative).unwrap_err()),
        RiskError::InvalidInputRow { table: "collisions", row: 1, .. }
    ));

    let missing_coords = dir.path().join("missing.csv");
    write(&missing_coords, &format!("{header}\n1,,-74.0,2024-05-01 08:00,0,0,0,0\n"));
    assert!(load_collisions(&missing_coords).is_err());

    let out_of_range = dir.path().join("range.csv");
    write(&out_of_range, &format!("{header}\n1,95.0,-74.0,2024-05-01 08:00,0,0,0,0\n"));
    assert!(load_collisions(&out_of_range).is_err());

    let duplicate = dir.path().join("dup.csv");
    write(
        &duplicate,
        &format!("{header}\n1,40.7,-74.0,2024-05-01 08:00,0,0,0,0\n1,40.7,-74.0,2024-05-01 09:00,0,0,0,0\n"),
    );
    assert!(matches!(
        risk_error(load_collisions(&duplicate).unwrap_err()),
        RiskError::InvalidInputRow { row: 2, .. }
    ));
}

#[test]
fn station_table_rejects_duplicates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stations.csv");
    write(
        &path,
        "station_id,station_name,latitude,longitude\nA,First,40.7,-74.0\nA,Again,40.8,-74.0\n",
    );
    assert!(matches!(
        risk_error(load_stations(&path).unwrap_err()),
        RiskError::InvalidInputRow { table: "stations", row: 2, .. }
    ));
}

#[test]
fn station_with_blank_coordinate_is_an_invalid_row() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stations.csv");
    write(
        &path,
        "station_id,station_name,latitude,longitude\nA,Alpha,40.7,-74.0\nB,Beta,,0.0\n",
    );
    assert!(matches!(
        risk_error(load_stations(&path).unwrap_err()),
        RiskError::InvalidInputRow { table: "stations", row: 2, .. }
    ));
}

#[test]
fn station_ids_are_trimmed_to_match_trips() {
    let dir = tempdir().unwrap();
    let stations_path = dir.path().join("stations.csv");
    write(
        &stations_path,
        "station_id,station_name,latitude,longitude\n 72 , W 52 St ,40.76,-73.99\n",
    );
    let stations = load_stations(&stations_path).unwrap();
    assert_eq!(stations[0].station_id, "72");
    assert_eq!(stations[0].station_name.as_deref(), Some("W 52 St"));

    let trips_path = dir.path().join("trips.csv");
    write(
        &trips_path,
        &format!("{TRIP_HEADER}\nr1,2024-05-01 08:00:00,W 52 St,72,40.76,-73.99,member\n"),
    );
    let trips = load_trips(&[trips_path], &stations).unwrap();
    assert_eq!(trips[0].start_station_id, "72");
}

#[test]
fn derives_stations_with_most_common_name_and_mean_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("2024/05/trips.csv");
    write(
        &path,
        &format!(
            "{TRIP_HEADER}\n\
             r1,2024-05-01 08:00:00,Broadway & W 60,S1,40.70,-74.00,member\n\
             r2,2024-05-01 08:05:00,Broadway & W 60 St,S1,40.72,-74.02,member\n\
             r3,2024-05-01 08:10:00,Broadway & W 60 St,S1,40.71,-74.01,member\n\
             r4,2024-05-01 08:15:00,Pier 40,S0,40.73,-74.01,casual\n\
             r5,2024-05-01 08:20:00,Ghost,S9,,,casual\n"
        ),
    );
    let stations = derive_stations(&[path]).unwrap();
    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].station_id, "S0");
    let s1 = &stations[1];
    assert_eq!(s1.station_name.as_deref(), Some("Broadway & W 60 St"));
    assert!((s1.latitude - 40.71).abs() < 1e-9);
    assert!((s1.longitude + 74.01).abs() < 1e-9);
}
