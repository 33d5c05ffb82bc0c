//! Store-level tests against real archive files.

use mbtilesrv::store::TileStore;
use mbtilesrv::StoreError;
use serde_json::Value;

use super::test_utils::{default_metadata, ArchiveFixture};

#[test]
fn test_tiles_come_back_byte_exact() {
    let fixture = ArchiveFixture::new(&default_metadata());
    let payload: Vec<u8> = (0u16..512).map(|i| (i % 251) as u8).collect();
    fixture.insert_tile(2, 1, 3, &payload);

    let store = TileStore::open(fixture.path()).unwrap();
    assert_eq!(store.get_tile(2, 1, 3).unwrap(), payload);
}

#[test]
fn test_missing_tile_is_distinguishable_from_io_failure() {
    let fixture = ArchiveFixture::new(&default_metadata());
    let store = TileStore::open(fixture.path()).unwrap();

    let err = store.get_tile(0, 0, 0).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, StoreError::TileNotFound));
}

#[test]
fn test_grid_merges_all_rows() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_grid(1, 0, 0, r#"{"grid":[" "],"keys":["1","2","3"]}"#);
    fixture.insert_grid_data(1, 0, 0, "1", r#"{"name":"Alpha"}"#);
    fixture.insert_grid_data(1, 0, 0, "2", r#"{"name":"Beta"}"#);
    fixture.insert_grid_data(1, 0, 0, "3", r#"{"name":"Gamma"}"#);

    let store = TileStore::open(fixture.path()).unwrap();
    let body = store.get_grid_data(1, 0, 0, None).unwrap();
    let doc: Value = serde_json::from_slice(&body).unwrap();

    let data = doc["data"].as_object().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(doc["data"]["1"]["name"], "Alpha");
    assert_eq!(doc["data"]["2"]["name"], "Beta");
    assert_eq!(doc["data"]["3"]["name"], "Gamma");
    assert_eq!(doc["keys"], serde_json::json!(["1", "2", "3"]));
}

#[test]
fn test_grid_with_no_rows_has_empty_data_object() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_grid(0, 0, 0, r#"{"keys":[]}"#);

    let store = TileStore::open(fixture.path()).unwrap();
    let body = store.get_grid_data(0, 0, 0, None).unwrap();
    let doc: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(doc["data"], serde_json::json!({}));
}

#[test]
fn test_jsonp_wrapping_is_exact() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_grid(0, 0, 0, r#"{"keys":[]}"#);

    let store = TileStore::open(fixture.path()).unwrap();
    let plain = store.get_grid_data(0, 0, 0, None).unwrap();
    let wrapped = store.get_grid_data(0, 0, 0, Some("grid")).unwrap();

    let mut expected = b"grid(".to_vec();
    expected.extend_from_slice(&plain);
    expected.extend_from_slice(b");");
    assert_eq!(wrapped, expected);
}

#[test]
fn test_corrupt_grid_blob_reports_decode_error() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_raw_grid(0, 0, 0, b"this is not zlib data");
    fixture.insert_tile(0, 0, 0, b"still fine");

    let store = TileStore::open(fixture.path()).unwrap();

    let err = store.get_grid_data(0, 0, 0, None).unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");

    // Other lookups keep working after a failed assembly.
    assert_eq!(store.get_tile(0, 0, 0).unwrap(), b"still fine");
}

#[test]
fn test_metadata_parse_errors_are_non_fatal() {
    let fixture = ArchiveFixture::new(&[
        ("name", "Partially Broken"),
        ("maxzoom", "many"),
        ("bounds", "-10,-10,10,10"),
    ]);

    let store = TileStore::open(fixture.path()).unwrap();
    let metadata = store.metadata().unwrap();

    assert_eq!(metadata.name, "Partially Broken");
    assert_eq!(metadata.bounds.west, -10.0);
    assert_eq!(metadata.max_zoom, 0);
    assert_eq!(metadata.errors.len(), 1);
    assert_eq!(metadata.errors[0].field, "maxzoom");
}

#[test]
fn test_concurrent_readers_share_the_store() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_tile(1, 0, 0, b"shared");

    let store = std::sync::Arc::new(TileStore::open(fixture.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    assert_eq!(store.get_tile(1, 0, 0).unwrap(), b"shared");
                    assert!(store.get_tile(1, 0, 1).unwrap_err().is_not_found());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
