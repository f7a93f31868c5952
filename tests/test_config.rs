// tests/test_config.rs
// Viewer configuration and world construction tests.
// Checks JSON persistence of tuning values and that bad inputs are refused up front.
// RELEVANT FILES: src/config.rs, src/grid.rs, src/overlay/world.rs, src/error.rs

use drape3d::{
    DisplayMode, DisplayProjection, GridProjection, TerrainGrid, ViewTransform, ViewerConfig,
    World,
};

#[test]
fn config_survives_json_round_trip() {
    let config = ViewerConfig {
        pick_division: 31,
        bounds_frequency: 3,
        drape_offset_factor: 4.0,
        ..ViewerConfig::default()
    };
    let json = config.to_json_string().expect("config should serialize");
    assert!(json.contains("\"pick_division\": 31"), "{}", json);
    let restored = ViewerConfig::from_json_str(&json).expect("config should parse");
    assert_eq!(restored, config);
    assert!((restored.drape_offset() - 0.004).abs() < 1e-12);
}

#[test]
fn empty_json_is_the_default_config() {
    let config = ViewerConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ViewerConfig::default());
}

#[test]
fn malformed_json_is_a_config_error() {
    let err = ViewerConfig::from_json_str("{ \"alloc_chunk\": ").unwrap_err();
    assert_eq!(err.category(), "Config");
}

#[test]
fn world_refuses_invalid_config() {
    let terrain = TerrainGrid::filled(4, 4, [0.0, 0.0], [0.1, 0.1], -5.0).unwrap();
    let config = ViewerConfig {
        alloc_chunk: 0,
        ..ViewerConfig::default()
    };
    let err = World::new(terrain, GridProjection::Geographic, config).unwrap_err();
    assert_eq!(err.category(), "Config");
}

#[test]
fn degenerate_grids_are_rejected() {
    let err = TerrainGrid::new(1, 4, [0.0, 0.0], [1.0, 1.0], -1.0, vec![0.0; 4]).unwrap_err();
    assert_eq!(err.category(), "InvalidGrid");
    let err = TerrainGrid::new(2, 2, [0.0, 0.0], [1.0, 1.0], -1.0, vec![0.0; 3]).unwrap_err();
    assert_eq!(err.category(), "InvalidGrid");
    let err = TerrainGrid::new(2, 2, [0.0, 0.0], [0.0, 1.0], -1.0, vec![0.0; 4]).unwrap_err();
    assert_eq!(err.category(), "InvalidGrid");
}

#[test]
fn unknown_windows_are_reported() {
    let terrain = TerrainGrid::filled(4, 4, [0.0, 0.0], [0.1, 0.1], -5.0).unwrap();
    let mut world = World::new(terrain, GridProjection::Geographic, ViewerConfig::default()).unwrap();
    assert_eq!(world.pick(7, 1, 1).unwrap_err().category(), "UnknownWindow");
    assert!(world.set_active_window(7).is_err());

    let w = world
        .open_window(
            DisplayProjection::Geographic,
            ViewTransform::new(DisplayMode::ThreeD, 64, 64),
        )
        .unwrap();
    assert_eq!(world.active_window(), Some(w));
    assert!(world.polylines(w).unwrap().is_empty());
    world.close_window(w).unwrap();
    assert_eq!(world.active_window(), None);
}
