//! Common test fixtures for rain-overlay tests.
//!
//! Catalog documents mirror the shape of the public radar catalogs the
//! source presets point at.

use serde_json::{json, Value};

/// Timestamp of the newest frame in [`rainviewer_catalog`].
pub const LATEST_FRAME_TIME: i64 = 1_700_000_600;

/// A RainViewer-style catalog with two past frames and one nowcast.
pub fn rainviewer_catalog() -> Value {
    json!({
        "version": "2.0",
        "generated": 1_700_000_650,
        "host": "https://tilecache.rainviewer.com",
        "radar": {
            "past": [
                { "time": 1_700_000_000, "path": "/v2/radar/1700000000" },
                { "time": LATEST_FRAME_TIME, "path": "/v2/radar/1700000600" }
            ],
            "nowcast": [
                { "time": 1_700_001_200, "path": "/v2/radar/nowcast_abc" }
            ]
        }
    })
}

/// A catalog whose `radar.past` list is empty.
pub fn empty_catalog() -> Value {
    json!({
        "host": "https://tilecache.rainviewer.com",
        "radar": { "past": [] }
    })
}

/// Scale presets used across layer tests: one leading, one centered.
pub const SCALES_JSON: &str = r##"{
  "version": "1.0",
  "scales": {
    "steps": {
      "units": "dBZ",
      "scale": [
        { "value": 5,  "color": "#04e9e7" },
        { "value": 20, "color": "#01fd02" },
        { "value": 40, "color": "#fdf802" },
        { "value": 60, "color": "#fd0000" }
      ]
    },
    "centered": {
      "align": "center",
      "scale": [
        { "value": 0,  "color": "#000000" },
        { "value": 10, "color": "#808080" },
        { "value": 20, "color": "#ffffff" }
      ]
    }
  }
}"##;

/// A single test source whose tiles resolve against [`rainviewer_catalog`].
pub const SOURCES_YAML: &str = r#"
sources:
  test:
    catalog: https://example.com/weather-maps.json
    tiles:
      - "${host}${radar.past[-1].path}/256/{z}/{x}/{y}/0/0_1.png"
    timestamp: "${radar.past[-1].time}"
    interval_secs: 60
    minzoom: 0
    maxzoom: 7
"#;

/// Tile coordinates at a few zooms.
pub mod tiles {
    /// The single world tile.
    pub const WORLD: (u32, u32, u32) = (0, 0, 0);

    /// Deep zoom where particle counts are multiplied up.
    pub const CITY_Z16: (u32, u32, u32) = (16, 35205, 21489);
}
