//! Tests for loading presets from a configuration directory.

use std::fs;

use rain_common::{load_presets, Alignment, RainError, ScaleConfig, SourceConfig};
use test_utils::{config_dir, SCALES_JSON, SOURCES_YAML};

// ============================================================================
// Directory overrides
// ============================================================================

#[test]
fn test_missing_files_fall_back_to_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let (scales, sources) = load_presets(dir.path()).unwrap();
    assert!(scales.get("noaa").is_ok());
    assert!(sources.get("rainviewer").is_ok());
}

#[test]
fn test_shipped_config_dir_matches_builtin() {
    let (scales, sources) = load_presets(config_dir()).unwrap();
    let builtin = SourceConfig::builtin().unwrap();
    let shipped = sources.get("rainviewer").unwrap();
    let bundled = builtin.get("rainviewer").unwrap();
    assert_eq!(shipped.catalog, bundled.catalog);
    assert_eq!(shipped.tiles, bundled.tiles);
    assert_eq!(shipped.interval_secs, bundled.interval_secs);
    assert_eq!(
        scales.get("noaa").unwrap().scale.len(),
        ScaleConfig::builtin().unwrap().get("noaa").unwrap().scale.len()
    );
}

#[test]
fn test_shared_fixtures_parse() {
    let scales = ScaleConfig::from_json(SCALES_JSON).unwrap();
    assert_eq!(scales.get("centered").unwrap().align, Alignment::Center);
    let sources = SourceConfig::from_yaml(SOURCES_YAML).unwrap();
    assert_eq!(sources.get("test").unwrap().interval_secs, 60);
}

#[test]
fn test_directory_files_override_builtin() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scales.json"),
        r##"{"scales":{"steps":{"align":"center","scale":[
            {"value":0,"color":"#000000"},
            {"value":10,"color":"#808080"},
            {"value":20,"color":"#ffffff"}]}}}"##,
    )
    .unwrap();
    fs::write(
        dir.path().join("sources.yaml"),
        r##"
sources:
  indexed:
    catalog: https://example.com/catalog.json
    tiles: ["https://example.com/${[0].basetime}/{z}/{x}/{y}.png"]
    timestamp: "${[0].validtime}"
    interval_secs: 60
    colors: ["#f2f2ff", "#a0d2ff", "#218cff"]
"##,
    )
    .unwrap();

    let (scales, sources) = load_presets(dir.path()).unwrap();
    assert_eq!(scales.get("steps").unwrap().align, Alignment::Center);
    assert!(scales.get("noaa").is_err());

    let indexed = sources.get("indexed").unwrap();
    assert_eq!(indexed.colors.as_ref().unwrap().len(), 3);
    assert_eq!(indexed.tile_size, 256);
    assert_eq!(indexed.interval().as_secs(), 60);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_source_without_tiles_is_invalid() {
    let yaml = r#"
sources:
  empty:
    catalog: https://example.com/c.json
    tiles: []
    timestamp: "${time}"
"#;
    let err = SourceConfig::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, RainError::InvalidSource { ref name, .. } if name == "empty"));
    assert!(err.is_fatal());
}

#[test]
fn test_malformed_yaml_is_parse_error() {
    let err = SourceConfig::from_yaml("sources: [").unwrap_err();
    assert!(matches!(err, RainError::ConfigParse(_)));
}
