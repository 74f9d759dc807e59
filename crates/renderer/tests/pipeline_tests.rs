//! End-to-end tests of decode -> palette -> synthesis on generated tiles.

use rain_common::{ScaleConfig, TileCoord};
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::{
    decode_tile, particle_count, resolution_for_zoom, synthesize_tile, DecodeMode, Palette,
};
use test_utils::{
    assert_approx_eq, raw_gradient_tile, split_phase_tile, uniform_indexed_tile, uniform_raw_tile,
    tiles, SCALES_JSON,
};

fn steps() -> Palette {
    let scales = ScaleConfig::from_json(SCALES_JSON).unwrap();
    Palette::resolve(&scales, "steps").unwrap()
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

// ============================================================================
// Fill mesh
// ============================================================================

#[test]
fn test_uniform_tile_at_z1_fills_every_cell() {
    // 4x4 tile, every pixel at raw 70 (scale value 38): inside the 20..40 class
    let image = uniform_raw_tile(4, 4, 70, false);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let tile = TileCoord::new(1, 0, 0);

    let geometry = synthesize_tile(&tile, &grid, &steps(), true, &mut rng());
    let fill = geometry.fill.expect("fill mesh");

    let res = resolution_for_zoom(1);
    assert_eq!(fill.resolution, (res, res));
    assert_eq!(fill.instance_count(), res * res);
    assert!(fill.instances.iter().all(|i| i.color == fill.instances[0].color));
}

#[test]
fn test_fill_instances_tile_the_unit_square() {
    let image = uniform_raw_tile(8, 8, 70, false);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let tile = TileCoord::new(10, 3, 4);

    let fill = synthesize_tile(&tile, &grid, &steps(), true, &mut rng())
        .fill
        .unwrap();
    let (res_x, res_y) = fill.resolution;
    assert_eq!(res_x, 8);

    // Last instance is the bottom-right cell
    let last = fill.instances.last().unwrap().matrix;
    assert_approx_eq!(last[(0, 0)], 1.0 / res_x as f32, 1e-6);
    assert_approx_eq!(last[(1, 1)], 1.0 / res_y as f32, 1e-6);
    assert_approx_eq!(last[(0, 3)], (res_x - 1) as f32 / res_x as f32, 1e-6);
    assert_approx_eq!(last[(1, 3)], (res_y - 1) as f32 / res_y as f32, 1e-6);
    assert_approx_eq!(last[(2, 2)], 1.0, 1e-6);
}

#[test]
fn test_fill_model_matrix_places_tile_in_mercator_space() {
    let image = uniform_raw_tile(4, 4, 70, false);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let tile = TileCoord::new(2, 1, 3);

    let fill = synthesize_tile(&tile, &grid, &steps(), false, &mut rng())
        .fill
        .unwrap();
    assert_approx_eq!(fill.model[(0, 3)], 0.25, 1e-9);
    assert_approx_eq!(fill.model[(1, 3)], 0.75, 1e-9);
    assert_approx_eq!(fill.model[(0, 0)], 0.25, 1e-9);
    // z=2 -> 2^8 * 0.0002
    assert_approx_eq!(fill.model[(2, 2)], 0.0512, 1e-12);
    // Anchored on the map plane
    assert_approx_eq!(fill.model[(2, 3)], 0.0, 1e-12);
}

#[test]
fn test_gradient_splits_into_classes() {
    // Raw 37 (value 5) on the left edge, raw 101 (value 69) on the right
    let image = raw_gradient_tile(64, 64, 37, 101);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let palette = steps();

    let fill = synthesize_tile(&TileCoord::new(1, 0, 0), &grid, &palette, true, &mut rng())
        .fill
        .unwrap();

    let colors: std::collections::HashSet<_> = fill.instances.iter().map(|i| i.color).collect();
    assert_eq!(colors.len(), 3);
    // Cells at or past the top threshold (raw 92) have no class and no box
    assert!(fill.instance_count() < 64 * 64);
}

// ============================================================================
// Particle meshes
// ============================================================================

#[test]
fn test_particle_totals_follow_count_formula() {
    let image = uniform_raw_tile(16, 16, 57, false);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let palette = steps();
    let tile = TileCoord::new(7, 10, 10);

    let geometry = synthesize_tile(&tile, &grid, &palette, true, &mut rng());
    let res = resolution_for_zoom(7);
    let per_cell = particle_count(57.0, palette.lowest_threshold(), 7);
    assert_eq!(per_cell, 4);
    assert_eq!(geometry.rain.unwrap().instance_count(), res * res * per_cell);
    assert!(geometry.snow.is_none());
}

#[test]
fn test_deep_zoom_multiplies_particles() {
    let image = uniform_raw_tile(16, 16, 57, false);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let palette = steps();
    let (z, x, y) = tiles::CITY_Z16;

    let geometry = synthesize_tile(&TileCoord::new(z, x, y), &grid, &palette, true, &mut rng());
    let res = resolution_for_zoom(z);
    assert_eq!(res, 2);
    // 4 per cell from intensity, doubled at z16
    assert_eq!(particle_count(57.0, palette.lowest_threshold(), z), 8);
    assert_eq!(geometry.rain.unwrap().instance_count(), res * res * 8);
    assert_eq!(geometry.fill.unwrap().instance_count(), res * res);
}

#[test]
fn test_split_phase_tile_fills_both_pools() {
    let image = split_phase_tile(32, 32, 60);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let geometry = synthesize_tile(&TileCoord::new(4, 2, 2), &grid, &steps(), true, &mut rng());

    let rain = geometry.rain.as_ref().unwrap();
    let snow = geometry.snow.as_ref().unwrap();
    assert_eq!(rain.instance_count(), snow.instance_count());
    assert!(rain.offsets.iter().all(|o| o[0] <= 0.5));
    assert!(snow.offsets.iter().all(|o| o[0] >= 0.5));
    assert_eq!(geometry.mesh_count(), 3);
}

#[test]
fn test_same_seed_same_geometry() {
    let image = uniform_raw_tile(16, 16, 80, true);
    let grid = decode_tile(&image, &DecodeMode::Raw);
    let tile = TileCoord::new(5, 1, 1);

    let a = synthesize_tile(&tile, &grid, &steps(), true, &mut rng());
    let b = synthesize_tile(&tile, &grid, &steps(), true, &mut rng());
    assert_eq!(a, b);
}

// ============================================================================
// Indexed sources
// ============================================================================

#[test]
fn test_indexed_tile_uses_table_index_as_value() {
    // 50-entry table: only the index matters, the index must clear the cut-off
    let table: Vec<rain_common::Color> = (0..50u8).map(|i| rain_common::Color::rgb(i, i, 255)).collect();
    let mode = DecodeMode::for_color_table(Some(table.as_slice()));

    let image = uniform_indexed_tile(4, 4, [45, 45, 255]);
    let grid = decode_tile(&image, &mode);
    assert_eq!(grid.get(0, 0).unwrap().value, 45);

    let geometry = synthesize_tile(&TileCoord::new(3, 0, 0), &grid, &steps(), mode.has_categories(), &mut rng());
    assert!(geometry.fill.is_some());
    assert!(geometry.snow.is_none());
}
