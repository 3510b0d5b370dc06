use gray_vision::{
    Grid,
    contrast::threshold_mut,
    hough::{HoughOptions, TrimOptions, accumulate, draw_trimmed_lines_mut, find_line_peaks},
    io::{load_grid, save_grid},
    moments::{object_stats, read_object_database, recognize, write_object_database},
    region_labelling::{LabelOptions, Resolution, label_components_mut},
};
use image::Luma;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scene() -> Grid {
    Grid::from_fn(60, 40, |x, y| {
        let square = (5..15).contains(&x) && (5..15).contains(&y);
        let bar = (25..55).contains(&x) && (20..24).contains(&y);
        Luma([if square || bar { 180 } else { 20 }])
    })
}

#[test]
fn eight_bit_grids_survive_a_pgm_round_trip() {
    init_logger();
    let path = std::env::temp_dir().join("gray-vision-round-trip-8.pgm");
    let grid = scene();
    save_grid(&path, &grid).unwrap();
    assert_eq!(load_grid(&path).unwrap(), grid);
    let _ = std::fs::remove_file(path);
}

#[test]
fn wide_grids_survive_a_sixteen_bit_png_round_trip() {
    init_logger();
    let path = std::env::temp_dir().join("gray-vision-round-trip-16.png");
    let grid = Grid::from_fn(8, 4, |x, y| Luma([(x + 8 * y) * 1000]));
    save_grid(&path, &grid).unwrap();
    assert_eq!(load_grid(&path).unwrap(), grid);
    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_files_are_reported() {
    let path = std::env::temp_dir().join("gray-vision-does-not-exist.pgm");
    assert!(load_grid(path).is_err());
}

#[test]
fn labelled_objects_are_recognized_from_their_own_database() {
    init_logger();
    let mut labelled = scene();
    threshold_mut(&mut labelled, 100);
    let components = label_components_mut(&mut labelled, &LabelOptions::default());
    assert_eq!(components.len(), 2);
    assert_eq!(components.display_values().collect::<Vec<_>>(), vec![85, 170]);

    let stats = object_stats(&labelled);
    let square = &stats[&85];
    assert_eq!(square.area, 100);
    assert!((square.roundedness - 1.0).abs() < 1e-9);
    assert!(stats[&170].roundedness < 0.1);

    let mut database = Vec::new();
    write_object_database(&mut database, stats.values()).unwrap();
    let records = read_object_database(database.as_slice()).unwrap();
    assert_eq!(recognize(&stats, &records, 1e-6).len(), 2);

    // Only the square is in a database holding round objects.
    let round_only: Vec<_> = records.into_iter().filter(|r| r.roundedness > 0.5).collect();
    let recognized = recognize(&stats, &round_only, 0.05);
    assert_eq!(recognized.len(), 1);
    assert_eq!(recognized[0].label, 85);
}

#[test]
fn both_resolutions_agree_on_convex_objects() {
    let mut binary = scene();
    threshold_mut(&mut binary, 100);

    let mut full = binary.clone();
    let mut single_hop = binary;
    let full_components = label_components_mut(&mut full, &LabelOptions::default());
    let single_hop_components = label_components_mut(
        &mut single_hop,
        &LabelOptions {
            resolution: Resolution::SingleHop,
            ..LabelOptions::default()
        },
    );
    assert_eq!(full_components.len(), single_hop_components.len());
    assert_eq!(full, single_hop);
}

#[test]
fn hough_recovers_a_horizontal_line() {
    init_logger();
    let mut edges = Grid::new(60, 60);
    for x in 0..60 {
        edges.put_pixel(x, 30, Luma([255]));
    }

    let options = HoughOptions::default();
    let accumulator = accumulate(&edges, &options);
    let lines = find_line_peaks(&accumulator, 50, &options);
    assert_eq!(lines.len(), 1);
    assert!((lines[0].rho - 30.0).abs() < 1e-9);
    assert!(lines[0].theta.abs() < 1e-9);

    let mut canvas = Grid::new(60, 60);
    let drawn = draw_trimmed_lines_mut(&mut canvas, &edges, &lines, &TrimOptions::default(), 255);
    assert_eq!(drawn, 1);
    assert_eq!(canvas, edges);
}
