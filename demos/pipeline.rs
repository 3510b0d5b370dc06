use std::fs::File;
use std::io::BufWriter;

use gray_vision::{
    Grid,
    contrast::threshold_mut,
    drawing::draw_orientation_mut,
    edges::sobel_magnitude,
    hough::{HoughOptions, TrimOptions, accumulate, draw_trimmed_lines_mut, find_line_peaks},
    io::save_grid,
    moments::{object_stats, write_object_database},
    region_labelling::{LabelOptions, draw_principal_connected_components, label_components_mut},
};
use image::{Luma, Rgba};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let out_dir = std::env::temp_dir().join("gray-vision-pipeline");
    std::fs::create_dir_all(&out_dir)?;

    // 1. Synthetic scene: a long bar and a disk on a dark background
    let scene = Grid::from_fn(200, 120, |x, y| {
        let in_bar = (20..40).contains(&y) && (20..140).contains(&x);
        let (dx, dy) = (x as i64 - 150, y as i64 - 80);
        let in_disk = dx * dx + dy * dy <= 400;
        Luma([if in_bar || in_disk { 200 } else { 30 }])
    });
    save_grid(out_dir.join("scene.pgm"), &scene)?;

    // 2. Binarize and label
    let mut labelled = scene.clone();
    threshold_mut(&mut labelled, 100);
    let components = label_components_mut(&mut labelled, &LabelOptions::default());
    println!("Found {} components", components.len());
    save_grid(out_dir.join("labelled.pgm"), &labelled)?;

    let colored = draw_principal_connected_components(&labelled, 2, Rgba([0, 0, 0, 255]));
    colored.save(out_dir.join("components.png"))?;

    // 3. Object statistics, written as a database and drawn as orientation lines
    let stats = object_stats(&labelled);
    let database = out_dir.join("objects.txt");
    write_object_database(BufWriter::new(File::create(&database)?), stats.values())?;
    println!("Wrote {} objects to {}", stats.len(), database.display());

    let mut annotated = labelled.clone();
    for object in stats.values() {
        println!(
            "  label {:>3}: area {:>5}, orientation {:>6.1}°, roundedness {:.3}",
            object.label, object.area, object.orientation, object.roundedness
        );
        draw_orientation_mut(&mut annotated, object, 30.0, 255);
    }
    save_grid(out_dir.join("orientations.pgm"), &annotated)?;

    // 4. Edges and Hough lines
    let mut edges = sobel_magnitude(&scene);
    threshold_mut(&mut edges, 300);
    let options = HoughOptions::default();
    let accumulator = accumulate(&edges, &options);
    let lines = find_line_peaks(&accumulator, 80, &options);
    println!("Found {} candidate lines", lines.len());

    let mut overlay = scene.clone();
    let drawn = draw_trimmed_lines_mut(&mut overlay, &edges, &lines, &TrimOptions::default(), 255);
    println!("Drew {drawn} trimmed segments");
    save_grid(out_dir.join("lines.pgm"), &overlay)?;

    println!("Results saved to {}", out_dir.display());
    Ok(())
}
