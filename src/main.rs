use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use pilesim::config::{DisturbanceParams, Params};
use pilesim::disturbance::DisturbanceKind;
use pilesim::material::MaterialKind;
use pilesim::render::{self, Overlay};
use pilesim::{DisturbancePlan, export};
use tracing_subscriber::EnvFilter;

const IMAGE_W: usize = 800;
const IMAGE_H: usize = 400;

fn parse_disturbance(arg: Option<&String>) -> Option<DisturbanceKind> {
    match arg.map(String::as_str) {
        Some("rain") => Some(DisturbanceKind::Rain),
        Some("impact") => Some(DisturbanceKind::Impact),
        Some("vibration") => Some(DisturbanceKind::Vibration),
        _ => None,
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let grid_size: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let particles: u32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1000);
    let material = match args.get(4) {
        Some(key) => key.parse::<MaterialKind>().unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(2);
        }),
        None => MaterialKind::Sand,
    };
    let disturbance = parse_disturbance(args.get(5));
    let ticks: usize = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(50);
    let out_dir: PathBuf = args
        .get(7)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    std::fs::create_dir_all(&out_dir).expect("failed to create output directory");

    let params = Params {
        grid_size,
        material,
        target_particles: particles,
        ..Params::default()
    };
    let plan = disturbance.map(|kind| DisturbancePlan {
        params: DisturbanceParams {
            kind,
            ..DisturbanceParams::default()
        },
        ticks,
    });

    eprintln!(
        "Building {} pile on {} cells with seed={}, particles={}",
        material, grid_size, seed, particles
    );

    let (sim, timings) = match pilesim::simulate(seed, &params, plan.as_ref()) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("simulation failed: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("\nTimings:");
    for t in &timings {
        eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
    }

    let stats = sim.stats();
    eprintln!("\nRepose angle:  {:.2} deg", sim.angle_of_repose());
    eprintln!("Max height:    {:.2}", stats.max_height);
    eprintln!("Base width:    {}", stats.base_width);
    eprintln!(
        "Avalanches:    {} building, {} disturbance",
        stats.building.count, stats.disturbance.count
    );

    // 1. Side view
    let overlay = Overlay {
        material,
        uniform: params.uniform,
        recent: None,
        markers: sim.markers(),
        disturbance: sim.disturbance_params().kind,
    };
    let rgba = render::render_profile(sim.profile(), &overlay, IMAGE_W, IMAGE_H);
    let path = out_dir.join("profile.png");
    image::save_buffer(&path, &rgba, IMAGE_W as u32, IMAGE_H as u32, image::ColorType::Rgba8)
        .expect("failed to save image");
    eprintln!("Saved {}", path.display());

    // 2. Height strip
    let strip = render::render_heightstrip(sim.profile());
    let path = out_dir.join("heightstrip.png");
    image::save_buffer(&path, &strip, sim.profile().len() as u32, 1, image::ColorType::Rgba8)
        .expect("failed to save image");
    eprintln!("Saved {}", path.display());

    // 3. Export record
    let path = out_dir.join("export.json");
    let file = File::create(&path).expect("failed to create export file");
    serde_json::to_writer_pretty(BufWriter::new(file), &export::export(&sim))
        .expect("failed to write export");
    eprintln!("Saved {}", path.display());

    eprintln!("\nDone.");
}
