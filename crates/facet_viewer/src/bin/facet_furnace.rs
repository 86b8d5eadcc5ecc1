// White furnace table for every NDF with a fixed GSF and Fresnel
// Run with: cargo run --release --bin facet_furnace -- [glossiness] [gsf] [fresnel] [resolution]

use facet_core::furnace::{FurnaceReport, DEFAULT_RESOLUTION, REPORT_VIEW_COSINES};
use facet_core::{Brdf, FresnelModel, GsfModel, MaterialParams, NdfModel, ShadingModel, ShadingModels};
use std::env;

fn parse_model<M: ShadingModel>(arg: Option<&String>, default: M) -> Result<M, String> {
    match arg {
        Some(name) => M::from_name(name).ok_or_else(|| {
            let known: Vec<_> = M::ALL.iter().map(|m| m.name()).collect();
            format!("unknown {} '{}', expected one of: {}", M::LABEL, name, known.join(", "))
        }),
        None => Ok(default),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: {} [glossiness] [gsf] [fresnel] [resolution]", args[0]);
        std::process::exit(1);
    }

    let glossiness: f32 = match args.get(1) {
        Some(text) => text.parse()?,
        None => 0.5,
    };
    let gsf = parse_model(args.get(2), GsfModel::default())?;
    let fresnel = parse_model(args.get(3), FresnelModel::Schlick)?;
    let resolution: u32 = match args.get(4) {
        Some(text) => text.parse()?,
        None => DEFAULT_RESOLUTION,
    };

    // Pure specular lobe: white metal
    let material = MaterialParams {
        metalness: 1.0,
        glossiness,
        ..Default::default()
    };

    println!(
        "White furnace: glossiness {:.2}, GSF {}, Fresnel {}, {}x{} samples",
        material.clamped().glossiness,
        gsf.name(),
        fresnel.name(),
        resolution,
        resolution
    );

    print!("\n{:<34}", "NDF \\ view angle");
    for cos in REPORT_VIEW_COSINES {
        print!("{:>8.1}°", cos.acos().to_degrees());
    }
    println!("{:>10}", "status");

    for &ndf in NdfModel::ALL {
        let brdf = Brdf::new(ShadingModels { ndf, gsf, fresnel }, material);
        let report = FurnaceReport::compute(&brdf, resolution);

        print!("{:<34}", ndf.name());
        for (_, albedo) in &report.samples {
            print!("{:>9.3}", albedo.max_element());
        }
        let status = if report.conserves_energy(0.01) { "ok" } else { "GAIN" };
        println!("{:>10}", status);
    }

    Ok(())
}
