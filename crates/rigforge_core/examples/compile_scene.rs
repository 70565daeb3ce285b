//! Example: Compile a JSON rig scene to a binary artifact.
//!
//! Run with: cargo run --example compile_scene -- scene.json [--pose <id>] [--options options.json]
//!
//! Writes `<scene>.bin` (the buffer) and `<scene>.artifact.json` (its records)
//! next to the input file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rigforge_core::tessellation::tessellate_mesh;
use rigforge_core::{bake_scene, compile_scene, inspect_mesh, CompileOptions, Scene};

struct Args {
    scene: PathBuf,
    pose: Option<String>,
    options: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = env::args().skip(1);
    let Some(scene) = args.next() else {
        return Ok(None);
    };

    let mut parsed = Args {
        scene: PathBuf::from(scene),
        pose: None,
        options: None,
    };
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--pose" => parsed.pose = Some(args.next().context("--pose needs a pose id")?),
            "--options" => {
                parsed.options = Some(PathBuf::from(
                    args.next().context("--options needs a path")?,
                ))
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(Some(parsed))
}

fn load_options(path: Option<&Path>) -> Result<CompileOptions> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading options {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing options {}", path.display()))
        }
        None => Ok(CompileOptions::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let Some(args) = parse_args()? else {
        println!("Usage: compile_scene <scene.json> [--pose <id>] [--options <options.json>]");
        println!("\nExamples:");
        println!("  cargo run --example compile_scene -- assets/arm.json");
        println!("  cargo run --example compile_scene -- assets/arm.json --pose wave");
        return Ok(());
    };

    let text = fs::read_to_string(&args.scene)
        .with_context(|| format!("reading scene {}", args.scene.display()))?;
    let scene: Scene = serde_json::from_str(&text)
        .with_context(|| format!("parsing scene {}", args.scene.display()))?;
    let options = load_options(args.options.as_deref())?;

    println!("Compiling scene: {}", args.scene.display());
    let compiled = match &args.pose {
        Some(pose) => bake_scene(&scene, pose, &options)?,
        None => compile_scene(&scene, &options)?,
    };

    println!("\n--- Meshes ---");
    for def in &scene.meshes {
        let mesh = tessellate_mesh(def, &options)?;
        let report = inspect_mesh(&mesh);
        println!(
            "  {} - {} vertices, {} indices",
            report.id, report.vertices, report.indices
        );
        for primitive in &report.primitives {
            println!(
                "       {} ({}): {} triangles, bounds ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
                primitive.id,
                primitive.shape,
                primitive.triangles,
                primitive.min[0],
                primitive.min[1],
                primitive.min[2],
                primitive.max[0],
                primitive.max[1],
                primitive.max[2]
            );
        }
    }

    if !compiled.advisories.is_empty() {
        println!("\n--- Advisories ---");
        for advisory in &compiled.advisories {
            println!("  {}", advisory);
        }
    }

    let artifact = &compiled.artifact;
    let bin_path = args.scene.with_extension("bin");
    let json_path = args.scene.with_extension("artifact.json");
    fs::write(&bin_path, &artifact.buffer)
        .with_context(|| format!("writing {}", bin_path.display()))?;
    fs::write(&json_path, serde_json::to_string_pretty(artifact)?)
        .with_context(|| format!("writing {}", json_path.display()))?;

    println!("\n--- Artifact ---");
    println!("  Buffer: {} bytes -> {}", artifact.byte_length, bin_path.display());
    println!(
        "  Records: {} accessors, {} skins, {} poses -> {}",
        artifact.accessors.len(),
        artifact.skins.len(),
        artifact.poses.len(),
        json_path.display()
    );
    Ok(())
}
