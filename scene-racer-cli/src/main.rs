//
// Command-line scene renderer. Loads or builds a scene, optionally
// runs its animations for a while, and ray traces a frame to a file.
//

use std::path::PathBuf;

use anyhow::*;
use clap::Parser;

use scene_racer_lib::animation::{self, AnimationNode, Behaviour, Jump, Rotate};
use scene_racer_lib::scene::{AABoxNode, LightNode, SphereNode};
use scene_racer_lib::vec4::Vec4;
use scene_racer_lib::*;

////////////////////////////////////////////////////////////////////////
// Command-line args
//

/// Ray trace a scene graph to an image
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Scene description to render, instead of the built-in demo scene
    #[arg(long)]
    scene: Option<PathBuf>,
    /// File to write the output to
    #[arg(short, long)]
    output: PathBuf,
    /// Output image width
    #[arg(short, long, default_value_t = 512)]
    width: usize,
    /// Output image height
    #[arg(long, default_value_t = 512)]
    height: usize,
    /// Horizontal camera field of view, in degrees
    #[arg(long, default_value_t = 120.0)]
    fov: f64,
    /// Weight of the ambient term
    #[arg(long, default_value_t = 0.5)]
    ambient: f64,
    /// Weight of the diffuse term
    #[arg(long, default_value_t = 0.9)]
    diffuse: f64,
    /// Weight of the specular term
    #[arg(long, default_value_t = 1.0)]
    specular: f64,
    /// Phong exponent
    #[arg(long, default_value_t = raytracer::SHININESS)]
    shininess: f64,
    /// Report the nearest sphere hit in front of the camera, rather
    /// than the smaller root
    #[arg(long)]
    nearest_forward: bool,
    /// Milliseconds of animation to run before rendering
    #[arg(long, default_value_t = 0.0)]
    animate_ms: f64,
    /// Animation time step, in milliseconds
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,
    /// Write the group matrices (after animation) to this file
    #[arg(long)]
    snapshot_out: Option<PathBuf>,
    /// Overwrite the group matrices from this file before animating
    #[arg(long)]
    snapshot_in: Option<PathBuf>,
    /// Write the scene description (after animation) to this file
    #[arg(long)]
    dump_scene: Option<PathBuf>,
}

////////////////////////////////////////////////////////////////////////
// Demo scene
//

fn demo_scene() -> Result<(Scene, Vec<AnimationNode>)> {
    let white = Colour::new(1.0, 1.0, 1.0);

    let mut scene = Scene::new(Transformation::translation(Vec4::dir(0.0, 0.0, -5.0)));
    let root = scene.root();

    for offset in [Vec4::dir(5.0, 3.0, 6.0), Vec4::dir(-5.0, -3.0, 6.0)] {
        let lamp = scene.add_group(root, Transformation::translation(offset))?;
        scene.add(lamp, LightNode { colour: white })?;
    }

    let turntable = scene.add_group(root, Transformation::rotation(Vec4::dir(0.0, 1.0, 0.0), 0.0)?)?;

    let right = scene.add_group(turntable, Transformation::translation(Vec4::dir(1.2, 0.5, 0.0)))?;
    scene.add(right, SphereNode { colour: Colour::new(0.4, 0.0, 0.0) })?;

    let left = scene.add_group(turntable, Transformation::translation(Vec4::dir(-0.8, 1.0, 1.0)))?;
    let small = scene.add_group(left, Transformation::scaling(Vec4::dir(0.4, 0.4, 0.4))?)?;
    scene.add(small, SphereNode { colour: Colour::new(0.0, 0.0, 0.3) })?;

    let low = scene.add_group(turntable, Transformation::translation(Vec4::dir(0.0, -1.2, 0.0)))?;
    scene.add(low, AABoxNode { colour: Colour::new(0.0, 0.3, 0.0) })?;

    let mut jump = Jump::default();
    jump.trigger();
    let animations = vec![
        AnimationNode::new(
            turntable,
            Behaviour::Rotate(Rotate {
                left: true,
                ..Rotate::default()
            }),
        ),
        AnimationNode::new(left, Behaviour::Jump(jump)),
    ];

    Ok((scene, animations))
}

////////////////////////////////////////////////////////////////////////
// Main code.
//

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let width = args.width;
    ensure!((16..=16384).contains(&width), "width {} out of range", width);
    let height = args.height;
    ensure!((16..=16384).contains(&height), "height {} out of range", height);
    let fov_degrees = args.fov;
    ensure!(
        (20.0..=160.0).contains(&fov_degrees),
        "field of view {} out of range",
        fov_degrees
    );
    for (name, factor) in [
        ("ambient", args.ambient),
        ("diffuse", args.diffuse),
        ("specular", args.specular),
    ] {
        ensure!((0.0..=1.0).contains(&factor), "{} factor {} out of range", name, factor);
    }
    ensure!(args.shininess > 0.0, "shininess must be positive");
    ensure!(args.animate_ms >= 0.0, "animation time must not be negative");
    ensure!(args.frame_ms > 0.0, "animation time step must be positive");
    // Fail on an unknown output format before spending time rendering.
    image::ImageFormat::from_path(&args.output)
        .with_context(|| format!("choosing image format for {}", args.output.display()))?;

    let (mut scene, mut animations) = match &args.scene {
        Some(path) => (load_scene(path)?, Vec::new()),
        None => demo_scene()?,
    };
    log::info!("scene has {} nodes", scene.len());

    if let Some(path) = &args.snapshot_in {
        MatrixSnapshot::load(path)?
            .restore(&mut scene)
            .with_context(|| format!("restoring {}", path.display()))?;
    }

    let mut elapsed = 0.0;
    while elapsed < args.animate_ms {
        let step = args.frame_ms.min(args.animate_ms - elapsed);
        animation::simulate_all(&mut animations, &mut scene, step)?;
        elapsed += step;
    }

    if let Some(path) = &args.snapshot_out {
        MatrixSnapshot::capture(&scene)?.save(path)?;
    }
    if let Some(path) = &args.dump_scene {
        save_scene(&scene, path)?;
    }

    let tracer = RayTracer::new(TracerConfig {
        sphere_roots: if args.nearest_forward {
            SphereRoots::NearestForward
        } else {
            SphereRoots::Smaller
        },
        shininess: args.shininess,
    });
    let camera = RayCamera {
        origin: Vec4::point(0.0, 0.0, 0.0),
        width,
        height,
        alpha: fov_degrees.to_radians(),
    };
    let lights = light_positions(&scene)?;

    let image = tracer.render(
        &scene,
        &camera,
        &lights,
        args.ambient,
        args.diffuse,
        args.specular,
    )?;
    image
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("wrote {}", args.output.display());

    Ok(())
}
