//! Grow a random tree skeleton, mesh it and write it as OBJ
//!
//! This example shows how to:
//! - Build a `Skeleton` from nodes and nested branches
//! - Configure ring resolution, roots, twigs and frond grafting
//! - Load frond templates from OBJ files
//! - Build the full mesh plus growth and wind shape keys

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use grovemesh_core::{AttributeKind, Branch, Drawable, Node, Point3f, Skeleton, Vector3f};
use grovemesh_io::{write_mesh, FrondSetReader, ObjReader};
use grovemesh_mesher::{build_tree, BuildMode, BuildSettings, FrondPolicy, FrondSettings, TwigSettings};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    Disabled,
    Thickness,
    Depth,
    Both,
}

impl From<Policy> for FrondPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Disabled => FrondPolicy::Disabled,
            Policy::Thickness => FrondPolicy::ByThickness,
            Policy::Depth => FrondPolicy::ByDepth,
            Policy::Both => FrondPolicy::Both,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Seed of the random skeleton
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Branching depth below the trunk
    #[arg(short, long, default_value_t = 3)]
    depth: usize,

    /// Ring resolution at full thickness
    #[arg(short, long, default_value_t = 16)]
    resolution: usize,

    /// OBJ files holding frond templates
    #[arg(long)]
    fronds: Vec<PathBuf>,

    /// When branches are replaced by frond templates
    #[arg(long, value_enum, default_value_t = Policy::Disabled)]
    policy: Policy,

    /// Emit twig duplicator triangles
    #[arg(long)]
    twigs: bool,

    /// The output path
    #[arg(short, long, default_value = "tree.obj")]
    out: PathBuf,
}

/// Grow one branch from `start`, forking while `depth` allows.
fn grow(rng: &mut StdRng, start: Point3f, direction: Vector3f, radius: f32, depth: usize) -> Branch {
    let count = rng.gen_range(5..12);
    let mut nodes = Vec::with_capacity(count);
    let mut position = start;
    let mut heading = direction.normalize();

    for i in 0..count {
        let t = i as f32 / count as f32;
        let r = (radius * (1.0 - 0.8 * t)).max(0.004);
        // last year's node sat a little closer to the branch start
        let previous = start + (position - start) * 0.9;
        let mut node = Node::new(position, r)
            .with_direction(heading)
            .with_thickness((r * 8.0).min(1.0))
            .with_age((count - i) as f32 + depth as f32)
            .with_weight(r * r * 100.0)
            .with_last_year(previous, r * 0.85);
        node.photosynthesis = rng.gen_range(0.2..1.0);

        if depth > 0 && i > 0 && i + 1 < count && rng.gen_bool(0.6) {
            let side = Vector3f::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-0.2..0.5));
            node = node.with_sub_branch(grow(rng, position, heading + side * 1.5, r * 0.7, depth - 1));
        }
        nodes.push(node);

        let bend = Vector3f::new(rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2), rng.gen_range(0.0..0.15));
        heading = (heading + bend).normalize();
        position += heading * rng.gen_range(0.25..0.5);
    }

    let mut branch = Branch::new(nodes);
    branch.shade = rng.gen_range(0.0..1.0);
    branch.power = rng.gen_range(0.3..1.0);
    branch.initial_phyllotaxic_angle = rng.gen_range(0.0..std::f32::consts::TAU);
    branch
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut trunk = grow(&mut rng, Point3f::origin(), Vector3f::z(), 0.25, args.depth);
    trunk.is_trunk = true;
    trunk.nodes[0].direction = Vector3f::z();
    let skeleton = Skeleton::new(trunk);
    println!("Grew skeleton with {} branches", skeleton.branch_count());

    let policy = FrondPolicy::from(args.policy);
    if policy != FrondPolicy::Disabled && args.fronds.is_empty() {
        bail!("--policy {:?} needs at least one --fronds file", args.policy);
    }
    let fronds = if args.fronds.is_empty() {
        None
    } else {
        Some(ObjReader::read_frond_set(args.fronds.as_slice(), 1.0).context("loading frond templates")?)
    };

    let settings = BuildSettings::default()
        .with_profile_resolution(args.resolution)
        .with_twist(0.05)
        .with_edge_loop_reduction(0.995)
        .with_fronds(FrondSettings {
            policy,
            thickness_cutoff: 0.05,
            ..Default::default()
        })
        .with_twigs(TwigSettings {
            enabled: args.twigs,
            ..Default::default()
        });

    let mesh = build_tree(&skeleton, &settings, fronds.as_ref(), BuildMode::Full)?;
    println!(
        "Built mesh with {} vertices and {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );
    let (min, max) = mesh.bounding_box();
    println!(
        "   Bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
        min.x, min.y, min.z, max.x, max.y, max.z
    );
    let grafted = mesh.layer(AttributeKind::Frond).iter().filter(|f| **f > 0.0).count();
    if grafted > 0 {
        println!("   {} vertices come from frond templates", grafted);
    }

    for mode in [BuildMode::GrowthShape, BuildMode::WindShape] {
        let shape = build_tree(&skeleton, &settings, fronds.as_ref(), mode)?;
        println!("   {:?}: {} shape positions", mode, shape.shape.len());
    }

    write_mesh(&mesh, &args.out).with_context(|| format!("writing {}", args.out.display()))?;
    println!("Wrote {}", args.out.display());
    Ok(())
}
