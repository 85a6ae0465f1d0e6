use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use paint_preview::{
    FrameCoordinator, FrameTree, FrameView, GestureEvent, ImageRasterizer, PlayerOpts, Point,
    PooledCompositor, RasterCanvas, Rgba8Premul,
};

#[derive(Parser, Debug)]
#[command(name = "paint-preview", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play back a snapshot through a gesture script and write the final viewport as PNG.
    Replay(ReplayArgs),
    /// Check a frame tree (and optional player options) without rendering.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Frame tree JSON.
    #[arg(long)]
    tree: PathBuf,

    /// Directory holding one `<frame id>.png` snapshot per frame.
    #[arg(long)]
    snapshots: PathBuf,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Player options JSON.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Gesture step, repeatable: `scroll:DX,DY[@X,Y]`, `zoom:FACTOR@X,Y` or `fling:VX,VY`.
    /// A scroll with `@X,Y` starts over that viewport point, so it can scroll a sub-frame.
    #[arg(long = "step", value_parser = parse_step)]
    steps: Vec<Step>,

    /// How long to wait for tiles after each step.
    #[arg(long, default_value_t = 5000)]
    wait_ms: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Frame tree JSON.
    #[arg(long)]
    tree: PathBuf,

    /// Player options JSON.
    #[arg(long)]
    opts: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    Scroll { dx: f64, dy: f64, at: Option<Point> },
    Zoom { factor: f64, focal: Point },
    Fling { vx: f64, vy: f64 },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Replay(args) => cmd_replay(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn read_tree(path: &Path) -> anyhow::Result<FrameTree> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("open frame tree '{}'", path.display()))?;
    FrameTree::from_json_str(&s).with_context(|| format!("load frame tree '{}'", path.display()))
}

fn read_opts(path: Option<&Path>) -> anyhow::Result<PlayerOpts> {
    let Some(path) = path else {
        return Ok(PlayerOpts::default());
    };
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("open player options '{}'", path.display()))?;
    PlayerOpts::from_json_str(&s)
        .with_context(|| format!("load player options '{}'", path.display()))
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'A,B', got '{s}'"))?;
    let a = a.trim().parse::<f64>().map_err(|e| format!("'{a}': {e}"))?;
    let b = b.trim().parse::<f64>().map_err(|e| format!("'{b}': {e}"))?;
    Ok((a, b))
}

fn parse_step(s: &str) -> Result<Step, String> {
    let (kind, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("step '{s}' must look like KIND:ARGS"))?;
    match kind {
        "scroll" => {
            let (delta, at) = match rest.split_once('@') {
                Some((delta, at)) => {
                    let (x, y) = parse_pair(at)?;
                    (delta, Some(Point::new(x, y)))
                }
                None => (rest, None),
            };
            let (dx, dy) = parse_pair(delta)?;
            Ok(Step::Scroll { dx, dy, at })
        }
        "fling" => {
            let (vx, vy) = parse_pair(rest)?;
            Ok(Step::Fling { vx, vy })
        }
        "zoom" => {
            let (factor, at) = rest
                .split_once('@')
                .ok_or_else(|| format!("zoom step '{s}' must look like zoom:FACTOR@X,Y"))?;
            let factor = factor
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("'{factor}': {e}"))?;
            let (x, y) = parse_pair(at)?;
            Ok(Step::Zoom {
                factor,
                focal: Point::new(x, y),
            })
        }
        other => Err(format!("unknown step kind '{other}'")),
    }
}

fn apply_step(player: &mut FrameCoordinator, step: Step) {
    match step {
        Step::Scroll { dx, dy, at } => {
            if let Some(at) = at {
                player.on_gesture(GestureEvent::Down { x: at.x, y: at.y });
            }
            player.on_gesture(GestureEvent::ScrollBy { dx, dy });
            player.on_gesture(GestureEvent::ScrollEnd);
        }
        Step::Zoom { factor, focal } => {
            player.on_gesture(GestureEvent::ScaleBy { factor, focal });
            player.on_gesture(GestureEvent::ScaleFinished { factor: 1.0, focal });
        }
        Step::Fling { vx, vy } => {
            if player.on_gesture(GestureEvent::Fling { vx, vy }) {
                while player.advance_fling() {}
            }
        }
    }
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let tree = read_tree(&args.tree)?;
    let opts = read_opts(args.opts.as_deref())?;

    let mut rasterizer = ImageRasterizer::new();
    let loaded = rasterizer
        .load_dir(&tree, &args.snapshots)
        .with_context(|| format!("load snapshots from '{}'", args.snapshots.display()))?;
    if loaded == 0 {
        anyhow::bail!("no snapshots found in '{}'", args.snapshots.display());
    }
    let compositor = Arc::new(PooledCompositor::from_opts(rasterizer, &opts)?);
    let mut player = FrameCoordinator::build(&tree, compositor, opts)?;

    let wait = Duration::from_millis(args.wait_ms);
    player.layout(f64::from(args.width), f64::from(args.height));
    player.wait_for_tiles(wait);
    for step in &args.steps {
        tracing::info!(?step, "apply step");
        apply_step(&mut player, *step);
        player.wait_for_tiles(wait);
    }
    if !player.is_ready_to_show() {
        tracing::warn!("tiles still missing after waiting; output has holes");
    }

    let mut canvas = RasterCanvas::new(args.width, args.height);
    canvas.clear(Rgba8Premul::from_straight_rgba(255, 255, 255, 255));
    player.paint(&mut canvas);

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    canvas
        .save_png(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let tree = read_tree(&args.tree)?;
    let opts = read_opts(args.opts.as_deref())?;
    let nested: usize = tree.frames.iter().map(|f| f.subframes.len()).sum();
    println!(
        "ok: {} frames ({} embedded), root {}, max scale {}",
        tree.frames.len(),
        nested,
        tree.root,
        opts.max_scale_factor
    );
    Ok(())
}
