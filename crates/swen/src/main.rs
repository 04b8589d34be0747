//! Reference host: read a `.swen` file, build the scene, render frames.
//!
//! The core is a library; this binary wires the pipeline together the way
//! an embedding host would. Exit code 0 on clean shutdown, non-zero on
//! parse or pipeline failure.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use swen_markup::parse_source;
use swen_render::{NullBackend, Renderer};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        bail!("usage: swen <scene.swen> [frames]");
    };
    let frames: u64 = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid frame count '{raw}'"))?,
        None => 1,
    };

    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let tree =
        parse_source(&source).map_err(|err| anyhow!("{}: {err}", path.display()))?;

    let desktop_size = tree.root.desktop.size;
    let mut renderer = Renderer::new(
        NullBackend::new(),
        desktop_size.x as u32,
        desktop_size.y as u32,
    );

    let mut last = swen_render::FrameResult::default();
    for _ in 0..frames {
        last = renderer.render_desktop(&tree)?;
        log::debug!(
            "frame {}: {} draws, {} tiles",
            renderer.ir().frame_number(),
            last.draw_calls,
            last.tiles_rendered
        );
    }

    let report = serde_json::json!({
        "frames": frames,
        "stats": renderer.scheduler().stats(),
        "last_frame": last,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
