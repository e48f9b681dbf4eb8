use std::path::PathBuf;

use serde::Serialize;

use loopgen::config::Params;
use loopgen::dir::Mode;
use loopgen::driver::CancelFlag;
use loopgen::render;

#[derive(Serialize)]
struct Stats {
    seed: u64,
    cols: usize,
    rows: usize,
    mode: &'static str,
    populate_steps: usize,
    forced_merges: usize,
    animate_steps: usize,
    path_len: usize,
    path_seeded: bool,
    search_exhausted: bool,
    search_nodes: usize,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let cols: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(64);
    let rows: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(64);
    let mode = args
        .get(4)
        .and_then(|s| Mode::from_name(s))
        .unwrap_or(Mode::Eight);
    let out_dir: PathBuf = args
        .get(5)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    std::fs::create_dir_all(&out_dir).expect("failed to create output directory");

    let params = Params::default();
    let cancel = CancelFlag::new();

    eprintln!(
        "Populating {}x{} board with seed={}, mode={}, retry budget={}",
        cols,
        rows,
        seed,
        mode.name(),
        params.retry_budget
    );

    let (outcome, timings) =
        loopgen::simulate(seed, cols, rows, mode, &params, &cancel).expect("simulation failed");

    eprintln!("\nTimings:");
    for t in &timings {
        eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
    }
    eprintln!(
        "{} populate steps, {} forced merges, {} animation ticks",
        outcome.populate_steps,
        outcome.merges.len(),
        outcome.animate_steps
    );

    let save = |name: &str, rgba: &[u8], w: usize, h: usize| {
        let path = out_dir.join(name);
        image::save_buffer(&path, rgba, w as u32, h as u32, image::ColorType::Rgba8)
            .expect("failed to save image");
        eprintln!("Saved {}", path.display());
    };

    let pw = cols * params.tile_size;
    let ph = rows * params.tile_size;

    // 1. Board after population + recorded animation
    save("board.png", &outcome.rgba, pw, ph);

    // 2. Direction codes
    let dir_rgba = render::render_directions(&outcome.board).to_rgba(params.tile_size);
    save("directions.png", &dir_rgba, pw, ph);

    // 3. Longest-path demonstration between the classic probe tiles.
    // Asymmetric modes cannot seed the reversed path; report and move on.
    let (path_len, path_seeded, search_exhausted, search_nodes) =
        match loopgen::demonstrate_path(seed, cols, rows, mode, (2, 2), (2, 1), &params, &cancel) {
            Ok((path_outcome, path_timings)) => {
                eprintln!("\nPath timings:");
                for t in &path_timings {
                    eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
                }
                eprintln!(
                    "path of {} tiles, {} nodes expanded{}{}",
                    path_outcome.path.len(),
                    path_outcome.nodes,
                    if path_outcome.exhausted {
                        " (search exhausted)"
                    } else {
                        ""
                    },
                    if path_outcome.seeded {
                        ""
                    } else {
                        " (path not seedable as a cycle)"
                    }
                );
                save("path.png", &path_outcome.rgba, pw, ph);
                (
                    path_outcome.path.len(),
                    path_outcome.seeded,
                    path_outcome.exhausted,
                    path_outcome.nodes,
                )
            }
            Err(e) => {
                eprintln!("\nPath demonstration skipped: {e}");
                (0, false, false, 0)
            }
        };

    let stats = Stats {
        seed,
        cols,
        rows,
        mode: mode.name(),
        populate_steps: outcome.populate_steps,
        forced_merges: outcome.merges.len(),
        animate_steps: outcome.animate_steps,
        path_len,
        path_seeded,
        search_exhausted,
        search_nodes,
    };
    let stats_path = out_dir.join("stats.json");
    let json = serde_json::to_string_pretty(&stats).expect("failed to encode stats");
    std::fs::write(&stats_path, json).expect("failed to write stats");
    eprintln!("Saved {}", stats_path.display());

    eprintln!("\nDone.");
}
