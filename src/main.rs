use std::io::{self, BufRead, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fieldview::command::{Command, CommandQueue, CommandSender};
use fieldview::config::SceneConfig;
use fieldview::gpu::{HeadlessBackend, Renderer};
use fieldview::scene::Scene;

#[derive(Debug, Parser)]
#[command(
    name = "fieldview",
    version,
    about = "render numeric arrays as GPU textures"
)]
struct Args {
    /// Path to YAML scene description
    #[arg(value_name = "SCENE")]
    scene: PathBuf,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    /// Lay out and draw the scene once without a window, then print panel viewports
    #[arg(long = "dry-run")]
    dry_run: bool,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default},wgpu=warn,winit=warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        scene,
        verbose,
        dry_run,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = SceneConfig::from_yaml_file(&scene)
        .with_context(|| format!("failed to load scene from {}", scene.display()))?
        .validated()
        .context("invalid scene values")?;
    tracing::debug!("Loaded scene from {}:\n{:#?}", scene.display(), cfg);

    if dry_run {
        return run_dry(cfg);
    }

    let (commands_tx, commands_rx) = CommandQueue::bounded(cfg.shell.queue_capacity);
    let cancel = CancellationToken::new();

    if cfg.shell.enabled {
        spawn_shell(cfg.clone(), commands_tx, cancel.clone())?;
    } else if io::stdin().is_terminal() {
        // Ctrl-D cancels the viewer
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut sink = Vec::new();
            match io::stdin().read_to_end(&mut sink) {
                Ok(_) => tracing::info!("stdin closed; initiating shutdown"),
                Err(err) => tracing::warn!("stdin watcher failed: {err}"),
            }
            cancel.cancel();
        });
    } else {
        tracing::debug!("stdin is not a terminal; skipping shutdown watcher");
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for ctrl-c: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let result = fieldview::viewer::run_windowed(cfg, commands_rx, cancel.clone());
    cancel.cancel();
    result
}

fn run_dry(cfg: SceneConfig) -> Result<()> {
    let (width, height) = (f64::from(cfg.window.width), f64::from(cfg.window.height));
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut scene = Scene::build(cfg, &mut renderer, width, height)?;
    scene.draw(&mut renderer)?;
    for (name, vp) in scene.viewports()? {
        println!("{name}: {}x{} at ({}, {})", vp.width, vp.height, vp.x, vp.y);
    }
    for panel in scene.panels() {
        let image = panel.image();
        let program = image
            .shader_key()
            .map_or_else(|| "plain".to_string(), |key| key.label());
        println!("{}: {} {}", panel.name(), image.format(), program);
    }
    scene.destroy(&mut renderer);
    Ok(())
}

/// Reads shell commands from stdin on a plain thread; each line waits for its reply.
fn spawn_shell(cfg: SceneConfig, commands: CommandSender, cancel: CancellationToken) -> Result<()> {
    std::thread::Builder::new()
        .name("fieldview-shell".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!("shell read failed: {err}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match Command::parse_with(&line, |name| cfg.colormap(name)) {
                    Ok(command) => command,
                    Err(err) => {
                        eprintln!("{err}");
                        continue;
                    }
                };
                let quit = matches!(command, Command::Quit);
                match commands.send(command) {
                    Ok(Ok(reply)) => println!("{reply}"),
                    Ok(Err(reply)) => eprintln!("error: {reply}"),
                    Err(err) => {
                        tracing::warn!("shell lost the viewer: {err}");
                        break;
                    }
                }
                if quit {
                    return;
                }
            }
            tracing::info!("shell input closed; initiating shutdown");
            cancel.cancel();
        })
        .context("failed to spawn shell thread")?;
    Ok(())
}
