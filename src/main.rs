//! scrawl — standalone CLI for the turtle-graphics bridge.
//!
//! Commands:
//! - `write-bootstrap` — serialize the demo runtime's bootstrap image to disk
//! - `compile` — compile a script to a portable image
//! - `run` — compile a script, load it, and step N frames

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scrawl::bootstrap::{self, BOOTSTRAP_IMAGE_FILE};
use scrawl::Bridge;
use scrawl_types::{Color, CompileResponse, StartResponse, StepResponse};

#[derive(Parser)]
#[command(name = "scrawl", version, about = "Turtle-graphics bridge over an embedded runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the demo runtime's bootstrap image to disk.
    WriteBootstrap {
        /// Output path.
        #[arg(long, default_value = BOOTSTRAP_IMAGE_FILE)]
        out: PathBuf,
    },
    /// Compile a script to a portable image.
    Compile {
        /// Script file to compile.
        script: PathBuf,
        /// Bootstrap image to load (defaults to ./scrawl.image, falling back
        /// to an in-memory bootstrap when absent).
        #[arg(long)]
        bootstrap: Option<PathBuf>,
        /// Write the image bytes to this path.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Emit a JSON response instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Compile a script, load it, and step frames.
    Run {
        /// Script file to run.
        script: PathBuf,
        /// Bootstrap image to load (defaults to ./scrawl.image, falling back
        /// to an in-memory bootstrap when absent).
        #[arg(long)]
        bootstrap: Option<PathBuf>,
        /// Number of frames to step.
        #[arg(long, default_value_t = 1)]
        frames: u32,
        /// Emit JSON responses instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::WriteBootstrap { out } => write_bootstrap(&out),
        Command::Compile {
            script,
            bootstrap,
            out,
            json,
        } => compile(&script, bootstrap.as_deref(), out.as_deref(), json),
        Command::Run {
            script,
            bootstrap,
            frames,
            json,
        } => run(&script, bootstrap.as_deref(), frames, json),
    }
}

fn write_bootstrap(out: &Path) -> Result<()> {
    let engine = scrawl_engine::Engine::new();
    let runtime = bootstrap::install_builtins(&engine);
    let bytes = bootstrap::build_bootstrap_image(&engine, &runtime)
        .context("building bootstrap image")?;
    fs::write(out, &bytes)
        .with_context(|| format!("writing bootstrap image to {}", out.display()))?;
    println!("wrote {} ({} bytes)", out.display(), bytes.len());
    Ok(())
}

/// Load a bridge from an on-disk bootstrap image. An explicitly named image
/// must exist; the default path falls back to an in-memory bootstrap so a
/// fresh checkout works without a `write-bootstrap` step.
fn load_bridge(path: Option<&Path>) -> Result<Bridge> {
    match path {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("reading bootstrap image {}", path.display()))?;
            bootstrap::bridge_from_image(&bytes)
                .with_context(|| format!("loading bootstrap image {}", path.display()))
        }
        None => {
            let default = Path::new(BOOTSTRAP_IMAGE_FILE);
            if default.exists() {
                let bytes = fs::read(default)
                    .with_context(|| format!("reading bootstrap image {}", default.display()))?;
                bootstrap::bridge_from_image(&bytes)
                    .with_context(|| format!("loading bootstrap image {}", default.display()))
            } else {
                bootstrap::fresh_bridge().context("bootstrapping in memory")
            }
        }
    }
}

fn compile(script: &Path, bootstrap: Option<&Path>, out: Option<&Path>, json: bool) -> Result<()> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let bridge = load_bridge(bootstrap)?;

    match bridge.compile(&source) {
        Ok(image) => {
            let bytes = image.bytes();
            if let Some(out) = out {
                fs::write(out, &bytes)
                    .with_context(|| format!("writing image to {}", out.display()))?;
            }
            if json {
                let response = CompileResponse {
                    ok: true,
                    error: None,
                    image_b64: Some(BASE64.encode(&bytes)),
                    image_digest: Some(image.digest_hex()),
                };
                println!("{}", serde_json::to_string(&response)?);
            } else {
                println!("compiled {} bytes, digest {}", bytes.len(), image.digest_hex());
            }
            Ok(())
        }
        Err(err) => {
            if json {
                let response = CompileResponse {
                    ok: false,
                    error: Some(err.to_string()),
                    image_b64: None,
                    image_digest: None,
                };
                println!("{}", serde_json::to_string(&response)?);
                Ok(())
            } else {
                bail!("compile failed: {err}");
            }
        }
    }
}

fn run(script: &Path, bootstrap: Option<&Path>, frames: u32, json: bool) -> Result<()> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let bridge = load_bridge(bootstrap)?;

    let image = bridge.compile(&source).map_err(|err| {
        if json {
            let response = CompileResponse {
                ok: false,
                error: Some(err.to_string()),
                image_b64: None,
                image_digest: None,
            };
            // Best effort: the error line is the payload.
            if let Ok(line) = serde_json::to_string(&response) {
                println!("{line}");
            }
        }
        anyhow::anyhow!("compile failed: {err}")
    })?;

    let started = bridge.start(&image).context("starting environment")?;
    if json {
        let response = StartResponse {
            ok: true,
            error: None,
            background: Some(started.background),
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("start: background {}", format_color(&started.background));
    }

    for frame in 0..frames {
        match bridge.step(&started.environment) {
            Ok(output) => {
                if json {
                    let response = StepResponse {
                        ok: true,
                        error: None,
                        lines: output.lines,
                        background: Some(output.background),
                    };
                    println!("{}", serde_json::to_string(&response)?);
                } else {
                    println!(
                        "frame {}: {} lines, background {}",
                        frame,
                        output.lines.len(),
                        format_color(&output.background)
                    );
                }
            }
            Err(err) => {
                if json {
                    println!("{}", serde_json::to_string(&StepResponse::error(err.to_string()))?);
                    return Ok(());
                }
                bail!("step {frame} failed: {err}");
            }
        }
        bridge.engine().collect();
    }
    Ok(())
}

fn format_color(color: &Color) -> String {
    format!("({}, {}, {}, {})", color.r, color.g, color.b, color.a)
}
