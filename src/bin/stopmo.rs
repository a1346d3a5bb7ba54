use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stopmo", version)]
struct Cli {
    /// Project store file (overrides the config).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Studio config JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List projects.
    List,
    /// Create an empty project.
    Create { name: String },
    /// Rename a project.
    Rename { project: String, name: String },
    /// Delete a project.
    Delete { project: String },
    /// Append image files to a project as imported frames.
    Import {
        project: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Set a project's playback rate.
    Fps { project: String, fps: u32 },
    /// List a project's frames.
    Frames { project: String },
    /// Write one frame's full image to disk.
    ExportFrame {
        project: String,
        /// Frame index (0-based).
        index: usize,
        /// Output path; `.jpg`/`.jpeg` is written as stored, other extensions are re-encoded.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => stopmo::StudioConfig::load(path)?,
        None => stopmo::StudioConfig::default(),
    };
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let store = stopmo::JsonFileStore::new(config.store_path.clone());
    let mut studio =
        stopmo::Studio::load(config, Box::new(store), Box::new(stopmo::NoCamera))?;

    let result = run(&mut studio, cli.cmd);
    studio.shutdown().context("flush project store")?;
    result
}

fn run(studio: &mut stopmo::Studio, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::List => cmd_list(studio),
        Command::Create { name } => {
            let id = studio.create(&name)?;
            println!("{id}");
            Ok(())
        }
        Command::Rename { project, name } => {
            let id = resolve_project(studio, &project)?;
            studio.rename(id, &name)?;
            Ok(())
        }
        Command::Delete { project } => {
            let id = resolve_project(studio, &project)?;
            studio.delete(id)?;
            eprintln!("deleted {id}");
            Ok(())
        }
        Command::Import { project, files } => {
            let id = resolve_project(studio, &project)?;
            studio.open(id)?;
            let report = studio.import_files(&mut stopmo::FsImportSource, &files)?;
            studio.close()?;
            eprintln!(
                "imported {} frame(s), skipped {}, failed {}",
                report.appended, report.skipped, report.failed
            );
            Ok(())
        }
        Command::Fps { project, fps } => {
            let id = resolve_project(studio, &project)?;
            studio.open(id)?;
            studio.set_fps(fps)?;
            studio.close()?;
            Ok(())
        }
        Command::Frames { project } => {
            let id = resolve_project(studio, &project)?;
            let project = studio
                .project(id)
                .with_context(|| format!("project {id} disappeared"))?;
            for (i, frame) in project.frames.iter().enumerate() {
                println!(
                    "{i:>4}  {}  {}  {}x{}{}",
                    frame.id,
                    frame.captured_at_label,
                    frame.full_image.width,
                    frame.full_image.height,
                    if frame.imported { "  imported" } else { "" }
                );
            }
            Ok(())
        }
        Command::ExportFrame {
            project,
            index,
            out,
        } => {
            let id = resolve_project(studio, &project)?;
            let project = studio
                .project(id)
                .with_context(|| format!("project {id} disappeared"))?;
            let frame = project
                .frames
                .get(index)
                .with_context(|| format!("frame {index} out of range"))?;
            export_frame(frame, &out)?;
            eprintln!("wrote {}", out.display());
            Ok(())
        }
    }
}

fn cmd_list(studio: &stopmo::Studio) -> anyhow::Result<()> {
    for p in studio.list() {
        println!(
            "{}  {:<24}  {:>4} frames  {:>2} fps  {:>6.2}s  modified {}",
            p.id,
            p.name,
            p.frame_count,
            p.fps.get(),
            p.duration_seconds,
            p.last_modified.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Accept a full id, a unique id prefix, or an exact project name.
fn resolve_project(studio: &stopmo::Studio, needle: &str) -> anyhow::Result<stopmo::ProjectId> {
    if let Ok(id) = stopmo::ProjectId::parse(needle)
        && studio.project(id).is_some()
    {
        return Ok(id);
    }

    let matches: Vec<stopmo::ProjectId> = studio
        .projects()
        .iter()
        .filter(|p| p.id.to_string().starts_with(needle) || p.name == needle)
        .map(|p| p.id)
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => anyhow::bail!("no project matches '{needle}'"),
        _ => anyhow::bail!("'{needle}' matches {} projects", matches.len()),
    }
}

fn export_frame(frame: &stopmo::Frame, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let ext = out
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => std::fs::write(out, &frame.full_image.jpeg)
            .with_context(|| format!("write '{}'", out.display())),
        _ => {
            let img = frame.full_image.decode()?;
            img.save(out)
                .with_context(|| format!("write image '{}'", out.display()))
        }
    }
}
