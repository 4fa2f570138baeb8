use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use cargo_metadata::MetadataCommand;
use clap::{Parser, Subcommand};

const MANIFEST: &str = "crates/clonify/assets/clonify.inx";

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build clonify and install it with its .inx manifest as an editor extension
    Install {
        /// Extension directory (defaults to the user's Inkscape extensions folder)
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        debug: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Install { dir, debug } => install(dir, debug)?,
    }
    Ok(())
}

fn install(dir: Option<PathBuf>, debug: bool) -> Result<()> {
    let metadata = MetadataCommand::new()
        .no_deps()
        .exec()
        .context("failed to read cargo metadata")?;
    let workspace_root: PathBuf = metadata.workspace_root.clone().into();
    let target_dir: PathBuf = metadata.target_directory.clone().into();

    let mut cmd = Command::new("cargo");
    cmd.arg("build").arg("--package").arg("clonify");
    if !debug {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo build failed");
    }

    let dest = match dir {
        Some(dir) => dir,
        None => default_extension_dir()?,
    };
    fs::create_dir_all(&dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;

    let profile = if debug { "debug" } else { "release" };
    let binary = format!("clonify{}", std::env::consts::EXE_SUFFIX);
    copy(&target_dir.join(profile).join(&binary), &dest.join(&binary))?;
    copy(&workspace_root.join(MANIFEST), &dest.join("clonify.inx"))?;

    println!("installed clonify into {}", dest.display());
    Ok(())
}

fn default_extension_dir() -> Result<PathBuf> {
    dirs_next::config_dir()
        .map(|base| base.join("inkscape").join("extensions"))
        .context("could not determine the user config directory; pass --dir")
}

fn copy(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}
