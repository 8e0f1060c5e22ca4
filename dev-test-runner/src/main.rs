//! Snapshot runner: generates every `<fixtures>/*.types.json` under both
//! presets and compares against `<fixtures>/expected/<name>.<preset>.json`.
//! Missing snapshots fail the run; `--update` records them.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use json_typeschema::type_file::TypeFile;
use json_typeschema::{SchemaGenerator, SchemaOptions};
use serde_json::Value;

#[derive(Parser, Debug)]
struct Settings {
    /// directory holding `*.types.json` fixtures
    #[arg(long, default_value = "fixtures")]
    fixtures: PathBuf,

    /// record missing snapshots and overwrite existing ones
    #[arg(long)]
    update: bool,
}

enum Outcome {
    Matched,
    Recorded,
    Missing,
    Mismatched(String),
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    let pattern = settings.fixtures.join("*.types.json");
    let expected_dir = settings.fixtures.join("expected");

    let mut total = 0usize;
    let mut mismatched = 0usize;
    let mut missing = 0usize;
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = entry?;
        let file = load(&path)?;
        let Some(root) = file.root() else {
            bail!("{}: fixtures must name a root type", path.display());
        };
        let presets = [("permissive", SchemaOptions::permissive()), ("strict", SchemaOptions::strict())];
        for (preset, options) in presets {
            total += 1;
            let document = SchemaGenerator::new()
                .with_provider(&file)
                .generate_named(root, &options)
                .with_context(|| format!("{} ({preset})", path.display()))?;
            let snapshot = expected_dir.join(format!("{}.{preset}.json", fixture_name(&path)));
            let label = format!("{} [{preset}]", path.display());
            match check(&snapshot, document.as_value(), settings.update)? {
                Outcome::Matched => eprintln!("{} {label}", "✓".green()),
                Outcome::Recorded => eprintln!("{} {label} → {}", "+".yellow(), snapshot.display()),
                Outcome::Missing => {
                    missing += 1;
                    eprintln!("{} {label}: no snapshot at {} (rerun with --update)", "?".red(), snapshot.display());
                }
                Outcome::Mismatched(diff) => {
                    mismatched += 1;
                    eprintln!("{} {label}\n{diff}", "✗".red());
                }
            }
        }
    }

    if total == 0 {
        bail!("no fixtures matched {}", pattern.display());
    }
    if mismatched > 0 || missing > 0 {
        bail!("{mismatched} of {total} snapshots differ, {missing} missing");
    }
    eprintln!("{}", format!("{total} snapshots ok").bold());
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<TypeFile> {
    let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    TypeFile::parse(&source).with_context(|| format!("failed to parse {}", path.display()))
}

fn check(snapshot: &Path, actual: &Value, update: bool) -> anyhow::Result<Outcome> {
    if !update && !snapshot.exists() {
        return Ok(Outcome::Missing);
    }
    if update {
        if let Some(parent) = snapshot.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(snapshot, format!("{actual:#}\n"))?;
        return Ok(Outcome::Recorded);
    }
    let source = std::fs::read_to_string(snapshot)?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let expected: Value = serde_path_to_error::deserialize(de)
        .with_context(|| format!("failed to parse snapshot {}", snapshot.display()))?;
    if &expected == actual {
        Ok(Outcome::Matched)
    } else {
        Ok(Outcome::Mismatched(pretty_assertions::Comparison::new(&expected, actual).to_string()))
    }
}

/// `document.types.json` → `document`
fn fixture_name(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    name.strip_suffix(".types.json").unwrap_or(&name).to_string()
}
