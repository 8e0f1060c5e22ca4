//! Minimal CLI: type file → JSON Schema
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use crate::descriptor::TypeKey;
use crate::generator::SchemaGenerator;
use crate::naming::NamingPolicy;
use crate::options::{ConstMode, NullableMode, RootMode, SchemaOptions};
use crate::type_file::TypeFile;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate JSON Schema documents from declared type files
#[derive(Parser, Debug)]
#[command(name = "json-typeschema", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate a schema document for the root type of each input
    Schema(SchemaOut),
    /// list the types declared in each input
    List(ListOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more type files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
enum Dialect {
    /// `nullable`, `const`, formats, root duplication
    #[default]
    Permissive,
    /// type unions, single-value enums, root recursion; validated
    Strict,
}

#[derive(Args, Debug, Clone)]
struct DialectSettings {
    /// preset to start from
    #[arg(long, value_enum, default_value_t = Dialect::Permissive)]
    dialect: Dialect,

    #[arg(long, value_enum)]
    nullable_mode: Option<NullableMode>,

    #[arg(long, value_enum)]
    const_mode: Option<ConstMode>,

    #[arg(long, value_enum)]
    root_mode: Option<RootMode>,

    /// casing applied to property names, discriminators and enum members
    #[arg(long, value_enum)]
    naming: Option<NamingPolicy>,

    /// never emit `format`; describe the format in text instead
    #[arg(long)]
    no_format: bool,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    dialect_settings: DialectSettings,

    /// root type (overrides the file's `root`)
    #[arg(long)]
    root: Option<String>,

    /// output .json file, or a directory when there are several inputs (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct ListOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")
    }
}

impl DialectSettings {
    fn options(&self) -> SchemaOptions {
        let mut options = match self.dialect {
            Dialect::Permissive => SchemaOptions::permissive(),
            Dialect::Strict => SchemaOptions::strict(),
        };
        if let Some(mode) = self.nullable_mode {
            options = options.with_nullable_mode(mode);
        }
        if let Some(mode) = self.const_mode {
            options = options.with_const_mode(mode);
        }
        if let Some(mode) = self.root_mode {
            options = options.with_root_mode(mode);
        }
        if let Some(naming) = self.naming {
            options = options.with_naming(naming);
        }
        if self.no_format {
            options = options.with_format_supported(false);
        }
        options
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                target.run()
            }
            Command::List(target) => {
                for path in target.input_settings.paths()? {
                    let file = load_type_file(&path)?;
                    println!("{}", path.display().to_string().bold());
                    for (key, kind) in file.declared() {
                        let marker = if file.root() == Some(key) { " (root)".cyan().to_string() } else { String::new() };
                        println!("  {:<8} {key}{marker}", kind.dimmed());
                    }
                }
                Ok(())
            }
        }
    }
}

impl SchemaOut {
    fn run(&self) -> anyhow::Result<()> {
        let paths = self.input_settings.paths()?;
        let options = self.dialect_settings.options();
        tracing::debug!(inputs = paths.len(), ?options, "generating schemas");

        // one generation context per input
        let results: Vec<_> = paths
            .par_iter()
            .map(|path| generate_file(path, self.root.as_deref(), &options))
            .collect();

        let mut failures = 0usize;
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(schema_src) => self.emit(path, paths.len(), &schema_src)?,
                Err(error) => {
                    failures += 1;
                    eprintln!("{} {}: {error:#}", "✗".red(), path.display());
                }
            }
        }
        if failures > 0 {
            bail!("{failures} of {} inputs failed", paths.len());
        }
        Ok(())
    }

    fn emit(&self, path: &Path, total: usize, schema_src: &str) -> anyhow::Result<()> {
        let Some(out) = self.out.as_ref() else {
            println!("{schema_src}");
            return Ok(());
        };
        let target = if total > 1 { out.join(schema_file_name(path)) } else { out.clone() };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, schema_src).with_context(|| format!("failed to write {}", target.display()))?;
        eprintln!("{} {} → {}", "✓".green(), path.display(), target.display());
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_type_file(path: &Path) -> anyhow::Result<TypeFile> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read type file {}", path.display()))?;
    TypeFile::parse(&source).with_context(|| format!("failed to parse type file {}", path.display()))
}

fn generate_file(path: &Path, root: Option<&str>, options: &SchemaOptions) -> anyhow::Result<String> {
    let file = load_type_file(path)?;
    let root = match (root, file.root()) {
        (Some(root), _) => TypeKey::new(root),
        (None, Some(root)) => root.clone(),
        (None, None) => bail!("no root type: pass --root or set `root` in the file"),
    };
    let document = SchemaGenerator::new()
        .with_provider(&file)
        .generate_named(&root, options)
        .with_context(|| format!("failed to generate schema for `{root}`"))?;
    Ok(document.to_json_pretty())
}

/// `fixtures/document.types.json` → `document.schema.json`
fn schema_file_name(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let stem = name.strip_suffix(".types.json").or_else(|| name.strip_suffix(".json")).unwrap_or(&name);
    format!("{stem}.schema.json")
}

pub(crate) fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_dialect_flags_override_the_preset() {
        let cli = CommandLineInterface::try_parse_from([
            "json-typeschema",
            "schema",
            "--input",
            "a.types.json",
            "--dialect",
            "strict",
            "--const-mode",
            "default",
            "--naming",
            "snake-case-lower",
        ])
        .unwrap();
        let Command::Schema(target) = cli.cmd else { panic!("schema command") };
        let options = target.dialect_settings.options();
        assert_eq!(options.const_mode, ConstMode::Default);
        assert_eq!(options.root_mode, RootMode::RootRecursion);
        assert_eq!(options.naming, NamingPolicy::SnakeCaseLower);
        assert!(options.validator.is_some());
    }

    #[test]
    fn schema_file_names_drop_the_types_suffix() {
        assert_eq!(schema_file_name(Path::new("fixtures/document.types.json")), "document.schema.json");
        assert_eq!(schema_file_name(Path::new("plain.json")), "plain.schema.json");
    }

    #[test]
    fn literal_paths_pass_through_and_empty_globs_fail() {
        let paths = resolve_file_path_patterns(["a.types.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.types.json")]);
        assert!(resolve_file_path_patterns(["definitely-missing-dir/*.types.json"]).is_err());
    }
}
