use crate::grab::{clear_cache, grab};
use crate::logging::init_logger;
use crate::models::{Args, Artifact, ClearCacheOptions, Commands, GrabOptions};
use crate::platform::SuffixTable;
use anyhow::{Context, Result};
use clap::Parser;

/// Main CLI entry point
pub fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Grab {
            repository,
            version_spec,
            name,
            platform_suffixes,
            arch_suffixes,
            target_dir,
            unpack_exe,
            no_cache,
            force_cache,
            token,
            verbose,
        } => {
            init_logger(verbose);
            let options = GrabOptions {
                repository,
                version: Some(version_spec),
                name,
                platform_suffixes: parse_suffix_table(&platform_suffixes)
                    .context("Invalid --platform-suffixes")?,
                arch_suffixes: parse_suffix_table(&arch_suffixes)
                    .context("Invalid --arch-suffixes")?,
                target_directory: target_dir,
                unpack_executable: unpack_exe,
                cache: Some(!no_cache),
                force_cache,
                token,
                verbose,
            };
            let result = grab(&options)?;
            match result.artifact {
                Artifact::Archive(path) => {
                    println!("Downloaded {} ({})", path.display(), result.version)
                }
                Artifact::Executable(path) => {
                    println!("Unpacked {} ({})", path.display(), result.version)
                }
            }
        }
        Commands::ClearCache {
            repository,
            verbose,
        } => {
            init_logger(verbose);
            clear_cache(&ClearCacheOptions {
                repository,
                verbose,
            })?;
        }
    }

    Ok(())
}

/// Parse `platform=alias` pairs; values may be comma-separated and keys repeated
fn parse_suffix_table(values: &[String]) -> Result<Option<SuffixTable>> {
    if values.is_empty() {
        return Ok(None);
    }
    let mut table = SuffixTable::new();
    for entry in values.iter().flat_map(|value| value.split(',')) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = parse_key_value(entry)?;
        table.entry(key).or_default().push(value);
    }
    Ok(Some(table))
}

fn parse_key_value(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(anyhow::anyhow!("Expected format 'key=value', got: {s}")),
    }
}
