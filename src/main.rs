use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use walkdir::WalkDir;

use scspdec::atlas;
use scspdec::envelope::{self, Endian};
use scspdec::file::ScspFile;

#[derive(Parser)]
#[command(author, version, about = "Convert SCSP skeleton containers to Spine JSON", long_about = None)]
struct Cli {
    /// File or directory to process
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output directory for decompressed envelopes
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Envelope block headers are big-endian
    #[arg(long)]
    big_endian: bool,

    /// Decompress LZ4 envelopes before converting
    #[arg(long)]
    lz4: bool,

    /// Skip the atlas rewrite pass
    #[arg(long)]
    skip_atlas: bool,

    /// Extension of the files to convert
    #[arg(long, default_value = "scsp")]
    ext: String,
}

// Every file under `root` (or `root` itself) whose name ends with
// `.{ext}`, case-insensitively.
fn collect_files(root: &Path, ext: &str) -> Vec<PathBuf> {
    let suffix = format!(".{}", ext.trim_start_matches('.').to_lowercase());

    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(&suffix)
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn atlas_pass(root: &Path) {
    let atlas_files = collect_files(root, "atlas");

    if atlas_files.is_empty() {
        info!("no atlas files under {}", root.display());
        return;
    }

    let mut processed = 0usize;

    for path in &atlas_files {
        match atlas::process_atlas_file(path) {
            Ok(true) => processed += 1,
            Ok(false) => {}
            Err(e) => warn!("skipping atlas {}: {}", path.display(), e),
        }
    }

    info!("rewrote {} of {} atlas files", processed, atlas_files.len());
}

// Output path for a decompressed envelope: either into the output
// directory or alongside the input, with a .decompressed suffix.
fn decompressed_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".decompressed");

    match output_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

fn lz4_pass(
    root: &Path,
    output_dir: Option<&Path>,
    endian: Endian,
    failures: &mut Vec<(PathBuf, String)>,
) {
    let inputs = collect_files(root, "scsp");

    if inputs.is_empty() {
        info!("no .scsp envelopes under {}", root.display());
        return;
    }

    info!("decompressing {} envelopes", inputs.len());

    for input in inputs {
        let out_path = decompressed_path(&input, output_dir);

        match envelope::decode_file(&input, &out_path, endian) {
            Ok(written) => info!("wrote {} bytes to {}", written, out_path.display()),
            Err(e) => failures.push((input, e.to_string())),
        }
    }
}

// 1043.scsp.decompressed (converting .decompressed) becomes 1043.json,
// next to the input.
fn json_path(input: &Path, ext: &str) -> PathBuf {
    let suffix = format!(".{}", ext.trim_start_matches('.').to_lowercase());
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut stem = if name.to_lowercase().ends_with(&suffix) {
        name[..name.len() - suffix.len()].to_string()
    } else {
        name
    };

    if let Some(dot) = stem.find('.') {
        stem.truncate(dot);
    }

    input.with_file_name(format!("{}.json", stem))
}

fn convert_file(input: &Path, ext: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let decoded = ScspFile::new(data)?;
    let document = decoded.to_json()?;

    let out_path = json_path(input, ext);
    fs::write(&out_path, serde_json::to_string(&document)?)?;

    Ok(out_path)
}

fn convert_pass(root: &Path, ext: &str, failures: &mut Vec<(PathBuf, String)>) {
    let inputs = collect_files(root, ext);

    if inputs.is_empty() {
        info!("no .{} files under {}", ext, root.display());
        return;
    }

    info!("converting {} files", inputs.len());

    for input in inputs {
        match convert_file(&input, ext) {
            Ok(out_path) => info!("{} -> {}", input.display(), out_path.display()),
            Err(e) => failures.push((input, e.to_string())),
        }
    }
}

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .expect("logger init");

    let cli = Cli::parse();

    let endian = if cli.big_endian {
        Endian::Big
    } else {
        Endian::Little
    };

    if !cli.skip_atlas && cli.path.is_dir() {
        atlas_pass(&cli.path);
    }

    let mut failures: Vec<(PathBuf, String)> = Vec::new();
    let mut ext = cli.ext.clone();

    if cli.lz4 {
        lz4_pass(&cli.path, cli.output.as_deref(), endian, &mut failures);
        ext = "decompressed".to_string();
    }

    // In lz4 mode the conversion stage scans wherever the decompressed
    // files landed: the output directory if one was given, otherwise
    // next to the inputs.
    let convert_root: &Path = if cli.lz4 {
        match cli.output.as_deref() {
            Some(dir) => dir,
            None if cli.path.is_file() => cli.path.parent().unwrap_or_else(|| Path::new(".")),
            None => &cli.path,
        }
    } else {
        &cli.path
    };

    convert_pass(convert_root, &ext, &mut failures);

    if failures.is_empty() {
        info!("all files converted without errors");
    } else {
        error!("{} files failed:", failures.len());
        for (path, message) in &failures {
            error!("  {}: {}", path.display(), message);
        }
        process::exit(1);
    }
}
