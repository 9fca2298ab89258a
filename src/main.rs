// (c) 2022 Dimitar Rusev <mitikodev@gmail.com> licensed under GPL-3.0

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context};
use log::{info, trace};
use rayon::prelude::*;

use anvil_packer::codec::parse_neighbors;
use anvil_packer::dump::{read_dump, read_packed, write_dump, write_packed};
use anvil_packer::{BlockCodec, CodecSettings};

#[derive(Clone, Copy)]
enum Action {
    Compress,
    Decompress,
    Test,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let (action, path, settings) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(err) => {
            print_usage();
            return Err(err);
        }
    };
    // bad settings fail before any file is touched
    BlockCodec::new(settings.clone())?;
    info!("using {settings}");

    if path.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(&path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                files.push(file_path);
            }
        }
        // regions are independent, one job each
        files.par_iter().try_for_each(|file| run(file, action, &settings))?;
    } else if path.is_file() {
        run(&path, action, &settings)?;
    } else {
        bail!("{} must be a file or a directory", path.display());
    }

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<(Action, PathBuf, CodecSettings)> {
    let mut settings = CodecSettings::default();
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--context-bits" => {
                let value = args.next().ok_or_else(|| anyhow!("--context-bits needs a value"))?;
                settings.context_bits = value.parse().with_context(|| format!("invalid context bits '{value}'"))?;
            }
            "--neighbors" => {
                let value = args.next().ok_or_else(|| anyhow!("--neighbors needs a value"))?;
                settings.neighbors = parse_neighbors(&value).map_err(|err| anyhow!(err))?;
            }
            _ => positional.push(arg),
        }
    }

    let [action, path] = &positional[..] else {
        bail!("Invocation doesn't match usage! Provide an action and a path.");
    };
    let action = match action.as_str() {
        "c" => Action::Compress,
        "d" => Action::Decompress,
        "t" => Action::Test,
        _ => bail!("Unrecognized action '{action}'!"),
    };

    Ok((action, PathBuf::from(path), settings))
}

fn run(file_path: &Path, action: Action, settings: &CodecSettings) -> anyhow::Result<()> {
    let file_name = file_path.file_name().ok_or_else(|| anyhow!("invalid file {}", file_path.display()))?;
    let mut out_path = std::env::current_dir()?;
    out_path.push(file_name);

    let compress_path = out_path.with_extension("appk");
    let decompress_path = out_path.with_extension("orig");

    let timer = Instant::now();
    match action {
        Action::Compress => {
            compress(file_path, &compress_path, settings)?;
            println!("{}: compression took {:?}", file_path.display(), timer.elapsed());
        }
        Action::Decompress => {
            decompress(file_path, &decompress_path)?;
            println!("{}: decompression took {:?}", file_path.display(), timer.elapsed());
        }
        Action::Test => {
            compress(file_path, &compress_path, settings)?;
            println!("{}: compression took {:?}", file_path.display(), timer.elapsed());
            let timer = Instant::now();
            decompress(&compress_path, &decompress_path)?;
            println!("{}: decompression took {:?}", file_path.display(), timer.elapsed());
            compare(file_path, &decompress_path)?;
        }
    }

    Ok(())
}

fn compress(input: &Path, output: &Path, settings: &CodecSettings) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(input)?);
    let region = read_dump(reader).with_context(|| format!("reading {}", input.display()))?;

    let writer = BufWriter::new(File::create(output)?);
    let codec = BlockCodec::new(settings.clone())?;
    let mut progress = |fraction: f64| trace!("{}: {:.0}%", input.display(), fraction * 100.0);
    write_packed(&region, codec, writer, &mut progress)
        .with_context(|| format!("compressing {}", input.display()))?;

    let (before, after) = (fs::metadata(input)?.len(), fs::metadata(output)?.len());
    println!(
        "{}: {} region, {before} -> {after} bytes ({:.3} bits per block)",
        input.display(),
        region.dims(),
        after as f64 * 8.0 / region.blocks().len().max(1) as f64
    );
    Ok(())
}

fn decompress(input: &Path, output: &Path) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(input)?);
    let mut progress = |fraction: f64| trace!("{}: {:.0}%", input.display(), fraction * 100.0);
    let region = read_packed(reader, &mut progress).with_context(|| format!("decompressing {}", input.display()))?;

    let writer = BufWriter::new(File::create(output)?);
    write_dump(&region, writer)?;
    Ok(())
}

fn compare(original: &Path, decompressed: &Path) -> anyhow::Result<()> {
    let a = read_dump(BufReader::new(File::open(original)?))?;
    let b = read_dump(BufReader::new(File::open(decompressed)?))?;
    if a != b {
        bail!("{} and {} differ", original.display(), decompressed.display());
    }
    println!("{}: compare OK", original.display());
    Ok(())
}

fn print_usage() {
    println!("Usage: anvil-packer [options] <Action> <Path>");
    println!("<Action>: c (compress), d (decompress), t (test = c + d + compare)");
    println!("<Path> can be a single file or a directory");
    println!("Options:");
    println!("  --context-bits <N>    context table size, 1..=16 (default 12)");
    println!("  --neighbors <LIST>    causal neighbor offsets, \"dx,dy,dz;...\"");
    println!("Note: Directories are shallow traversed, files are processed in parallel");
}
