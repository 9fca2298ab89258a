use std::{fs::File, io::BufReader, time::Instant};

use anyhow::Context;
use rayon::prelude::*;

use anvil_packer::{
    dump::read_dump, helpers::estimate_size, BlockCodec, BlockRegion, CodecSettings, Offset,
};

const WEST: Offset = Offset::new(-1, 0, 0);
const BELOW: Offset = Offset::new(0, -1, 0);
const NORTH: Offset = Offset::new(0, 0, -1);
const NORTH_WEST: Offset = Offset::new(-1, 0, -1);
const BELOW_WEST: Offset = Offset::new(-1, -1, 0);
const TWO_BELOW: Offset = Offset::new(0, -2, 0);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        anyhow::bail!("Usage: settings-search <block dump>");
    };
    let region = read_dump(BufReader::new(File::open(&path)?)).with_context(|| format!("reading {path}"))?;
    println!("[search] {path}: {} region, palette of {}", region.dims(), region.palette_len());

    let neighbor_sets = [
        vec![],
        vec![WEST],
        vec![BELOW],
        vec![WEST, NORTH],
        vec![WEST, BELOW, NORTH],
        vec![BELOW, WEST, NORTH],
        vec![WEST, BELOW, NORTH, NORTH_WEST],
        vec![WEST, BELOW, NORTH, BELOW_WEST],
        vec![BELOW, TWO_BELOW, WEST, NORTH],
    ];
    let candidates: Vec<CodecSettings> = neighbor_sets
        .iter()
        .flat_map(|neighbors| {
            (1..=16).map(|context_bits| CodecSettings { context_bits, neighbors: neighbors.clone() })
        })
        .collect();

    let results = candidates
        .into_par_iter()
        .map(|settings| exec(&region, settings))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (best, size) = results.into_iter().min_by_key(|&(_, size)| size).context("no candidates")?;
    println!("[search] best: {best}, csize: {size}");
    Ok(())
}

fn exec(region: &BlockRegion, settings: CodecSettings) -> anyhow::Result<(CodecSettings, u64)> {
    let timer = Instant::now();
    let size = estimate_size(BlockCodec::new(settings.clone())?, region)?;
    let size = size + settings.encoded_len() as u64;

    let time = timer.elapsed();
    println!(
        "[search] [{settings}] csize: {size} ({:.3} bits per block), ctime: {time:?}",
        size as f64 * 8.0 / region.blocks().len().max(1) as f64,
    );
    Ok((settings, size))
}
