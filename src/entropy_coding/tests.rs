use std::io::ErrorKind;

use super::{
    ac_io::{ACReader, ACWriter},
    ArithmeticCoder, PROB_ONE,
};

const CERTAIN: u16 = u16::MAX;
const HALF: u16 = (PROB_ONE / 2) as u16;
const NEVER: u16 = 1;

fn bits_of(input: &[u8]) -> Vec<u8> {
    input.iter().flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1)).collect()
}

fn compress(input: &[u8], probabilities: &[u16]) -> Vec<u8> {
    let mut ac = ArithmeticCoder::new_coder(ACWriter::new(Vec::new()));
    for (bit, &prob) in bits_of(input).into_iter().zip(probabilities) {
        ac.encode(bit, prob).unwrap();
    }
    ac.flush().unwrap().into_inner()
}

fn decompress(input: &[u8], probabilities: &[u16]) -> Vec<u8> {
    let mut ac = ArithmeticCoder::new_decoder(ACReader::new(input)).unwrap();
    let bits: Vec<u8> = probabilities.iter().map(|&prob| ac.decode(prob).unwrap()).collect();
    bits.chunks(8).map(|byte| byte.iter().fold(0, |acc, &bit| (acc << 1) | bit)).collect()
}

#[test]
fn best_model_zeroes() {
    let block_size = 1 << 15;
    let input = [0x00].repeat(block_size);
    let probabilities = [CERTAIN].repeat(block_size * 8);
    let compressed = compress(&input, &probabilities);
    let decompressed = decompress(&compressed, &probabilities);
    assert_eq!(input, decompressed);
    // ~2^18 * log2(65536/65535) = 6 bits, plus the 32 flushed state bits
    assert!(compressed.len() <= 20, "got {} bytes", compressed.len());
}

#[test]
fn best_model_ones() {
    let block_size = 1 << 15;
    let input = [0xff].repeat(block_size);
    let probabilities = [NEVER].repeat(block_size * 8);
    let compressed = compress(&input, &probabilities);
    let decompressed = decompress(&compressed, &probabilities);
    assert_eq!(input, decompressed);
    assert!(compressed.len() <= 20, "got {} bytes", compressed.len());
}

#[test]
fn best_model_alternating() {
    let block_size = 1024;
    let input = [0x55].repeat(block_size);
    let probabilities = [CERTAIN, NEVER].repeat(block_size * 8 / 2);
    let compressed = compress(&input, &probabilities);
    let decompressed = decompress(&compressed, &probabilities);
    assert_eq!(input, decompressed);
    assert!(compressed.len() <= 8, "got {} bytes", compressed.len());
}

#[test]
fn worst_model_zeroes() {
    let block_size = 16;
    let input = [0x00].repeat(block_size);
    let probabilities = [NEVER].repeat(block_size * 8);
    let compressed = compress(&input, &probabilities);
    let decompressed = decompress(&compressed, &probabilities);
    assert_eq!(input, decompressed);
    // 16 bits per bit
    assert!((256..=268).contains(&compressed.len()), "got {} bytes", compressed.len());
}

#[test]
fn no_model() {
    let block_size = 128;
    let input = [0xaa, 0x55].repeat(block_size / 2);
    let probabilities = [HALF].repeat(block_size * 8);
    let compressed = compress(&input, &probabilities);
    let decompressed = decompress(&compressed, &probabilities);
    assert_eq!(input, decompressed);
    // one bit per bit, plus the flushed state
    assert!((128..=136).contains(&compressed.len()), "got {} bytes", compressed.len());
}

#[test]
fn half_good_model() {
    let block_size = 128;
    let input = [0x55].repeat(block_size);
    let probabilities = [HALF, NEVER].repeat(block_size * 8 / 2);
    let compressed = compress(&input, &probabilities);
    let decompressed = decompress(&compressed, &probabilities);
    assert_eq!(input, decompressed);
    // cross entropy is 1/2 * 1 + 1/2 * log2(65536/65535) ~ 1/2
    assert!((64..=72).contains(&compressed.len()), "got {} bytes", compressed.len());
}

#[test]
fn truncated_stream_is_an_error() {
    let input: Vec<u8> = (0..=255).collect();
    let probabilities = [HALF].repeat(input.len() * 8);
    let compressed = compress(&input, &probabilities);

    for cut in [1, 4, compressed.len()] {
        let truncated = &compressed[..compressed.len() - cut];
        let result = ArithmeticCoder::new_decoder(ACReader::new(truncated)).and_then(|mut ac| {
            probabilities.iter().try_for_each(|&prob| ac.decode(prob).map(drop))
        });
        let err = result.expect_err("decoded a truncated stream");
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}

#[test]
fn decoder_consumes_whole_stream() {
    let input = b"block grids are spatially autocorrelated";
    let probabilities = [HALF, 50_000, 9_000, 200].repeat(input.len() * 2);
    let compressed = compress(input, &probabilities);

    let mut ac = ArithmeticCoder::new_decoder(ACReader::new(compressed.as_slice())).unwrap();
    for &prob in &probabilities {
        ac.decode(prob).unwrap();
    }
    assert_eq!(ac.into_inner().consumed(), compressed.len() as u64);
}
