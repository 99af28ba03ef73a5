#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

pub fn random_data(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0_u8; size];
    rng.fill_bytes(&mut data);
    data
}

/// Text-like data that compresses well.
pub fn repetitive_data(size: usize) -> Vec<u8> {
    b"the quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(size)
        .collect()
}

/// A real file descriptor holding `data`, positioned at its start.
pub fn channel_with(data: &[u8]) -> File {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(data).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file
}

pub fn read_back(file: &mut File) -> Vec<u8> {
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    data
}

pub fn io_generic_copy<R: Read, W: Write>(src: &mut R, dst: &mut W) -> io::Result<()> {
    let mut buf = [0_u8; 4096];
    loop {
        let read_size = src.read(&mut buf)?;
        if read_size == 0 {
            break;
        }
        dst.write_all(&buf[..read_size])?;
    }
    Ok(())
}
