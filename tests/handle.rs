use std::fs::{File, OpenOptions};
use std::io::{Read, Write};

use hex_literal::hex;
use rayon::prelude::*;

use bz2::header::StreamHeader;
use bz2::read::Bz2Decoder;
use bz2::write::Bz2Encoder;
use bz2::{buffer, CompressionParams, Error};

mod common;
use common::*;

/// Reads until the decoder reports the end of the stream.
fn read_member(decoder: &mut Bz2Decoder) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0_u8; 1000];
    let len = buf.len();
    while !decoder.is_end_of_stream() {
        let n = decoder.read_region(&mut buf, 0, len).unwrap();
        out.extend_from_slice(&buf[..n]);
    }
    out
}

#[test]
fn read_past_end_is_an_error() {
    let data = random_data(50_000, 1);
    let channel = channel_with(&buffer::compress(&data, 9).unwrap());

    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();
    assert_eq!(read_member(&mut decoder), data);

    let mut buf = [0_u8; 16];
    assert!(matches!(
        decoder.read_region(&mut buf, 0, 16),
        Err(Error::EndOfInput)
    ));
    assert!(matches!(
        decoder.read_region(&mut buf, 0, 0),
        Err(Error::EndOfInput)
    ));
    // still open: reaching the end is not fatal
    assert!(!decoder.is_closed());
    assert!(decoder.unused_bytes().unwrap().is_empty());

    // the `Read` impl reports plain EOF instead
    assert_eq!(decoder.read(&mut buf).unwrap(), 0);
}

#[test]
fn last_chunk_is_returned_with_the_end() {
    let data = b"hello, hello, hello".to_vec();
    let channel = channel_with(&buffer::compress(&data, 1).unwrap());
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();

    let mut buf = [0_u8; 64];
    let n = decoder.read_region(&mut buf, 8, 56).unwrap();
    assert_eq!(n, data.len());
    assert_eq!(&buf[8..8 + n], data.as_slice());
    assert!(decoder.is_end_of_stream());
}

#[test]
fn unused_bytes_of_concatenated_members() {
    let first = repetitive_data(3000);
    let second = b"a second, independently compressed member".to_vec();
    let first_compressed = buffer::compress(&first, 9).unwrap();
    let second_compressed = buffer::compress(&second, 1).unwrap();

    let mut concatenated = first_compressed.clone();
    concatenated.extend_from_slice(&second_compressed);
    let channel = channel_with(&concatenated);

    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();
    assert_eq!(read_member(&mut decoder), first);
    let unused = decoder.unused_bytes().unwrap();
    assert_eq!(unused, second_compressed);
    decoder.close();

    // the channel itself is drained; the rest comes from the leftover bytes
    let mut decoder = Bz2Decoder::open(&channel, true, Some(&unused)).unwrap();
    assert_eq!(read_member(&mut decoder), second);
    assert!(decoder.unused_bytes().unwrap().is_empty());
}

#[test]
fn unused_bytes_before_end() {
    let data = random_data(20_000, 2);
    let channel = channel_with(&buffer::compress(&data, 9).unwrap());
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();

    assert!(matches!(
        decoder.unused_bytes(),
        Err(Error::InvalidArgument(_))
    ));
    let mut buf = [0_u8; 100];
    decoder.read_region(&mut buf, 0, 100).unwrap();
    assert!(matches!(
        decoder.unused_bytes(),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn read_region_bounds() {
    let channel = channel_with(&buffer::compress(b"abc", 9).unwrap());
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();
    let mut buf = [0_u8; 10];

    for (offset, len) in [(0, 11), (5, 6), (11, 0), (usize::MAX, 2)] {
        assert!(matches!(
            decoder.read_region(&mut buf, offset, len),
            Err(Error::InvalidArgument(_))
        ));
    }
    // nothing was consumed by the rejected calls
    assert!(!decoder.is_closed());
    assert_eq!(decoder.read_region(&mut buf, 10, 0).unwrap(), 0);
    assert_eq!(decoder.read_region(&mut buf, 2, 8).unwrap(), 3);
    assert_eq!(&buf[2..5], b"abc");
}

#[test]
fn corrupt_stream_closes_decoder() {
    let channel = channel_with(b"this is certainly not bzip2 data");
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();
    let mut buf = [0_u8; 100];

    assert!(matches!(
        decoder.read_region(&mut buf, 0, 100),
        Err(Error::DataCorruption)
    ));
    assert!(decoder.is_closed());
    assert!(matches!(
        decoder.read_region(&mut buf, 0, 100),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn truncated_stream_closes_decoder() {
    let compressed = buffer::compress(&random_data(30_000, 4), 9).unwrap();
    let channel = channel_with(&compressed[..compressed.len() / 2]);
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();

    let mut out = Vec::new();
    let err = decoder.read_to_end(&mut out).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    assert!(decoder.is_closed());
}

#[test]
fn descriptor_read_failure_closes_decoder() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let channel = OpenOptions::new().write(true).open(file.path()).unwrap();
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();

    let mut buf = [0_u8; 100];
    assert!(matches!(
        decoder.read_region(&mut buf, 0, 100),
        Err(Error::Io(_))
    ));
    assert!(decoder.is_closed());
}

#[test]
fn descriptor_write_failure_closes_encoder() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let channel = File::open(file.path()).unwrap();
    let mut encoder = Bz2Encoder::open(&channel, 1).unwrap();

    // several full blocks, so compressed output reaches the descriptor
    let data = random_data(400_000, 6);
    assert!(matches!(
        encoder.write_region(&data, 0, data.len()),
        Err(Error::Io(_))
    ));
    assert!(encoder.is_closed());
    assert!(matches!(
        encoder.write_region(&data, 0, 10),
        Err(Error::InvalidArgument(_))
    ));
    encoder.close().unwrap();
}

#[test]
fn close_is_idempotent() {
    let channel = channel_with(&buffer::compress(b"abc", 9).unwrap());
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();
    decoder.close();
    decoder.close();
    assert!(decoder.is_closed());
    let mut buf = [0_u8; 4];
    assert!(matches!(
        decoder.read_region(&mut buf, 0, 4),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        decoder.unused_bytes(),
        Err(Error::InvalidArgument(_))
    ));

    let channel = tempfile::tempfile().unwrap();
    let mut encoder = Bz2Encoder::open(&channel, 9).unwrap();
    encoder.close().unwrap();
    encoder.close().unwrap();
    assert!(encoder.is_closed());
    assert!(matches!(
        encoder.write_region(b"abc", 0, 3),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn handle_outlives_original_channel() {
    let data = random_data(10_000, 5);
    let channel = channel_with(&buffer::compress(&data, 9).unwrap());
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();
    drop(channel);
    assert_eq!(read_member(&mut decoder), data);

    let mut channel = tempfile::tempfile().unwrap();
    let mut encoder = Bz2Encoder::open(&channel, 9).unwrap();
    encoder.write_region(&data, 0, data.len()).unwrap();
    encoder.close().unwrap();
    // closing the encoder left the original descriptor usable
    let compressed = read_back(&mut channel);
    assert_eq!(buffer::decompress(&compressed, false).unwrap(), data);
}

#[test]
fn encoder_block_size() {
    let channel = tempfile::tempfile().unwrap();
    for block_size in [0, 10, u32::MAX] {
        assert!(matches!(
            Bz2Encoder::open(&channel, block_size),
            Err(Error::InvalidArgument(_))
        ));
    }
    let params = CompressionParams::default().with_block_size(0);
    assert!(matches!(
        Bz2Encoder::with_params(&channel, &params),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn encoder_header_carries_block_size() {
    let mut channel = tempfile::tempfile().unwrap();
    let mut encoder = Bz2Encoder::open(&channel, 3).unwrap();
    encoder.close().unwrap();

    let compressed = read_back(&mut channel);
    assert_eq!(compressed, hex!("425a683317724538509000000000"));
    let header = StreamHeader::parse(&compressed).unwrap();
    assert_eq!(header.block_size, 3);
    assert!(header.is_empty_stream);
}

#[test]
fn write_region_bounds() {
    let mut channel = tempfile::tempfile().unwrap();
    let mut encoder = Bz2Encoder::open(&channel, 9).unwrap();
    let data = b"0123456789";

    for (offset, len) in [(0, 11), (5, 6), (11, 0), (usize::MAX, 2)] {
        assert!(matches!(
            encoder.write_region(data, offset, len),
            Err(Error::InvalidArgument(_))
        ));
    }
    assert!(!encoder.is_closed());
    encoder.write_region(data, 2, 5).unwrap();
    encoder.write_region(data, 10, 0).unwrap();
    encoder.close().unwrap();

    let compressed = read_back(&mut channel);
    assert_eq!(buffer::decompress(&compressed, false).unwrap(), b"23456");
}

#[test]
fn dropping_encoder_finalizes() {
    let data = repetitive_data(100_000);
    let mut channel = tempfile::tempfile().unwrap();
    {
        let mut encoder = Bz2Encoder::open(&channel, 9).unwrap();
        encoder.write_all(&data).unwrap();
        encoder.flush().unwrap();
    }
    let compressed = read_back(&mut channel);
    assert_eq!(buffer::decompress(&compressed, false).unwrap(), data);
}

#[test]
fn independent_handles_in_parallel() {
    (0..16_u64).into_par_iter().for_each(|seed| {
        let data = random_data(20_000 + seed as usize * 1000, seed);
        let block_size = (seed % 9 + 1) as u32;

        let mut channel = tempfile::tempfile().unwrap();
        let mut encoder = Bz2Encoder::open(&channel, block_size).unwrap();
        encoder.write_all(&data).unwrap();
        encoder.close().unwrap();

        let compressed = read_back(&mut channel);
        let channel = channel_with(&compressed);
        let mut decoder = Bz2Decoder::open(&channel, seed % 2 == 0, None).unwrap();
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    });
}

#[test]
fn handles_move_between_threads() {
    let data = random_data(5000, 9);
    let channel = channel_with(&buffer::compress(&data, 9).unwrap());
    let mut decoder = Bz2Decoder::open(&channel, false, None).unwrap();

    let out = std::thread::spawn(move || {
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    })
    .join()
    .unwrap();
    assert_eq!(out, data);
}
