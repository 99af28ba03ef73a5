use std::fs::File;
use std::io::{self, stdout, BufWriter, Read, Write};
use std::path::Path;

use bytesize::ByteSize;
use bz2::read::Bz2Decoder;
use bz2::write::Bz2Encoder;
use bz2::CompressionParams;
use clap::{value_parser, Arg, ArgAction, Command};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("bzip2")
        .arg(Arg::new("input").required(true))
        .arg(
            Arg::new("block-size")
                .short('b')
                .long("block-size")
                .value_parser(value_parser!(u32))
                .default_value("9")
                .conflicts_with("decompress"),
        )
        .arg(
            Arg::new("decompress")
                .short('d')
                .long("decompress")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("small")
                .short('s')
                .long("small")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;
    eprintln!("Bzip2 version: {}", bz2::version());

    let params = CompressionParams::default()
        .with_block_size(*matches.get_one::<u32>("block-size").unwrap())
        .with_small(matches.get_flag("small"));
    let input = matches.get_one::<String>("input").unwrap();

    if matches.get_flag("decompress") {
        decompress(Path::new(input), &params)
    } else {
        compress(Path::new(input), &params)
    }
}

fn compress(input: &Path, params: &CompressionParams) -> anyhow::Result<()> {
    params.validate()?;
    eprintln!(
        "Block size: {}",
        ByteSize(params.block_size_bytes()).to_string_as(true)
    );

    let mut file = File::open(input)?;
    let stdout = stdout();
    let mut encoder = Bz2Encoder::with_params(&stdout, params)?;
    io::copy(&mut file, &mut encoder)?;
    encoder.close()?;
    Ok(())
}

/// Decodes every concatenated member of `input`, handing the read-ahead of
/// one member to the decoder of the next.
fn decompress(input: &Path, params: &CompressionParams) -> anyhow::Result<()> {
    let file = File::open(input)?;
    let mut writer = BufWriter::new(stdout().lock());
    let mut unused = Vec::new();
    let mut members = 0;

    loop {
        let mut decoder = Bz2Decoder::with_params(&file, params, Some(unused.as_slice()))?;
        io::copy(&mut decoder, &mut writer)?;
        unused = decoder.unused_bytes()?;
        decoder.close();
        members += 1;

        if unused.is_empty() {
            // the read-ahead ended exactly at the member boundary
            let mut chunk = vec![0_u8; 8192];
            let n = (&file).read(&mut chunk)?;
            if n == 0 {
                break;
            }
            chunk.truncate(n);
            unused = chunk;
        }
    }
    writer.flush()?;
    eprintln!("Decoded {} member(s)", members);
    Ok(())
}
