// SPDX-License-Identifier: MIT
//! piff-view: print the chunks of a piff container

use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use piff::{Chunk, ChunkSeeker, ChunkSource, ChunkStream};

mod config;
mod render;

use config::{DumpFormat, Input, PayloadAccess, ViewConfig};
use render::{sha256_hex, ChunkView};

#[derive(Parser, Debug)]
#[command(name = "piff-view", about = "Print the chunks of a piff container")]
pub struct Cli {
    /// Container to view; `-` or nothing reads stdin
    path: Option<PathBuf>,

    /// Container to view (same as PATH)
    #[arg(long, conflicts_with = "path")]
    filename: Option<PathBuf>,

    /// Payload dump format [env: PIFF_VIEW_DUMP]
    #[arg(long, value_enum)]
    dump: Option<DumpFormat>,

    /// Dump at most this many octets per chunk [env: PIFF_VIEW_MAX_BYTES]
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Index the container first and print its offset table
    #[arg(long)]
    index: bool,

    /// Print only the chunk at this index
    #[arg(long)]
    chunk: Option<usize>,

    /// Print the SHA-256 of each payload
    #[arg(long)]
    digest: bool,

    /// One JSON object per chunk
    #[arg(long)]
    json: bool,

    /// Log filter [env: PIFF_VIEW_LOG]
    #[arg(long)]
    log: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ViewConfig::from_env().apply_cli(&cli);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    config.validate().map_err(anyhow::Error::msg)?;
    debug!(?config, "configuration loaded");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let count = run(&config, &mut out)?;
    out.flush()?;

    info!(chunks = count, "done");
    Ok(())
}

fn run(config: &ViewConfig, out: &mut impl Write) -> anyhow::Result<usize> {
    match &config.input {
        Input::Path(path) if config.index || config.chunk.is_some() => {
            let mut seeker = ChunkSeeker::open(path)
                .with_context(|| format!("failed to index {}", path.display()))?;
            view_indexed(&mut seeker, config, out)
        }
        Input::Path(path) => {
            let stream = ChunkStream::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            view_stream(stream, config, out)
        }
        Input::Stdin => {
            let stream = ChunkStream::from_reader(io::stdin().lock())
                .context("failed to read container from stdin")?;
            view_stream(stream, config, out)
        }
    }
}

fn view_stream<S: ChunkSource>(
    mut stream: ChunkStream<S>,
    config: &ViewConfig,
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    let mut index = 0;
    while !stream.is_exhausted() {
        // no header while an error is pending; the next read reports it
        let access = match stream.peek_header() {
            Some(header) => config.payload_access(header.payload_len),
            None => PayloadAccess::Full,
        };
        let chunk = match access {
            PayloadAccess::Skip => stream.skip_chunk().map(|header| Chunk {
                header,
                payload: Vec::new(),
            }),
            PayloadAccess::Prefix(count) => stream.read_partial_chunk(count),
            PayloadAccess::Full => stream.read_chunk(),
        }
        .with_context(|| format!("failed to read chunk #{}", index))?;

        print_chunk(index, &chunk, config, out)?;
        index += 1;
    }
    Ok(index)
}

fn view_indexed<R: Read + Seek>(
    seeker: &mut ChunkSeeker<R>,
    config: &ViewConfig,
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    if let Some(index) = config.chunk {
        let chunk = fetch(seeker, index, config)?;
        print_chunk(index, &chunk, config, out)?;
        return Ok(1);
    }

    if !config.json {
        writeln!(out, "chunks: {}", seeker.chunk_count())?;
        for (i, entry) in seeker.index().iter().enumerate() {
            writeln!(
                out,
                "{:>6}  {:>12}  {}  {}",
                i, entry.start_offset, entry.header.type_tag, entry.header.payload_len
            )?;
        }
    }

    let count = seeker.chunk_count();
    for index in 0..count {
        let chunk = fetch(seeker, index, config)?;
        print_chunk(index, &chunk, config, out)?;
    }
    Ok(count)
}

fn fetch<R: Read + Seek>(
    seeker: &mut ChunkSeeker<R>,
    index: usize,
    config: &ViewConfig,
) -> anyhow::Result<Chunk> {
    let header = *seeker.header(index)?;
    let chunk = match config.payload_access(header.payload_len) {
        PayloadAccess::Skip => Ok(Chunk {
            header,
            payload: Vec::new(),
        }),
        PayloadAccess::Prefix(count) => seeker.find_partial_chunk(index, count),
        PayloadAccess::Full => seeker.find_chunk(index),
    };
    chunk.with_context(|| format!("failed to read chunk #{}", index))
}

fn print_chunk(
    index: usize,
    chunk: &Chunk,
    config: &ViewConfig,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut view = ChunkView::new(index, &chunk.header);
    if config.digest {
        view.sha256 = Some(sha256_hex(&chunk.payload));
    }
    if config.dump != DumpFormat::None {
        let shown = match config.max_bytes {
            Some(max) => &chunk.payload[..max.min(chunk.payload.len())],
            None => &chunk.payload[..],
        };
        view.shown = Some(shown);
    }

    if config.json {
        writeln!(out, "{}", view.render_json(config.dump)?)?;
    } else {
        write!(out, "{}", view.render_text(config.dump))?;
    }
    Ok(())
}
