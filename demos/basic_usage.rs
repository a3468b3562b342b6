// SPDX-License-Identifier: MIT
//! Basic usage example for piff containers

use piff::{ChunkSeeker, ChunkStream, ChunkWriter, TypeTag};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Piff Container - Basic Usage ===\n");

    // Step 1: Write a small recording
    println!("1. Writing container...");
    let output_path = PathBuf::from("/tmp/basic_usage.piff");
    let mut writer = ChunkWriter::create(&output_path)?;
    writer.write_chunk_str("meta", br#"{"source":"demo","fps":30}"#)?;
    let frame = TypeTag::new(*b"fram");
    for i in 0..5u8 {
        writer.write_chunk(&frame, &[i; 256])?;
    }
    writer.write_chunk_str("logs", b"recording finished")?;
    println!(
        "   {} chunks, {} bytes -> {}",
        writer.chunks_written(),
        writer.bytes_written(),
        output_path.display()
    );
    writer.close()?;

    // Step 2: Sequential read, inspecting each header before the payload
    println!("\n2. Reading sequentially...");
    let mut stream = ChunkStream::open(&output_path)?;
    while let Some(header) = stream.peek_header().copied() {
        if header.type_tag == frame {
            stream.skip_chunk()?;
            println!("   {} ({} bytes, skipped)", header.type_tag, header.payload_len);
        } else {
            let chunk = stream.read_chunk()?;
            println!(
                "   {} ({} bytes): {}",
                header.type_tag,
                header.payload_len,
                String::from_utf8_lossy(&chunk.payload)
            );
        }
    }

    // Step 3: Random access by index
    println!("\n3. Random access...");
    let mut seeker = ChunkSeeker::open(&output_path)?;
    println!("   Indexed {} chunks", seeker.chunk_count());
    let frames: Vec<usize> = seeker.index().positions_of(&frame).collect();
    println!("   Frames at indices {:?}", frames);
    if let Some(&last) = frames.last() {
        let prefix = seeker.find_partial_chunk(last, 4)?;
        println!("   Last frame starts with {:?}", prefix.payload);
    }

    println!("\n=== Done ===");
    Ok(())
}
