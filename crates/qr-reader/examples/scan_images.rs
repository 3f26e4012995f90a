//! Decode every image passed on the command line, one still image at a time.
//!
//! ```text
//! cargo run -p qr-reader --example scan_images -- ticket.png badge.jpg
//! ```

use std::env;

use qr_reader::{decode_still, DataType};

#[cfg(not(feature = "tracing"))]
use log::{info, warn, LevelFilter};
#[cfg(feature = "tracing")]
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    qr_reader::core::init_with_level(LevelFilter::Info)?;
    #[cfg(feature = "tracing")]
    qr_reader::core::init_tracing(false);

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        warn!("usage: scan_images <image>...");
        return Ok(());
    }

    for path in &paths {
        let img = image::open(path)?.to_luma8();
        let symbols = decode_still(&img, 4)?;
        info!("{path}: {} symbol(s)", symbols.len());
        for symbol in symbols {
            let kind = symbol.data_type().map_or("-", DataType::name);
            match symbol.payload_str() {
                Some(text) if symbol.is_valid() => println!("{path}\t{kind}\t{text}"),
                Some(reason) => println!("{path}\tfailed\t{reason}"),
                None => println!("{path}\t{kind}\t<{} binary bytes>", symbol.payload_len()),
            }
        }
    }
    Ok(())
}
