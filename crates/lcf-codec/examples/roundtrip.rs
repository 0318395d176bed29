use lcf_codec::{to_bytes, to_json, LcfFile};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: roundtrip <file.ldb|lmt|lmu|lsd>")?;

    // Read the original
    let original = std::fs::read(&path)?;
    let file = LcfFile::from_bytes(original.clone())?;
    if !file.valid() {
        return Err(format!("{}: {}", path, file.error()).into());
    }
    println!("{}: {} ({} bytes)", path, file.signature(), original.len());
    for (i, root) in file.roots().iter().enumerate() {
        println!("  root {} '{}': {} bytes at {}", i, root.label(), root.len(), root.offset());
    }
    if file.trailing_bytes() > 0 {
        println!("  {} trailing bytes", file.trailing_bytes());
    }

    // Value tree and back
    let json = to_json(&file)?;
    let saved = to_bytes(&json)?;
    let reopened = LcfFile::from_bytes(saved.clone())?;
    let json_again = to_json(&reopened)?;

    println!("\nJSON round trip: {}", if json == json_again { "OK" } else { "MISMATCH" });
    if saved == original {
        println!("Binary round trip: identical");
    } else {
        let first_diff = saved
            .iter()
            .zip(&original)
            .position(|(a, b)| a != b)
            .unwrap_or(saved.len().min(original.len()));
        println!(
            "Binary round trip: {} bytes vs {} original, first difference at {}",
            saved.len(),
            original.len(),
            first_diff
        );
    }

    Ok(())
}
