//! Dual-column hex dump of the composed vs. current boot sector.

/// Prints both sectors side by side, 8 bytes per column, with a `*`
/// marking rows that differ.
pub fn dump_side_by_side(new: &[u8], current: &[u8]) {
    println!("          Rebuild Boot sector       Boot sector");
    for (i, (n, c)) in new.chunks(8).zip(current.chunks(8)).enumerate() {
        let marker = if n == c { ' ' } else { '*' };
        println!("{:04x}  {}  {} {}", i * 8, hex_row(n), hex_row(c), marker);
    }
    println!();
}

fn hex_row(chunk: &[u8]) -> String {
    let mut out = String::with_capacity(chunk.len() * 3);
    for (j, byte) in chunk.iter().enumerate() {
        if j > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
