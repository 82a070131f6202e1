//! digraph6: `&`, the size, then the full adjacency matrix row by row.

use super::{BitReader, BitWriter, decode_size, encode_size};
use crate::graph::Graph;

pub(super) fn encode(g: &Graph) -> Vec<u8> {
    let n = g.order();
    let mut out = Vec::with_capacity(9 + (n * n).div_ceil(6));
    out.push(b'&');
    encode_size(n, &mut out);
    let mut bits = BitWriter::new(out);
    for i in 0..n {
        for j in 0..n {
            bits.push(g.has_edge(i, j));
        }
    }
    bits.finish()
}

/// Decode the part after the `&` prefix.
pub(super) fn decode(bytes: &[u8]) -> Result<Graph, String> {
    let (n, used) = decode_size(bytes)?;
    let body = &bytes[used..];
    let expected = n
        .checked_mul(n)
        .map(|bits| bits.div_ceil(6))
        .ok_or_else(|| format!("digraph6 order {} is too large", n))?;
    if body.len() != expected {
        return Err(format!(
            "digraph6 body has {} bytes, expected {} for {} vertices",
            body.len(),
            expected,
            n
        ));
    }
    let mut g = Graph::new_directed(n);
    let mut bits = BitReader::new(body);
    for i in 0..n {
        for j in 0..n {
            match bits.next_bit()? {
                Some(true) => g.add_arc(i, j),
                Some(false) => {}
                None => return Err("digraph6 body truncated".to_string()),
            }
        }
    }
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_arc() {
        let mut g = Graph::new_directed(2);
        g.add_arc(0, 1);
        // bits 0100 padded -> 010000 = 16
        assert_eq!(encode(&g), b"&AO".to_vec());
        let back = decode(b"AO").unwrap();
        assert!(back.is_directed());
        assert!(back.has_edge(0, 1));
        assert!(!back.has_edge(1, 0));
    }

    #[test]
    fn test_loops_survive() {
        let mut g = Graph::new_directed(3);
        g.add_arc(2, 2);
        g.add_arc(1, 0);
        let encoded = encode(&g);
        let back = decode(&encoded[1..]).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(decode(b"AOO").is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_order_without_panicking() {
        assert!(decode(b"~~~~~~~~").is_err());
    }
}
