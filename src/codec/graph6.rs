//! graph6: the upper triangle of the adjacency matrix, column by column.

use super::{BitReader, BitWriter, decode_size, encode_size};
use crate::graph::Graph;

pub(super) fn encode(g: &Graph) -> Vec<u8> {
    let n = g.order();
    let mut out = Vec::with_capacity(8 + (n * n.saturating_sub(1) / 2).div_ceil(6));
    encode_size(n, &mut out);
    let mut bits = BitWriter::new(out);
    for j in 1..n {
        for i in 0..j {
            bits.push(g.has_edge(i, j) || g.has_edge(j, i));
        }
    }
    bits.finish()
}

pub(super) fn decode(bytes: &[u8]) -> Result<Graph, String> {
    let (n, used) = decode_size(bytes)?;
    let body = &bytes[used..];
    let expected = n
        .checked_mul(n.saturating_sub(1))
        .map(|bits| (bits / 2).div_ceil(6))
        .ok_or_else(|| format!("graph6 order {} is too large", n))?;
    if body.len() != expected {
        return Err(format!(
            "graph6 body has {} bytes, expected {} for {} vertices",
            body.len(),
            expected,
            n
        ));
    }
    let mut g = Graph::new(n);
    let mut bits = BitReader::new(body);
    for j in 1..n {
        for i in 0..j {
            match bits.next_bit()? {
                Some(true) => g.add_edge(i, j),
                Some(false) => {}
                None => return Err("graph6 body truncated".to_string()),
            }
        }
    }
    Ok(g)
}
