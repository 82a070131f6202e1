//! sparse6: `:`, the size, then an edge list as (b, x) pairs.
//!
//! Each pair is one bit `b` followed by `k` bits of `x`, where `k` is the
//! number of bits in `n - 1`. The decoder keeps a current vertex `v`:
//! `b = 1` increments it, `x > v` jumps to `x`, otherwise `{x, v}` is an edge.

use super::{BitReader, BitWriter, decode_size, encode_size};
use crate::graph::Graph;

fn width_for(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

pub(super) fn encode(g: &Graph) -> Vec<u8> {
    let n = g.order();
    let k = width_for(n);
    let mut out = vec![b':'];
    encode_size(n, &mut out);
    let mut bits = BitWriter::new(out);
    let mut last_v = 0usize;

    for v in 0..n {
        for u in 0..=v {
            if !(g.has_edge(u, v) || g.has_edge(v, u)) {
                continue;
            }
            if v == last_v {
                bits.push(false);
            } else {
                bits.push(true);
                if v > last_v + 1 {
                    bits.push_value(v, k);
                    bits.push(false);
                }
                last_v = v;
            }
            bits.push_value(u, k);
        }
    }

    let free = bits.free_in_byte();
    if free > 0 {
        // A run of 1s would read as a jump to n-1 (or past it). When n is a
        // power of two and the last vertex written is n-2, that jump would
        // instead decode as a loop on n-1, so a 0 bit goes first.
        if free as u32 > k && n > 1 && last_v == n - 2 && n == 1 << k {
            bits.push(false);
        }
        while bits.free_in_byte() > 0 {
            bits.push(true);
        }
    }
    bits.finish()
}

/// Decode the part after the `:` prefix.
pub(super) fn decode(bytes: &[u8]) -> Result<Graph, String> {
    let (n, used) = decode_size(bytes)?;
    let k = width_for(n);
    let mut g = Graph::new(n);
    let mut bits = BitReader::new(&bytes[used..]);
    let mut v = 0usize;

    loop {
        let Some(b) = bits.next_bit()? else { break };
        let Some(x) = bits.next_value(k)? else { break };
        if b {
            v += 1;
        }
        if v >= n {
            break;
        }
        if x > v {
            v = x;
        } else {
            g.add_edge(x, v);
        }
    }
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(g: &Graph) -> String {
        String::from_utf8(encode(g)).unwrap()
    }

    fn round_trip(g: &Graph) -> Graph {
        let encoded = encode(g);
        decode(&encoded[1..]).unwrap()
    }

    #[test]
    fn test_width() {
        assert_eq!(width_for(1), 0);
        assert_eq!(width_for(2), 1);
        assert_eq!(width_for(4), 2);
        assert_eq!(width_for(5), 3);
    }

    #[test]
    fn test_published_example() {
        // The example from the format description: n=7,
        // edges 0-1 0-2 1-2 5-6.
        let g = decode(b"Fa@x^").unwrap();
        assert_eq!(g.order(), 7);
        assert!(g.has_edge(0, 1));
        assert!(g.has_edge(0, 2));
        assert!(g.has_edge(1, 2));
        assert!(g.has_edge(5, 6));
        assert_eq!(g.edge_count(), 4);

        let mut h = Graph::new(7);
        h.add_edge(0, 1);
        h.add_edge(0, 2);
        h.add_edge(1, 2);
        h.add_edge(5, 6);
        assert_eq!(text(&h), ":Fa@x^");
    }

    #[test]
    fn test_loops_survive() {
        let mut g = Graph::new(5);
        g.add_edge(0, 0);
        g.add_edge(3, 4);
        g.add_edge(4, 4);
        assert_eq!(round_trip(&g), g);
    }

    #[test]
    fn test_padding_does_not_add_loop() {
        // n = 4 is a power of two, the last edge ends at vertex 2 = n-2 and
        // three bits are left over in the final byte
        let mut g = Graph::new(4);
        g.add_edge(0, 0);
        g.add_edge(0, 2);
        let back = round_trip(&g);
        assert_eq!(back, g);
        assert_eq!(back.loop_count(), 1);
        assert!(!back.has_edge(3, 3));
    }

    #[test]
    fn test_empty_graphs() {
        assert_eq!(round_trip(&Graph::new(0)).order(), 0);
        assert_eq!(round_trip(&Graph::new(1)).order(), 1);
        assert_eq!(round_trip(&Graph::new(9)).edge_count(), 0);
    }
}
