use crate::error::{GhostlinkError, Result};

fn bits_per_symbol(order: usize) -> Result<usize> {
    match order {
        4 => Ok(2),
        8 => Ok(3),
        other => Err(GhostlinkError::Configuration(format!(
            "symbol order must be 4 or 8, got {}",
            other
        ))),
    }
}

/// Pack bits into M-ary symbols, k = log2(order) bits each, MSB-first.
/// The tail is zero-padded to a whole symbol.
pub fn bits_to_symbols(bits: &[u8], order: usize) -> Result<Vec<u8>> {
    let k = bits_per_symbol(order)?;
    Ok(bits
        .chunks(k)
        .map(|chunk| (0..k).fold(0u8, |acc, i| (acc << 1) | chunk.get(i).copied().unwrap_or(0)))
        .collect())
}

/// Expand each symbol back into k bits, MSB-first
pub fn symbols_to_bits(symbols: &[u8], order: usize) -> Result<Vec<u8>> {
    let k = bits_per_symbol(order)?;
    let mut bits = Vec::with_capacity(symbols.len() * k);
    for &symbol in symbols {
        for shift in (0..k).rev() {
            bits.push((symbol >> shift) & 1);
        }
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order8_with_padding() {
        // 1011 -> 101 100
        assert_eq!(bits_to_symbols(&[1, 0, 1, 1], 8).unwrap(), vec![5, 4]);
    }

    #[test]
    fn test_order4_with_padding() {
        // 10111 -> 10 11 10
        assert_eq!(bits_to_symbols(&[1, 0, 1, 1, 1], 4).unwrap(), vec![2, 3, 2]);
    }

    #[test]
    fn test_symbols_stay_in_range() {
        let bits: Vec<u8> = (0..90).map(|i| (i % 3 == 0) as u8).collect();
        for order in [4, 8] {
            let symbols = bits_to_symbols(&bits, order).unwrap();
            assert!(symbols.iter().all(|&s| (s as usize) < order));
        }
    }

    #[test]
    fn test_symbols_to_bits_inverse() {
        let bits = vec![1, 1, 0, 0, 1, 0, 1, 1, 1];
        for order in [4, 8] {
            let symbols = bits_to_symbols(&bits, order).unwrap();
            let restored = symbols_to_bits(&symbols, order).unwrap();
            assert_eq!(restored[..bits.len()], bits[..]);
            assert!(restored[bits.len()..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_invalid_order() {
        assert!(bits_to_symbols(&[1, 0], 16).is_err());
        assert!(symbols_to_bits(&[1], 2).is_err());
    }
}
