use crate::error::{Error, Result};

/// Parses bytes written as hex pairs. Whitespace, `:` and `,` between pairs
/// are ignored, as is a leading `0x`.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b',')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(Error::InvalidHex(format!(
            "odd number of digits ({})",
            digits.len()
        )));
    }

    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = nibble(pair[0])?;
            let lo = nibble(pair[1])?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn nibble(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(Error::InvalidHex(format!("unexpected character {:?}", digit as char))),
    }
}
