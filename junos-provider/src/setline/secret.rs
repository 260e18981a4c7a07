//! Junos `$9$` reversible secrets.
//!
//! `display set` prints pre-shared keys and other reversible secrets
//! obfuscated as `$9$...`. Decoding them lets a read reconstruct the
//! plain value a user configured.

const FAMILY: [&str; 4] = [
    "QzF3n6/9CAtpu0O",
    "B1IREhcSyrleKvMW8LXx",
    "7N-dVbwsY2g4oaJZGUDj",
    "iHkq.mPf5T",
];

const ENCODING: [&[u32]; 7] = [
    &[1, 4, 32],
    &[1, 16, 32],
    &[1, 8, 32],
    &[1, 64],
    &[1, 32],
    &[1, 4, 16, 128],
    &[1, 32, 64],
];

const PREFIX: &str = "$9$";

fn alphabet() -> Vec<char> {
    FAMILY.iter().flat_map(|f| f.chars()).collect()
}

/// Number of salt characters following the first one.
fn extra(c: char) -> Option<usize> {
    FAMILY
        .iter()
        .position(|f| f.contains(c))
        .map(|family| 3 - family)
}

/// Decode a `$9$` secret. Values without the prefix are returned unchanged.
pub fn decode_secret(value: &str) -> Result<String, String> {
    let Some(encoded) = value.strip_prefix(PREFIX) else {
        return Ok(value.to_string());
    };

    let alphabet = alphabet();
    let index = |c: char| {
        alphabet
            .iter()
            .position(|a| *a == c)
            .ok_or_else(|| format!("invalid character '{c}' in secret"))
    };

    let mut chars = encoded.chars();
    let first = chars.next().ok_or("empty secret")?;
    let salt = extra(first).ok_or_else(|| format!("invalid character '{first}' in secret"))?;
    for _ in 0..salt {
        chars.next().ok_or("truncated secret")?;
    }

    let rest: Vec<char> = chars.collect();
    let mut prev = index(first)?;
    let mut pos = 0;
    let mut decoded = String::new();

    while pos < rest.len() {
        let weights = ENCODING[decoded.chars().count() % ENCODING.len()];
        let Some(nibble) = rest.get(pos..pos + weights.len()) else {
            return Err("truncated secret".to_string());
        };
        pos += weights.len();

        let mut code: u32 = 0;
        for (c, weight) in nibble.iter().zip(weights.iter()) {
            let cur = index(*c)?;
            let gap = (cur + alphabet.len() - prev) % alphabet.len();
            // A zero gap would underflow to -1; valid secrets never contain one.
            let gap = gap.checked_sub(1).ok_or("invalid secret")? as u32;
            code += gap * weight;
            prev = cur;
        }
        decoded.push(char::from((code % 256) as u8));
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode_secret("$9$LbHX-wg4Z").unwrap(), "lc");
        assert_eq!(decode_secret("$9$QxyznA0EhrvMXEcK8LxsY").unwrap(), "secret");
        assert_eq!(
            decode_secret("$9$7adw2ZUH5Qn4aQn/CB17-VbwYq.f3nCP5SeWxwsP5Qn9pBIcyre").unwrap(),
            "Juniper Networks!"
        );
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(decode_secret("0a1b2c").unwrap(), "0a1b2c");
    }

    #[test]
    fn test_malformed_secrets() {
        assert!(decode_secret("$9$QxyznA0EhrvMXEcK8Lxs").is_err());
        assert!(decode_secret("$9$").is_err());
        assert!(decode_secret("$9$Qxyz!ab").is_err());
    }
}
