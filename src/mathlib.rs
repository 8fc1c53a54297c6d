//! Numeric literal parsing and constant folding.
//!
//! The simplifier and the checkers exchange numbers as lexeme strings, so the
//! functions here are string-in/string-out: parse a C literal in any radix
//! (decimal, octal, hex, binary) with integer suffixes, fold a binary
//! operation, and render the result back in decimal. Operations that have no
//! defined result (division by zero, unknown operator) return `None` and the
//! caller leaves the tokens alone.

/// True when the lexeme is an integer literal (any radix, optional suffix).
pub fn is_int(s: &str) -> bool {
    parse_int(s).is_some()
}

/// True when the lexeme parses as a floating-point literal but not an
/// integer one.
pub fn is_float(s: &str) -> bool {
    !is_int(s) && parse_float(s).is_some()
}

/// Parse a C integer literal: `123`, `0x1f`, `017`, `0b101`, with any
/// combination of `u`/`U`/`l`/`L` suffixes.
pub fn parse_int(s: &str) -> Option<i64> {
    let body = strip_int_suffix(s)?;
    if body.is_empty() {
        return None;
    }
    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (bin, 2)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };
    if digits.is_empty() {
        return None;
    }
    i64::from_str_radix(digits, radix).ok()
}

/// Parse a floating-point literal, accepting a trailing `f`/`F`/`l`/`L`.
pub fn parse_float(s: &str) -> Option<f64> {
    let body = s
        .strip_suffix(['f', 'F', 'l', 'L'])
        .unwrap_or(s);
    if body.is_empty() || !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    body.parse::<f64>().ok()
}

/// Strip integer suffixes; `None` when the remaining body cannot be an
/// integer literal at all.
fn strip_int_suffix(s: &str) -> Option<&str> {
    let trimmed = s.trim_end_matches(['u', 'U', 'l', 'L']);
    if trimmed.is_empty() || s.len() - trimmed.len() > 3 {
        return None;
    }
    Some(trimmed)
}

/// Whether the literal carries an unsigned suffix.
pub fn has_unsigned_suffix(s: &str) -> bool {
    s.trim_end_matches(['l', 'L']).ends_with(['u', 'U'])
}

/// Whether the literal carries a long suffix.
pub fn has_long_suffix(s: &str) -> bool {
    s.trim_end_matches(['u', 'U']).ends_with(['l', 'L'])
}

/// Fold `lhs op rhs` over two integer values. `None` when the operation is
/// undefined (division or remainder by zero, shift out of range).
pub fn calculate_int(lhs: i64, rhs: i64, op: &str) -> Option<i64> {
    match op {
        "+" => Some(lhs.wrapping_add(rhs)),
        "-" => Some(lhs.wrapping_sub(rhs)),
        "*" => Some(lhs.wrapping_mul(rhs)),
        "/" if rhs != 0 => Some(lhs.wrapping_div(rhs)),
        "%" if rhs != 0 => Some(lhs.wrapping_rem(rhs)),
        "<<" if (0..64).contains(&rhs) => Some(lhs.wrapping_shl(rhs as u32)),
        ">>" if (0..64).contains(&rhs) => Some(lhs.wrapping_shr(rhs as u32)),
        "&" => Some(lhs & rhs),
        "|" => Some(lhs | rhs),
        "^" => Some(lhs ^ rhs),
        "<" => Some(i64::from(lhs < rhs)),
        "<=" => Some(i64::from(lhs <= rhs)),
        ">" => Some(i64::from(lhs > rhs)),
        ">=" => Some(i64::from(lhs >= rhs)),
        "==" => Some(i64::from(lhs == rhs)),
        "!=" => Some(i64::from(lhs != rhs)),
        "&&" => Some(i64::from(lhs != 0 && rhs != 0)),
        "||" => Some(i64::from(lhs != 0 || rhs != 0)),
        _ => None,
    }
}

/// Fold two literal lexemes with `op`, rendering the result as a decimal
/// lexeme. Integer folding is used when both sides are integers; otherwise
/// both are widened to double. Comparison results are `"0"`/`"1"`.
pub fn calculate(lhs: &str, rhs: &str, op: &str) -> Option<String> {
    if let (Some(a), Some(b)) = (parse_int(lhs), parse_int(rhs)) {
        return calculate_int(a, b, op).map(|v| v.to_string());
    }
    let a = parse_float(lhs).or_else(|| parse_int(lhs).map(|v| v as f64))?;
    let b = parse_float(rhs).or_else(|| parse_int(rhs).map(|v| v as f64))?;
    let v = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b != 0.0 => a / b,
        "<" => return Some(i64::from(a < b).to_string()),
        "<=" => return Some(i64::from(a <= b).to_string()),
        ">" => return Some(i64::from(a > b).to_string()),
        ">=" => return Some(i64::from(a >= b).to_string()),
        "==" => return Some(i64::from(a == b).to_string()),
        "!=" => return Some(i64::from(a != b).to_string()),
        _ => return None,
    };
    // Render whole results without a trailing ".0" so folded floats can feed
    // into integer contexts like array sizes.
    if v.fract() == 0.0 && v.abs() < 1e15 {
        Some(format!("{}", v as i64))
    } else {
        Some(v.to_string())
    }
}

/// Compare two numeric lexemes, `None` when either fails to parse.
pub fn compare(lhs: &str, rhs: &str) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (parse_int(lhs), parse_int(rhs)) {
        return Some(a.cmp(&b));
    }
    let a = parse_float(lhs).or_else(|| parse_int(lhs).map(|v| v as f64))?;
    let b = parse_float(rhs).or_else(|| parse_int(rhs).map(|v| v as f64))?;
    a.partial_cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_radix() {
        assert_eq!(parse_int("123"), Some(123));
        assert_eq!(parse_int("0x1f"), Some(31));
        assert_eq!(parse_int("0X1F"), Some(31));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0"), Some(0));
    }

    #[test]
    fn parses_suffixes() {
        assert_eq!(parse_int("10u"), Some(10));
        assert_eq!(parse_int("10UL"), Some(10));
        assert_eq!(parse_int("0x10uLL"), Some(16));
        assert!(has_unsigned_suffix("10u"));
        assert!(has_long_suffix("10ul"));
        assert!(!has_unsigned_suffix("10l"));
    }

    #[test]
    fn rejects_non_numbers() {
        assert!(!is_int("abc"));
        assert!(!is_int(""));
        assert!(!is_int("0x"));
        assert!(!is_int("12.5"));
        assert!(is_float("12.5"));
        assert!(is_float("1e3"));
        assert!(!is_float("e3"));
    }

    #[test]
    fn integer_folding() {
        assert_eq!(calculate("2", "3", "+").as_deref(), Some("5"));
        assert_eq!(calculate("7", "2", "/").as_deref(), Some("3"));
        assert_eq!(calculate("7", "2", "%").as_deref(), Some("1"));
        assert_eq!(calculate("1", "3", "<<").as_deref(), Some("8"));
        assert_eq!(calculate("0xff", "8", ">>").as_deref(), Some("0"));
        assert_eq!(calculate("0xf0", "0x0f", "|").as_deref(), Some("255"));
        assert_eq!(calculate("5", "3", "&").as_deref(), Some("1"));
        assert_eq!(calculate("5", "3", "^").as_deref(), Some("6"));
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        assert_eq!(calculate("1", "0", "/"), None);
        assert_eq!(calculate("1", "0", "%"), None);
    }

    #[test]
    fn shift_out_of_range_is_not_folded() {
        assert_eq!(calculate("1", "64", "<<"), None);
        assert_eq!(calculate("1", "-1", ">>"), None);
    }

    #[test]
    fn float_folding_renders_whole_results_as_ints() {
        assert_eq!(calculate("2.5", "2", "*").as_deref(), Some("5"));
        assert_eq!(calculate("1.5", "2", "*").as_deref(), Some("3"));
        assert_eq!(calculate("1.25", "2", "+").as_deref(), Some("3.25"));
    }

    #[test]
    fn comparisons() {
        assert_eq!(calculate("2", "3", "<").as_deref(), Some("1"));
        assert_eq!(calculate("3", "3", "!=").as_deref(), Some("0"));
        assert_eq!(compare("0x10", "16"), Some(std::cmp::Ordering::Equal));
    }
}
