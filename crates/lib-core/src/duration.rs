//! Go-style duration strings: `"1h30m0s"`, `"1.5ms"`, `"-2m"`, `"0s"`.
//!
//! This is the on-wire form of the `Duration` value variant, both in JSON
//! output and when casting `String` to `Duration`.

pub const NANOS_PER_MICRO: i64 = 1_000;
pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
pub const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// Parse a duration like `"300ms"`, `"-1.5h"` or `"2h45m"` into nanoseconds.
///
/// A bare `"0"` (with optional sign) is accepted; any other number requires a
/// unit. Out-of-range magnitudes saturate.
pub fn parse(s: &str) -> Result<i64, String> {
    let original = s;
    let mut rest = s;
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix(['-', '+']) {
        negative = rest.starts_with('-');
        rest = stripped;
    }
    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(format!("invalid duration {original:?}"));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(stripped) = rest.strip_prefix('.') {
            let frac_len = stripped
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(stripped.len());
            frac_part = &stripped[..frac_len];
            rest = &stripped[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("invalid duration {original:?}"));
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let scale = unit_nanos(unit)
            .ok_or_else(|| format!("unknown unit {unit:?} in duration {original:?}"))?;

        let int: i128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| format!("invalid duration {original:?}"))?
        };
        total += int * scale as i128;
        if !frac_part.is_empty() {
            let frac: f64 = format!("0.{frac_part}")
                .parse()
                .map_err(|_| format!("invalid duration {original:?}"))?;
            total += (frac * scale as f64) as i128;
        }
    }

    if negative {
        total = -total;
    }
    Ok(total.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
}

fn unit_nanos(unit: &str) -> Option<i64> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Render nanoseconds in the Go style: largest unit hours, sub-second
/// magnitudes with a fractional single unit, zero as `"0s"`.
pub fn format(nanos: i64) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    let magnitude = nanos.unsigned_abs();

    if magnitude < NANOS_PER_SECOND as u64 {
        let (unit, precision) = if magnitude < NANOS_PER_MICRO as u64 {
            ("ns", 0)
        } else if magnitude < NANOS_PER_MILLI as u64 {
            ("\u{b5}s", 3)
        } else {
            ("ms", 6)
        };
        push_with_fraction(&mut out, magnitude, precision);
        out.push_str(unit);
        return out;
    }

    let sub_second = magnitude % NANOS_PER_SECOND as u64;
    let total_seconds = magnitude / NANOS_PER_SECOND as u64;
    let minutes = total_seconds / 60;
    let hours = minutes / 60;
    if hours > 0 {
        out.push_str(&hours.to_string());
        out.push('h');
    }
    if minutes > 0 {
        out.push_str(&(minutes % 60).to_string());
        out.push('m');
    }
    push_with_fraction(&mut out, (total_seconds % 60) * NANOS_PER_SECOND as u64 + sub_second, 9);
    out.push('s');
    out
}

/// Append `value / 10^precision` with its fraction, trailing zeros trimmed.
fn push_with_fraction(out: &mut String, value: u64, precision: u32) {
    let scale = 10u64.pow(precision);
    out.push_str(&(value / scale).to_string());
    if precision == 0 {
        return;
    }
    let mut frac = value % scale;
    if frac == 0 {
        return;
    }
    let mut digits = precision;
    while frac % 10 == 0 {
        frac /= 10;
        digits -= 1;
    }
    out.push('.');
    out.push_str(&format!("{frac:0>width$}", width = digits as usize));
}
