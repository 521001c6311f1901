/// A decoded notification payload. A `NaN` value means the payload was not numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub peripheral_id: String,
    pub value: f64,
}

impl Reading {
    pub fn new(peripheral_id: impl Into<String>, raw: &[u8]) -> Self {
        Reading {
            peripheral_id: peripheral_id.into(),
            value: decode(raw),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.value.is_finite()
    }
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')
}

/// Decodes a temperature payload. The peripheral sends the value as decimal text, e.g. `b"21.5"`.
///
/// Surrounding whitespace and NUL padding are ignored. Anything that is not a finite decimal
/// number decodes to `f64::NAN`.
pub fn decode(raw: &[u8]) -> f64 {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');

    // rejects the "inf" and "NaN" spellings that f64::from_str accepts
    if text.is_empty() || !text.chars().all(is_numeric_char) {
        return f64::NAN;
    }

    text.parse::<f64>().unwrap_or(f64::NAN)
}
