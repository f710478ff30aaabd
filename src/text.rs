//! Text utilities shared by the filter compiler and column search

/// Escape regex metacharacters in a phrase, translating the `*` wildcard to
/// "any characters". Everything else matches literally.
pub fn escape_regex_except_star(phrase: &str) -> String {
    let mut pattern = String::with_capacity(phrase.len() + 8);
    for ch in phrase.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            // regex metacharacters, escaped to match literally
            '.' | '+' | '?' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                pattern.push('\\');
                pattern.push(ch);
            }
            _ => pattern.push(ch),
        }
    }
    pattern
}

/// Convert a raw phrase for display: literal newlines become the two
/// characters `\n` so filter chips stay on one line.
pub fn escape_newlines(value: &str) -> String {
    value.replace('\n', "\\n")
}

/// Inverse of [`escape_newlines`], used before matching against cell values.
pub fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}

/// Format a number with thousands separators for filter display values,
/// e.g. `1000000` -> `"1,000,000"`. Fractional digits are kept as-is.
pub fn format_thousands(value: f64) -> String {
    let raw = if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    };

    let (number, fraction) = match raw.split_once('.') {
        Some((int, frac)) => (int.to_string(), Some(frac.to_string())),
        None => (raw, None),
    };
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
