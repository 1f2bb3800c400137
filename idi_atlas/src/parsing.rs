// Primitives for comparing names and reading numbers out of dataset cells.

use log::debug;

/// Normalizes a name for comparison: lowercase, diacritics removed, hyphens
/// turned into spaces, whitespace trimmed and collapsed.
///
/// ```
/// use idi_atlas::normalize_name;
/// assert_eq!(normalize_name("  Castilla-La Mancha "), "castilla la mancha");
/// assert_eq!(normalize_name("Aragón"), normalize_name("ARAGON"));
/// ```
pub fn normalize_name(s: &str) -> String {
    let mut folded = String::with_capacity(s.len());
    for c in s.chars().flat_map(|c| c.to_lowercase()) {
        match c {
            'æ' => folded.push_str("ae"),
            'œ' => folded.push_str("oe"),
            'ß' => folded.push_str("ss"),
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => folded.push('a'),
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => folded.push('e'),
            'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => folded.push('i'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => folded.push('o'),
            'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => folded.push('u'),
            'ý' | 'ÿ' | 'ŷ' => folded.push('y'),
            'ñ' | 'ń' | 'ņ' | 'ň' => folded.push('n'),
            'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => folded.push('c'),
            'ś' | 'ŝ' | 'ş' | 'ș' | 'š' => folded.push('s'),
            'ź' | 'ż' | 'ž' => folded.push('z'),
            'ð' | 'ď' | 'đ' => folded.push('d'),
            'ł' | 'ĺ' | 'ļ' | 'ľ' | 'ŀ' => folded.push('l'),
            'ŕ' | 'ř' => folded.push('r'),
            'ť' | 'ţ' | 'ț' | 'þ' => folded.push('t'),
            'ğ' | 'ĝ' | 'ġ' | 'ģ' => folded.push('g'),
            // Catalan middle dot (Il·les), apostrophes
            '·' | '\'' | '’' => {}
            '-' | '–' | '—' | '_' | '/' => folded.push(' '),
            c => folded.push(c),
        }
    }
    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Turns the inverted form used by the INE ("Madrid, Comunidad de",
/// "Rioja, La") back into the natural order.
///
/// Names without exactly one comma are returned unchanged.
pub fn uninvert_name(s: &str) -> String {
    let parts: Vec<&str> = s.split(',').collect();
    match parts.as_slice() {
        [head, tail] if !head.trim().is_empty() && !tail.trim().is_empty() => {
            format!("{} {}", tail.trim(), head.trim())
        }
        _ => s.trim().to_string(),
    }
}

/// Parses the value of a dataset cell.
///
/// Returns `None` ("no data") for empty cells, the Eurostat `:` placeholder
/// and anything that is not a finite number. Both `,` and `.` are accepted as
/// decimal separator; when both appear, the last one is the decimal separator
/// and the other one groups thousands. A lone comma is always a decimal
/// separator.
///
/// ```
/// use idi_atlas::parse_value;
/// assert_eq!(parse_value("1,85"), Some(1.85));
/// assert_eq!(parse_value("1.234,5"), Some(1234.5));
/// assert_eq!(parse_value("0"), Some(0.0));
/// assert_eq!(parse_value(""), None);
/// ```
pub fn parse_value(raw: &str) -> Option<f64> {
    if is_missing(raw) {
        debug!("parse_value: no data in {:?}", raw);
        return None;
    }
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    // Eurostat may glue the flag to the value ("1.85 p").
    while tokens.len() > 1 && tokens.last().map_or(false, |t| is_flag(t)) {
        tokens.pop();
    }
    // What is left are digit groups ("1 234,5", "12\u{a0}345").
    let s: String = tokens.concat();
    let cleaned: String = match (s.rfind(','), s.rfind('.')) {
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() > 1 => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        (None, Some(_)) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s,
    };
    match cleaned.parse::<f64>() {
        Ok(x) if x.is_finite() => Some(x),
        _ => {
            debug!("parse_value: could not read {:?} as a number", raw);
            None
        }
    }
}

fn is_flag(token: &str) -> bool {
    token.chars().all(|c| c.is_alphabetic())
}

/// True for cells that explicitly hold no data: blank, `:` (with or without
/// a flag), `-` and `..`.
///
/// A cell that is neither missing nor a number is malformed.
pub fn is_missing(raw: &str) -> bool {
    match raw.split_whitespace().next() {
        None => true,
        Some(s) => s == ":" || s == "-" || s == "..",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_accents_and_case() {
        assert_eq!(normalize_name("Andalucía"), "andalucia");
        assert_eq!(normalize_name("PAÍS VASCO"), "pais vasco");
        assert_eq!(normalize_name("Illes  Balears"), "illes balears");
        assert_eq!(normalize_name("Il·les Balears"), "illes balears");
        assert_eq!(normalize_name("Türkiye"), "turkiye");
        assert_eq!(normalize_name("Castilla - La Mancha"), "castilla la mancha");
    }

    #[test]
    fn uninvert_ine_names() {
        assert_eq!(uninvert_name("Madrid, Comunidad de"), "Comunidad de Madrid");
        assert_eq!(uninvert_name("Rioja, La"), "La Rioja");
        assert_eq!(uninvert_name("Galicia"), "Galicia");
        assert_eq!(uninvert_name("a, b, c"), "a, b, c");
    }

    #[test]
    fn parse_decimal_separators() {
        assert_eq!(parse_value("1.85"), Some(1.85));
        assert_eq!(parse_value(" 1,85 "), Some(1.85));
        assert_eq!(parse_value("1,234.5"), Some(1234.5));
        assert_eq!(parse_value("1.234.567,25"), Some(1234567.25));
        assert_eq!(parse_value("-0,5"), Some(-0.5));
        assert_eq!(parse_value("0,125"), Some(0.125));
        assert_eq!(parse_value("1.85 p"), Some(1.85));
        assert_eq!(parse_value("1.234.567"), Some(1234567.0));
        // Digit groups separated by spaces keep all their digits.
        assert_eq!(parse_value("1 234,5"), Some(1234.5));
        assert_eq!(parse_value("12\u{a0}345"), Some(12345.0));
        assert_eq!(parse_value("1 234 567 e"), Some(1234567.0));
        assert_eq!(parse_value("12\u{a0}345,5 bp"), Some(12345.5));
        assert_eq!(parse_value("12 x5"), None);
    }

    #[test]
    fn parse_missing_is_not_zero() {
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("   "), None);
        assert_eq!(parse_value(":"), None);
        assert_eq!(parse_value(": c"), None);
        assert_eq!(parse_value("n/a"), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value("0"), Some(0.0));
        assert!(is_missing(": c"));
        assert!(is_missing(" "));
        assert!(!is_missing("n/a"));
        assert_eq!(parse_value("0,0"), Some(0.0));
    }
}
