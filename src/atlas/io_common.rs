// Primitives shared by the readers: locating and fetching the sources.

use std::fs;
use std::path::Path;

use crate::atlas::*;

pub fn is_remote(path: &str) -> bool {
    let p = path.trim().to_lowercase();
    p.starts_with("http://") || p.starts_with("https://")
}

/// Paths are relative to the directory of the configuration file. URLs are kept as they are.
pub fn resolve_path(root: &str, file_path: &str) -> String {
    if is_remote(file_path) || Path::new(file_path).is_absolute() {
        file_path.to_string()
    } else {
        Path::new(root).join(file_path).to_string_lossy().to_string()
    }
}

pub fn read_source_bytes(path: &str) -> BAtlasResult<Vec<u8>> {
    if is_remote(path) {
        debug!("read_source_bytes: fetching {}", path);
        let resp = reqwest::blocking::get(path)
            .and_then(|r| r.error_for_status())
            .context(FetchingUrlSnafu { url: path })?;
        let bytes = resp.bytes().context(FetchingUrlSnafu { url: path })?;
        info!("read_source_bytes: {} bytes from {}", bytes.len(), path);
        Ok(bytes.to_vec())
    } else {
        let bytes = fs::read(path).context(OpeningFileSnafu { path })?;
        Ok(bytes)
    }
}

/// Decodes a text file. Files that are not UTF-8 are read as Latin-1, which
/// is how older INE exports are encoded.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            debug!("decode_text: not UTF-8, reading as Latin-1");
            bytes.iter().map(|b| *b as char).collect()
        }
    }
}

pub fn read_source_text(path: &str) -> BAtlasResult<String> {
    let bytes = read_source_bytes(path)?;
    Ok(decode_text(&bytes))
}

/// Guesses the delimiter of a CSV file from its header line.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let candidates = [b';', b',', b'\t', b'|'];
    let mut best = b',';
    let mut best_count = 0;
    for d in candidates {
        let count = header.bytes().filter(|b| *b == d).count();
        if count > best_count {
            best = d;
            best_count = count;
        }
    }
    best
}

/// Warns about a value cell that is neither a number nor an explicit "no data".
/// Called once per cell, when the file is read.
pub fn check_value(path: &str, lineno: usize, raw: &str) -> bool {
    if is_missing(raw) || parse_value(raw).is_some() {
        return true;
    }
    warn!("{}:{}: could not read {:?} as a number", path, lineno, raw);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(resolve_path("/data", "gasto.csv"), "/data/gasto.csv");
        assert_eq!(resolve_path("/data", "/tmp/gasto.csv"), "/tmp/gasto.csv");
        let url = "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/data/rd_e_gerdtot?format=SDMX-CSV";
        assert_eq!(resolve_path("/data", url), url);
    }

    #[test]
    fn delimiters() {
        assert_eq!(sniff_delimiter("geo;TIME_PERIOD;OBS_VALUE\nES;2023;1,49"), b';');
        assert_eq!(sniff_delimiter("geo,TIME_PERIOD,OBS_VALUE\n"), b',');
        assert_eq!(sniff_delimiter("geo\tTIME_PERIOD"), b'\t');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn malformed_values() {
        assert!(check_value("x.csv", 2, "1 234,5"));
        assert!(check_value("x.csv", 3, ": c"));
        assert!(check_value("x.csv", 4, ""));
        assert!(!check_value("x.csv", 5, "n/a"));
        assert!(!check_value("x.csv", 6, "1,2,3abc"));
    }

    #[test]
    fn latin1_and_bom() {
        assert_eq!(decode_text(b"Arag\xf3n;1,2"), "Aragón;1,2");
        assert_eq!(decode_text("\u{feff}Aragón".as_bytes()), "Aragón");
    }
}
