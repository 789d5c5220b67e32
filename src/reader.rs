use crate::error::{ApuraError, Result};

/// A parsed delimiter-separated file: named string columns, no typing.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Delimiters attempted in priority order when none can be sniffed.
const DELIMITERS: &[u8] = &[b';', b',', b'\t', b'|'];

// Windows-1252 maps 0x80-0x9F to printable characters where Latin-1 has
// control codes; everything else matches Latin-1.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{81}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{8D}', '\u{017D}', '\u{8F}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{9D}', '\u{017E}', '\u{0178}',
];

/// Decode file bytes: UTF-8 (with or without BOM) first, falling back to
/// Windows-1252/Latin-1 for legacy bank exports. Never fails; every byte
/// sequence is representable under the fallback.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes
            .iter()
            .map(|&b| match b {
                0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
                _ => b as char,
            })
            .collect(),
    }
}

/// Collapse runs of whitespace in a header cell (original exports pad
/// headers with stray spaces and line breaks).
fn normalize_header(h: &str) -> String {
    h.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_placeholder(header: &str) -> bool {
    header.is_empty() || header.starts_with("Unnamed") || header.starts_with("Coluna")
}

/// Parse a raw file into a table of string columns.
///
/// If `header_hints` is non-empty, lines are scanned top to bottom for the
/// first one containing every hint fragment (case-insensitive); preamble
/// metadata lines above it are discarded. Without hints, each delimiter is
/// attempted in priority order until one yields more than one column.
///
/// Fails per file with [`ApuraError::Read`]; callers must keep processing
/// the remaining files of a batch.
pub fn read_table(bytes: &[u8], header_hints: &[String]) -> Result<RawTable> {
    let text = decode(bytes);

    let body = if header_hints.is_empty() {
        text.as_str()
    } else {
        find_header_line(&text, header_hints)?
    };

    let mut last_err = String::from("empty file");
    for &delim in DELIMITERS {
        match parse_with(body, delim) {
            Ok(table) if table.headers.len() > 1 => return Ok(table),
            Ok(table) => {
                last_err = format!(
                    "delimiter {:?} produced {} column(s)",
                    delim as char,
                    table.headers.len()
                );
            }
            Err(e) => last_err = e.to_string(),
        }
    }
    Err(ApuraError::Read(format!(
        "no delimiter produced a usable table (last attempt: {last_err})"
    )))
}

/// Locate the first line containing all hint fragments and return the text
/// from that line onward.
fn find_header_line<'a>(text: &'a str, hints: &[String]) -> Result<&'a str> {
    let lowered: Vec<String> = hints.iter().map(|h| h.to_lowercase()).collect();
    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        let lower = line.to_lowercase();
        if lowered.iter().all(|h| lower.contains(h)) {
            return Ok(&text[offset..]);
        }
        offset += line.len();
    }
    Err(ApuraError::Read(format!(
        "header line containing {:?} not found",
        hints.join(", ")
    )))
}

fn parse_with(text: &str, delimiter: u8) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut headers: Vec<String> = Vec::new();
    let mut keep: Vec<usize> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for result in rdr.records() {
        let record = result?;
        if headers.is_empty() {
            for (i, field) in record.iter().enumerate() {
                let h = normalize_header(field);
                if !is_placeholder(&h) {
                    keep.push(i);
                    headers.push(h);
                }
            }
            continue;
        }
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let row: Vec<String> = keep
            .iter()
            .map(|&i| record.get(i).unwrap_or("").trim().to_string())
            .collect();
        rows.push(row);
    }

    if headers.is_empty() {
        return Err(ApuraError::Read("no header row".to_string()));
    }
    Ok(RawTable { headers, rows })
}
