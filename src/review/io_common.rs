use std::path::Path;

use crate::review::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Splits a `column=value` filter given on the command line.
pub fn parse_filter(filter: &str) -> ReviewResult<(String, String)> {
    match filter.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.trim().to_string()))
        }
        _ => InvalidFilterSnafu { filter }.fail(),
    }
}

/// Cleans up a header cell: strips a byte order mark and surrounding spaces.
pub fn clean_header(s: &str) -> String {
    s.trim_start_matches('\u{feff}').trim().to_string()
}

/// Turns a reviewer name into something safe to put in a file name.
pub fn slug(s: &str) -> String {
    let res: String = s
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if res.is_empty() {
        "anonymous".to_string()
    } else {
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters() {
        assert_eq!(
            parse_filter("dimensao_padrao = Governança").unwrap(),
            ("dimensao_padrao".to_string(), "Governança".to_string())
        );
        assert_eq!(
            parse_filter("ano=").unwrap(),
            ("ano".to_string(), "".to_string())
        );
        assert!(parse_filter("=x").is_err());
        assert!(parse_filter("ano").is_err());
    }

    #[test]
    fn names() {
        assert_eq!(slug(" Ana Souza "), "ana_souza");
        assert_eq!(slug("../x"), "___x");
        assert_eq!(slug(""), "anonymous");
        assert_eq!(simplify_file_name("/tmp/data/catalog.csv"), "catalog.csv");
        assert_eq!(clean_header("\u{feff}numero "), "numero");
    }
}
