//! Disc sheet formats

pub mod cue;
pub mod gdi;

use std::path::PathBuf;

/// Location of a data track inside its backing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTrack {
    pub path: PathBuf,
    /// Byte offset of the track's first sector
    pub offset: u64,
    pub size: u64,
    pub sector_size: u32,
}

/// Split a sheet line into tokens; double quotes group words
pub(crate) fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"FILE "Game (Disc 1).bin" BINARY"#),
            vec!["FILE", "Game (Disc 1).bin", "BINARY"]
        );
        assert_eq!(tokenize("  INDEX 01   00:02:00 "), vec!["INDEX", "01", "00:02:00"]);
        assert_eq!(tokenize(r#"FILE "" BINARY"#), vec!["FILE", "", "BINARY"]);
        assert!(tokenize("   ").is_empty());
    }
}
