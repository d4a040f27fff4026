//! Compression CLI Helpers

use crate::Compression;
use crate::error::Result;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Parse algorithm names as given on the command-line or in configuration.
///
/// Each value may itself be a comma- or whitespace-separated list, so
/// `["brotli", "gzip"]`, `["brotli,gzip"]` and `["brotli gzip"]` are all
/// equivalent. Duplicates collapse. An unknown name fails the whole list.
pub fn parse_list<I, S>(values: I) -> Result<BTreeSet<Compression>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut formats = BTreeSet::new();
    for value in values {
        for name in value.as_ref().split([',', ' ']).filter(|name| !name.trim().is_empty()) {
            formats.insert(Compression::from_str(name)?);
        }
    }
    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case(vec!["brotli"], vec![Compression::Brotli])]
    #[case(vec!["gzip", "brotli"], vec![Compression::Brotli, Compression::Gzip])]
    #[case(vec!["brotli,gzip"], vec![Compression::Brotli, Compression::Gzip])]
    #[case(vec!["brotli gzip"], vec![Compression::Brotli, Compression::Gzip])]
    #[case(vec!["gz", "gzip", "GZIP"], vec![Compression::Gzip])]
    #[case(vec![], vec![])]
    #[case(vec![" , "], vec![])]
    fn test_parse_list(#[case] values: Vec<&str>, #[case] expected: Vec<Compression>) {
        let parsed = parse_list(values).unwrap();
        assert_eq!(parsed.into_iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_parse_list_unsupported() {
        let err = parse_list(["gzip", "zstd"]).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedAlgorithm("zstd".to_string()));
    }
}
