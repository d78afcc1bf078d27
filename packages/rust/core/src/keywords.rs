//! Optional seed-keyword file.
//!
//! Plain text, one keyword per line. Each line is trimmed and used whole;
//! blank lines are skipped. A missing file yields an empty list.

use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use shopscribe_shared::{Result, ShopscribeError};

/// Seed keywords available to the freshness tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedKeywords(Vec<String>);

impl SeedKeywords {
    pub fn new(keywords: Vec<String>) -> Self {
        Self(keywords)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no seed keyword file");
                return Ok(Self::default());
            }
            Err(e) => return Err(ShopscribeError::io(path, e)),
        };
        let keywords = Self::parse(&content);
        debug!(?path, count = keywords.len(), "loaded seed keywords");
        Ok(keywords)
    }

    pub fn parse(content: &str) -> Self {
        let keywords = content
            .lines()
            .map(str::trim)
            .filter(|kw| !kw.is_empty())
            .map(str::to_string)
            .collect();
        Self(keywords)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.0.choose(rng).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let keywords = SeedKeywords::load(&dir.path().join("keywords.csv")).unwrap();
        assert!(keywords.is_empty());
        assert!(keywords.choose(&mut StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn loads_whole_trimmed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#1 gift ideas").unwrap();
        writeln!(file, "hats, scarves").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "  streetwear  ").unwrap();

        let keywords = SeedKeywords::load(file.path()).unwrap();
        assert_eq!(
            keywords,
            SeedKeywords::new(vec![
                "#1 gift ideas".into(),
                "hats, scarves".into(),
                "streetwear".into()
            ])
        );
    }

    #[test]
    fn choose_returns_a_member() {
        let keywords = SeedKeywords::parse("a\nb\nc\n");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let kw = keywords.choose(&mut rng).unwrap();
            assert!(["a", "b", "c"].contains(&kw));
        }
    }
}
