use std::cmp::Ordering;
use std::fmt;

/// A dot-separated sequence of numeric segments, e.g. "4.0.5455".
///
/// Ordering compares segments pairwise as numbers; missing trailing segments
/// count as zero, so "1.0" and "1.0.0" are equal.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
    raw: String,
}

impl Version {
    pub fn parse(s: &str) -> Option<Version> {
        let raw = s.trim();
        if raw.is_empty() {
            return None;
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            segments.push(part.parse::<u64>().ok()?);
        }

        Some(Version {
            segments,
            raw: raw.to_string(),
        })
    }

    /// The original string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
