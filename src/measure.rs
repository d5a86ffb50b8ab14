use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Size metric used for every budget comparison in the splitter.
///
/// `Tokens` is the deliberately crude `chars / 4 + 1` estimate, not a real
/// tokenizer. Character positions (stride windows, overlap comparison) are
/// always measured in characters regardless of the active metric.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthMetric {
    Chars,
    Tokens,
}

impl LengthMetric {
    pub fn measure(self, text: &str) -> usize {
        let chars = text.chars().count();
        match self {
            LengthMetric::Chars => chars,
            LengthMetric::Tokens => chars / 4 + 1,
        }
    }
}

impl std::fmt::Display for LengthMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthMetric::Chars => write!(f, "chars"),
            LengthMetric::Tokens => write!(f, "tokens"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chars_counts_scalar_values() {
        assert_eq!(LengthMetric::Chars.measure(""), 0);
        assert_eq!(LengthMetric::Chars.measure("abc"), 3);
        assert_eq!(LengthMetric::Chars.measure("héllo"), 5);
    }

    #[test]
    fn tokens_uses_quarter_estimate() {
        assert_eq!(LengthMetric::Tokens.measure(""), 1);
        assert_eq!(LengthMetric::Tokens.measure("abc"), 1);
        assert_eq!(LengthMetric::Tokens.measure("abcd"), 2);
        assert_eq!(LengthMetric::Tokens.measure(&"x".repeat(100)), 26);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&LengthMetric::Chars).unwrap(), "\"chars\"");
        let m: LengthMetric = serde_json::from_str("\"tokens\"").unwrap();
        assert_eq!(m, LengthMetric::Tokens);
    }
}
