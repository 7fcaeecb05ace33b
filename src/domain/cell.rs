use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The recurrent cell a sequence model delegates to.
///
/// The display form ("RNN", "LSTM", "GRU") is also the variant name
/// substituted into the checkpoint path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Rnn,
    Lstm,
    Gru,
}

impl CellKind {
    /// Number of gate blocks stacked in the fused input/hidden projections
    pub fn gate_count(self) -> usize {
        match self {
            CellKind::Rnn  => 1,
            CellKind::Gru  => 3,
            CellKind::Lstm => 4,
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellKind::Rnn  => "RNN",
            CellKind::Lstm => "LSTM",
            CellKind::Gru  => "GRU",
        };
        f.write_str(name)
    }
}

impl FromStr for CellKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rnn"  => Ok(CellKind::Rnn),
            "lstm" => Ok(CellKind::Lstm),
            "gru"  => Ok(CellKind::Gru),
            other  => Err(format!("unknown cell '{other}', expected rnn, lstm or gru")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("LSTM".parse::<CellKind>().unwrap(), CellKind::Lstm);
        assert_eq!("gru".parse::<CellKind>().unwrap(), CellKind::Gru);
        assert!("transformer".parse::<CellKind>().is_err());
    }

    #[test]
    fn test_display_matches_variant_name() {
        assert_eq!(CellKind::Rnn.to_string(), "RNN");
    }
}
