use std::fmt;

use serde::{Serialize, Serializer};

/// One of eight ordered age ranges, shared by estimators and statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBracket {
    Child,
    Teen,
    Twenties,
    Thirties,
    Forties,
    Fifties,
    Sixties,
    SeventyPlus,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 8] = [
        AgeBracket::Child,
        AgeBracket::Teen,
        AgeBracket::Twenties,
        AgeBracket::Thirties,
        AgeBracket::Forties,
        AgeBracket::Fifties,
        AgeBracket::Sixties,
        AgeBracket::SeventyPlus,
    ];

    pub fn from_age(age: u32) -> Self {
        match age {
            0..=12 => AgeBracket::Child,
            13..=19 => AgeBracket::Teen,
            20..=29 => AgeBracket::Twenties,
            30..=39 => AgeBracket::Thirties,
            40..=49 => AgeBracket::Forties,
            50..=59 => AgeBracket::Fifties,
            60..=69 => AgeBracket::Sixties,
            _ => AgeBracket::SeventyPlus,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeBracket::Child => "0-12",
            AgeBracket::Teen => "13-19",
            AgeBracket::Twenties => "20-29",
            AgeBracket::Thirties => "30-39",
            AgeBracket::Forties => "40-49",
            AgeBracket::Fifties => "50-59",
            AgeBracket::Sixties => "60-69",
            AgeBracket::SeventyPlus => "70+",
        }
    }

    /// Age reported when a classifier picks this bracket.
    pub fn representative_age(self) -> u32 {
        match self {
            AgeBracket::Child => 5,
            AgeBracket::Teen => 15,
            AgeBracket::Twenties => 25,
            AgeBracket::Thirties => 35,
            AgeBracket::Forties => 45,
            AgeBracket::Fifties => 55,
            AgeBracket::Sixties => 65,
            AgeBracket::SeventyPlus => 75,
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AgeBracket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0-12")]
    #[case(12, "0-12")]
    #[case(13, "13-19")]
    #[case(19, "13-19")]
    #[case(25, "20-29")]
    #[case(39, "30-39")]
    #[case(40, "40-49")]
    #[case(59, "50-59")]
    #[case(69, "60-69")]
    #[case(70, "70+")]
    #[case(104, "70+")]
    fn test_from_age_label(#[case] age: u32, #[case] expected: &str) {
        assert_eq!(AgeBracket::from_age(age).label(), expected);
    }

    #[test]
    fn test_representative_age_falls_in_own_bracket() {
        for bracket in AgeBracket::ALL {
            assert_eq!(AgeBracket::from_age(bracket.representative_age()), bracket);
        }
    }

    #[test]
    fn test_representative_age_table() {
        let ages: Vec<u32> = AgeBracket::ALL.iter().map(|b| b.representative_age()).collect();
        assert_eq!(ages, vec![5, 15, 25, 35, 45, 55, 65, 75]);
    }

    #[test]
    fn test_all_is_ordered() {
        assert!(AgeBracket::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_serializes_as_label() {
        assert_eq!(serde_json::to_string(&AgeBracket::SeventyPlus).unwrap(), "\"70+\"");
    }
}
