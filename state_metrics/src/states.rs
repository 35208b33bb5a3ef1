// The fixed set of jurisdictions accepted as join keys.

use std::fmt::Display;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum JurisdictionKind {
    State,
    /// The District of Columbia.
    District,
    Territory,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Jurisdiction {
    pub code: &'static str,
    pub fips: u8,
    pub name: &'static str,
    pub kind: JurisdictionKind,
}

const fn state(code: &'static str, fips: u8, name: &'static str) -> Jurisdiction {
    Jurisdiction {
        code,
        fips,
        name,
        kind: JurisdictionKind::State,
    }
}

const fn territory(code: &'static str, fips: u8, name: &'static str) -> Jurisdiction {
    Jurisdiction {
        code,
        fips,
        name,
        kind: JurisdictionKind::Territory,
    }
}

/// All the known jurisdictions, sorted by code.
pub const JURISDICTIONS: [Jurisdiction; 56] = [
    state("AK", 2, "Alaska"),
    state("AL", 1, "Alabama"),
    state("AR", 5, "Arkansas"),
    territory("AS", 60, "American Samoa"),
    state("AZ", 4, "Arizona"),
    state("CA", 6, "California"),
    state("CO", 8, "Colorado"),
    state("CT", 9, "Connecticut"),
    Jurisdiction {
        code: "DC",
        fips: 11,
        name: "District of Columbia",
        kind: JurisdictionKind::District,
    },
    state("DE", 10, "Delaware"),
    state("FL", 12, "Florida"),
    state("GA", 13, "Georgia"),
    territory("GU", 66, "Guam"),
    state("HI", 15, "Hawaii"),
    state("IA", 19, "Iowa"),
    state("ID", 16, "Idaho"),
    state("IL", 17, "Illinois"),
    state("IN", 18, "Indiana"),
    state("KS", 20, "Kansas"),
    state("KY", 21, "Kentucky"),
    state("LA", 22, "Louisiana"),
    state("MA", 25, "Massachusetts"),
    state("MD", 24, "Maryland"),
    state("ME", 23, "Maine"),
    state("MI", 26, "Michigan"),
    state("MN", 27, "Minnesota"),
    state("MO", 29, "Missouri"),
    territory("MP", 69, "Northern Mariana Islands"),
    state("MS", 28, "Mississippi"),
    state("MT", 30, "Montana"),
    state("NC", 37, "North Carolina"),
    state("ND", 38, "North Dakota"),
    state("NE", 31, "Nebraska"),
    state("NH", 33, "New Hampshire"),
    state("NJ", 34, "New Jersey"),
    state("NM", 35, "New Mexico"),
    state("NV", 32, "Nevada"),
    state("NY", 36, "New York"),
    state("OH", 39, "Ohio"),
    state("OK", 40, "Oklahoma"),
    state("OR", 41, "Oregon"),
    state("PA", 42, "Pennsylvania"),
    territory("PR", 72, "Puerto Rico"),
    state("RI", 44, "Rhode Island"),
    state("SC", 45, "South Carolina"),
    state("SD", 46, "South Dakota"),
    state("TN", 47, "Tennessee"),
    state("TX", 48, "Texas"),
    state("UT", 49, "Utah"),
    state("VA", 51, "Virginia"),
    territory("VI", 78, "U.S. Virgin Islands"),
    state("VT", 50, "Vermont"),
    state("WA", 53, "Washington"),
    state("WI", 55, "Wisconsin"),
    state("WV", 54, "West Virginia"),
    state("WY", 56, "Wyoming"),
];

/// A validated state identifier.
///
/// Values can only be obtained through [`StateCode::parse`] or
/// [`StateCode::all`], so every `StateCode` refers to a known jurisdiction.
/// The ordering is the alphabetical order of the two-letter codes, which is
/// the tie-break order used by all the rankings.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct StateCode(&'static str);

impl StateCode {
    /// Parses a two-letter code, a numeric FIPS code or a full name.
    /// The comparison ignores case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<StateCode> {
        Self::lookup(raw).map(|j| StateCode(j.code))
    }

    pub fn all() -> impl Iterator<Item = StateCode> {
        JURISDICTIONS.iter().map(|j| StateCode(j.code))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn jurisdiction(&self) -> &'static Jurisdiction {
        // Construction guarantees that the code is in the table.
        Self::lookup(self.0).unwrap_or(&JURISDICTIONS[0])
    }

    pub fn kind(&self) -> JurisdictionKind {
        self.jurisdiction().kind
    }

    pub fn name(&self) -> &'static str {
        self.jurisdiction().name
    }

    fn lookup(raw: &str) -> Option<&'static Jurisdiction> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) {
            let upper = s.to_ascii_uppercase();
            return JURISDICTIONS
                .binary_search_by(|j| j.code.cmp(upper.as_str()))
                .ok()
                .map(|idx| &JURISDICTIONS[idx]);
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            let fips = s.parse::<u8>().ok()?;
            return JURISDICTIONS.iter().find(|j| j.fips == fips);
        }
        JURISDICTIONS
            .iter()
            .find(|j| j.name.eq_ignore_ascii_case(s))
    }
}

impl Display for StateCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
