use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse named region of Austin used as a categorical model feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Airport,
    University,
    #[serde(rename = "West Campus")]
    WestCampus,
    Downtown,
    #[serde(rename = "East Austin")]
    EastAustin,
    #[serde(rename = "South Austin")]
    SouthAustin,
    #[serde(rename = "North Austin")]
    NorthAustin,
    Other,
}

#[derive(Debug, Clone, Copy)]
pub enum Keyword {
    /// Substring anywhere in the lowercased text.
    Contains(&'static str),
    /// Whole alphanumeric token, e.g. an airport code.
    Word(&'static str),
}

impl Keyword {
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Keyword::Contains(needle) => lowered.contains(needle),
            Keyword::Word(token) => lowered
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|t| t == *token),
        }
    }
}

pub struct ZoneRule {
    pub zone: Zone,
    pub keywords: &'static [Keyword],
}

/// Address rules, evaluated top to bottom; the first rule with any matching keyword wins.
pub const ZONE_RULES: &[ZoneRule] = &[
    ZoneRule {
        zone: Zone::Airport,
        keywords: &[
            Keyword::Contains("airport"),
            Keyword::Contains("bergstrom"),
            Keyword::Word("aus"),
        ],
    },
    ZoneRule {
        zone: Zone::WestCampus,
        keywords: &[Keyword::Contains("west campus"), Keyword::Contains("w 23rd")],
    },
    ZoneRule {
        zone: Zone::University,
        keywords: &[
            Keyword::Contains("university"),
            Keyword::Contains("campus"),
            Keyword::Contains("23rd"),
        ],
    },
    ZoneRule {
        zone: Zone::Downtown,
        keywords: &[
            Keyword::Contains("downtown"),
            Keyword::Contains("6th"),
            Keyword::Contains("market"),
        ],
    },
    ZoneRule {
        zone: Zone::EastAustin,
        keywords: &[Keyword::Contains("east")],
    },
    ZoneRule {
        zone: Zone::SouthAustin,
        keywords: &[Keyword::Contains("south"), Keyword::Contains("s congress")],
    },
    ZoneRule {
        zone: Zone::NorthAustin,
        keywords: &[Keyword::Contains("north")],
    },
];

/// Inclusive lat/lon bounding box for a zone.
pub struct CoordinateRule {
    pub zone: Zone,
    pub lat: (f64, f64),
    pub lon: (f64, f64),
}

impl CoordinateRule {
    fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat.0..=self.lat.1).contains(&lat) && (self.lon.0..=self.lon.1).contains(&lon)
    }
}

/// Boxes overlap at their edges; first match wins, same as the address rules.
pub const COORDINATE_RULES: &[CoordinateRule] = &[
    CoordinateRule { zone: Zone::Airport, lat: (30.17, 30.22), lon: (-97.70, -97.63) },
    CoordinateRule { zone: Zone::WestCampus, lat: (30.280, 30.300), lon: (-97.760, -97.742) },
    CoordinateRule { zone: Zone::University, lat: (30.276, 30.300), lon: (-97.742, -97.720) },
    CoordinateRule { zone: Zone::Downtown, lat: (30.255, 30.276), lon: (-97.760, -97.735) },
    CoordinateRule { zone: Zone::EastAustin, lat: (30.240, 30.300), lon: (-97.735, -97.680) },
    CoordinateRule { zone: Zone::SouthAustin, lat: (30.100, 30.255), lon: (-97.880, -97.700) },
    CoordinateRule { zone: Zone::NorthAustin, lat: (30.300, 30.520), lon: (-97.880, -97.600) },
];

impl Zone {
    pub const ALL: [Zone; 8] = [
        Zone::Airport,
        Zone::University,
        Zone::WestCampus,
        Zone::Downtown,
        Zone::EastAustin,
        Zone::SouthAustin,
        Zone::NorthAustin,
        Zone::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Zone::Airport => "Airport",
            Zone::University => "University",
            Zone::WestCampus => "West Campus",
            Zone::Downtown => "Downtown",
            Zone::EastAustin => "East Austin",
            Zone::SouthAustin => "South Austin",
            Zone::NorthAustin => "North Austin",
            Zone::Other => "Other",
        }
    }

    /// Classify free text. Blank or unmatched text is `Other`.
    pub fn from_address(address: &str) -> Zone {
        let lowered = address.trim().to_lowercase();
        if lowered.is_empty() {
            return Zone::Other;
        }
        ZONE_RULES
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| k.matches(&lowered)))
            .map(|rule| rule.zone)
            .unwrap_or(Zone::Other)
    }

    pub fn from_coordinates(lat: f64, lon: f64) -> Zone {
        if !lat.is_finite() || !lon.is_finite() {
            return Zone::Other;
        }
        COORDINATE_RULES
            .iter()
            .find(|rule| rule.contains(lat, lon))
            .map(|rule| rule.zone)
            .unwrap_or(Zone::Other)
    }

    /// Address first; coordinates only when the address says nothing useful.
    pub fn resolve(address: &str, lat: f64, lon: f64) -> Zone {
        match Zone::from_address(address) {
            Zone::Other => Zone::from_coordinates(lat, lon),
            zone => zone,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_rules() {
        let cases = [
            ("Austin-Bergstrom International Airport", Zone::Airport),
            ("AUS terminal pickup", Zone::Airport),
            ("University Campus, E 23rd St, Austin, United States, 78712", Zone::University),
            ("West Campus, W 23rd St, Austin, United States, 78705", Zone::WestCampus),
            ("Market District, W 6th St, Austin, United States, 78701", Zone::Downtown),
            ("East Austin, Harvey St, Austin, United States, 78702", Zone::EastAustin),
            ("Govalle, E Cesar Chavez St, Austin, United States, 78702", Zone::Other),
            ("1415 S Congress Ave, Austin, TX 78704, United States", Zone::SouthAustin),
            ("Rambler Apartments, Seton Avenue, Austin, TX, USA", Zone::Other),
        ];
        for (text, expected) in cases {
            assert_eq!(Zone::from_address(text), expected, "address {:?}", text);
        }
    }

    #[test]
    fn test_austin_is_not_airport() {
        // "aus" is a token rule, not a substring rule
        assert_eq!(Zone::from_address("Shoal Crest, Rio Grande St, Austin"), Zone::Other);
    }

    #[test]
    fn test_blank_address_is_other() {
        assert_eq!(Zone::from_address(""), Zone::Other);
        assert_eq!(Zone::from_address("   "), Zone::Other);
    }

    #[test]
    fn test_first_rule_wins() {
        // Downtown's "6th" is checked before East Austin's "east"
        assert_eq!(Zone::from_address("East End, E 6th St"), Zone::Downtown);
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(Zone::from_coordinates(30.197, -97.666), Zone::Airport);
        assert_eq!(Zone::from_coordinates(30.2847998, -97.735696), Zone::University);
        assert_eq!(Zone::from_coordinates(30.2958783, -97.7440765), Zone::WestCampus);
        assert_eq!(Zone::from_coordinates(30.270065, -97.750424), Zone::Downtown);
        assert_eq!(Zone::from_coordinates(40.0, -75.0), Zone::Other);
        assert_eq!(Zone::from_coordinates(f64::NAN, -97.7), Zone::Other);
    }

    #[test]
    fn test_resolve_falls_back_to_coordinates() {
        assert_eq!(
            Zone::resolve("Rambler Apartments, Seton Avenue", 30.2847998, -97.735696),
            Zone::University
        );
        assert_eq!(
            Zone::resolve("Downtown loft", 30.197, -97.666),
            Zone::Downtown
        );
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&Zone::WestCampus).unwrap();
        assert_eq!(json, "\"West Campus\"");
        let back: Zone = serde_json::from_str("\"North Austin\"").unwrap();
        assert_eq!(back, Zone::NorthAustin);
        for zone in Zone::ALL {
            assert_eq!(serde_json::to_string(&zone).unwrap(), format!("\"{}\"", zone));
        }
    }
}
