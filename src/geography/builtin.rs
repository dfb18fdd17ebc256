//! Reference tables for the built-in geography profiles.

use super::MapType;

pub(super) struct BuiltinTable {
    pub id: &'static str,
    pub display_name: &'static str,
    pub location_label: &'static str,
    pub region_label: &'static str,
    pub map_type: MapType,
    pub locations: &'static [(&'static str, &'static str)],
    pub regions: &'static [(&'static str, &'static [&'static str])],
}

/// Registration order matters: it is the tie-break for equal detection scores.
pub(super) const BUILTIN_TABLES: &[BuiltinTable] = &[US_STATES, CANADA_PROVINCES, AUSTRALIA_STATES, WORLD_COUNTRIES];

const US_STATES: BuiltinTable = BuiltinTable {
    id: "us_states",
    display_name: "United States",
    location_label: "State",
    region_label: "Region",
    map_type: MapType::UsStates,
    locations: &[
        ("AL", "Alabama"),
        ("AK", "Alaska"),
        ("AZ", "Arizona"),
        ("AR", "Arkansas"),
        ("CA", "California"),
        ("CO", "Colorado"),
        ("CT", "Connecticut"),
        ("DE", "Delaware"),
        ("DC", "District of Columbia"),
        ("FL", "Florida"),
        ("GA", "Georgia"),
        ("HI", "Hawaii"),
        ("ID", "Idaho"),
        ("IL", "Illinois"),
        ("IN", "Indiana"),
        ("IA", "Iowa"),
        ("KS", "Kansas"),
        ("KY", "Kentucky"),
        ("LA", "Louisiana"),
        ("ME", "Maine"),
        ("MD", "Maryland"),
        ("MA", "Massachusetts"),
        ("MI", "Michigan"),
        ("MN", "Minnesota"),
        ("MS", "Mississippi"),
        ("MO", "Missouri"),
        ("MT", "Montana"),
        ("NE", "Nebraska"),
        ("NV", "Nevada"),
        ("NH", "New Hampshire"),
        ("NJ", "New Jersey"),
        ("NM", "New Mexico"),
        ("NY", "New York"),
        ("NC", "North Carolina"),
        ("ND", "North Dakota"),
        ("OH", "Ohio"),
        ("OK", "Oklahoma"),
        ("OR", "Oregon"),
        ("PA", "Pennsylvania"),
        ("RI", "Rhode Island"),
        ("SC", "South Carolina"),
        ("SD", "South Dakota"),
        ("TN", "Tennessee"),
        ("TX", "Texas"),
        ("UT", "Utah"),
        ("VT", "Vermont"),
        ("VA", "Virginia"),
        ("WA", "Washington"),
        ("WV", "West Virginia"),
        ("WI", "Wisconsin"),
        ("WY", "Wyoming"),
    ],
    regions: &[
        (
            "Northeast",
            &["CT", "ME", "MA", "NH", "RI", "VT", "NJ", "NY", "PA"],
        ),
        (
            "Midwest",
            &[
                "IL", "IN", "MI", "OH", "WI", "IA", "KS", "MN", "MO", "NE", "ND", "SD",
            ],
        ),
        (
            "South",
            &[
                "DE", "DC", "FL", "GA", "MD", "NC", "SC", "VA", "WV", "AL", "KY", "MS", "TN", "AR",
                "LA", "OK", "TX",
            ],
        ),
        (
            "West",
            &[
                "AZ", "CO", "ID", "MT", "NV", "NM", "UT", "WY", "AK", "CA", "HI", "OR", "WA",
            ],
        ),
    ],
};

const CANADA_PROVINCES: BuiltinTable = BuiltinTable {
    id: "canada_provinces",
    display_name: "Canada",
    location_label: "Province",
    region_label: "Region",
    map_type: MapType::CanadaProvinces,
    locations: &[
        ("AB", "Alberta"),
        ("BC", "British Columbia"),
        ("MB", "Manitoba"),
        ("NB", "New Brunswick"),
        ("NL", "Newfoundland and Labrador"),
        ("NS", "Nova Scotia"),
        ("NT", "Northwest Territories"),
        ("NU", "Nunavut"),
        ("ON", "Ontario"),
        ("PE", "Prince Edward Island"),
        ("QC", "Quebec"),
        ("SK", "Saskatchewan"),
        ("YT", "Yukon"),
    ],
    regions: &[
        ("Atlantic", &["NB", "NL", "NS", "PE"]),
        ("Central", &["ON", "QC"]),
        ("Prairies", &["AB", "MB", "SK"]),
        ("West Coast", &["BC"]),
        ("North", &["NT", "NU", "YT"]),
    ],
};

const AUSTRALIA_STATES: BuiltinTable = BuiltinTable {
    id: "australia_states",
    display_name: "Australia",
    location_label: "State",
    region_label: "Region",
    map_type: MapType::AustraliaStates,
    locations: &[
        ("NSW", "New South Wales"),
        ("VIC", "Victoria"),
        ("QLD", "Queensland"),
        ("WA", "Western Australia"),
        ("SA", "South Australia"),
        ("TAS", "Tasmania"),
        ("ACT", "Australian Capital Territory"),
        ("NT", "Northern Territory"),
    ],
    regions: &[
        ("East Coast", &["NSW", "VIC", "QLD", "ACT"]),
        ("Southern", &["SA", "TAS"]),
        ("Western", &["WA"]),
        ("Northern", &["NT"]),
    ],
};

const WORLD_COUNTRIES: BuiltinTable = BuiltinTable {
    id: "world_countries",
    display_name: "World",
    location_label: "Country",
    region_label: "Continent",
    map_type: MapType::WorldCountries,
    locations: &[
        ("US", "United States"),
        ("CA", "Canada"),
        ("MX", "Mexico"),
        ("BR", "Brazil"),
        ("AR", "Argentina"),
        ("CL", "Chile"),
        ("CO", "Colombia"),
        ("PE", "Peru"),
        ("GB", "United Kingdom"),
        ("IE", "Ireland"),
        ("FR", "France"),
        ("DE", "Germany"),
        ("IT", "Italy"),
        ("ES", "Spain"),
        ("PT", "Portugal"),
        ("NL", "Netherlands"),
        ("BE", "Belgium"),
        ("CH", "Switzerland"),
        ("AT", "Austria"),
        ("SE", "Sweden"),
        ("NO", "Norway"),
        ("DK", "Denmark"),
        ("FI", "Finland"),
        ("PL", "Poland"),
        ("CZ", "Czechia"),
        ("GR", "Greece"),
        ("TR", "Turkey"),
        ("UA", "Ukraine"),
        ("RU", "Russia"),
        ("CN", "China"),
        ("JP", "Japan"),
        ("KR", "South Korea"),
        ("IN", "India"),
        ("SG", "Singapore"),
        ("ID", "Indonesia"),
        ("MY", "Malaysia"),
        ("TH", "Thailand"),
        ("VN", "Vietnam"),
        ("PH", "Philippines"),
        ("AE", "United Arab Emirates"),
        ("SA", "Saudi Arabia"),
        ("IL", "Israel"),
        ("PK", "Pakistan"),
        ("BD", "Bangladesh"),
        ("AU", "Australia"),
        ("NZ", "New Zealand"),
        ("ZA", "South Africa"),
        ("NG", "Nigeria"),
        ("EG", "Egypt"),
        ("KE", "Kenya"),
        ("MA", "Morocco"),
        ("GH", "Ghana"),
        ("ET", "Ethiopia"),
    ],
    regions: &[
        ("North America", &["US", "CA", "MX"]),
        ("South America", &["BR", "AR", "CL", "CO", "PE"]),
        (
            "Europe",
            &[
                "GB", "IE", "FR", "DE", "IT", "ES", "PT", "NL", "BE", "CH", "AT", "SE", "NO", "DK",
                "FI", "PL", "CZ", "GR", "TR", "UA", "RU",
            ],
        ),
        (
            "Asia",
            &[
                "CN", "JP", "KR", "IN", "SG", "ID", "MY", "TH", "VN", "PH", "AE", "SA", "IL", "PK",
                "BD",
            ],
        ),
        ("Oceania", &["AU", "NZ"]),
        ("Africa", &["ZA", "NG", "EG", "KE", "MA", "GH", "ET"]),
    ],
};
