//! Region code → display name lookup.
//!
//! Country codes resolve through a static ISO 3166-1 alpha-2 table. Codes the
//! table doesn't know (multi-country bundles, backend-specific aliases) fall
//! back to a small alias table, and finally to the raw code verbatim.

/// Read-only code → display name lookup.
pub trait RegionLookup: Send + Sync {
    fn display_name(&self, code: &str) -> Option<String>;
}

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EG", "Egypt"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("HK", "Hong Kong"),
    ("HR", "Croatia"),
    ("HU", "Hungary"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IS", "Iceland"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KE", "Kenya"),
    ("KR", "South Korea"),
    ("MA", "Morocco"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PE", "Peru"),
    ("PH", "Philippines"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("QA", "Qatar"),
    ("RO", "Romania"),
    ("SA", "Saudi Arabia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("TH", "Thailand"),
    ("TR", "Turkey"),
    ("TW", "Taiwan"),
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("VN", "Vietnam"),
    ("ZA", "South Africa"),
];

const REGION_ALIASES: &[(&str, &str)] = &[
    ("EU", "Europe"),
    ("EUR", "Europe"),
    ("EUROPE", "Europe"),
    ("GLOBAL", "Global"),
    ("WW", "Global"),
    ("ASIA", "Asia"),
    ("APAC", "Asia Pacific"),
    ("LATAM", "Latin America"),
    ("NAM", "North America"),
    ("MENA", "Middle East & North Africa"),
    ("AFRICA", "Africa"),
    ("CARIB", "Caribbean"),
    ("UK", "United Kingdom"),
];

/// Built-in lookup backed by the static tables above.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRegionLookup;

impl RegionLookup for StaticRegionLookup {
    fn display_name(&self, code: &str) -> Option<String> {
        let key = code.trim().to_ascii_uppercase();
        COUNTRY_NAMES
            .iter()
            .find(|(c, _)| *c == key)
            .map(|(_, name)| name.to_string())
    }
}

/// Resolve a region code to something displayable.
///
/// Lookup → alias table → the raw code as given.
pub fn resolve_region_name(lookup: &dyn RegionLookup, code: &str) -> String {
    if let Some(name) = lookup.display_name(code) {
        return name;
    }
    let key = code.trim().to_ascii_uppercase();
    REGION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}
