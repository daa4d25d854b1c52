//! AdV building function codes grouped into the categories used for setback distances.
//!
//! Complete code list:
//! <https://repository.gdi-de.org/schemas/adv/citygml/Codelisten/BuildingFunctionTypeAdV.xml>

pub const RESIDENTIAL_FUNCTIONS: &[&str] = &[
    "31001_1000",
    "31001_1010",
    "31001_1020",
    "31001_1021",
    "31001_1022",
    "31001_1023",
    "31001_1024",
    "31001_1025",
    "31001_1210",
    "31001_3064",
    "31001_3066",
    "31001_2070",
    "31001_2071",
    "31001_2072",
    "31001_2074",
];

pub const HEALTH_FUNCTIONS: &[&str] = &[
    "31001_3240",
    "31001_3241",
    "31001_3242",
    "31001_3051",
    "31001_3052",
];

pub const MIXED_FUNCTIONS: &[&str] = &[
    "31001_1100",
    "31001_1110",
    "31001_1120",
    "31001_1121",
    "31001_1122",
    "31001_1123",
    "31001_1130",
    "31001_1220",
    "31001_1221",
    "31001_1223",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildingCategory {
    Residential,
    Health,
    Mixed,
    Other,
}

impl BuildingCategory {
    pub const ALL: [BuildingCategory; 4] = [
        BuildingCategory::Residential,
        BuildingCategory::Health,
        BuildingCategory::Mixed,
        BuildingCategory::Other,
    ];

    /// Categorize a `bldg:function` code. Codes outside the three lists are `Other`.
    pub fn classify(function: &str) -> Self {
        let function = function.trim();
        if RESIDENTIAL_FUNCTIONS.contains(&function) {
            BuildingCategory::Residential
        } else if HEALTH_FUNCTIONS.contains(&function) {
            BuildingCategory::Health
        } else if MIXED_FUNCTIONS.contains(&function) {
            BuildingCategory::Mixed
        } else {
            BuildingCategory::Other
        }
    }

    /// Shapefile stem the category is written to
    pub fn file_stem(self) -> &'static str {
        match self {
            BuildingCategory::Residential => "residential",
            BuildingCategory::Health => "health",
            BuildingCategory::Mixed => "mixed",
            BuildingCategory::Other => "other",
        }
    }
}
