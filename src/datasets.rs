//! The fixed catalog of source datasets this tool knows how to provision.
//!
//! Each entry names a remote archive, the rule for enumerating its member
//! files, and the destination table. The member enumeration is data here so
//! the orchestrator never hard-codes one dataset's shape.

use crate::db::TableRef;
use crate::ingest::batch::MemberSet;

/// Schema every destination table lives in.
pub const TARGET_SCHEMA: &str = "istat";

/// Destination of the census indicator rows.
pub const CENSUS_DEST: TableRef = TableRef {
    schema: TARGET_SCHEMA,
    table: "census_sections",
};

/// Destination of the municipality boundary layer.
pub const MUNICIPALITIES_DEST: TableRef = TableRef {
    schema: TARGET_SCHEMA,
    table: "municipalities",
};

/// Destination of the derived analytical table.
pub const VIEW_DEST: TableRef = TableRef {
    schema: TARGET_SCHEMA,
    table: "municipality_stats",
};

/// One logical tabular dataset: an archive, an enumeration rule for its
/// member files, and a destination table. Defined once per run, immutable.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub name: &'static str,
    pub url: &'static str,
    /// File name of the archive inside the download directory
    pub archive_file: &'static str,
    pub members: MemberSet,
    /// Member used for schema inference before the batch import
    pub sample_member: &'static str,
    pub delimiter: u8,
    pub dest: TableRef,
}

/// One geospatial vector dataset addressed inside its archive.
#[derive(Debug, Clone)]
pub struct VectorSource {
    pub name: &'static str,
    pub url: &'static str,
    pub archive_file: &'static str,
    /// Path of the vector file relative to the archive root
    pub member: &'static str,
    pub dest: TableRef,
}

/// 2011 census indicators per census section, one semicolon-delimited CSV per
/// regional subdivision (19 of them) inside a single zip archive.
#[must_use]
pub fn census_sections() -> DataSource {
    DataSource {
        name: "census sections 2011",
        url: "https://www.istat.it/storage/cartografia/variabili-censuarie/dati-cps_2011.zip",
        archive_file: "dati-cps_2011.zip",
        members: MemberSet::Indexed {
            template: "R{n}_indicatori_2011_sezioni.csv",
            width: 2,
            range: 1..=19,
        },
        sample_member: "R01_indicatori_2011_sezioni.csv",
        delimiter: b';',
        dest: CENSUS_DEST,
    }
}

/// 2011 municipality boundaries, a shapefile inside its zip archive.
#[must_use]
pub const fn municipal_boundaries() -> VectorSource {
    VectorSource {
        name: "municipality boundaries 2011",
        url: "https://www.istat.it/storage/cartografia/confini_amministrativi/non-generalizzati/Limiti_2011_WGS84.zip",
        archive_file: "Limiti_2011_WGS84.zip",
        member: "Com2011_WGS84/Com2011_WGS84.shp",
        dest: MUNICIPALITIES_DEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_census_member_enumeration_matches_the_known_dataset_shape() {
        let members = census_sections().members.members();
        assert_eq!(members.len(), 19);
        assert!(members.contains(&census_sections().sample_member.to_string()));
    }

    #[test]
    fn test_destinations_share_one_schema() {
        assert_eq!(CENSUS_DEST.schema, TARGET_SCHEMA);
        assert_eq!(MUNICIPALITIES_DEST.schema, TARGET_SCHEMA);
        assert_eq!(VIEW_DEST.schema, TARGET_SCHEMA);
    }
}
