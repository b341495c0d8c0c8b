use failure::Fail;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One of the yearly "Road vehicles Australia" snapshots hosted on data.gov.au.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dataset {
    Y2021,
    Y2022,
    Y2023,
    Y2024,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::Y2021,
        Dataset::Y2022,
        Dataset::Y2023,
        Dataset::Y2024,
    ];

    pub fn year(self) -> u16 {
        match self {
            Dataset::Y2021 => 2021,
            Dataset::Y2022 => 2022,
            Dataset::Y2023 => 2023,
            Dataset::Y2024 => 2024,
        }
    }

    /// Datastore resource key for the snapshot.
    pub fn resource_id(self) -> Uuid {
        Uuid::from_u128(match self {
            Dataset::Y2021 => 0x21619e31_c57d_4845_a9d4_24cd172f446d,
            Dataset::Y2022 => 0xe6588c5f_e65f_4a6a_99d1_fde1b7ea5201,
            Dataset::Y2023 => 0x6f375468_5ab0_4bba_8d0a_32df267c2dbd,
            Dataset::Y2024 => 0x2c35ff3d_1f49_4721_b79c_d0f35b2c4d04,
        })
    }

    /// The resource key as a quoted SQL identifier.
    pub fn table(self) -> String {
        format!("\"{}\"", self.resource_id().to_hyphenated())
    }

    pub fn source_page(self) -> &'static str {
        match self {
            Dataset::Y2021 => {
                "https://data.gov.au/dataset/ds-dga-292a071b-71f0-48c4-8617-c2ee0ca1ff2e/details"
            }
            Dataset::Y2022 => {
                "https://data.gov.au/dataset/ds-dga-c34b68b7-b482-48c4-86ad-a426e22dd761/details"
            }
            Dataset::Y2023 => {
                "https://data.gov.au/dataset/ds-dga-787053f6-97e1-4170-8e41-32a57277489a/details"
            }
            Dataset::Y2024 => {
                "https://data.gov.au/dataset/ds-dga-767b84b8-6756-460a-96c9-9c073153485a/details"
            }
        }
    }

    pub fn title(self) -> String {
        format!("Road vehicles Australia, January {}", self.year())
    }

    pub fn as_of(self) -> String {
        format!("As of 31 January, {}", self.year())
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Dataset::Y2024
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.year())
    }
}

impl FromStr for Dataset {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2021" => Ok(Dataset::Y2021),
            "2022" => Ok(Dataset::Y2022),
            "2023" => Ok(Dataset::Y2023),
            "2024" => Ok(Dataset::Y2024),
            other => Err(FilterError::UnknownDataset(other.to_string())),
        }
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Rejected user input. The HTTP layer reports these as 400s.
#[derive(Debug, Fail, PartialEq)]
pub enum FilterError {
    #[fail(display = "invalid model year: {:?}", _0)]
    InvalidYear(String),
    #[fail(display = "unknown dataset: {:?}", _0)]
    UnknownDataset(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub dataset: Dataset,
    pub resource_id: String,
    pub title: String,
    pub as_of: String,
    pub source: &'static str,
}

impl From<Dataset> for DatasetInfo {
    fn from(dataset: Dataset) -> Self {
        DatasetInfo {
            dataset,
            resource_id: dataset.resource_id().to_hyphenated().to_string(),
            title: dataset.title(),
            as_of: dataset.as_of(),
            source: dataset.source_page(),
        }
    }
}
