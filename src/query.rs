use crate::types::{Dataset, FilterError};
use url::Url;

const DETAIL_COLUMNS: &str = "SELECT state_abb, year_of_manufacture, make, model, no_vehicles FROM ";
const SUM_COLUMNS: &str = "SELECT no_vehicles FROM ";

/// A make/model selection, optionally narrowed to a model-year range.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFilter {
    pub make: String,
    pub model: String,
    pub year_min: Option<u16>,
    pub year_max: Option<u16>,
}

impl VehicleFilter {
    /// Year bounds come straight from form fields; blank means unbounded.
    pub fn new(
        make: &str,
        model: &str,
        year_min: &str,
        year_max: &str,
    ) -> Result<VehicleFilter, FilterError> {
        Ok(VehicleFilter {
            make: make.to_string(),
            model: model.to_string(),
            year_min: parse_year(year_min)?,
            year_max: parse_year(year_max)?,
        })
    }

    fn where_clause(&self) -> String {
        let mut clause = format!(
            " WHERE make='{}' AND model='{}'",
            escape_literal(&self.make),
            escape_literal(&self.model)
        );
        if let Some(min) = self.year_min {
            clause.push_str(&format!(" AND year_of_manufacture>='{}'", min));
        }
        if let Some(max) = self.year_max {
            clause.push_str(&format!(" AND year_of_manufacture<='{}'", max));
        }
        clause
    }
}

fn parse_year(raw: &str) -> Result<Option<u16>, FilterError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u16>()
        .map(Some)
        .map_err(|_| FilterError::InvalidYear(raw.to_string()))
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Per-state, per-year rows for one dataset.
pub fn detail_sql(dataset: Dataset, filter: &VehicleFilter) -> String {
    format!("{}{}{}", DETAIL_COLUMNS, dataset.table(), filter.where_clause())
}

/// Just the counts, for summing a dataset's total.
pub fn sum_sql(dataset: Dataset, filter: &VehicleFilter) -> String {
    format!("{}{}{}", SUM_COLUMNS, dataset.table(), filter.where_clause())
}

pub fn distinct_models_sql(dataset: Dataset) -> String {
    format!("SELECT DISTINCT make, model FROM {}", dataset.table())
}

/// The endpoint URL carrying `sql` as its only query parameter.
pub fn request_url(endpoint: &Url, sql: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut().clear().append_pair("sql", sql);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(min: &str, max: &str) -> VehicleFilter {
        VehicleFilter::new("TOYOTA", "HILUX", min, max).unwrap()
    }

    #[test]
    fn detail_without_year_bounds() {
        assert_eq!(
            detail_sql(Dataset::Y2024, &filter("", " ")),
            "SELECT state_abb, year_of_manufacture, make, model, no_vehicles FROM \
             \"2c35ff3d-1f49-4721-b79c-d0f35b2c4d04\" WHERE make='TOYOTA' AND model='HILUX'"
        );
    }

    #[test]
    fn sum_with_year_bounds() {
        assert_eq!(
            sum_sql(Dataset::Y2021, &filter("1985", "1990")),
            "SELECT no_vehicles FROM \"21619e31-c57d-4845-a9d4-24cd172f446d\" \
             WHERE make='TOYOTA' AND model='HILUX' \
             AND year_of_manufacture>='1985' AND year_of_manufacture<='1990'"
        );
    }

    #[test]
    fn only_lower_bound() {
        assert!(detail_sql(Dataset::Y2023, &filter("2000", ""))
            .ends_with("model='HILUX' AND year_of_manufacture>='2000'"));
    }

    #[test]
    fn quotes_are_doubled() {
        let f = VehicleFilter::new("O'BRIEN", "X'", "", "").unwrap();
        assert!(sum_sql(Dataset::Y2024, &f).ends_with("WHERE make='O''BRIEN' AND model='X'''"));
    }

    #[test]
    fn rejects_non_numeric_years() {
        assert_eq!(
            VehicleFilter::new("TOYOTA", "HILUX", "19' OR '1'='1", ""),
            Err(FilterError::InvalidYear("19' OR '1'='1".to_string()))
        );
    }

    #[test]
    fn request_url_encodes_sql() {
        let endpoint =
            Url::parse("https://data.gov.au/data/api/action/datastore_search_sql").unwrap();
        let url = request_url(&endpoint, &distinct_models_sql(Dataset::Y2024));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![(
                "sql".to_string(),
                "SELECT DISTINCT make, model FROM \"2c35ff3d-1f49-4721-b79c-d0f35b2c4d04\""
                    .to_string()
            )]
        );
        assert!(url.as_str().starts_with("https://data.gov.au/data/api/action/datastore_search_sql?sql="));
    }
}
