use crate::query::VehicleFilter;
use crate::types::{Dataset, FilterError};
use url::form_urlencoded;

const PLACEHOLDER_LABEL: &str = "Search Vehicles";

/// Dashboard state as carried in a shareable link:
/// `/?MYMax=&MYMin=1985&dataset=2024&make=TOYOTA&model=HILUX`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShareState {
    pub make: Option<String>,
    pub model: Option<String>,
    /// `MYMin`
    pub year_min: Option<String>,
    /// `MYMax`
    pub year_max: Option<String>,
    pub dataset: Option<String>,
}

impl ShareState {
    /// Parses the query part of a share link; a leading `/?` or `?` is ignored.
    pub fn from_link(link: &str) -> ShareState {
        ShareState::from_query(link.splitn(2, '?').nth(1).unwrap_or(link))
    }

    /// Parses a bare query string. Unknown keys are ignored and a repeated
    /// key keeps its last value.
    pub fn from_query(query: &str) -> ShareState {
        let mut state = ShareState::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "make" => state.make = value,
                "model" => state.model = value,
                "MYMin" => state.year_min = value,
                "MYMax" => state.year_max = value,
                "dataset" => state.dataset = value,
                _ => {}
            }
        }
        state
    }

    pub fn dataset(&self) -> Result<Dataset, FilterError> {
        match self.dataset.as_deref().map(str::trim) {
            None | Some("") => Ok(Dataset::default()),
            Some(year) => year.parse(),
        }
    }

    fn selection(&self) -> Option<(&str, &str)> {
        match (non_blank(&self.make), non_blank(&self.model)) {
            (Some(make), Some(model)) => Some((make, model)),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self.selection() {
            Some((make, model)) => format!("{} {}", make, model),
            None => PLACEHOLDER_LABEL.to_string(),
        }
    }

    /// The query filter, or `None` until both make and model are chosen.
    pub fn filter(&self) -> Result<Option<VehicleFilter>, FilterError> {
        match self.selection() {
            Some((make, model)) => VehicleFilter::new(
                make,
                model,
                self.year_min.as_deref().unwrap_or(""),
                self.year_max.as_deref().unwrap_or(""),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    /// Keys are emitted in sorted order and blank bounds are kept as `key=`,
    /// so identical selections always produce identical links.
    pub fn share_url(&self) -> Result<String, FilterError> {
        let dataset = self.dataset()?.to_string();
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("MYMax", self.year_max.as_deref().unwrap_or(""))
            .append_pair("MYMin", self.year_min.as_deref().unwrap_or(""))
            .append_pair("dataset", &dataset)
            .append_pair("make", self.make.as_deref().unwrap_or(""))
            .append_pair("model", self.model.as_deref().unwrap_or(""))
            .finish();
        Ok(format!("/?{}", query))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hilux() -> ShareState {
        ShareState {
            make: Some("TOYOTA".to_string()),
            model: Some("HILUX SR5".to_string()),
            year_min: Some("1985".to_string()),
            year_max: Some("".to_string()),
            dataset: Some("2022".to_string()),
        }
    }

    #[test]
    fn share_url_sorts_keys_and_keeps_blanks() {
        assert_eq!(
            hilux().share_url().unwrap(),
            "/?MYMax=&MYMin=1985&dataset=2022&make=TOYOTA&model=HILUX+SR5"
        );
    }

    #[test]
    fn link_parses_back() {
        let link = hilux().share_url().unwrap();
        assert_eq!(ShareState::from_link(&link), hilux());
    }

    #[test]
    fn defaults_without_selection() {
        let state = ShareState::from_link("/");
        assert_eq!(state.label(), "Search Vehicles");
        assert_eq!(state.dataset(), Ok(Dataset::Y2024));
        assert_eq!(state.filter(), Ok(None));
        assert_eq!(
            state.share_url().unwrap(),
            "/?MYMax=&MYMin=&dataset=2024&make=&model="
        );
    }

    #[test]
    fn make_alone_is_not_a_selection() {
        let state = ShareState::from_link("?make=FORD&model=%20");
        assert_eq!(state.label(), "Search Vehicles");
        assert_eq!(state.filter(), Ok(None));
    }

    #[test]
    fn filter_carries_year_bounds() {
        let filter = hilux().filter().unwrap().unwrap();
        assert_eq!(filter.make, "TOYOTA");
        assert_eq!(filter.year_min, Some(1985));
        assert_eq!(filter.year_max, None);
        assert_eq!(hilux().label(), "TOYOTA HILUX SR5");
    }

    #[test]
    fn query_keeps_question_marks_and_last_value() {
        let state = ShareState::from_query("make=A&make=WHO%3F&model=WHAT?");
        assert_eq!(state.make.as_deref(), Some("WHO?"));
        assert_eq!(state.model.as_deref(), Some("WHAT?"));
    }

    #[test]
    fn bad_dataset_is_rejected() {
        let state = ShareState::from_link("?dataset=1999");
        assert_eq!(
            state.dataset(),
            Err(FilterError::UnknownDataset("1999".to_string()))
        );
    }
}
