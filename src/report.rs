use crate::aggregate::{self, Breakdown, Point};
use crate::datastore::Client;
use crate::query::{self, VehicleFilter};
use crate::share::ShareState;
use crate::types::{Dataset, FilterError};
use futures::future::join_all;
use log::{error, info};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Links {
    /// Dashboard link reproducing this selection.
    pub share: String,
    /// The datastore request behind the breakdown.
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub label: String,
    pub dataset: Dataset,
    pub as_of: String,
    pub links: Option<Links>,
    pub breakdown: Option<Breakdown>,
    /// Registered totals per dataset, oldest first.
    pub change: Option<Vec<Point>>,
}

impl Report {
    fn unselected(state: &ShareState, dataset: Dataset) -> Report {
        Report {
            label: state.label(),
            dataset,
            as_of: dataset.as_of(),
            links: None,
            breakdown: Some(Breakdown::empty()),
            change: None,
        }
    }
}

/// Runs the selected dataset's breakdown and the four per-dataset totals
/// concurrently. A failed part is logged and left out of the report.
pub async fn build(client: &Client, state: &ShareState) -> Result<Report, FilterError> {
    let dataset = state.dataset()?;
    let filter = match state.filter()? {
        Some(filter) => filter,
        None => return Ok(Report::unselected(state, dataset)),
    };
    info!("Building report for {} ({})", state.label(), dataset);

    let links = Links {
        share: state.share_url()?,
        source: query::request_url(client.endpoint(), &query::detail_sql(dataset, &filter))
            .to_string(),
    };
    let (breakdown, change) =
        futures::join!(breakdown(client, dataset, &filter), change(client, &filter));

    Ok(Report {
        label: state.label(),
        dataset,
        as_of: dataset.as_of(),
        links: Some(links),
        breakdown,
        change,
    })
}

async fn breakdown(client: &Client, dataset: Dataset, filter: &VehicleFilter) -> Option<Breakdown> {
    match client.detail(dataset, filter).await {
        Ok(rows) => Some(Breakdown::from_rows(&rows)),
        Err(e) => {
            error!("Error fetching breakdown for {}: {}", dataset, e);
            None
        }
    }
}

async fn change(client: &Client, filter: &VehicleFilter) -> Option<Vec<Point>> {
    let fetches = Dataset::ALL
        .iter()
        .map(|&dataset| async move { (dataset, client.counts(dataset, filter).await) });
    let mut counts = Vec::with_capacity(Dataset::ALL.len());
    for (dataset, result) in join_all(fetches).await {
        match result {
            Ok(rows) => counts.push((dataset, rows)),
            Err(e) => {
                error!("Error fetching total for {}: {}", dataset, e);
                return None;
            }
        }
    }
    Some(aggregate::dataset_change(&counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::mock::{records, MockDatastore};
    use serde_json::json;

    fn selection() -> ShareState {
        ShareState::from_link("/?MYMin=1985&MYMax=1990&dataset=2023&make=TOYOTA&model=HILUX")
    }

    #[tokio::test]
    async fn unselected_state_skips_the_datastore() {
        let mock = MockDatastore::start(vec![]);
        let client = Client::new(mock.endpoint());
        let report = build(&client, &ShareState::from_link("/?make=TOYOTA"))
            .await
            .unwrap();
        assert_eq!(report.label, "Search Vehicles");
        assert!(report.links.is_none());
        assert_eq!(report.breakdown, Some(Breakdown::empty()));
        assert!(mock.queries().is_empty());
    }

    #[tokio::test]
    async fn full_report() {
        let mock = MockDatastore::start(vec![
            (
                "SELECT state_abb",
                200,
                records(json!([
                    {"state_abb": "qld", "year_of_manufacture": "1986", "no_vehicles": "3"},
                    {"state_abb": "NSW", "year_of_manufacture": "1985", "no_vehicles": "2"},
                ])),
            ),
            (
                "2c35ff3d-1f49-4721-b79c-d0f35b2c4d04",
                200,
                records(json!([{"no_vehicles": "4"}, {"no_vehicles": 1}])),
            ),
            (
                "21619e31-c57d-4845-a9d4-24cd172f446d",
                200,
                records(json!([{"no_vehicles": "9"}])),
            ),
        ]);
        let client = Client::new(mock.endpoint());
        let report = build(&client, &selection()).await.unwrap();

        assert_eq!(report.label, "TOYOTA HILUX");
        assert_eq!(report.dataset, Dataset::Y2023);
        let links = report.links.unwrap();
        assert_eq!(
            links.share,
            "/?MYMax=1990&MYMin=1985&dataset=2023&make=TOYOTA&model=HILUX"
        );
        assert!(links.source.starts_with(mock.endpoint().as_str()));

        let breakdown = report.breakdown.unwrap();
        assert_eq!(breakdown.total, 5);
        assert_eq!(breakdown.by_year[0].label, "1985");

        let change: Vec<(String, u64)> = report
            .change
            .unwrap()
            .into_iter()
            .map(|p| (p.label, p.value))
            .collect();
        assert_eq!(
            change,
            vec![("2021".to_string(), 9), ("2024".to_string(), 5)]
        );
        assert_eq!(mock.queries().len(), 5);
    }

    #[tokio::test]
    async fn failed_breakdown_keeps_change() {
        let mock = MockDatastore::start(vec![
            (
                "SELECT state_abb",
                409,
                json!({"success": false, "error": {"message": "boom"}}),
            ),
            (
                "SELECT no_vehicles",
                200,
                records(json!([{"no_vehicles": 1}])),
            ),
        ]);
        let client = Client::new(mock.endpoint());
        let report = build(&client, &selection()).await.unwrap();
        assert!(report.breakdown.is_none());
        assert_eq!(report.change.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn one_failed_total_drops_change_only() {
        let mock = MockDatastore::start(vec![
            (
                "SELECT no_vehicles FROM \"e6588c5f-e65f-4a6a-99d1-fde1b7ea5201\"",
                409,
                json!({"success": false, "error": {"message": "timeout"}}),
            ),
            (
                "SELECT no_vehicles",
                200,
                records(json!([{"no_vehicles": 2}])),
            ),
            (
                "SELECT state_abb",
                200,
                records(json!([{"state_abb": "TAS", "year_of_manufacture": "1987", "no_vehicles": 2}])),
            ),
        ]);
        let client = Client::new(mock.endpoint());
        let report = build(&client, &selection()).await.unwrap();
        assert!(report.change.is_none());
        assert_eq!(report.breakdown.unwrap().total, 2);
        assert_eq!(mock.queries().len(), 5);
    }

    #[tokio::test]
    async fn invalid_year_is_rejected() {
        let mock = MockDatastore::start(vec![]);
        let client = Client::new(mock.endpoint());
        let state = ShareState::from_link("?make=TOYOTA&model=HILUX&MYMin=abc");
        assert_eq!(
            build(&client, &state).await.unwrap_err(),
            FilterError::InvalidYear("abc".to_string())
        );
    }
}
