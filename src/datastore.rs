use crate::query::{self, VehicleFilter};
use crate::types::Dataset;
use failure::Error;
use log::{debug, info};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://data.gov.au/data/api/action/datastore_search_sql";

/// Envelope returned by `datastore_search_sql`, both for live queries and
/// for saved copies of a response on disk.
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub success: bool,
    pub result: Option<ResultSet<T>>,
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ResultSet<T> {
    pub records: Vec<T>,
}

impl<T> Response<T> {
    pub fn into_records(self) -> Result<Vec<T>, Error> {
        if !self.success {
            let message = self
                .error
                .as_ref()
                .and_then(|e| e["message"].as_str().map(str::to_string))
                .or_else(|| self.error.as_ref().map(Value::to_string))
                .unwrap_or_else(|| "no error detail".to_string());
            bail!("Datastore rejected query: {}", message);
        }
        self.result
            .map(|r| r.records)
            .ok_or_else(|| format_err!("Missing result in datastore response"))
    }
}

/// One registration row: a count of vehicles of a make/model/year in a state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Registration {
    pub state_abb: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year_of_manufacture: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub no_vehicles: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Count {
    #[serde(deserialize_with = "lenient_count")]
    pub no_vehicles: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MakeModel {
    pub make: String,
    pub model: String,
}

// The datastore types these columns loosely; accept numbers or numeric text.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("invalid vehicle count {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid vehicle count {:?}", s))),
        other => Err(de::Error::custom(format!("invalid vehicle count {}", other))),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("unexpected value {}", other))),
    }
}

pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
}

impl Client {
    pub fn new(endpoint: Url) -> Client {
        Client {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Rows broken down by state and year for one dataset.
    pub async fn detail(
        &self,
        dataset: Dataset,
        filter: &VehicleFilter,
    ) -> Result<Vec<Registration>, Error> {
        self.run(&query::detail_sql(dataset, filter)).await
    }

    /// Count rows for one dataset; callers sum them.
    pub async fn counts(&self, dataset: Dataset, filter: &VehicleFilter) -> Result<Vec<u64>, Error> {
        let rows: Vec<Count> = self.run(&query::sum_sql(dataset, filter)).await?;
        Ok(rows.into_iter().map(|c| c.no_vehicles).collect())
    }

    pub async fn distinct_models(&self, dataset: Dataset) -> Result<Vec<MakeModel>, Error> {
        self.run(&query::distinct_models_sql(dataset)).await
    }

    async fn run<T>(&self, sql: &str) -> Result<Vec<T>, Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = query::request_url(&self.endpoint, sql);
        debug!("Querying datastore: {}", sql);
        let response = self.http.get(url.as_str()).send().await?;
        let status = response.status();
        // Rejected queries come back as 409 with a JSON body explaining why,
        // so decode before looking at the status.
        let body = response.bytes().await?;
        let decoded: Response<T> = serde_json::from_slice(&body).map_err(|e| {
            format_err!(
                "Undecodable datastore response (HTTP {}): {}",
                status.as_u16(),
                e
            )
        })?;
        let records = decoded.into_records()?;
        info!("Datastore returned {} records", records.len());
        Ok(records)
    }
}
