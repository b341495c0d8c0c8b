use crate::datastore::{self, MakeModel};
use crate::types::Dataset;
use failure::Error;
use log::info;
use rusqlite::{params, Connection, NO_PARAMS};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// An autocomplete option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub label: String,
}

impl From<MakeModel> for Vehicle {
    fn from(m: MakeModel) -> Self {
        Vehicle {
            label: format!("{} {}", m.make, m.model),
            make: m.make,
            model: m.model,
        }
    }
}

// SQLite's lower() only folds ASCII, so labels are folded here and stored.
fn fold(make: &str, model: &str) -> String {
    format!("{} {}", make, model).to_lowercase()
}

/// Local copy of the distinct make/model pairs, so autocomplete never has to
/// run the expensive distinct query against the datastore.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Catalog, Error> {
        Catalog::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Catalog, Error> {
        Catalog::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Catalog, Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS vehicle (make TEXT NOT NULL, model TEXT NOT NULL, folded TEXT NOT NULL, PRIMARY KEY (make, model)) WITHOUT ROWID",
            NO_PARAMS,
        )?;
        Ok(Catalog { conn })
    }

    /// Replaces the catalog contents. Returns the number of distinct pairs stored.
    pub fn replace(&mut self, pairs: Vec<MakeModel>) -> Result<usize, Error> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM vehicle", NO_PARAMS)?;
        let mut inserted = 0;
        for pair in &pairs {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO vehicle(make, model, folded) VALUES (?1, ?2, ?3)",
                params![pair.make, pair.model, fold(&pair.make, &pair.model)],
            )?;
        }
        tx.commit()?;
        info!("Catalog now holds {} vehicles", inserted);
        Ok(inserted)
    }

    /// Loads a saved `datastore_search_sql` response for
    /// `SELECT DISTINCT make, model`.
    pub fn import_json<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, Error> {
        let path = path.as_ref();
        let raw = fs::read(path)
            .map_err(|e| format_err!("Unable to read {}: {}", path.display(), e))?;
        let response: datastore::Response<MakeModel> = serde_json::from_slice(&raw)?;
        self.replace(response.into_records()?)
    }

    pub async fn refresh(
        &mut self,
        client: &datastore::Client,
        dataset: Dataset,
    ) -> Result<usize, Error> {
        let pairs = client.distinct_models(dataset).await?;
        self.replace(pairs)
    }

    pub fn len(&self) -> Result<usize, Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vehicle", NO_PARAMS, |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Case-insensitive substring match on "MAKE MODEL". An empty term
    /// matches nothing.
    pub fn search(&self, term: &str, limit: usize) -> Result<Vec<Vehicle>, Error> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT make, model FROM vehicle WHERE instr(folded, ?1) > 0 ORDER BY make, model LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![term, limit as i64], |row| {
            Ok(MakeModel {
                make: row.get(0)?,
                model: row.get(1)?,
            })
        })?;
        let mut vehicles = Vec::new();
        for row in rows {
            vehicles.push(Vehicle::from(row?));
        }
        Ok(vehicles)
    }
}
