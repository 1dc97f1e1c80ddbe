//! The paper store
//!
//! Every operation opens its own connection and drops it before returning,
//! so nothing is shared between calls except the database file. Failures are
//! logged where the operation returns and handed back as a [`StoreError`].

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::models::paper::{join_authors, NewPaper, Paper, PaperField, AUTHOR_SEPARATOR};
use crate::models::tag::{Tag, TagCount};
use crate::storage::{init_database, open_connection, PaperRepo, StoreError, TagRepo};

pub struct PaperStore {
    config: StoreConfig,
}

impl PaperStore {
    /// Open the store, creating the database file and schema if needed
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        init_database(&config)
            .inspect_err(|e| error!("Error initializing store at {:?}: {}", config.db_path, e))?;
        Ok(Self { config })
    }

    /// Open a store at `db_path` with default settings
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open(StoreConfig::new(db_path))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        open_connection(&self.config)
    }

    /// Insert a new paper, stamping its access date with the current time
    pub fn add_paper(&self, paper: &NewPaper) -> Result<(), StoreError> {
        let result = validate_new_paper(paper).and_then(|()| {
            let conn = self.connect()?;
            PaperRepo::new(&conn).insert(paper, &Utc::now().to_rfc3339())
        });

        match &result {
            Ok(()) => info!("Added paper {}", paper.id),
            Err(e) => error!("Error adding paper {}: {}", paper.id, e),
        }
        result
    }

    /// Fetch a paper with its tags. An unknown id is `Ok(None)`.
    pub fn get_paper(&self, paper_id: &str) -> Result<Option<Paper>, StoreError> {
        self.connect()
            .and_then(|conn| PaperRepo::new(&conn).get(paper_id))
            .inspect_err(|e| error!("Error getting paper {}: {}", paper_id, e))
    }

    /// Case-insensitive substring search over title and abstract.
    ///
    /// `source` is an exact match, `from_date` an inclusive lower bound on
    /// `publication_date` compared as text. An empty `source` or `from_date`
    /// applies no filter. Result order is unspecified.
    pub fn search_papers(
        &self,
        query: &str,
        source: Option<&str>,
        from_date: Option<&str>,
    ) -> Result<Vec<Paper>, StoreError> {
        self.connect()
            .and_then(|conn| PaperRepo::new(&conn).search(query, source, from_date))
            .inspect(|papers| debug!("Search {:?} matched {} papers", query, papers.len()))
            .inspect_err(|e| error!("Error searching papers for {:?}: {}", query, e))
    }

    /// Attach tags to a paper, creating missing tags. All or nothing.
    ///
    /// The paper itself is not looked up; with foreign keys off a link to an
    /// unknown paper id is stored as is.
    pub fn add_tags<S: AsRef<str>>(&self, paper_id: &str, tags: &[S]) -> Result<(), StoreError> {
        let result = self.attach_tags(paper_id, tags);

        match &result {
            Ok(()) => debug!("Tagged paper {} with {} tags", paper_id, tags.len()),
            Err(e) => error!("Error adding tags to {}, rolled back: {}", paper_id, e),
        }
        result
    }

    fn attach_tags<S: AsRef<str>>(&self, paper_id: &str, tags: &[S]) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        TagRepo::new(&tx).attach_all(paper_id, tags)?;
        tx.commit()?;
        Ok(())
    }

    /// Apply an allow-listed partial update.
    ///
    /// Keys outside the allow-list are ignored. `is_paywalled` takes a bool
    /// or the integers 0 and 1. Returns the number of rows changed, which is
    /// 0 for an unknown id.
    pub fn update_paper(
        &self,
        paper_id: &str,
        updates: &Map<String, Value>,
    ) -> Result<usize, StoreError> {
        let result = collect_updates(updates).and_then(|fields| {
            let conn = self.connect()?;
            PaperRepo::new(&conn).update_fields(paper_id, &fields)
        });

        match &result {
            Ok(count) => info!("Updated paper {} ({} rows)", paper_id, count),
            Err(StoreError::NoValidFields) => {
                warn!("Update for paper {} had no updatable fields", paper_id)
            }
            Err(e) => error!("Error updating paper {}: {}", paper_id, e),
        }
        result
    }

    /// Every tag with its paper count, by name
    pub fn list_tags(&self) -> Result<Vec<TagCount>, StoreError> {
        self.connect()
            .and_then(|conn| TagRepo::new(&conn).list_with_counts())
            .inspect_err(|e| error!("Error listing tags: {}", e))
    }

    /// Look up a tag by name
    pub fn find_tag(&self, name: &str) -> Result<Option<Tag>, StoreError> {
        self.connect()
            .and_then(|conn| TagRepo::new(&conn).find(name))
            .inspect_err(|e| error!("Error finding tag {:?}: {}", name, e))
    }

    /// Papers carrying the named tag
    pub fn papers_with_tag(&self, tag: &str) -> Result<Vec<Paper>, StoreError> {
        self.connect()
            .and_then(|conn| PaperRepo::new(&conn).list_by_tag(tag))
            .inspect_err(|e| error!("Error listing papers tagged {:?}: {}", tag, e))
    }

    pub fn paper_exists(&self, paper_id: &str) -> Result<bool, StoreError> {
        self.connect()
            .and_then(|conn| PaperRepo::new(&conn).exists(paper_id))
            .inspect_err(|e| error!("Error checking paper {}: {}", paper_id, e))
    }

    pub fn count_papers(&self) -> Result<i64, StoreError> {
        self.connect()
            .and_then(|conn| PaperRepo::new(&conn).count())
            .inspect_err(|e| error!("Error counting papers: {}", e))
    }

    pub fn count_by_source(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        self.connect()
            .and_then(|conn| PaperRepo::new(&conn).count_by_source())
            .inspect_err(|e| error!("Error counting papers by source: {}", e))
    }
}

fn validate_new_paper(paper: &NewPaper) -> Result<(), StoreError> {
    for (name, value) in [
        ("id", &paper.id),
        ("title", &paper.title),
        ("source", &paper.source),
        ("publication_date", &paper.publication_date),
    ] {
        if value.trim().is_empty() {
            return Err(StoreError::InvalidInput(format!("{} is empty", name)));
        }
    }
    validate_authors(&paper.authors)
}

/// Authors are stored joined by a comma, so a name may not contain one
fn validate_authors(authors: &[String]) -> Result<(), StoreError> {
    if authors.is_empty() {
        return Err(StoreError::InvalidInput("authors is empty".to_string()));
    }
    for author in authors {
        if author.trim().is_empty() {
            return Err(StoreError::InvalidInput("author name is empty".to_string()));
        }
        if author.contains(AUTHOR_SEPARATOR) {
            return Err(StoreError::InvalidInput(format!(
                "author name {:?} contains {:?}",
                author, AUTHOR_SEPARATOR
            )));
        }
    }
    Ok(())
}

/// Keep allow-listed keys and convert their values to column values
fn collect_updates(updates: &Map<String, Value>) -> Result<Vec<(PaperField, SqlValue)>, StoreError> {
    let mut fields = Vec::new();
    for (key, value) in updates {
        match PaperField::from_str(key) {
            Some(field) => fields.push((field, field_value(field, value)?)),
            None => debug!("Ignoring non-updatable field {:?}", key),
        }
    }

    if fields.is_empty() {
        return Err(StoreError::NoValidFields);
    }
    Ok(fields)
}

fn field_value(field: PaperField, value: &Value) -> Result<SqlValue, StoreError> {
    match (field, value) {
        (PaperField::Authors, Value::Array(items)) => {
            let authors = items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        StoreError::InvalidInput(format!("author {} is not a string", item))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            validate_authors(&authors)?;
            Ok(SqlValue::Text(join_authors(&authors)))
        }
        (PaperField::IsPaywalled, Value::Bool(flag)) => Ok(SqlValue::Integer(i64::from(*flag))),
        (PaperField::IsPaywalled, Value::Number(n)) if matches!(n.as_i64(), Some(0 | 1)) => {
            Ok(SqlValue::Integer(i64::from(n.as_i64() == Some(1))))
        }
        (PaperField::Title, Value::String(title)) if title.trim().is_empty() => {
            Err(StoreError::InvalidInput("title is empty".to_string()))
        }
        (field, Value::String(text))
            if !matches!(field, PaperField::Authors | PaperField::IsPaywalled) =>
        {
            Ok(SqlValue::Text(text.clone()))
        }
        (field, Value::Null) if field.nullable() => Ok(SqlValue::Null),
        (field, other) => Err(StoreError::InvalidInput(format!(
            "unexpected value for {}: {}",
            field.as_str(),
            other
        ))),
    }
}
