//! Paper repository for database operations on papers

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

use crate::models::paper::{join_authors, split_authors, NewPaper, Paper, PaperField};
use super::tag_repo::TagRepo;
use super::StoreError;

const PAPER_COLUMNS: &str = "id, title, authors, abstract, source, publication_date, access_date,
    pdf_path, bibtex_path, endnote_path, is_paywalled, summary, implications,
    topic_category, error_log";

/// Repository for Paper operations
pub struct PaperRepo<'a> {
    conn: &'a Connection,
}

impl<'a> PaperRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a paper by id, with its tags
    pub fn get(&self, id: &str) -> Result<Option<Paper>, StoreError> {
        let sql = format!("SELECT {} FROM papers WHERE id = ?", PAPER_COLUMNS);
        let paper = self
            .conn
            .query_row(&sql, [id], row_to_paper)
            .optional()?;

        match paper {
            Some(mut paper) => {
                paper.tags = TagRepo::new(self.conn).names_for_paper(&paper.id)?;
                Ok(Some(paper))
            }
            None => Ok(None),
        }
    }

    /// Insert a new paper. A duplicate id is a constraint violation.
    pub fn insert(&self, paper: &NewPaper, access_date: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO papers (
                id, title, authors, abstract, source,
                publication_date, access_date, pdf_path,
                bibtex_path, endnote_path, is_paywalled,
                summary, implications, topic_category, error_log
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                paper.id,
                paper.title,
                join_authors(&paper.authors),
                paper.r#abstract,
                paper.source,
                paper.publication_date,
                access_date,
                paper.pdf_path,
                paper.bibtex_path,
                paper.endnote_path,
                paper.is_paywalled,
                paper.summary,
                paper.implications,
                paper.topic_category,
                paper.error_log,
            ],
        )?;
        Ok(())
    }

    /// Set the given columns on one paper. Returns the number of rows changed.
    pub fn update_fields(
        &self,
        id: &str,
        fields: &[(PaperField, SqlValue)],
    ) -> Result<usize, StoreError> {
        if fields.is_empty() {
            return Err(StoreError::NoValidFields);
        }

        let assignments: Vec<String> = fields
            .iter()
            .map(|(field, _)| format!("{} = ?", field.as_str()))
            .collect();
        let sql = format!("UPDATE papers SET {} WHERE id = ?", assignments.join(", "));

        let mut values: Vec<SqlValue> = fields.iter().map(|(_, value)| value.clone()).collect();
        values.push(SqlValue::Text(id.to_string()));

        let count = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(count)
    }

    /// Substring search over title and abstract, optionally narrowed by
    /// exact source and an inclusive lower bound on publication date.
    /// An empty `source` or `from_date` means no filter.
    pub fn search(
        &self,
        query: &str,
        source: Option<&str>,
        from_date: Option<&str>,
    ) -> Result<Vec<Paper>, StoreError> {
        let pattern = format!("%{}%", escape_like(query));

        let mut sql = format!(
            "SELECT {} FROM papers
             WHERE (title LIKE ?1 ESCAPE '\\' OR abstract LIKE ?1 ESCAPE '\\')",
            PAPER_COLUMNS
        );
        let mut values = vec![pattern];

        if let Some(source) = source.filter(|s| !s.is_empty()) {
            values.push(source.to_string());
            sql.push_str(&format!(" AND source = ?{}", values.len()));
        }

        if let Some(from_date) = from_date.filter(|d| !d.is_empty()) {
            values.push(from_date.to_string());
            sql.push_str(&format!(" AND publication_date >= ?{}", values.len()));
        }

        self.query_papers(&sql, params_from_iter(values.iter()))
    }

    /// Papers carrying the named tag
    pub fn list_by_tag(&self, tag: &str) -> Result<Vec<Paper>, StoreError> {
        let sql = format!(
            "SELECT {} FROM papers
             WHERE id IN (
                SELECT pt.paper_id FROM paper_tags pt
                JOIN tags t ON t.id = pt.tag_id
                WHERE t.name = ?
             )",
            PAPER_COLUMNS
        );
        self.query_papers(&sql, [tag])
    }

    /// Check if a paper exists
    pub fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM papers WHERE id = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count papers per source
    pub fn count_by_source(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, COUNT(*) FROM papers GROUP BY source")?;

        let rows = stmt.query_map([], |row| {
            let source: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((source, count))
        })?;

        let mut by_source = BTreeMap::new();
        for row in rows {
            let (source, count) = row?;
            by_source.insert(source, count);
        }
        Ok(by_source)
    }

    // Helper methods

    fn query_papers<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Paper>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_paper)?;

        let mut papers = Vec::new();
        for row in rows {
            papers.push(row?);
        }

        let tags = TagRepo::new(self.conn);
        for paper in &mut papers {
            paper.tags = tags.names_for_paper(&paper.id)?;
        }

        Ok(papers)
    }
}

fn row_to_paper(row: &Row) -> rusqlite::Result<Paper> {
    let authors: String = row.get("authors")?;

    Ok(Paper {
        id: row.get("id")?,
        title: row.get("title")?,
        authors: split_authors(&authors),
        r#abstract: row.get("abstract")?,
        source: row.get("source")?,
        publication_date: row.get("publication_date")?,
        access_date: row.get("access_date")?,
        pdf_path: row.get("pdf_path")?,
        bibtex_path: row.get("bibtex_path")?,
        endnote_path: row.get("endnote_path")?,
        is_paywalled: row.get::<_, Option<bool>>("is_paywalled")?.unwrap_or(false),
        summary: row.get("summary")?,
        implications: row.get("implications")?,
        topic_category: row.get("topic_category")?,
        error_log: row.get("error_log")?,
        tags: Vec::new(), // Loaded separately
    })
}

/// Make `%`, `_` and the escape character itself match literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
