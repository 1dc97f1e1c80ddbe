//! Tag repository for tags and paper-tag assignments

use rusqlite::{params, Connection, OptionalExtension};

use crate::models::tag::{Tag, TagCount};
use super::StoreError;

/// Repository for tags and the `paper_tags` association
pub struct TagRepo<'a> {
    conn: &'a Connection,
}

impl<'a> TagRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a tag by name
    pub fn find(&self, name: &str) -> Result<Option<Tag>, StoreError> {
        let tag = self
            .conn
            .query_row("SELECT id, name FROM tags WHERE name = ?", [name], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(tag)
    }

    /// Create the tag if it does not exist yet and return its id
    pub fn ensure(&self, name: &str) -> Result<i64, StoreError> {
        self.conn
            .execute("INSERT OR IGNORE INTO tags (name) VALUES (?)", [name])?;

        let id = self
            .conn
            .query_row("SELECT id FROM tags WHERE name = ?", [name], |row| row.get(0))?;
        Ok(id)
    }

    /// Link a tag to a paper. Existing links are left alone.
    pub fn attach(&self, paper_id: &str, tag_id: i64) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO paper_tags (paper_id, tag_id) VALUES (?, ?)",
            params![paper_id, tag_id],
        )?;
        Ok(())
    }

    /// Create and link every tag in `names`. The caller owns the transaction.
    pub fn attach_all<S: AsRef<str>>(&self, paper_id: &str, names: &[S]) -> Result<(), StoreError> {
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                return Err(StoreError::InvalidInput("tag name is empty".to_string()));
            }
            let tag_id = self.ensure(name)?;
            self.attach(paper_id, tag_id)?;
        }
        Ok(())
    }

    /// Names of the tags attached to a paper
    pub fn names_for_paper(&self, paper_id: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name
             FROM tags t
             JOIN paper_tags pt ON t.id = pt.tag_id
             WHERE pt.paper_id = ?",
        )?;

        let rows = stmt.query_map([paper_id], |row| row.get(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    /// All tags with the number of papers carrying them
    pub fn list_with_counts(&self) -> Result<Vec<TagCount>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name, COUNT(pt.paper_id) as paper_count
             FROM tags t
             LEFT JOIN paper_tags pt ON t.id = pt.tag_id
             GROUP BY t.id
             ORDER BY t.name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(TagCount {
                name: row.get(0)?,
                paper_count: row.get(1)?,
            })
        })?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::storage::{init_database, open_connection};
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Connection) {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("papers.db"));
        init_database(&config).unwrap();
        let conn = open_connection(&config).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let (_dir, conn) = setup();
        let repo = TagRepo::new(&conn);

        let first = repo.ensure("graphs").unwrap();
        let second = repo.ensure("graphs").unwrap();
        assert_eq!(first, second);

        let tag = repo.find("graphs").unwrap().unwrap();
        assert_eq!(tag.id, first);
        assert!(repo.find("missing").unwrap().is_none());
    }

    #[test]
    fn test_attach_and_list() {
        let (_dir, conn) = setup();
        let repo = TagRepo::new(&conn);

        repo.attach_all("p1", &["ml".to_string(), "graphs".to_string()]).unwrap();
        repo.attach_all("p2", &["ml".to_string()]).unwrap();
        repo.attach_all("p2", &["ml".to_string()]).unwrap();

        let mut names = repo.names_for_paper("p1").unwrap();
        names.sort();
        assert_eq!(names, vec!["graphs", "ml"]);

        let counts = repo.list_with_counts().unwrap();
        assert_eq!(
            counts,
            vec![
                TagCount { name: "graphs".to_string(), paper_count: 1 },
                TagCount { name: "ml".to_string(), paper_count: 2 },
            ]
        );
    }

    #[test]
    fn test_empty_tag_name_rejected() {
        let (_dir, conn) = setup();
        let repo = TagRepo::new(&conn);

        let err = repo.attach_all("p1", &["  ".to_string()]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }
}
