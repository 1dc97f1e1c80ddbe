use serde::{Deserialize, Serialize};

/// Separator used for the single-column `authors` representation
pub const AUTHOR_SEPARATOR: &str = ",";

/// A stored paper, as read back from the database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub r#abstract: Option<String>,
    pub source: String,
    pub publication_date: String,
    pub access_date: String,

    pub pdf_path: Option<String>,
    pub bibtex_path: Option<String>,
    pub endnote_path: Option<String>,

    #[serde(default)]
    pub is_paywalled: bool,

    pub summary: Option<String>,
    pub implications: Option<String>,
    pub topic_category: Option<String>,
    pub error_log: Option<String>,

    /// Names of attached tags, in join order
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A paper as handed in by the ingestion side. `access_date` is stamped on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPaper {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(default)]
    pub r#abstract: Option<String>,
    pub source: String,
    pub publication_date: String,

    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub bibtex_path: Option<String>,
    #[serde(default)]
    pub endnote_path: Option<String>,

    #[serde(default)]
    pub is_paywalled: bool,

    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub implications: Option<String>,
    #[serde(default)]
    pub topic_category: Option<String>,
    #[serde(default)]
    pub error_log: Option<String>,
}

impl NewPaper {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        authors: Vec<String>,
        source: impl Into<String>,
        publication_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors,
            r#abstract: None,
            source: source.into(),
            publication_date: publication_date.into(),
            pdf_path: None,
            bibtex_path: None,
            endnote_path: None,
            is_paywalled: false,
            summary: None,
            implications: None,
            topic_category: None,
            error_log: None,
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.r#abstract = Some(text.into());
        self
    }

    pub fn with_pdf_path(mut self, path: impl Into<String>) -> Self {
        self.pdf_path = Some(path.into());
        self
    }

    pub fn with_topic_category(mut self, topic: impl Into<String>) -> Self {
        self.topic_category = Some(topic.into());
        self
    }

    pub fn paywalled(mut self, is_paywalled: bool) -> Self {
        self.is_paywalled = is_paywalled;
        self
    }
}

/// Columns of `papers` that may be changed after insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperField {
    Title,
    Authors,
    Abstract,
    PdfPath,
    BibtexPath,
    EndnotePath,
    IsPaywalled,
    Summary,
    Implications,
    TopicCategory,
    ErrorLog,
}

impl PaperField {
    pub const ALL: [PaperField; 11] = [
        PaperField::Title,
        PaperField::Authors,
        PaperField::Abstract,
        PaperField::PdfPath,
        PaperField::BibtexPath,
        PaperField::EndnotePath,
        PaperField::IsPaywalled,
        PaperField::Summary,
        PaperField::Implications,
        PaperField::TopicCategory,
        PaperField::ErrorLog,
    ];

    /// Column name in the `papers` table
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperField::Title => "title",
            PaperField::Authors => "authors",
            PaperField::Abstract => "abstract",
            PaperField::PdfPath => "pdf_path",
            PaperField::BibtexPath => "bibtex_path",
            PaperField::EndnotePath => "endnote_path",
            PaperField::IsPaywalled => "is_paywalled",
            PaperField::Summary => "summary",
            PaperField::Implications => "implications",
            PaperField::TopicCategory => "topic_category",
            PaperField::ErrorLog => "error_log",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == s)
    }

    /// Whether the column accepts NULL
    pub fn nullable(&self) -> bool {
        !matches!(self, PaperField::Title | PaperField::Authors | PaperField::IsPaywalled)
    }
}

pub fn join_authors(authors: &[String]) -> String {
    authors.join(AUTHOR_SEPARATOR)
}

pub fn split_authors(joined: &str) -> Vec<String> {
    joined.split(AUTHOR_SEPARATOR).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authors_join_split() {
        let authors = vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()];
        let joined = join_authors(&authors);
        assert_eq!(joined, "Ada Lovelace,Alan Turing");
        assert_eq!(split_authors(&joined), authors);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(PaperField::from_str("topic_category"), Some(PaperField::TopicCategory));
        assert_eq!(PaperField::from_str("source"), None);
        assert_eq!(PaperField::from_str("id"), None);
        for field in PaperField::ALL {
            assert_eq!(PaperField::from_str(field.as_str()), Some(field));
        }
    }

    #[test]
    fn test_new_paper_defaults() {
        let paper = NewPaper::new("arxiv:1", "T", vec!["A".into()], "arxiv", "2024-01-01");
        assert!(!paper.is_paywalled);
        assert!(paper.r#abstract.is_none());
        assert_eq!(join_authors(&paper.authors), "A");
    }
}
