const ELIGIBLE_SEGMENT: &str = "/merch-card/";
const EXCLUDED_SUFFIX: &str = ".json";
const SOURCE_SUFFIX: &str = ".md";

/// One entry of the raw index sheet, in column order.
///
/// `last_modified`, `robots` and `publication_date` stay empty: they carry no
/// meaning for a preview index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRow {
    pub path: String,
    pub title: String,
    pub card_content: String,
    pub last_modified: String,
    pub card_classes: String,
    pub robots: String,
    pub tags: String,
    pub publication_date: String,
}

impl IndexRow {
    pub fn values(&self) -> [&str; 8] {
        [
            &self.path,
            &self.title,
            &self.card_content,
            &self.last_modified,
            &self.card_classes,
            &self.robots,
            &self.tags,
            &self.publication_date,
        ]
    }
}

/// Site-relative path of a published resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn new(path: impl Into<String>) -> Self {
        ResourcePath(path.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only merch-card documents are indexed; sheets (`.json`) never are.
    pub fn is_eligible(&self) -> bool {
        !self.0.is_empty() && self.0.contains(ELIGIBLE_SEGMENT) && !self.0.ends_with(EXCLUDED_SUFFIX)
    }

    /// Index key: the path without its `.md` source suffix.
    pub fn index_key(&self) -> &str {
        self.0.strip_suffix(SOURCE_SUFFIX).unwrap_or(&self.0)
    }
}
