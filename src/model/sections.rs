//! Typed view over the news list.
//!
//! The stored document is never validated against these; every field is
//! optional and items that fail to parse are skipped.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::Document;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    /// Numbers from the dashboard, strings from older seeds.
    pub id: Option<Value>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub content: Option<String>,
}

impl NewsArticle {
    /// The slug the article is addressed by; falls back to the slugified title.
    pub fn effective_slug(&self) -> Option<String> {
        match (self.slug.as_deref(), self.title.as_deref()) {
            (Some(slug), _) if !slug.is_empty() => Some(slug.to_string()),
            (_, Some(title)) if !title.is_empty() => Some(slug::slugify(title)),
            _ => None,
        }
    }
}

pub fn list<T: DeserializeOwned>(doc: &Document, name: &str) -> Vec<T> {
    match doc.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct NewsEntry {
    pub article: NewsArticle,
    pub previous: Option<NewsArticle>,
    pub next: Option<NewsArticle>,
}

/// Finds an article and its neighbours in list order.
pub fn find_news(doc: &Document, slug: &str) -> Option<NewsEntry> {
    let mut articles = list::<NewsArticle>(doc, "newsArticles");
    let index = articles
        .iter()
        .position(|article| article.effective_slug().as_deref() == Some(slug))?;

    let next = articles.get(index + 1).cloned();
    let previous = index.checked_sub(1).map(|i| articles[i].clone());
    Some(NewsEntry {
        article: articles.swap_remove(index),
        previous,
        next,
    })
}

#[derive(Debug, PartialEq)]
pub enum Violation {
    DuplicateId { section: &'static str, id: Value },
    DuplicateSlug(String),
}

/// Uniqueness conventions the dashboard relies on but nothing enforces.
pub fn check_conventions(doc: &Document) -> Vec<Violation> {
    let mut violations = Vec::new();

    for section in super::LIST_SECTIONS {
        let Some(Value::Array(items)) = doc.get(section) else {
            continue;
        };

        let mut seen = Vec::new();
        for id in items.iter().filter_map(|item| item.get("id")) {
            if seen.contains(&id) {
                violations.push(Violation::DuplicateId {
                    section,
                    id: id.clone(),
                });
            } else {
                seen.push(id);
            }
        }
    }

    let mut slugs = Vec::new();
    for slug in list::<NewsArticle>(doc, "newsArticles")
        .iter()
        .filter_map(|article| article.slug.clone())
    {
        if slugs.contains(&slug) {
            violations.push(Violation::DuplicateSlug(slug));
        } else {
            slugs.push(slug);
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn malformed_items_are_skipped() {
        let doc = doc(json!({"newsArticles": [
            {"id": 1, "title": "kept"},
            {"id": 2, "title": 7},
            "not an item"
        ]}));

        let items: Vec<NewsArticle> = list(&doc, "newsArticles");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("kept"));
    }

    #[test]
    fn news_lookup_reports_neighbours() {
        let doc = doc(json!({"newsArticles": [
            {"id": 1, "slug": "one", "title": "One"},
            {"id": 2, "slug": "two", "title": "Two"},
            {"id": 3, "title": "Third Post"}
        ]}));

        let entry = find_news(&doc, "two").unwrap();
        assert_eq!(entry.article.title.as_deref(), Some("Two"));
        assert_eq!(entry.previous.unwrap().slug.as_deref(), Some("one"));
        assert_eq!(entry.next.unwrap().title.as_deref(), Some("Third Post"));

        let first = find_news(&doc, "one").unwrap();
        assert!(first.previous.is_none());

        let last = find_news(&doc, "third-post").unwrap();
        assert_eq!(last.article.id, Some(json!(3)));
        assert!(last.next.is_none());

        assert!(find_news(&doc, "four").is_none());
    }

    #[test]
    fn duplicate_ids_and_slugs_are_reported() {
        let doc = doc(json!({
            "newsArticles": [
                {"id": 1, "slug": "a"},
                {"id": 1, "slug": "a"}
            ],
            "audioStories": [{"id": "x"}, {"id": "y"}]
        }));

        assert_eq!(
            check_conventions(&doc),
            vec![
                Violation::DuplicateId {
                    section: "newsArticles",
                    id: json!(1)
                },
                Violation::DuplicateSlug(String::from("a")),
            ]
        );
    }
}
