/*!
Selection of the catalog items presented to a reviewer.

The filters are applied in order: level, then each category filter, then the
free-text search over the content column.
*/

use log::debug;
use serde_json::Value as JSValue;
use std::collections::BTreeSet;

use crate::config::*;

#[derive(PartialEq, Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Keep only the rows whose column has this value.
    pub level: Option<(String, JSValue)>,
    /// (column, displayed value) pairs that must all match.
    pub categories: Vec<(String, String)>,
    /// Case-insensitive substring searched in the content column.
    pub search: Option<String>,
    pub content_column: String,
}

impl CatalogFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if let Some((column, level)) = &self.level {
            if item.get(column) != Some(level) {
                return false;
            }
        }
        let categories_ok = self
            .categories
            .iter()
            .all(|(column, value)| item.display(column) == *value);
        if !categories_ok {
            return false;
        }
        match &self.search {
            Some(needle) if !needle.trim().is_empty() => item
                .display(&self.content_column)
                .to_lowercase()
                .contains(&needle.trim().to_lowercase()),
            _ => true,
        }
    }

    /// The same filter without any category or search restriction.
    /// Used to compute the options of the category selectors.
    pub fn level_only(&self) -> CatalogFilter {
        CatalogFilter {
            level: self.level.clone(),
            categories: vec![],
            search: None,
            content_column: self.content_column.clone(),
        }
    }
}

pub fn filter_items(items: &[Item], filter: &CatalogFilter) -> Vec<Item> {
    let res: Vec<Item> = items.iter().filter(|it| filter.matches(it)).cloned().collect();
    debug!(
        "filter_items: kept {} of {} items with {:?}",
        res.len(),
        items.len(),
        filter
    );
    res
}

/// The sorted distinct values of a column, as shown in a category selector.
/// Empty values are not offered.
pub fn distinct_values(items: &[Item], column: &str) -> Vec<String> {
    let values: BTreeSet<String> = items
        .iter()
        .map(|it| it.display(column))
        .filter(|s| !s.is_empty())
        .collect();
    values.into_iter().collect()
}

/// Number of items and number of distinct values per category column.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CatalogStats {
    pub total: usize,
    pub distinct: Vec<(String, usize)>,
}

pub fn catalog_stats(items: &[Item], category_columns: &[String]) -> CatalogStats {
    CatalogStats {
        total: items.len(),
        distinct: category_columns
            .iter()
            .map(|c| (c.clone(), distinct_values(items, c).len()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(position: usize, nivel: i64, dim: &str, sub: &str, text: &str) -> Item {
        let fields = json!({
            "nivel": nivel,
            "dimensao_padrao": dim,
            "subdimensao": sub,
            "texto_completo": text,
        });
        Item {
            position,
            fields: fields.as_object().unwrap().clone(),
        }
    }

    fn sample() -> Vec<Item> {
        vec![
            item(0, 3, "Capacidades", "Talento", "Header row"),
            item(1, 4, "Capacidades", "Talento", "Existe un plan de formación"),
            item(2, 4, "Capacidades", "Datos", "Se publican datos abiertos"),
            item(3, 4, "Resultados", "Impacto", "Se mide el impacto de los PLANES"),
        ]
    }

    fn level_four() -> CatalogFilter {
        CatalogFilter {
            level: Some(("nivel".to_string(), json!(4))),
            content_column: "texto_completo".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn level_filter() {
        let res = filter_items(&sample(), &level_four());
        let positions: Vec<usize> = res.iter().map(|it| it.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn category_and_search() {
        let mut f = level_four();
        f.categories = vec![("dimensao_padrao".to_string(), "Capacidades".to_string())];
        assert_eq!(filter_items(&sample(), &f).len(), 2);

        let mut f = level_four();
        f.search = Some("plan".to_string());
        let positions: Vec<usize> = filter_items(&sample(), &f)
            .iter()
            .map(|it| it.position)
            .collect();
        assert_eq!(positions, vec![1, 3]);
    }

    #[test]
    fn options_and_stats() {
        let items = filter_items(&sample(), &level_four());
        assert_eq!(
            distinct_values(&items, "dimensao_padrao"),
            vec!["Capacidades".to_string(), "Resultados".to_string()]
        );
        let stats = catalog_stats(
            &items,
            &["dimensao_padrao".to_string(), "subdimensao".to_string()],
        );
        assert_eq!(stats.total, 3);
        assert_eq!(
            stats.distinct,
            vec![
                ("dimensao_padrao".to_string(), 2),
                ("subdimensao".to_string(), 3)
            ]
        );
    }
}
