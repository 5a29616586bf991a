//! Client-side filtering and autocomplete over the in-memory city list.

use crate::model::{CityRef, ZoneFilter};

/// Default number of autocomplete suggestions
pub const SUGGESTION_LIMIT: usize = 5;

/// Free-text + zone filter state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityQuery {
    pub text: String,
    pub zone: ZoneFilter,
}

fn contains_folded(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Cities matching the query, in input order. Text matches name or
/// region, case-insensitively.
pub fn filter(cities: &[CityRef], query: &CityQuery) -> Vec<CityRef> {
    let text = query.text.trim().to_lowercase();
    cities
        .iter()
        .filter(|c| text.is_empty() || contains_folded(&c.name, &text) || contains_folded(&c.region, &text))
        .filter(|c| query.zone.matches(c.zone))
        .cloned()
        .collect()
}

/// Up to `limit` cities whose name contains `text`, in input order
pub fn suggest(cities: &[CityRef], text: &str, limit: usize) -> Vec<CityRef> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Vec::new();
    }
    cities
        .iter()
        .filter(|c| contains_folded(&c.name, &text))
        .take(limit)
        .cloned()
        .collect()
}

/// Text input with a suggestion list that hides itself once a city is committed
#[derive(Debug, Clone)]
pub struct Autocomplete {
    text: String,
    committed: Option<CityRef>,
    /// Highlighted suggestion
    cursor: usize,
    limit: usize,
}

impl Default for Autocomplete {
    fn default() -> Self {
        Self {
            text: String::new(),
            committed: None,
            cursor: 0,
            limit: SUGGESTION_LIMIT,
        }
    }
}

impl Autocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn committed(&self) -> Option<&CityRef> {
        self.committed.as_ref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the text; editing always drops a committed selection.
    /// Returns true when that happened.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        self.text = text.into();
        self.cursor = 0;
        self.committed.take().is_some()
    }

    pub fn push(&mut self, ch: char) -> bool {
        let mut text = std::mem::take(&mut self.text);
        text.push(ch);
        self.set_text(text)
    }

    pub fn backspace(&mut self) -> bool {
        let mut text = std::mem::take(&mut self.text);
        text.pop();
        self.set_text(text)
    }

    /// Commit a city: the text becomes its name and suggestions are suppressed
    pub fn commit(&mut self, city: CityRef) {
        self.text = city.name.clone();
        self.committed = Some(city);
        self.cursor = 0;
    }

    pub fn clear(&mut self) -> bool {
        self.set_text(String::new())
    }

    /// Current suggestions; empty while a committed name is shown unedited
    pub fn suggestions(&self, cities: &[CityRef]) -> Vec<CityRef> {
        if let Some(city) = &self.committed {
            if city.name == self.text {
                return Vec::new();
            }
        }
        suggest(cities, &self.text, self.limit)
            .into_iter()
            .filter(|c| self.committed.as_ref().map_or(true, |sel| sel.name != c.name))
            .collect()
    }

    pub fn move_cursor(&mut self, delta: isize, available: usize) {
        if available == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as isize + delta).rem_euclid(available as isize) as usize;
    }

    /// Commit the highlighted suggestion, if any
    pub fn accept(&mut self, cities: &[CityRef]) -> Option<CityRef> {
        let city = self.suggestions(cities).into_iter().nth(self.cursor)?;
        self.commit(city.clone());
        Some(city)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{city, mumbai_delhi};
    use crate::model::Zone;
    use std::sync::Arc;

    fn names(cities: &[CityRef]) -> Vec<&str> {
        cities.iter().map(|c| c.name.as_str()).collect()
    }

    fn many() -> Vec<CityRef> {
        vec![
            city(1, "New Delhi", "Delhi", 28.61, 77.2, Zone::HighRisk),
            city(2, "Mumbai", "Maharashtra", 19.07, 72.87, Zone::Safe),
            city(3, "Pune", "Maharashtra", 18.52, 73.85, Zone::Safe),
            city(4, "Nagpur", "Maharashtra", 21.14, 79.08, Zone::Moderate),
            city(5, "Navi Mumbai", "Maharashtra", 19.03, 73.02, Zone::Safe),
            city(6, "Nashik", "Maharashtra", 19.99, 73.78, Zone::Moderate),
            city(7, "Nanded", "Maharashtra", 19.13, 77.32, Zone::Moderate),
            city(8, "Nellore", "Andhra Pradesh", 14.44, 79.98, Zone::Safe),
        ]
    }

    #[test]
    fn test_empty_query_returns_input_unchanged() {
        let cities = many();
        let out = filter(&cities, &CityQuery::default());
        assert_eq!(out.len(), cities.len());
        assert!(out.iter().zip(&cities).all(|(a, b)| Arc::ptr_eq(a, b)));
    }

    #[test]
    fn test_text_match_is_case_insensitive_substring() {
        let cities = vec![
            city(1, "New Delhi", "Delhi NCR", 28.61, 77.2, Zone::HighRisk),
            city(2, "Mumbai", "Maharashtra", 19.07, 72.87, Zone::Safe),
        ];
        let query = CityQuery {
            text: "delhi".into(),
            zone: ZoneFilter::All,
        };
        assert_eq!(names(&filter(&cities, &query)), vec!["New Delhi"]);
    }

    #[test]
    fn test_text_matches_region() {
        let query = CityQuery {
            text: "MAHARASHTRA".into(),
            zone: ZoneFilter::All,
        };
        assert_eq!(filter(&many(), &query).len(), 6);
    }

    #[test]
    fn test_zone_filter_combines_with_text() {
        let query = CityQuery {
            text: "mumbai".into(),
            zone: ZoneFilter::Only(Zone::Safe),
        };
        assert_eq!(names(&filter(&many(), &query)), vec!["Mumbai", "Navi Mumbai"]);

        let green = CityQuery {
            text: String::new(),
            zone: ZoneFilter::Only(Zone::Safe),
        };
        assert_eq!(names(&filter(&mumbai_delhi(), &green)), vec!["Mumbai"]);
    }

    #[test]
    fn test_suggest_respects_limit_and_order() {
        let out = suggest(&many(), "n", SUGGESTION_LIMIT);
        assert_eq!(out.len(), SUGGESTION_LIMIT);
        assert_eq!(names(&out), vec!["New Delhi", "Pune", "Nagpur", "Navi Mumbai", "Nashik"]);
        assert!(suggest(&many(), "   ", 5).is_empty());
        assert!(suggest(&many(), "pun", 0).is_empty());
    }

    #[test]
    fn test_committed_selection_suppresses_suggestions() {
        let cities = many();
        let mut input = Autocomplete::new();
        input.set_text("mumb");
        assert_eq!(names(&input.suggestions(&cities)), vec!["Mumbai", "Navi Mumbai"]);

        let chosen = input.accept(&cities).unwrap();
        assert_eq!(chosen.name, "Mumbai");
        assert_eq!(input.text(), "Mumbai");
        assert!(input.suggestions(&cities).is_empty());

        // editing re-enables suggestions and drops the commitment
        assert!(input.backspace());
        assert!(input.committed().is_none());
        assert!(!input.suggestions(&cities).is_empty());
    }

    #[test]
    fn test_committed_name_never_suggested() {
        let cities = many();
        let mut input = Autocomplete::new();
        input.commit(cities[1].clone());
        // same text as another city's substring, but commitment still shown
        for c in input.suggestions(&cities) {
            assert_ne!(c.name, "Mumbai");
        }
    }

    #[test]
    fn test_cursor_wraps() {
        let cities = many();
        let mut input = Autocomplete::new();
        input.set_text("n");
        let n = input.suggestions(&cities).len();
        input.move_cursor(-1, n);
        assert_eq!(input.cursor(), n - 1);
        assert_eq!(input.accept(&cities).unwrap().name, "Nashik");
    }
}
