use paperlens_ai::RefinedMetadata;
use paperlens_core::models::paper::is_plausible_year;

use crate::extract::heuristics::{DEFAULT_TITLE, HeuristicMetadata};

/// Title the model returns when it could not find one.
pub const MODEL_PLACEHOLDER_TITLE: &str = "Untitled";

/// Bibliographic fields from one source; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
}

impl From<&HeuristicMetadata> for PartialMetadata {
    fn from(value: &HeuristicMetadata) -> Self {
        Self {
            title: Some(value.title.clone()),
            authors: value.authors.clone(),
            year: value.year,
        }
    }
}

impl From<RefinedMetadata> for PartialMetadata {
    fn from(value: RefinedMetadata) -> Self {
        Self {
            title: value.title,
            authors: value.authors,
            year: value.year,
        }
    }
}

/// Result of overlaying sources: title and authors are always populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub fields_from_overlay: Vec<&'static str>,
}

impl PartialMetadata {
    fn usable_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(MODEL_PLACEHOLDER_TITLE))
    }

    fn usable_year(&self) -> Option<i32> {
        self.year.filter(|y| is_plausible_year(*y))
    }
}

/// Field-by-field overlay: a usable `top` field replaces the `base` one,
/// anything else keeps `base`. Usable means a non-empty title other than
/// `"Untitled"`, a non-empty author list, or a year within [1900, 2100].
pub fn overlay(base: &PartialMetadata, top: &PartialMetadata) -> MergedMetadata {
    let mut fields_from_overlay = Vec::new();

    let title = match top.usable_title() {
        Some(title) => {
            fields_from_overlay.push("title");
            title.to_string()
        }
        None => base.usable_title().unwrap_or(DEFAULT_TITLE).to_string(),
    };

    let authors = if top.authors.is_empty() {
        base.authors.clone()
    } else {
        fields_from_overlay.push("authors");
        top.authors.clone()
    };

    let year = match top.usable_year() {
        Some(year) => {
            fields_from_overlay.push("year");
            Some(year)
        }
        None => base.usable_year(),
    };

    MergedMetadata {
        title,
        authors,
        year,
        fields_from_overlay,
    }
}

/// Heuristics overlaid with the model's proposal, when there is one.
pub fn merge_refined(heuristic: &HeuristicMetadata, refined: Option<RefinedMetadata>) -> MergedMetadata {
    let base = PartialMetadata::from(heuristic);
    let top = refined.map(PartialMetadata::from).unwrap_or_default();
    overlay(&base, &top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::heuristics::UNKNOWN_AUTHOR;

    fn heuristic(title: &str, year: Option<i32>) -> HeuristicMetadata {
        HeuristicMetadata {
            title: title.to_string(),
            authors: vec![UNKNOWN_AUTHOR.to_string()],
            abstract_text: "abstract".to_string(),
            year,
        }
    }

    fn refined(title: Option<&str>, authors: &[&str], year: Option<i32>) -> RefinedMetadata {
        RefinedMetadata {
            title: title.map(ToOwned::to_owned),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year,
        }
    }

    #[test]
    fn model_title_replaces_default_title() {
        let merged = merge_refined(
            &heuristic(DEFAULT_TITLE, None),
            Some(refined(Some("Real Title"), &[], None)),
        );
        assert_eq!(merged.title, "Real Title");
        assert_eq!(merged.fields_from_overlay, vec!["title"]);
    }

    #[test]
    fn untitled_from_model_keeps_heuristic() {
        let merged = merge_refined(
            &heuristic("Heuristic Title Line", None),
            Some(refined(Some("Untitled"), &[], None)),
        );
        assert_eq!(merged.title, "Heuristic Title Line");
    }

    #[test]
    fn failed_refinement_keeps_everything() {
        let merged = merge_refined(&heuristic("Heuristic Title Line", Some(2019)), None);
        assert_eq!(merged.title, "Heuristic Title Line");
        assert_eq!(merged.authors, vec![UNKNOWN_AUTHOR]);
        assert_eq!(merged.year, Some(2019));
        assert!(merged.fields_from_overlay.is_empty());
    }

    #[test]
    fn fields_merge_independently() {
        let merged = merge_refined(
            &heuristic("Heuristic Title Line", Some(2019)),
            Some(refined(None, &["Ada Lovelace", "Charles Babbage"], Some(1843))),
        );
        assert_eq!(merged.title, "Heuristic Title Line");
        assert_eq!(merged.authors, vec!["Ada Lovelace", "Charles Babbage"]);
        assert_eq!(merged.year, Some(2019));
        assert_eq!(merged.fields_from_overlay, vec!["authors"]);
    }

    #[test]
    fn model_year_overrides_heuristic_year() {
        let merged = merge_refined(
            &heuristic("Heuristic Title Line", Some(2019)),
            Some(refined(None, &[], Some(2017))),
        );
        assert_eq!(merged.year, Some(2017));
    }
}
