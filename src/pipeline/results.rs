//! The parse service's reply and how it is painted.
//!
//! Sections are shown in the order the server sent them. `importance_rank`
//! is displayed as given and never used to reorder the list.

use crate::view::{ResultItem, View, EMPTY_RESULTS_MESSAGE};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One detected section of the uploaded document.
///
/// Fields are kept as the server sent them. A missing field is `None`, an
/// explicit `null` is `Some(Value::Null)`, and neither stops the rest of the
/// reply from rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSection {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub importance_rank: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub section_title: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub page_number: Option<Value>,
}

impl ExtractedSection {
    /// A well-formed section.
    pub fn new(rank: i64, title: &str, document: &str, page: i64) -> Self {
        Self {
            importance_rank: Some(Value::from(rank)),
            section_title: Some(Value::from(title)),
            document: Some(Value::from(document)),
            page_number: Some(Value::from(page)),
        }
    }

    /// The list item for this section.
    pub fn to_item(&self) -> ResultItem {
        ResultItem {
            title: format!(
                "{}. {}",
                field_text(&self.importance_rank),
                field_text(&self.section_title)
            ),
            meta: format!(
                "{} - Page {}",
                field_text(&self.document),
                field_text(&self.page_number)
            ),
        }
    }
}

// A field that is present deserialises to `Some`, even when it is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Text of a reply field as the list shows it: strings verbatim, whole
/// numbers without a fraction, `null` and `undefined` for null and absent.
pub fn field_text(field: &Option<Value>) -> String {
    match field {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Run details the service reports alongside the sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseMetadata {
    pub input_document: Option<String>,
    pub persona: Option<String>,
    pub job_to_be_done: Option<String>,
    pub processing_timestamp: Option<String>,
    pub mode: Option<String>,
}

/// A refined passage from one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedChunk {
    pub refined_text: String,
    #[serde(default)]
    pub score: f64,
}

/// Refined passages grouped by document page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub page_number: i64,
    #[serde(default)]
    pub refined_chunks: Vec<RefinedChunk>,
}

/// Body of a `/api/parse` reply. Every field is optional; unknown fields
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseResponse {
    pub extracted_sections: Option<Vec<ExtractedSection>>,
    pub metadata: Option<ResponseMetadata>,
    pub subsection_analysis: Option<Vec<SubsectionAnalysis>>,
}

impl ParseResponse {
    /// Sections in server order; empty when the field was absent.
    pub fn sections(&self) -> &[ExtractedSection] {
        self.extracted_sections.as_deref().unwrap_or_default()
    }
}

/// Replace the results list with `response`'s sections.
pub fn render_results(response: &ParseResponse, view: &mut dyn View) {
    view.clear_results();

    let sections = response.sections();
    if sections.is_empty() {
        view.show_empty_results(EMPTY_RESULTS_MESSAGE);
        return;
    }

    for section in sections {
        view.append_result(section.to_item());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::PageState;

    #[test]
    fn item_text_matches_list_format() {
        let s = ExtractedSection::new(3, "Related Work", "paper.pdf", 7);
        let item = s.to_item();
        assert_eq!(item.title, "3. Related Work");
        assert_eq!(item.meta, "paper.pdf - Page 7");
    }

    #[test]
    fn missing_field_and_empty_list_both_show_placeholder() {
        for body in [r#"{}"#, r#"{"extracted_sections": []}"#, r#"{"extracted_sections": null}"#] {
            let resp: ParseResponse = serde_json::from_str(body).unwrap();
            let mut page = PageState::new();
            render_results(&resp, &mut page);
            assert_eq!(page.empty_results_message(), Some(EMPTY_RESULTS_MESSAGE), "{body}");
            assert!(page.results().is_empty(), "{body}");
        }
    }

    #[test]
    fn server_order_is_kept() {
        let resp: ParseResponse = serde_json::from_str(
            r#"{"extracted_sections": [
                {"importance_rank": 2, "section_title": "Intro", "document": "a.pdf", "page_number": 1},
                {"importance_rank": 1, "section_title": "Methods", "document": "a.pdf", "page_number": 3}
            ]}"#,
        )
        .unwrap();

        let mut page = PageState::new();
        render_results(&resp, &mut page);

        let titles: Vec<&str> = page.results().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["2. Intro", "1. Methods"]);
        assert_eq!(page.results()[1].meta, "a.pdf - Page 3");
        assert!(page.empty_results_message().is_none());
    }

    #[test]
    fn rerender_replaces_previous_results() {
        let mut page = PageState::new();
        let full = ParseResponse {
            extracted_sections: Some(vec![ExtractedSection::new(1, "Abstract", "b.pdf", 1)]),
            ..Default::default()
        };
        render_results(&full, &mut page);
        render_results(&ParseResponse::default(), &mut page);
        assert!(page.results().is_empty());
        assert_eq!(page.empty_results_message(), Some(EMPTY_RESULTS_MESSAGE));
    }

    #[test]
    fn full_service_reply_deserialises() {
        let resp: ParseResponse = serde_json::from_str(
            r#"{
                "metadata": {"input_document": "a.pdf", "persona": "general reader",
                             "job_to_be_done": "extract key sections", "mode": "api",
                             "processing_timestamp": "2026-10-18T09:00:00"},
                "extracted_sections": [],
                "subsection_analysis": [
                    {"document": "a.pdf", "page_number": 2,
                     "refined_chunks": [{"refined_text": "We propose…", "score": 0.82}]}
                ],
                "server_version": "ignored"
            }"#,
        )
        .unwrap();
        let meta = resp.metadata.as_ref().unwrap();
        assert_eq!(meta.persona.as_deref(), Some("general reader"));
        let subs = resp.subsection_analysis.as_ref().unwrap();
        assert_eq!(subs[0].refined_chunks[0].score, 0.82);
    }

    #[test]
    fn malformed_entry_renders_alongside_valid_ones() {
        let resp: ParseResponse = serde_json::from_str(
            r#"{"extracted_sections": [
                {"importance_rank": 1, "section_title": "Intro", "document": "a.pdf", "page_number": 1},
                {"importance_rank": 2, "section_title": "Appendix", "document": "a.pdf", "page_number": null},
                {"importance_rank": 3.0, "document": "a.pdf", "page_number": "iv"}
            ]}"#,
        )
        .unwrap();

        let mut page = PageState::new();
        render_results(&resp, &mut page);

        let items: Vec<(&str, &str)> = page
            .results()
            .iter()
            .map(|r| (r.title.as_str(), r.meta.as_str()))
            .collect();
        assert_eq!(
            items,
            [
                ("1. Intro", "a.pdf - Page 1"),
                ("2. Appendix", "a.pdf - Page null"),
                ("3. undefined", "a.pdf - Page iv"),
            ]
        );
    }

    #[test]
    fn absent_fields_are_not_serialised() {
        let s = ExtractedSection {
            section_title: Some(Value::from("Intro")),
            page_number: Some(Value::Null),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&s).unwrap(),
            r#"{"section_title":"Intro","page_number":null}"#
        );
    }
}
