//! Structured document bodies and header edits
//!
//! [`DocBody`] mirrors the structural JSON returned by the document provider for a
//! single document: paragraphs and tables, with pending suggestions recorded as
//! suggestion ids on each element. [`DocEdit`] is the batch of structural edits the
//! lifecycle sends back when it rewrites a header.

use docflow_core::constants::HEADER_TABLE_MAX_START_INDEX;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocBody {
    pub document_id: String,
    pub title: String,
    pub body: Body,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Body {
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructuralElement {
    pub start_index: i64,
    pub end_index: i64,
    pub paragraph: Option<Paragraph>,
    pub table: Option<Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Table {
    pub rows: i64,
    pub columns: i64,
    pub table_rows: Vec<TableRow>,
    pub suggested_insertion_ids: Vec<String>,
    pub suggested_deletion_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableRow {
    pub table_cells: Vec<TableCell>,
    pub suggested_insertion_ids: Vec<String>,
    pub suggested_deletion_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableCell {
    pub content: Vec<StructuralElement>,
    pub suggested_insertion_ids: Vec<String>,
    pub suggested_deletion_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Paragraph {
    pub elements: Vec<ParagraphElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParagraphElement {
    pub start_index: i64,
    pub end_index: i64,
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextRun {
    pub content: String,
    pub suggested_insertion_ids: Vec<String>,
    pub suggested_deletion_ids: Vec<String>,
    pub suggested_text_style_changes: BTreeMap<String, serde_json::Value>,
}

impl TextRun {
    pub fn has_suggestions(&self) -> bool {
        !self.suggested_insertion_ids.is_empty()
            || !self.suggested_deletion_ids.is_empty()
            || !self.suggested_text_style_changes.is_empty()
    }
}

impl DocBody {
    /// First table element of the body, with its position.
    pub fn first_table(&self) -> Option<(&StructuralElement, &Table)> {
        self.body
            .content
            .iter()
            .find_map(|e| e.table.as_ref().map(|t| (e, t)))
    }

    /// The document header: the first table, if it starts near the top of the body.
    pub fn header_table(&self) -> Option<(&StructuralElement, &Table)> {
        self.first_table()
            .filter(|(element, _)| element.start_index < HEADER_TABLE_MAX_START_INDEX)
    }
}

/// One row of a rendered header. A single cell spans both columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRow {
    pub cells: Vec<String>,
}

impl HeaderRow {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            cells: vec![text.into()],
        }
    }

    pub fn split(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            cells: vec![left.into(), right.into()],
        }
    }

    pub fn blank() -> Self {
        Self::full(String::new())
    }
}

/// Structural edit applied through `DocumentStorage::update_doc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocEdit {
    DeleteContentRange { start_index: i64, end_index: i64 },
    InsertHeaderTable { index: i64, rows: Vec<HeaderRow> },
}
