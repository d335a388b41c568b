//! The working-memory document.
//!
//! A single mutable document per agent, treated as opaque `field: value`
//! lines by the engine. The LLM rewrites it through the working-memory tool;
//! the engine validates size only. Updating the same field with the same
//! value is idempotent.

use engram_core::agent::WORKING_MEMORY_SIZE_MAX;
use engram_core::error::MemoryError;

/// A size-capped key-value text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDocument {
    text: String,
}

impl WorkingDocument {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn size_bytes(&self) -> usize {
        self.text.len()
    }

    /// Set `field` to `value`: replaces the existing `field: ...` line or
    /// appends a new one. Fails without mutating when the updated document
    /// would exceed the size cap.
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), MemoryError> {
        let field = field.trim();
        let new_line = format!("{field}: {value}");

        let mut replaced = false;
        let mut lines: Vec<String> = self
            .text
            .lines()
            .map(|line| {
                if !replaced && line_field(line) == Some(field) {
                    replaced = true;
                    new_line.clone()
                } else {
                    line.to_string()
                }
            })
            .collect();

        if !replaced {
            lines.push(new_line);
        }

        let updated = lines.join("\n");
        if updated.len() > WORKING_MEMORY_SIZE_MAX {
            return Err(MemoryError::WorkingMemoryTooLarge {
                size: updated.len(),
                cap: WORKING_MEMORY_SIZE_MAX,
            });
        }

        self.text = updated;
        Ok(())
    }
}

fn line_field(line: &str) -> Option<&str> {
    line.split_once(':').map(|(field, _)| field.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_appends_new_field() {
        let mut doc = WorkingDocument::from_text("status: ready");
        doc.set("user_name", "Todd").unwrap();
        assert_eq!(doc.as_str(), "status: ready\nuser_name: Todd");
    }

    #[test]
    fn set_replaces_existing_field() {
        let mut doc = WorkingDocument::from_text("status: ready\nuser_name: Todd");
        doc.set("status", "busy").unwrap();
        assert_eq!(doc.as_str(), "status: busy\nuser_name: Todd");
    }

    #[test]
    fn set_is_idempotent() {
        let mut doc = WorkingDocument::from_text("status: ready");
        doc.set("topic", "memory systems").unwrap();
        let once = doc.clone();
        doc.set("topic", "memory systems").unwrap();
        assert_eq!(doc, once);
    }

    #[test]
    fn set_on_empty_document() {
        let mut doc = WorkingDocument::from_text("");
        doc.set("status", "ready").unwrap();
        assert_eq!(doc.as_str(), "status: ready");
    }

    #[test]
    fn oversized_update_rejected_without_mutation() {
        let mut doc = WorkingDocument::from_text("status: ready");
        let before = doc.clone();
        let huge = "x".repeat(WORKING_MEMORY_SIZE_MAX);
        match doc.set("notes", &huge) {
            Err(MemoryError::WorkingMemoryTooLarge { size, cap }) => {
                assert!(size > cap);
                assert_eq!(cap, WORKING_MEMORY_SIZE_MAX);
            }
            other => panic!("Expected WorkingMemoryTooLarge, got {other:?}"),
        }
        assert_eq!(doc, before);
    }

    #[test]
    fn update_at_exactly_the_cap_succeeds() {
        let mut doc = WorkingDocument::from_text("");
        // "notes: " plus value == exactly the cap
        let value = "x".repeat(WORKING_MEMORY_SIZE_MAX - "notes: ".len());
        doc.set("notes", &value).unwrap();
        assert_eq!(doc.size_bytes(), WORKING_MEMORY_SIZE_MAX);
    }

    #[test]
    fn non_field_lines_are_preserved() {
        let mut doc = WorkingDocument::from_text("free-form note\nstatus: ready");
        doc.set("status", "busy").unwrap();
        assert_eq!(doc.as_str(), "free-form note\nstatus: busy");
    }
}
