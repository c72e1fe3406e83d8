// src/templates/editor.rs
//! Generic dotted-path editing of the structured-resume JSON.
//!
//! Paths look like `experience.0.title`: object keys and numeric array
//! indices separated by dots. Working on raw `serde_json::Value` keeps
//! the editor independent of whatever shape the parser returns.

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::templates::debounce::Debouncer;

const EDIT_DEBOUNCE: Duration = Duration::from_millis(500);

fn split_segments(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        anyhow::bail!("Invalid path: '{}'", path);
    }
    Ok(path.split('.').collect())
}

fn parse_index(segment: &str) -> Result<usize> {
    segment
        .parse::<usize>()
        .with_context(|| format!("'{}' is not an array index", segment))
}

fn descend_mut<'a>(root: &'a mut Value, segments: &[&str]) -> Result<&'a mut Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map
                .get_mut(*segment)
                .with_context(|| format!("No field '{}' on the way to the target", segment))?,
            Value::Array(items) => {
                let index = parse_index(segment)?;
                items
                    .get_mut(index)
                    .with_context(|| format!("Index {} is out of bounds", index))?
            }
            _ => anyhow::bail!("'{}' addresses into a leaf value", segment),
        };
    }
    Ok(current)
}

/// Read the value at `path`, if present. Never errors: a miss anywhere
/// along the way is `None`.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Replace the value at `path`. Object targets may gain a new key;
/// array targets must already contain the index.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments = split_segments(path)?;
    let (last, parents) = segments.split_last().context("Empty path")?;
    let parent = descend_mut(root, parents)?;

    match parent {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(last)?;
            let slot = items
                .get_mut(index)
                .with_context(|| format!("Index {} is out of bounds", index))?;
            *slot = value;
            Ok(())
        }
        _ => anyhow::bail!("Cannot set '{}' on a leaf value", last),
    }
}

/// Insert a value: array targets shift later elements right (index may
/// equal the length to append); object targets behave like `set_path`.
pub fn insert_path(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments = split_segments(path)?;
    let (last, parents) = segments.split_last().context("Empty path")?;
    let parent = descend_mut(root, parents)?;

    match parent {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(last)?;
            if index > items.len() {
                anyhow::bail!("Index {} is out of bounds for insert", index);
            }
            items.insert(index, value);
            Ok(())
        }
        _ => anyhow::bail!("Cannot insert '{}' into a leaf value", last),
    }
}

/// Remove and return the value at `path`. Array removals shift later
/// elements left.
pub fn remove_path(root: &mut Value, path: &str) -> Result<Value> {
    let segments = split_segments(path)?;
    let (last, parents) = segments.split_last().context("Empty path")?;
    let parent = descend_mut(root, parents)?;

    match parent {
        Value::Object(map) => map
            .remove(*last)
            .with_context(|| format!("No field '{}' to remove", last)),
        Value::Array(items) => {
            let index = parse_index(last)?;
            if index >= items.len() {
                anyhow::bail!("Index {} is out of bounds", index);
            }
            Ok(items.remove(index))
        }
        _ => anyhow::bail!("Cannot remove '{}' from a leaf value", last),
    }
}

/// An in-progress editing session over one structured resume. Edits
/// apply immediately to the working copy; `snapshot` hands out the
/// debounced current-form-data used for preview requests.
pub struct EditorSession {
    working: Value,
    debouncer: Debouncer<Value>,
}

impl EditorSession {
    pub fn new(initial: Value) -> Self {
        Self {
            working: initial,
            debouncer: Debouncer::new(EDIT_DEBOUNCE),
        }
    }

    pub fn working(&self) -> &Value {
        &self.working
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.working, path)
    }

    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        set_path(&mut self.working, path, value)?;
        self.debouncer.submit(self.working.clone());
        Ok(())
    }

    pub fn insert(&mut self, path: &str, value: Value) -> Result<()> {
        insert_path(&mut self.working, path, value)?;
        self.debouncer.submit(self.working.clone());
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Result<Value> {
        let removed = remove_path(&mut self.working, path)?;
        self.debouncer.submit(self.working.clone());
        Ok(removed)
    }

    /// Wait out the quiet period and return the settled form data. With
    /// no pending edits this is the working copy as-is.
    pub async fn snapshot(&mut self) -> Value {
        match self.debouncer.settled().await {
            Some(value) => value.clone(),
            None => self.working.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_resume() -> Value {
        json!({
            "contact": {"name": "Ada Lovelace", "email": "ada@example.com"},
            "experience": [
                {"title": "Engineer", "company": "Babbage & Co", "years": 3},
                {"title": "Analyst", "company": "Royal Society"}
            ],
            "skills": ["mathematics", "mechanical computation"]
        })
    }

    #[test]
    fn test_get_nested_array_field() {
        let resume = sample_resume();
        assert_eq!(
            get_path(&resume, "experience.0.title").and_then(Value::as_str),
            Some("Engineer")
        );
        assert_eq!(
            get_path(&resume, "experience.1.company").and_then(Value::as_str),
            Some("Royal Society")
        );
        assert!(get_path(&resume, "experience.5.title").is_none());
        assert!(get_path(&resume, "contact.name.first").is_none());
    }

    #[test]
    fn test_set_touches_only_the_target_field() {
        let mut resume = sample_resume();
        set_path(
            &mut resume,
            "experience.0.title",
            json!("Senior Engineer"),
        )
        .unwrap();

        assert_eq!(
            get_path(&resume, "experience.0.title").and_then(Value::as_str),
            Some("Senior Engineer")
        );
        // Siblings and array length are unaffected.
        assert_eq!(
            get_path(&resume, "experience.0.company").and_then(Value::as_str),
            Some("Babbage & Co")
        );
        assert_eq!(
            get_path(&resume, "experience.0.years").and_then(Value::as_u64),
            Some(3)
        );
        assert_eq!(resume["experience"].as_array().unwrap().len(), 2);
        assert_eq!(
            get_path(&resume, "contact.name").and_then(Value::as_str),
            Some("Ada Lovelace")
        );
    }

    #[test]
    fn test_set_can_add_object_key_but_not_array_slot() {
        let mut resume = sample_resume();
        set_path(&mut resume, "contact.phone", json!("+44 1")).unwrap();
        assert_eq!(
            get_path(&resume, "contact.phone").and_then(Value::as_str),
            Some("+44 1")
        );

        assert!(set_path(&mut resume, "skills.7", json!("poetry")).is_err());
    }

    #[test]
    fn test_insert_shifts_array_elements() {
        let mut resume = sample_resume();
        insert_path(&mut resume, "skills.1", json!("analysis")).unwrap();

        let skills = resume["skills"].as_array().unwrap();
        assert_eq!(skills.len(), 3);
        assert_eq!(skills[0], json!("mathematics"));
        assert_eq!(skills[1], json!("analysis"));
        assert_eq!(skills[2], json!("mechanical computation"));

        // Appending at the length is allowed; past it is not.
        insert_path(&mut resume, "skills.3", json!("poetry")).unwrap();
        assert!(insert_path(&mut resume, "skills.9", json!("x")).is_err());
    }

    #[test]
    fn test_remove_returns_the_removed_value() {
        let mut resume = sample_resume();
        let removed = remove_path(&mut resume, "experience.0").unwrap();
        assert_eq!(removed["title"], json!("Engineer"));
        assert_eq!(resume["experience"].as_array().unwrap().len(), 1);
        assert_eq!(
            get_path(&resume, "experience.0.title").and_then(Value::as_str),
            Some("Analyst")
        );

        assert!(remove_path(&mut resume, "contact.missing").is_err());
    }

    #[test]
    fn test_invalid_paths_error() {
        let mut resume = sample_resume();
        assert!(set_path(&mut resume, "", json!(1)).is_err());
        assert!(set_path(&mut resume, "contact..name", json!(1)).is_err());
        assert!(set_path(&mut resume, "experience.first.title", json!(1)).is_err());
        assert!(set_path(&mut resume, "contact.name.deep", json!(1)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_editor_session_debounces_snapshots() {
        let mut session = EditorSession::new(sample_resume());
        session.set("experience.0.title", json!("Lead")).unwrap();
        session
            .set("experience.0.title", json!("Principal"))
            .unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot["experience"][0]["title"], json!("Principal"));

        // Settled with nothing pending: snapshot reflects the working copy.
        let again = session.snapshot().await;
        assert_eq!(again, snapshot);
    }
}
