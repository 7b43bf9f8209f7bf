//! Per-run collection of captured script output.

use indexmap::IndexMap;

/// Captured output of one run, keyed by script id in execution order.
///
/// Lines are kept individually while the run is in progress; readers get
/// the newline-joined text. A script id that was launched appears as a key
/// even if it printed nothing. Running the same id twice in one request
/// appends to the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    outputs: IndexMap<String, Vec<String>>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `script_id` has an entry, keeping its position if it
    /// already exists.
    pub fn begin(&mut self, script_id: &str) {
        if !self.outputs.contains_key(script_id) {
            self.outputs.insert(script_id.to_string(), Vec::new());
        }
    }

    /// Append one captured line for `script_id`.
    pub fn push_line(&mut self, script_id: &str, line: impl Into<String>) {
        match self.outputs.get_mut(script_id) {
            Some(lines) => lines.push(line.into()),
            None => {
                self.outputs.insert(script_id.to_string(), vec![line.into()]);
            }
        }
    }

    /// Newline-joined output of `script_id`.
    pub fn text(&self, script_id: &str) -> Option<String> {
        self.outputs.get(script_id).map(|lines| lines.join("\n"))
    }

    pub fn contains(&self, script_id: &str) -> bool {
        self.outputs.contains_key(script_id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// `(script_id, text)` pairs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.outputs
            .iter()
            .map(|(id, lines)| (id.as_str(), lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_in_order() {
        let mut results = RunResult::new();
        results.begin("a.sh");
        results.push_line("a.sh", "one");
        results.push_line("a.sh", "two");

        assert_eq!(results.text("a.sh").as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn begun_script_without_output_is_empty_text() {
        let mut results = RunResult::new();
        results.begin("quiet.sh");

        assert!(results.contains("quiet.sh"));
        assert_eq!(results.text("quiet.sh").as_deref(), Some(""));
    }

    #[test]
    fn empty_lines_are_preserved() {
        let mut results = RunResult::new();
        results.push_line("a.sh", "");
        results.push_line("a.sh", "x");

        assert_eq!(results.text("a.sh").as_deref(), Some("\nx"));
    }

    #[test]
    fn keeps_execution_order_and_appends_repeats() {
        let mut results = RunResult::new();
        results.begin("b.sh");
        results.push_line("b.sh", "first");
        results.begin("a.sh");
        results.begin("b.sh");
        results.push_line("b.sh", "second");

        let entries: Vec<(&str, String)> = results.iter().collect();
        assert_eq!(
            entries,
            vec![("b.sh", "first\nsecond".to_string()), ("a.sh", String::new())]
        );
    }
}
