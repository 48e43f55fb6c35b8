//! Prompt sources
//!
//! A prompt set is an ordered, fixed list of questions issued in the same order
//! on every run. Sets can come from:
//! - plain text files (one prompt per non-empty line)
//! - markdown files (every `- item` bullet is a prompt)
//! - CSV files with `Question` and `Current response time (seconds)` columns
//! - the built-in default set

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A single prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// 1-based position within its set
    pub index: usize,
    /// Question text sent to the search endpoint
    pub text: String,
    /// Optional category label (e.g. "market_data")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Previously observed response time in seconds, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_secs: Option<f64>,
}

impl Prompt {
    /// Create an uncategorized prompt
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            category: None,
            baseline_secs: None,
        }
    }

    /// Attach a category label
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attach a baseline response time
    pub fn with_baseline_secs(mut self, secs: f64) -> Self {
        self.baseline_secs = Some(secs);
        self
    }

    /// Short form of the text for log lines
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    ("market_data", "What is the current price of Brent crude oil?"),
    ("market_data", "What is the latest EUR to USD exchange rate?"),
    (
        "technology",
        "What were the major AI product announcements this week?",
    ),
    (
        "regional",
        "What are the latest renewable energy investments announced in the UAE?",
    ),
];

/// Ordered set of prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSet {
    /// Set name (file stem or "builtin")
    pub name: String,
    prompts: Vec<Prompt>,
}

impl PromptSet {
    /// Build a set, renumbering prompts 1..=n in the given order
    pub fn new(name: impl Into<String>, prompts: Vec<Prompt>) -> Self {
        let prompts = prompts
            .into_iter()
            .enumerate()
            .map(|(idx, prompt)| Prompt {
                index: idx + 1,
                ..prompt
            })
            .collect();
        Self {
            name: name.into(),
            prompts,
        }
    }

    /// The built-in default set
    pub fn builtin() -> Self {
        let prompts = BUILTIN_PROMPTS
            .iter()
            .enumerate()
            .map(|(idx, (category, text))| Prompt::new(idx + 1, *text).with_category(*category))
            .collect();
        Self::new("builtin", prompts)
    }

    /// Create a set holding a single prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new("inline", vec![Prompt::new(1, prompt)])
    }

    /// Load a set from a file, picking the parser from the extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        let name = set_name(path);

        let set = match extension(path).as_deref() {
            Some("md") | Some("markdown") => Self::new(name, parse_markdown(&content)),
            Some("csv") => Self::new(
                name,
                parse_csv(&content)
                    .with_context(|| format!("Failed to parse CSV prompts: {}", path.display()))?,
            ),
            _ => Self::new(name, parse_lines(&content)),
        };

        if set.is_empty() {
            anyhow::bail!("No prompts found in file: {}", path.display());
        }

        tracing::debug!(path = %path.display(), prompts = set.len(), "Loaded prompt set");
        Ok(set)
    }

    /// Load a whole markdown document as one long prompt
    pub fn from_whole_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        if content.trim().is_empty() {
            anyhow::bail!("Prompt file is empty: {}", path.display());
        }

        tracing::debug!(
            path = %path.display(),
            chars = content.chars().count(),
            "Loaded long prompt"
        );
        Ok(Self::new(
            set_name(path),
            vec![Prompt::new(1, content.trim().to_string())],
        ))
    }

    /// Load every markdown prompt set in a directory (README.md excluded)
    ///
    /// Sets are returned sorted by file name. A file that fails to parse is
    /// skipped with a warning.
    pub fn discover(dir: &Path) -> Result<Vec<Self>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to list prompt directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| extension(path).as_deref() == Some("md"))
            .filter(|path| {
                path.file_name()
                    .map(|name| !name.eq_ignore_ascii_case("README.md"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        let mut sets = Vec::with_capacity(files.len());
        for path in files {
            match Self::from_file(&path) {
                Ok(set) => sets.push(set),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping prompt file"),
            }
        }
        Ok(sets)
    }

    /// Get a prompt by 1-based index
    pub fn get(&self, index: usize) -> Option<&Prompt> {
        index.checked_sub(1).and_then(|i| self.prompts.get(i))
    }

    /// Iterate prompts in order
    pub fn iter(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts.iter()
    }

    /// All prompts in order
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    /// Get the number of prompts
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Check if the set has no prompts
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn set_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("prompts")
        .to_string()
}

fn parse_lines(content: &str) -> Vec<Prompt> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Prompt::new(0, line))
        .collect()
}

/// Extract `- item` bullets; each becomes a question ending in `?`
fn parse_markdown(content: &str) -> Vec<Prompt> {
    content
        .lines()
        .filter_map(|line| {
            let item = line.trim_start().strip_prefix('-')?.trim();
            // horizontal rules and empty bullets
            if item.is_empty() || item.chars().all(|c| c == '-') {
                return None;
            }
            let item = item
                .strip_suffix('?')
                .or_else(|| item.strip_suffix('.'))
                .unwrap_or(item)
                .trim_end();
            if item.is_empty() {
                return None;
            }
            Some(Prompt::new(0, format!("{item}?")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct CsvPromptRow {
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Current response time (seconds)", default)]
    current_response_time: Option<String>,
}

fn parse_csv(content: &str) -> Result<Vec<Prompt>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut prompts = Vec::new();
    for row in reader.deserialize::<CsvPromptRow>() {
        let row = row?;
        if row.question.is_empty() {
            continue;
        }
        let mut prompt = Prompt::new(0, row.question);
        if let Some(secs) = row.current_response_time.as_deref().and_then(parse_seconds) {
            prompt = prompt.with_baseline_secs(secs);
        }
        prompts.push(prompt);
    }
    Ok(prompts)
}

/// Parse "12.5" or "12.5s"
fn parse_seconds(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    raw.strip_suffix('s')
        .unwrap_or(raw)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_builtin_set_is_indexed_and_categorized() {
        let set = PromptSet::builtin();
        assert_eq!(set.len(), 4);
        let indices: Vec<usize> = set.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(set.get(1).unwrap().category.as_deref(), Some("market_data"));
        assert!(set.get(0).is_none());
        assert!(set.get(5).is_none());
    }

    #[test]
    fn test_from_text_file() {
        let mut file = Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "Prompt 1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  Prompt 2  ").unwrap();
        writeln!(file, "Prompt 3").unwrap();

        let set = PromptSet::from_file(file.path()).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(2).unwrap().text, "Prompt 2");
        assert_eq!(set.get(3).unwrap().index, 3);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(PromptSet::from_file(file.path()).is_err());
    }

    #[test]
    fn test_markdown_bullets_become_questions() {
        let md = "# Business\n\n- What is the GDP of Japan?\n- Latest oil price.\n  - Top tech stocks\n---\nplain text line\n-\n";
        let prompts = parse_markdown(md);
        let texts: Vec<&str> = prompts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "What is the GDP of Japan?",
                "Latest oil price?",
                "Top tech stocks?"
            ]
        );
    }

    #[test]
    fn test_csv_prompts_with_baseline() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "bing-prompts.csv",
            "Question,Current response time (seconds)\n\"What is new, today?\",12.5s\nWhat is the weather?,8\nNo baseline?,n/a\n",
        );

        let set = PromptSet::from_file(&path).unwrap();
        assert_eq!(set.name, "bing-prompts");
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(1).unwrap().text, "What is new, today?");
        assert_eq!(set.get(1).unwrap().baseline_secs, Some(12.5));
        assert_eq!(set.get(2).unwrap().baseline_secs, Some(8.0));
        assert_eq!(set.get(3).unwrap().baseline_secs, None);
    }

    #[test]
    fn test_whole_file_is_one_prompt() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "long_prompt.md", "# Report\n\n- a\n- b\n");
        let set = PromptSet::from_whole_file(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get(1).unwrap().text.contains("- b"));
    }

    #[test]
    fn test_discover_skips_readme_and_sorts() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "README.md", "- not a prompt\n");
        write_file(&dir, "technology.md", "- What is new in chips\n");
        write_file(&dir, "business.md", "- What is the oil price\n- Gold price\n");
        write_file(&dir, "notes.txt", "ignored\n");

        let sets = PromptSet::discover(dir.path()).unwrap();
        let names: Vec<&str> = sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["business", "technology"]);
        assert_eq!(sets[0].len(), 2);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let sets = PromptSet::discover(Path::new("/definitely/not/here")).unwrap();
        assert!(sets.is_empty());
    }

    #[test]
    fn test_preview_truncates() {
        let prompt = Prompt::new(1, "abcdefghij");
        assert_eq!(prompt.preview(4), "abcd...");
        assert_eq!(prompt.preview(20), "abcdefghij");
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("30.0s"), Some(30.0));
        assert_eq!(parse_seconds(" 7 "), Some(7.0));
        assert_eq!(parse_seconds("-1"), None);
        assert_eq!(parse_seconds("soon"), None);
    }
}
