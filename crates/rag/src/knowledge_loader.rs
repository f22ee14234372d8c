//! Knowledge Base Loader
//!
//! Loads knowledge documents from YAML/JSON files. Declaration order is
//! preserved: files are read in name order and documents in file order.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::RagError;

/// Knowledge document format for YAML/JSON files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Unique document ID
    pub id: String,
    /// Document title
    #[serde(default)]
    pub title: String,
    /// Text injected into prompts
    pub content: String,
    /// Category (e.g. "product", "service", "pricing")
    #[serde(default)]
    pub category: Option<String>,
    /// Finer-grained type within the category
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    /// Language code (e.g., "en", "hi")
    #[serde(default = "default_language")]
    pub language: String,
    /// Index keywords, as a list or a comma-separated string
    #[serde(default, deserialize_with = "keyword_list")]
    pub keywords: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn keyword_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Keywords::deserialize(deserializer)? {
        Keywords::List(list) => list,
        Keywords::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    })
}

impl KnowledgeDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            content: content.into(),
            category: None,
            doc_type: None,
            language: default_language(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Knowledge base file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    /// List of documents
    pub documents: Vec<KnowledgeDocument>,
}

/// Reads knowledge files into documents
pub struct KnowledgeLoader;

impl KnowledgeLoader {
    /// Load documents from a single file or from every YAML/JSON file in a directory
    pub fn load_path(path: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        if path.is_dir() {
            Self::load_directory(path)
        } else if path.exists() {
            Self::load_file(path)
        } else {
            Err(RagError::NotFound(path.display().to_string()))
        }
    }

    /// Load all knowledge files in a directory, in file name order
    pub fn load_directory(knowledge_dir: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        let entries = std::fs::read_dir(knowledge_dir)
            .map_err(|e| RagError::Index(format!("Failed to read directory: {}", e)))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| RagError::Index(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if matches!(extension, "yaml" | "yml" | "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            let loaded = Self::load_file(&path)?;
            tracing::info!(
                file = %path.display(),
                documents = loaded.len(),
                "Loaded knowledge file"
            );
            documents.extend(loaded);
        }

        tracing::info!(
            directory = %knowledge_dir.display(),
            total_documents = documents.len(),
            "Knowledge base loading complete"
        );

        Ok(documents)
    }

    /// Load a single knowledge file
    pub fn load_file(path: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Index(format!("Failed to read file: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let knowledge: KnowledgeFile = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| RagError::Index(format!("JSON parse error: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| RagError::Index(format!("YAML parse error: {}", e)))?,
            _ => {
                return Err(RagError::Index(format!(
                    "Unsupported file type: {}",
                    extension
                )))
            }
        };

        Ok(knowledge.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_keywords_as_csv_or_list() {
        let yaml = r#"
documents:
  - id: a
    content: "A"
    keywords: "gym, fitness ,trainer"
  - id: b
    content: "B"
    type: voice_bot
    keywords: [voice, bot]
"#;
        let file: KnowledgeFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.documents[0].keywords, vec!["gym", " fitness ", "trainer"]);
        assert_eq!(file.documents[1].keywords, vec!["voice", "bot"]);
        assert_eq!(file.documents[1].doc_type.as_deref(), Some("voice_bot"));
        assert_eq!(file.documents[1].language, "en");
    }

    #[test]
    fn test_load_directory_in_name_order() {
        let dir = TempDir::new().unwrap();
        let mut second = std::fs::File::create(dir.path().join("b.json")).unwrap();
        write!(
            second,
            r#"{{"documents": [{{"id": "json-1", "content": "from json"}}]}}"#
        )
        .unwrap();
        let mut first = std::fs::File::create(dir.path().join("a.yaml")).unwrap();
        write!(
            first,
            "documents:\n  - id: yaml-1\n    content: one\n  - id: yaml-2\n    content: two\n"
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = KnowledgeLoader::load_path(dir.path()).unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["yaml-1", "yaml-2", "json-1"]);
    }

    #[test]
    fn test_missing_path() {
        let result = KnowledgeLoader::load_path(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(RagError::NotFound(_))));
    }

    #[test]
    fn test_bad_yaml_is_index_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "documents: [ {").unwrap();
        assert!(matches!(
            KnowledgeLoader::load_file(&path),
            Err(RagError::Index(_))
        ));
    }
}
