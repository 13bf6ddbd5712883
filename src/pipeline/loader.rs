//! Pipeline and table file loading
//!
//! Files ending in `.json` are parsed as JSON, everything else as YAML.

use std::path::Path;

use serde::de::DeserializeOwned;

use super::step::Pipeline;
use super::table::{Table, TableFile};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("JSON parse error in {file}: {error}")]
    Json {
        file: String,
        error: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(String),
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path)?;
    parse_str(path, &content)
}

fn parse_str<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, LoadError> {
    if is_json(path) {
        serde_json::from_str(content).map_err(|e| LoadError::Json {
            file: path.display().to_string(),
            error: e,
        })
    } else {
        serde_yaml::from_str(content).map_err(|e| LoadError::Yaml {
            file: path.display().to_string(),
            error: e,
        })
    }
}

pub struct PipelineLoader;

impl PipelineLoader {
    pub fn load_pipeline(path: &Path) -> Result<Pipeline, LoadError> {
        parse_file(path)
    }

    pub fn load_table(path: &Path) -> Result<Table, LoadError> {
        let file: TableFile = parse_file(path)?;
        Ok(Table::from(file))
    }

    /// Render a table as a list of records, JSON or YAML by path extension
    pub fn render_table(path: &Path, table: &Table) -> Result<String, LoadError> {
        if is_json(path) {
            serde_json::to_string_pretty(&table.rows)
                .map_err(|e| LoadError::Serialize(e.to_string()))
        } else {
            serde_yaml::to_string(&table.rows).map_err(|e| LoadError::Serialize(e.to_string()))
        }
    }

    pub fn save_table(path: &Path, table: &Table) -> Result<(), LoadError> {
        let content = Self::render_table(path, table)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_pipeline_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");

        fs::write(
            &path,
            r#"
- name: Company
  url_template: /companies/{id}
  path_map:
    id: company_id
  output_map:
    - json_field: score
      csv_column: Score
"#,
        )
        .unwrap();

        let pipeline = PipelineLoader::load_pipeline(&path).unwrap();
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.steps[0].name, "Company");
    }

    #[test]
    fn test_load_pipeline_json_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = PipelineLoader::load_pipeline(&path).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_load_table_grid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.json");
        fs::write(&path, r#"[["company_id"],["1"],["2"]]"#).unwrap();

        let table = PipelineLoader::load_table(&path).unwrap();
        assert_eq!(table.columns, vec!["company_id"]);
        assert_eq!(table.rows[1].get("company_id"), Some(&json!("2")));
    }

    #[test]
    fn test_save_table_round_trips_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let table = Table::from_records(vec![[("id", json!("1")), ("Score", json!(88))]
            .into_iter()
            .collect()]);

        PipelineLoader::save_table(&path, &table).unwrap();
        let loaded = PipelineLoader::load_table(&path).unwrap();
        assert_eq!(loaded, table);
    }
}
