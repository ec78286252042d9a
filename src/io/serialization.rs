// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project file serialization and deserialization.
//!
//! Project files list the labels and the extracted frames of each video.
//! They may be written in YAML or JSON; the extension decides.

use crate::models::project::ProjectData;
use anyhow::{bail, Result};
use std::path::Path;

/// Export project data to YAML format.
pub fn export_yaml(data: &ProjectData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export project data to JSON format.
pub fn export_json(data: &ProjectData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import project data from YAML format.
pub fn import_yaml(path: &Path) -> Result<ProjectData> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import project data from JSON format.
pub fn import_json(path: &Path) -> Result<ProjectData> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

/// Import a project file, choosing the format from its extension.
pub fn import_project(path: &Path) -> Result<ProjectData> {
    let extension = path.extension().and_then(|s| s.to_str());
    let project = match extension {
        Some("yaml") | Some("yml") => import_yaml(path)?,
        Some("json") => import_json(path)?,
        _ => bail!("Unsupported project file extension: {:?}", extension),
    };
    log::info!(
        "Imported project '{}' with {} labels and {} videos from {}",
        project.name,
        project.labels.len(),
        project.videos.len(),
        path.display()
    );
    Ok(project)
}

/// Export a project file, choosing the format from its extension.
pub fn export_project(data: &ProjectData, path: &Path) -> Result<()> {
    let extension = path.extension().and_then(|s| s.to_str());
    match extension {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        _ => bail!("Unsupported project file extension: {:?}", extension),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT_YAML: &str = r##"
id: p1
name: Traffic
labels:
  - id: "1"
    name: car
    color: "#ff0000"
  - id: "2"
    name: person
    color: "#00ff00"
    description: Pedestrians
videos:
  - id: v1
    name: junction.mp4
    frames:
      - id: f1
        frame_number: 1
        image_path: frames/0001.png
"##;

    #[test]
    fn test_import_yaml_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.yaml");
        std::fs::write(&path, PROJECT_YAML).unwrap();

        let project = import_project(&path).unwrap();
        assert_eq!(project.labels.len(), 2);
        assert_eq!(project.labels[1].description.as_deref(), Some("Pedestrians"));
        assert_eq!(project.videos[0].frames[0].image_path, "frames/0001.png");
    }

    #[test]
    fn test_yaml_to_json_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("project.yml");
        let json_path = dir.path().join("project.json");
        std::fs::write(&yaml_path, PROJECT_YAML).unwrap();

        let project = import_project(&yaml_path).unwrap();
        export_project(&project, &json_path).unwrap();
        let reloaded = import_project(&json_path).unwrap();
        assert_eq!(reloaded.name, "Traffic");
        assert_eq!(reloaded.labels, project.labels);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(import_project(Path::new("project.toml")).is_err());
    }
}
