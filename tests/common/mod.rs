#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use odp_search::config::Config;

pub const PARTICIPATION_ID: &str = "http://example.org/odp/participation.owl";
pub const REALIZATION_ID: &str = "http://example.org/odp/informationrealization.owl";

pub fn pattern_rdf(id: &str, label: &str, category: &str, intent: &str, cq: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
     xmlns:owl="http://www.w3.org/2002/07/owl#"
     xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
     xmlns:cpannotationschema="http://www.ontologydesignpatterns.org/schemas/cpannotationschema.owl#"
     xmlns:cpas-ext="http://xd-protege.com/schemas/cpas-ext.owl#">
    <owl:Ontology rdf:about="{id}">
        <rdfs:label>{label}</rdfs:label>
        <cpannotationschema:hasIntent>{intent}</cpannotationschema:hasIntent>
        <cpannotationschema:coversRequirements>{cq}</cpannotationschema:coversRequirements>
        <cpas-ext:category>{category}</cpas-ext:category>
    </owl:Ontology>
</rdf:RDF>
"#
    )
}

/// Temp workspace with a two-pattern repository and a config file.
pub struct TestEnv {
    pub tmp: TempDir,
    pub repo: PathBuf,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// `extra` is appended to the generated config file.
    pub fn with_config(extra: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let repo = root.join("repo");
        fs::create_dir_all(&repo).unwrap();

        fs::write(
            repo.join("participation.owl"),
            pattern_rdf(
                PARTICIPATION_ID,
                "Nary Participation",
                "General",
                "To represent participants in events",
                "What are the participants in that event at this time?",
            ),
        )
        .unwrap();
        fs::write(
            repo.join("informationrealization.owl"),
            pattern_rdf(
                REALIZATION_ID,
                "Information Realization",
                "Semiotics",
                "To represent the relation between information objects and their physical realization",
                "What physical object realizes this information?",
            ),
        )
        .unwrap();

        let config = format!(
            "[index]\ndir = {:?}\n\n[repository]\npath = {:?}\n\n[server]\nbind = \"127.0.0.1:0\"\n{extra}",
            root.join("index").display().to_string(),
            repo.display().to_string(),
        );
        let config_path = root.join("odps.toml");
        fs::write(&config_path, config).unwrap();

        Self {
            tmp,
            repo,
            config_path,
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn config(&self) -> Config {
        odp_search::config::load_config(&self.config_path).unwrap()
    }
}
