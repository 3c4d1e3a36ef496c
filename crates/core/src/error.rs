use std::path::PathBuf;

/// Top-level error type. All public API functions return this.
#[derive(Debug, thiserror::Error)]
pub enum RepresentativeError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Audit log error: {0}")]
    Audit(#[from] AuditError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Metadata type '{name}' is not defined in the ruleset")]
    UnknownMetadataType { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("Anchor node '{type_name}' has no children")]
    EmptyAnchor { type_name: String },

    #[error("Structural node '{type_name}' references unknown page '{page_id}'")]
    DanglingReference { type_name: String, page_id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Metadata file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Malformed metadata file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Step '{title}' not found for process {process_id}")]
    UnknownStep { process_id: u64, title: String },

    #[error("Malformed step file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not serialize steps: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Could not serialize audit entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown key: {0}")]
    UnknownKey(String),
}
