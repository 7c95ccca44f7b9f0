use crate::models::FieldConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Permanent prefix replacing the staging `tmp/` marker.
    pub storage_path: String,
    /// Upload attributes accepted on every record.
    pub fields: Vec<String>,
    pub prunable: bool,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Finalizes direct-to-storage uploads onto records")]
pub struct Args {
    /// Host to bind to (overrides UPLOADS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides UPLOADS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory backing the local disk (overrides UPLOADS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides UPLOADS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Permanent storage prefix (overrides UPLOADS_STORAGE_PATH)
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Comma-separated upload attributes (overrides UPLOADS_FIELDS)
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Keep superseded files instead of deleting them after commit
    #[arg(long)]
    pub keep_replaced: bool,

    /// S3 bucket for the cloud disk (overrides UPLOADS_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// S3 region (overrides UPLOADS_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// S3-compatible endpoint URL (overrides UPLOADS_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        Self::from_args(args)
    }

    pub fn from_args(args: Args) -> Result<(Self, bool)> {
        // --- Environment fallback ---
        let env_host = env::var("UPLOADS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("UPLOADS_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing UPLOADS_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading UPLOADS_PORT"),
        };
        let env_storage =
            env::var("UPLOADS_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("UPLOADS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/uploads.db".into());
        let env_storage_path =
            env::var("UPLOADS_STORAGE_PATH").unwrap_or_else(|_| "uploads/".into());
        let env_fields = env::var("UPLOADS_FIELDS")
            .map(|value| split_fields(&value))
            .unwrap_or_else(|_| vec!["file".to_string()]);
        let env_keep = env::var("UPLOADS_KEEP_REPLACED")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let env_region = env::var("UPLOADS_S3_REGION").unwrap_or_else(|_| "us-east-1".into());

        // --- Merge ---
        let fields = args.fields.map(|f| split_fields(&f.join(","))).unwrap_or(env_fields);
        if fields.is_empty() {
            anyhow::bail!("at least one upload field must be configured");
        }

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            storage_path: args.storage_path.unwrap_or(env_storage_path),
            fields,
            prunable: !(args.keep_replaced || env_keep),
            s3_bucket: args.s3_bucket.or_else(|| env::var("UPLOADS_S3_BUCKET").ok()),
            s3_region: args.s3_region.unwrap_or(env_region),
            s3_endpoint: args.s3_endpoint.or_else(|| env::var("UPLOADS_S3_ENDPOINT").ok()),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Field configuration for every upload attribute. Original filename and
    /// size land in `<field>_name` and `<field>_size`.
    pub fn field_configs(&self) -> Vec<FieldConfig> {
        self.fields
            .iter()
            .map(|name| {
                let field = FieldConfig::new(name.as_str())
                    .path(self.storage_path.as_str())
                    .store_original_name(format!("{name}_name"))
                    .store_size(format!("{name}_size"));
                if self.prunable { field.prunable() } else { field }
            })
            .collect()
    }
}

fn split_fields(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
