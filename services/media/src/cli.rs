//! Command-line surface of the media tool

use clap::{Args, Parser, Subcommand};
use medialibrary::AddMediaOptions;
use serde_json::Value;
use std::path::PathBuf;

/// Manage media files, their conversions and their storage disks
#[derive(Debug, Parser)]
#[command(name = "media", version, about)]
pub struct Cli {
    /// Settings file; `medialibrary.toml` in the working directory otherwise
    #[arg(long, global = true, env = "MEDIALIBRARY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a URL into a collection
    AddUrl {
        url: String,
        #[command(flatten)]
        add: AddArgs,
    },

    /// Store a local file into a collection
    AddFile {
        path: PathBuf,
        #[command(flatten)]
        add: AddArgs,
    },

    /// Import an object that already lives on a configured disk
    Import {
        source_disk: String,
        source_path: String,
        target_disk: String,
        #[command(flatten)]
        add: AddArgs,
    },

    /// Generate conversions for a stored media record
    Convert {
        id: u64,
        #[arg(required = true)]
        conversions: Vec<String>,
    },

    /// Generate responsive widths for a stored media record
    Responsive {
        id: u64,
        #[arg(required = true)]
        recipes: Vec<String>,
    },

    /// Copy the original to another disk under a new record
    Copy { id: u64, disk: String },

    /// Move the original to another disk, removing the source
    Move { id: u64, disk: String },

    /// Print a record with its URLs
    Show {
        id: u64,
        /// Also print a temporary URL valid for this many seconds
        #[arg(long)]
        temporary: Option<u64>,
    },

    /// List records of an owner, or of a whole collection
    List {
        #[arg(long, requires = "owner_id")]
        owner_type: Option<String>,
        #[arg(long, requires = "owner_type")]
        owner_id: Option<u64>,
        #[arg(long, required_unless_present = "owner_type")]
        collection: Option<String>,
    },

    /// Delete a record, its original and its derived files
    Delete { id: u64 },
}

/// Options shared by every ingestion command
#[derive(Debug, Clone, Default, Args)]
pub struct AddArgs {
    #[arg(long, default_value = "default")]
    pub collection: String,

    #[arg(long, requires = "owner_id")]
    pub owner_type: Option<String>,

    #[arg(long, requires = "owner_type")]
    pub owner_id: Option<u64>,

    /// Disk for the original, the configured default otherwise
    #[arg(long)]
    pub disk: Option<String>,

    #[arg(long)]
    pub conversions_disk: Option<String>,

    /// Display name, the file stem otherwise
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub order: Option<i32>,

    /// Conversion to generate after storing; repeatable
    #[arg(long = "conversion")]
    pub conversions: Vec<String>,

    /// Responsive recipe to generate after storing; repeatable
    #[arg(long = "responsive")]
    pub responsive: Vec<String>,

    /// `key=value` custom property; JSON values are parsed; repeatable
    #[arg(long = "property", value_parser = parse_property)]
    pub properties: Vec<(String, Value)>,
}

impl AddArgs {
    pub fn to_options(&self) -> AddMediaOptions {
        let mut options = AddMediaOptions::default();

        if let Some(disk) = &self.disk {
            options = options.with_disk(disk.clone());
        }
        if let Some(disk) = &self.conversions_disk {
            options = options.with_conversions_disk(disk.clone());
        }
        if let Some(name) = &self.name {
            options = options.with_name(name.clone());
        }
        if let (Some(owner_type), Some(owner_id)) = (&self.owner_type, self.owner_id) {
            options = options.with_owner(owner_type.clone(), owner_id);
        }
        if let Some(order) = self.order {
            options = options.with_order_column(order);
        }
        if !self.conversions.is_empty() {
            options = options
                .with_conversions(self.conversions.iter().cloned())
                .with_auto_generate_conversions(true);
        }
        if !self.responsive.is_empty() {
            options = options.with_responsive_images(self.responsive.iter().cloned());
        }
        for (key, value) in &self.properties {
            options = options.with_custom_property(key.clone(), value.clone());
        }

        options
    }
}

fn parse_property(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {}", raw))?;
    if key.is_empty() {
        return Err("property key cannot be empty".to_string());
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
