// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM Repository CLI
//!
//! Inspects and maintains a repository directory.
//!
//! # Usage
//!
//! ```bash
//! # List namespaces of the default repository (./repository)
//! cimrepo namespaces
//!
//! # Load a schema document, then show a class
//! cimrepo --root /var/lib/cim import root/cimv2 schema.json
//! cimrepo --root /var/lib/cim show-class root/cimv2 CIM_System
//!
//! # Use settings from a TOML file
//! cimrepo --config cimrepo.toml check
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use cim_repository::{
    export_document, import_document, Backend, CacheStats, CimName, CimRepository, Encoding,
    NamespaceDefinition, NamespaceName, RepositoryConfig, SchemaDocument,
};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BackendArg {
    File,
    Sqlite,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::File => Backend::File,
            BackendArg::Sqlite => Backend::Sqlite,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum EncodingArg {
    Binary,
    Json,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Binary => Encoding::Binary,
            EncodingArg::Json => Encoding::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cimrepo")]
#[command(about = "CIM Repository - namespace, class and instance store", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repository directory (overrides the configuration file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Storage backend (overrides the configuration file)
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Encoding for new object bodies
    #[arg(short, long, value_enum)]
    encoding: Option<EncodingArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List namespaces and their attributes
    Namespaces,
    /// Create a namespace
    CreateNamespace {
        name: String,
        /// Parent namespace supplying the schema
        #[arg(long)]
        parent: Option<String>,
        /// Allow other namespaces to use this one as parent
        #[arg(long)]
        shareable: bool,
        /// Reject schema updates
        #[arg(long)]
        read_only: bool,
    },
    /// Delete an empty namespace
    DeleteNamespace { name: String },
    /// List class names
    Classes {
        namespace: String,
        /// Start below this class
        #[arg(long)]
        class: Option<String>,
        /// Include all descendants
        #[arg(long)]
        deep: bool,
    },
    /// Print a resolved class as JSON
    ShowClass {
        namespace: String,
        class: String,
        /// Only elements defined by the class itself
        #[arg(long)]
        local_only: bool,
    },
    /// Delete a class without subclasses or instances
    DeleteClass { namespace: String, class: String },
    /// List qualifier declarations
    Qualifiers { namespace: String },
    /// List instance paths of a class and its subclasses
    Instances { namespace: String, class: String },
    /// Load a JSON schema document
    Import { namespace: String, file: PathBuf },
    /// Write a namespace as a JSON schema document
    Export { namespace: String, file: PathBuf },
    /// Verify every inheritance tree
    Check,
    /// Resolve every class and report object counts and cache counters
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RepositoryConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RepositoryConfig::default(),
    };
    if let Some(root) = args.root {
        config.root = root;
    }
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding.into();
    }

    tracing::debug!("Opening repository at {}", config.root.display());
    let root = config.root.clone();
    let repo = CimRepository::open(config)
        .with_context(|| format!("opening repository {}", root.display()))?;

    handle_command(args.command, &repo)
}

fn namespace(name: &str) -> Result<NamespaceName> {
    NamespaceName::new(name).with_context(|| format!("invalid namespace name '{}'", name))
}

fn handle_command(cmd: Commands, repo: &CimRepository) -> Result<()> {
    match cmd {
        Commands::Namespaces => {
            for ns in repo.enumerate_namespaces() {
                let attrs = repo.get_namespace_attributes(&ns)?;
                let details: Vec<String> = attrs
                    .iter()
                    .filter(|(k, _)| k.as_str() != "name")
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                println!("{} [{}]", ns, details.join(", "));
            }
        }
        Commands::CreateNamespace {
            name,
            parent,
            shareable,
            read_only,
        } => {
            let mut def = NamespaceDefinition::new(namespace(&name)?)
                .shareable(shareable)
                .updates_allowed(!read_only);
            if let Some(parent) = parent {
                def = def.with_parent(namespace(&parent)?);
            }
            repo.create_namespace(def)
                .with_context(|| format!("creating namespace {}", name))?;
            println!("Created namespace {}", name);
        }
        Commands::DeleteNamespace { name } => {
            repo.delete_namespace(&namespace(&name)?)
                .with_context(|| format!("deleting namespace {}", name))?;
            println!("Deleted namespace {}", name);
        }
        Commands::Classes {
            namespace: ns,
            class,
            deep,
        } => {
            let class = class.map(CimName::new);
            let mut names = repo.enumerate_class_names(&namespace(&ns)?, class.as_ref(), deep)?;
            names.sort();
            for name in names {
                println!("{}", name);
            }
        }
        Commands::ShowClass {
            namespace: ns,
            class,
            local_only,
        } => {
            let class = repo
                .get_class(
                    &namespace(&ns)?,
                    &CimName::new(class.as_str()),
                    local_only,
                    true,
                    true,
                    None,
                )
                .with_context(|| format!("reading class {}", class))?;
            println!("{}", serde_json::to_string_pretty(&class)?);
        }
        Commands::DeleteClass { namespace: ns, class } => {
            repo.delete_class(&namespace(&ns)?, &CimName::new(class.as_str()))
                .with_context(|| format!("deleting class {}", class))?;
            println!("Deleted class {}", class);
        }
        Commands::Qualifiers { namespace: ns } => {
            for decl in repo.enumerate_qualifiers(&namespace(&ns)?)? {
                println!(
                    "{} : {} = {} scope({}) flavor({})",
                    decl.name(),
                    decl.cim_type(),
                    decl.value(),
                    decl.scope().to_mof(),
                    decl.flavor().to_mof()
                );
            }
        }
        Commands::Instances { namespace: ns, class } => {
            for path in repo
                .enumerate_instance_names_for_subtree(&namespace(&ns)?, &CimName::new(class))?
            {
                println!("{}", path);
            }
        }
        Commands::Import { namespace: ns, file } => {
            let doc = SchemaDocument::from_file(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let summary = import_document(repo, &namespace(&ns)?, &doc)?;
            println!(
                "Imported {} qualifiers, {} classes, {} instances",
                summary.qualifiers, summary.classes, summary.instances
            );
        }
        Commands::Export { namespace: ns, file } => {
            let doc = export_document(repo, &namespace(&ns)?)?;
            doc.to_file(&file)
                .with_context(|| format!("writing {}", file.display()))?;
            println!(
                "Exported {} classes and {} instances to {}",
                doc.classes.len(),
                doc.instances.len(),
                file.display()
            );
        }
        Commands::Check => {
            repo.check()?;
            println!("Repository is consistent");
        }
        Commands::Stats => {
            for ns in repo.enumerate_namespaces() {
                let classes = repo.enumerate_classes(&ns, None, true, false, true, true)?;
                let qualifiers = repo.enumerate_qualifiers(&ns)?;
                println!(
                    "{}: {} classes, {} qualifiers",
                    ns,
                    classes.len(),
                    qualifiers.len()
                );
            }
            let stats = repo.cache_stats();
            println!("class cache: {}", describe_cache(stats.classes));
            println!("qualifier cache: {}", describe_cache(stats.qualifiers));
        }
    }

    Ok(())
}

fn describe_cache(stats: Option<CacheStats>) -> String {
    match stats {
        Some(stats) => format!("{} hits, {} misses", stats.hits, stats.misses),
        None => "disabled".to_string(),
    }
}
