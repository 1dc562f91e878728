use std::path::PathBuf;

use leditor_catalog_models::CatalogError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("directory not found: {0}")]
    #[diagnostic(code(leditor::loader::directory_not_found))]
    DirectoryNotFound(PathBuf),
    #[error("{descriptor} file not found in directory {directory}")]
    #[diagnostic(
        code(leditor::loader::descriptor_not_found),
        help("every pack directory needs a descriptor file listing its categories and items")
    )]
    DescriptorNotFound {
        directory: PathBuf,
        descriptor: String,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Texture(#[from] TextureError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),
    #[error("invalid operation: {0}")]
    #[diagnostic(code(leditor::loader::invalid_operation))]
    InvalidOperation(&'static str),
    #[error("loader faulted earlier and can not make progress anymore")]
    #[diagnostic(
        code(leditor::loader::faulted),
        help("construct a new loader, the error that poisoned this one was returned by an earlier call")
    )]
    Faulted,
    #[error(transparent)]
    #[diagnostic(transparent)]
    TaskLost(#[from] leditor_core::task::TaskLost),
}

/// Failure to turn a descriptor file into categories and items.
#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("failed to read {path}")]
    #[diagnostic(code(leditor::import::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} declares no category")]
    #[diagnostic(code(leditor::import::empty))]
    Empty { path: PathBuf },
    #[error("{path}:{line}: {message}")]
    #[diagnostic(code(leditor::import::syntax))]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{path}:{line}: item declared before any category")]
    #[diagnostic(
        code(leditor::import::orphan_item),
        help("add a category line such as -[\"Name\", color(0, 0, 0)] above it")
    )]
    OrphanItem { path: PathBuf, line: usize },
    #[error("{path}:{line}: item has no #nm property")]
    #[diagnostic(code(leditor::import::missing_name))]
    MissingName { path: PathBuf, line: usize },
}

#[derive(Debug, Error, Diagnostic)]
pub enum TextureError {
    #[error("texture not found: {path}")]
    #[diagnostic(
        code(leditor::texture::missing),
        help("each item needs a png named after it next to the descriptor file")
    )]
    Missing { path: PathBuf },
    #[error("failed to decode texture {path}")]
    #[diagnostic(code(leditor::texture::decode))]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to upload texture {name}: {message}")]
    #[diagnostic(code(leditor::texture::upload))]
    Upload { name: String, message: String },
}
