//! PDF model types shared with the document layer.

pub mod objects;

// Re-export main types for convenience
pub use objects::{PDFDict, PDFObjRef, PDFObject, PDFStream};
