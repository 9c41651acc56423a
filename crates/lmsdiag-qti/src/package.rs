//! Container extraction.
//!
//! Opens a zip-based assessment package in memory, lists its members,
//! reads the package manifest and pulls out every member whose content
//! looks like an assessment document. Nothing is written to disk.

use crate::parser::is_assessment_document;
use lmsdiag_core::{decode_text, DiagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

/// Package manifest file name.
pub const MANIFEST_NAME: &str = "imsmanifest.xml";

/// Largest member that will be read into memory.
pub const MAX_MEMBER_BYTES: u64 = 50 * 1024 * 1024;

/// Member extensions worth sniffing for assessment content.
const DOCUMENT_EXTENSIONS: &[&str] = &[".xml", ".qti"];

/// What the package declares and what it physically contains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerManifest {
    pub declared_member_paths: BTreeSet<String>,
    pub physical_member_paths: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    /// Resource hrefs whose declared type is an assessment
    pub assessment_resources: Vec<String>,
    /// Present when the manifest exists but could not be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemberDocument {
    pub path: String,
    pub text: String,
}

/// A member that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedPackage {
    pub manifest: ContainerManifest,
    /// Assessment candidates in archive enumeration order
    pub member_documents: Vec<MemberDocument>,
    pub unreadable: Vec<FailedFile>,
}

fn has_document_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    DOCUMENT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Open an in-memory zip container.
pub fn extract(bytes: &[u8]) -> Result<ExtractedPackage> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DiagError::Extraction(format!("cannot open container: {e}")))?;
    debug!(entries = archive.len(), "opened container");

    let mut package = ExtractedPackage::default();

    // The shallowest manifest wins when several are present
    let manifest_name = archive
        .file_names()
        .map(|n| n.replace('\\', "/"))
        .filter(|n| file_name(n).eq_ignore_ascii_case(MANIFEST_NAME))
        .min_by_key(|n| (n.matches('/').count(), n.clone()));

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index, error = %e, "unreadable container entry");
                package.unreadable.push(FailedFile {
                    path: format!("#{index}"),
                    error: e.to_string(),
                });
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        package.manifest.physical_member_paths.insert(name.clone());

        let is_manifest = manifest_name.as_deref() == Some(name.as_str());
        if !is_manifest && !has_document_extension(&name) {
            continue;
        }
        if entry.size() > MAX_MEMBER_BYTES {
            package.unreadable.push(FailedFile {
                path: name,
                error: format!("member exceeds {MAX_MEMBER_BYTES} byte limit"),
            });
            continue;
        }

        let mut buf = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = (&mut entry).take(MAX_MEMBER_BYTES).read_to_end(&mut buf) {
            package.unreadable.push(FailedFile {
                path: name,
                error: e.to_string(),
            });
            continue;
        }
        let text = decode_text(&buf);

        if is_manifest {
            read_manifest(&name, &text, &mut package.manifest);
        } else if is_assessment_document(&text) {
            package.member_documents.push(MemberDocument { path: name, text });
        }
    }

    debug!(
        candidates = package.member_documents.len(),
        physical = package.manifest.physical_member_paths.len(),
        declared = package.manifest.declared_member_paths.len(),
        "container extracted"
    );
    Ok(package)
}

/// Collect declared resource and file paths from a manifest. Paths are
/// relative to the manifest's own directory.
fn read_manifest(path: &str, text: &str, manifest: &mut ContainerManifest) {
    manifest.manifest_path = Some(path.to_string());
    let base = path.rfind('/').map(|i| &path[..=i]).unwrap_or("");

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = match roxmltree::Document::parse_with_options(text, options) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path, error = %e, "manifest is not well-formed");
            manifest.manifest_error = Some(e.to_string());
            return;
        }
    };

    for resource in doc.descendants().filter(|n| n.tag_name().name() == "resource") {
        let href = resource.attribute("href").map(|h| format!("{base}{h}"));
        if let Some(h) = &href {
            manifest.declared_member_paths.insert(h.clone());
        }
        let mut first_file = None;
        for file in resource.children().filter(|n| n.tag_name().name() == "file") {
            if let Some(h) = file.attribute("href") {
                let full = format!("{base}{h}");
                first_file.get_or_insert_with(|| full.clone());
                manifest.declared_member_paths.insert(full);
            }
        }

        let is_assessment = resource
            .attribute("type")
            .map(|t| t.to_lowercase().contains("imsqti"))
            .unwrap_or(false);
        if is_assessment {
            if let Some(target) = href.or(first_file) {
                manifest.assessment_resources.push(target);
            }
        }
    }
}
