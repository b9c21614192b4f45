//! Target file rendering and writing
//!
//! Target files use a fixed layout: one role block per key and one package
//! per line in compact JSON with `", "` and `": "` separators. Non-ASCII
//! text is written as `\uXXXX` escapes so the files stay plain ASCII.
//!
//! ```text
//! {
//!   "service_k8s": {
//!     "cluster": [
//!       {"package": "kubeadm", "type": "rpm"},
//!       {"package": "kubectl", "type": "rpm"}
//!     ]
//!   }
//! }
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use tracing::{debug, info};

use crate::error::{AdapterError, Result};
use crate::types::{Combination, TARGET_CLUSTER_KEY, TargetObject};

/// Render a target object in the target file layout
pub fn render_target(target: &TargetObject) -> serde_json::Result<String> {
    let mut out = String::from("{\n");
    let roles: Vec<_> = target.iter().collect();

    for (i, (key, packages)) in roles.iter().enumerate() {
        out.push_str(&format!("  {}: {{\n", to_line(key)?));
        out.push_str(&format!("    {}: [\n", to_line(&TARGET_CLUSTER_KEY)?));
        for (j, package) in packages.iter().enumerate() {
            out.push_str("      ");
            out.push_str(&to_line(package)?);
            if j + 1 < packages.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str("    ]\n  }");
        out.push_str(if i + 1 < roles.len() { ",\n" } else { "\n" });
    }

    out.push_str("}\n");
    Ok(out)
}

/// Write a target file to `<output_root>/<arch>/<os_family>/<os_version>/<target_file>`.
///
/// The content goes to a hidden sibling first and is renamed into place, so
/// readers never see a partial file.
pub fn write_target(
    output_root: &Path,
    combination: &Combination,
    target_file: &str,
    target: &TargetObject,
) -> Result<PathBuf> {
    let dir = output_root.join(combination.relative_dir());
    let path = dir.join(target_file);
    let content = render_target(target).map_err(|e| AdapterError::json(&path, e))?;

    fs::create_dir_all(&dir).map_err(|e| AdapterError::write(&dir, e))?;
    let staging = dir.join(format!(".{target_file}.tmp"));
    if let Err(e) = fs::write(&staging, content.as_bytes()) {
        let _ = fs::remove_file(&staging);
        return Err(AdapterError::write(&staging, e));
    }
    if let Err(e) = fs::rename(&staging, &path) {
        let _ = fs::remove_file(&staging);
        return Err(AdapterError::write(&path, e));
    }

    debug!("Wrote {} role(s) to {}", target.len(), path.display());
    info!("Generated {}", path.display());
    Ok(path)
}

fn to_line<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    value.serialize(&mut Serializer::with_formatter(&mut buf, SpacedFormatter))?;
    // The formatter only emits ASCII.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Compact JSON with a space after `,` and `:` and ASCII-only strings
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}
