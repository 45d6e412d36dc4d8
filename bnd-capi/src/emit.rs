//! Emission: wraps the accumulated bindings into the final header and
//! implementation files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::driver::Bindings;

/// `widget.h` → `_WIDGET_CWRAPPER_H_`.
pub fn guard_name(first_header: &Path) -> String {
    let stem = first_header
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("_{stem}_CWRAPPER_H_")
}

/// The C header: include guard, C standard headers, then the declarations
/// inside `extern "C"`.
pub fn render_header(bindings: &Bindings, guard: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
    out.push_str("#include <stdbool.h>\n#include <stddef.h>\n#include <stdint.h>\n\n");
    out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");
    out.push_str(&bindings.header);
    out.push_str("\n#ifdef __cplusplus\n}\n#endif\n\n");
    out.push_str(&format!("#endif /* {guard} */\n"));
    out
}

/// The C++ implementation: the wrapped headers, any extra includes, the
/// generated C header, then the forwarding definitions inside `extern "C"`.
///
/// `includes` entries already wrapped in `<>` or `""` are used verbatim,
/// anything else is quoted.
pub fn render_source(bindings: &Bindings, header_name: &str, includes: &[String]) -> String {
    let mut out = String::new();
    for inc in includes {
        if inc.starts_with('<') || inc.starts_with('"') {
            out.push_str(&format!("#include {inc}\n"));
        } else {
            out.push_str(&format!("#include \"{inc}\"\n"));
        }
    }
    out.push_str("#include <type_traits>\n");
    out.push_str(&format!("#include \"{header_name}\"\n\n"));
    out.push_str("extern \"C\" {\n\n");
    out.push_str(&bindings.source);
    out.push_str("\n}\n");
    out
}

/// Rendered output, ready to write.
#[derive(Debug, Clone)]
pub struct Output {
    pub header: String,
    pub source: String,
}

/// Paths the output was written to.
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    pub header: PathBuf,
    pub source: PathBuf,
}

pub fn write_outputs(
    output: &Output,
    header_path: &Path,
    source_path: &Path,
) -> Result<GeneratedFiles> {
    for parent in [header_path.parent(), source_path.parent()].into_iter().flatten() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }
    std::fs::write(header_path, &output.header)
        .with_context(|| format!("writing header to {}", header_path.display()))?;
    std::fs::write(source_path, &output.source)
        .with_context(|| format!("writing source to {}", source_path.display()))?;

    info!(
        header = %header_path.display(),
        source = %source_path.display(),
        bytes = output.header.len() + output.source.len(),
        "wrote bindings"
    );

    Ok(GeneratedFiles {
        header: header_path.to_path_buf(),
        source: source_path.to_path_buf(),
    })
}
