//! PDF export through an external HTML renderer.
//!
//! Images are inlined as base64 data URIs first so the renderer does not
//! need to resolve relative chart paths itself.

use std::path::Path;
use std::process::Command;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use crate::config::PdfSettings;
use crate::report::RenderError;

pub const DEFAULT_STYLESHEET: &str = include_str!("../../templates/style.css");

/// Replace every `<img src="...">` path with a data URI.
///
/// Paths resolve against `base_dir`. `data:` URIs and images that cannot be
/// read are left untouched.
pub fn inline_images(html: &str, base_dir: &Path) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find("<img") {
        out.push_str(&rest[..start]);
        let tag_len = rest[start..].find('>').map_or(rest.len() - start, |end| end + 1);
        let tag = &rest[start..start + tag_len];
        out.push_str(&inline_tag(tag, base_dir));
        rest = &rest[start + tag_len..];
    }
    out.push_str(rest);
    out
}

fn inline_tag(tag: &str, base_dir: &Path) -> String {
    const SRC: &str = "src=\"";
    let Some(src_start) = tag.find(SRC).map(|i| i + SRC.len()) else {
        return tag.to_string();
    };
    let Some(src_len) = tag[src_start..].find('"') else {
        return tag.to_string();
    };
    let src = &tag[src_start..src_start + src_len];
    if src.starts_with("data:") {
        return tag.to_string();
    }

    let path = base_dir.join(src);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "image not found, left as-is");
            return tag.to_string();
        }
    };
    let uri = format!("data:{};base64,{}", mime_type(&path), STANDARD.encode(bytes));
    format!("{}{uri}{}", &tag[..src_start], &tag[src_start + src_len..])
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "image/png",
    }
}

/// Write `html` (with images inlined) to a scratch file and run the renderer.
pub fn render_pdf(
    html: &str,
    base_dir: &Path,
    output: &Path,
    settings: &PdfSettings,
    stylesheet: &Path,
) -> Result<(), RenderError> {
    let inlined = inline_images(html, base_dir);
    let scratch = output.with_extension("inline.html");
    write(&scratch, &inlined)?;

    let (css, scratch_css) = if stylesheet.exists() {
        (stylesheet.to_path_buf(), None)
    } else {
        debug!(path = %stylesheet.display(), "stylesheet missing, using built-in");
        let css = output.with_extension("style.css");
        write(&css, DEFAULT_STYLESHEET)?;
        (css.clone(), Some(css))
    };

    let result = run_renderer(settings, &css, &scratch, output);
    for path in std::iter::once(&scratch).chain(scratch_css.as_ref()) {
        if let Err(e) = std::fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "could not remove scratch file");
        }
    }
    result?;
    info!(path = %output.display(), "PDF written");
    Ok(())
}

fn run_renderer(
    settings: &PdfSettings,
    css: &Path,
    input: &Path,
    output: &Path,
) -> Result<(), RenderError> {
    let status = Command::new(&settings.command)
        .args(&settings.args)
        .arg("-s")
        .arg(css)
        .arg(input)
        .arg(output)
        .status()
        .map_err(|e| RenderError::Pdf {
            command: settings.command.clone(),
            message: e.to_string(),
        })?;
    if !status.success() {
        return Err(RenderError::Pdf {
            command: settings.command.clone(),
            message: format!("exited with {status}"),
        });
    }
    Ok(())
}

fn write(path: &Path, contents: &str) -> Result<(), RenderError> {
    std::fs::write(path, contents).map_err(|source| RenderError::Io {
        path: path.display().to_string(),
        source,
    })
}
