//! HTML to PDF through the controlled browser
//!
//! Two styles: `Plain` is camera-ready (no margins, no header/footer, the
//! HTML is loaded from its file URL so relative assets resolve), `Formal`
//! is the procedure-document layout with a running header and a numbered
//! footer.

use action_flow::escape_html;
use cdp_adapter::{Cdp, PageId, PrintOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::errors::{ReelError, ReelResult};
use crate::session::wait_for_assets;

const LOAD_DEADLINE: Duration = Duration::from_secs(30);

pub const DEFAULT_TITLE: &str = "Standard Operating Procedure";
pub const DEFAULT_DOC_ID: &str = "SOP";

#[derive(Debug, Clone, PartialEq)]
pub enum PdfStyle {
    Plain,
    Formal { title: String, doc_id: String },
}

impl PdfStyle {
    pub fn formal(title: Option<String>, doc_id: Option<String>) -> Self {
        PdfStyle::Formal {
            title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            doc_id: doc_id.unwrap_or_else(|| DEFAULT_DOC_ID.to_string()),
        }
    }
}

/// Fixed text of the formal header and footer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormalMeta {
    pub brand: String,
    pub confidentiality: String,
    pub revision: String,
}

impl Default for FormalMeta {
    fn default() -> Self {
        Self {
            brand: "HelixNet".to_string(),
            confidentiality: "Confidential - Internal Use Only".to_string(),
            revision: "Rev 1.0 | January 2026".to_string(),
        }
    }
}

fn formal_header(meta: &FormalMeta, title: &str, doc_id: &str) -> String {
    format!(
        r#"<div style="width: 100%; font-size: 9px; font-family: Arial, sans-serif; padding: 0 15mm; display: flex; justify-content: space-between; color: #666;"><div style="font-weight: bold; color: #C0392B;">{}</div><div>{}</div><div style="font-weight: bold; color: #2C3E50;">{}</div></div>"#,
        escape_html(&meta.brand),
        escape_html(title),
        escape_html(doc_id),
    )
}

fn formal_footer(meta: &FormalMeta) -> String {
    format!(
        r#"<div style="width: 100%; font-size: 8px; font-family: Arial, sans-serif; padding: 5px 15mm 0; display: flex; justify-content: space-between; color: #666; border-top: 1px solid #ddd;"><div>{}</div><div>Page <span class="pageNumber"></span> of <span class="totalPages"></span></div><div>{}</div></div>"#,
        escape_html(&meta.confidentiality),
        escape_html(&meta.revision),
    )
}

pub fn print_options(style: &PdfStyle, meta: &FormalMeta) -> PrintOptions {
    match style {
        PdfStyle::Plain => PrintOptions::a4(),
        PdfStyle::Formal { title, doc_id } => PrintOptions::a4()
            .with_margins_mm(25.0, 25.0, 15.0, 15.0)
            .with_header_footer(formal_header(meta, title, doc_id), formal_footer(meta)),
    }
}

pub async fn generate_pdf(
    cdp: &dyn Cdp,
    page: PageId,
    input: &Path,
    output: &Path,
    style: &PdfStyle,
    meta: &FormalMeta,
) -> ReelResult<u64> {
    let input = std::fs::canonicalize(input)
        .map_err(|err| ReelError::invalid(format!("{}: {err}", input.display())))?;

    match style {
        PdfStyle::Plain => {
            let url = Url::from_file_path(&input)
                .map_err(|_| ReelError::invalid(format!("{} is not absolute", input.display())))?;
            cdp.navigate(page, url.as_str(), LOAD_DEADLINE).await?;
        }
        PdfStyle::Formal { .. } => {
            let html = tokio::fs::read_to_string(&input).await?;
            cdp.set_content(page, &html).await?;
        }
    }
    wait_for_assets(cdp, page).await?;

    let bytes = cdp.print_to_pdf(page, &print_options(style, meta)).await?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, &bytes).await?;

    match style {
        PdfStyle::Plain => info!(output = %output.display(), bytes = bytes.len(), "PDF generated"),
        PdfStyle::Formal { title, doc_id } => info!(
            output = %output.display(),
            bytes = bytes.len(),
            %title,
            %doc_id,
            "PDF generated"
        ),
    }
    Ok(bytes.len() as u64)
}
