use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, warn};

use crate::util::{document_basename, ensure_directory, run_tool};

pub const DEFAULT_OCR_LANG: &str = "eng";

pub trait OcrEngine {
    fn ocr_page(&self, document: &Path, page: u32) -> Result<String>;
}

pub trait PageTextProvider {
    fn page_text(&self, document: &Path, page: u32) -> String;
}

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    lang: String,
}

impl TesseractEngine {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(DEFAULT_OCR_LANG)
    }
}

impl OcrEngine for TesseractEngine {
    fn ocr_page(&self, document: &Path, page: u32) -> Result<String> {
        let safe_stem = document_basename(document)
            .chars()
            .map(|character| {
                if character.is_ascii_alphanumeric() {
                    character
                } else {
                    '_'
                }
            })
            .collect::<String>();

        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let output_root = std::env::temp_dir().join(format!(
            "auditor_ocr_{}_{}_{}_{}",
            safe_stem,
            std::process::id(),
            page,
            stamp
        ));
        let png_path = PathBuf::from(format!("{}.png", output_root.display()));

        let rasterized = Command::new("pdftoppm")
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile")
            .arg("-png")
            .arg(document)
            .arg(&output_root)
            .output()
            .with_context(|| format!("failed to execute pdftoppm for {}", document.display()))?;

        if !rasterized.status.success() {
            let stderr = String::from_utf8_lossy(&rasterized.stderr);
            bail!(
                "pdftoppm returned non-zero exit status for {} page {}: {}",
                document.display(),
                page,
                stderr.trim()
            );
        }

        if !png_path.exists() {
            bail!(
                "pdftoppm did not produce expected image for {} page {}",
                document.display(),
                page
            );
        }

        let args: [&OsStr; 4] = [
            png_path.as_os_str(),
            "stdout".as_ref(),
            "-l".as_ref(),
            self.lang.as_ref(),
        ];
        let text = run_tool("tesseract", args, document);
        let _ = fs::remove_file(&png_path);

        Ok(text?.trim().to_string())
    }
}

type CacheKey = (String, u32);

/// Read-through OCR cache: memory, then `<dir>/<basename>_<page>.txt`, then
/// the engine. Each key is computed at most once per run, even when pages
/// are requested from several threads.
///
/// Failed or empty OCR is remembered for the rest of the run but never
/// written to disk, so the next run tries again.
pub struct OcrCache<E> {
    engine: E,
    cache_dir: PathBuf,
    entries: Mutex<HashMap<CacheKey, Arc<OnceLock<String>>>>,
}

impl<E: OcrEngine> OcrCache<E> {
    pub fn new(engine: E, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            cache_dir: cache_dir.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_path(&self, document: &Path, page: u32) -> PathBuf {
        self.cache_dir
            .join(format!("{}_{}.txt", document_basename(document), page))
    }

    fn slot(&self, key: CacheKey) -> Arc<OnceLock<String>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(entries.entry(key).or_default())
    }

    fn load(&self, document: &Path, page: u32) -> String {
        let path = self.cache_path(document, page);
        if path.is_file() {
            match fs::read_to_string(&path) {
                Ok(text) => {
                    debug!(path = %path.display(), "OCR cache hit");
                    return text;
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "unreadable OCR cache file; running OCR again"
                    );
                }
            }
        }

        let text = match self.engine.ocr_page(document, page) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    path = %document.display(),
                    page,
                    error = %format!("{err:#}"),
                    "OCR failed; treating page as empty"
                );
                return String::new();
            }
        };

        if text.trim().is_empty() {
            warn!(path = %document.display(), page, "OCR produced no text");
            return text;
        }

        if let Err(err) = self.store(&path, &text) {
            warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "failed to write OCR cache file"
            );
        }
        text
    }

    fn store(&self, path: &Path, text: &str) -> Result<()> {
        ensure_directory(&self.cache_dir)?;
        fs::write(path, text)
            .with_context(|| format!("failed to write OCR cache file: {}", path.display()))
    }
}

impl<E: OcrEngine> PageTextProvider for OcrCache<E> {
    fn page_text(&self, document: &Path, page: u32) -> String {
        let slot = self.slot((document_basename(document), page));
        slot.get_or_init(|| self.load(document, page)).clone()
    }
}
