use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::mapping::DEFAULT_MAX_LOGICAL_PAGE;
use crate::ocr::DEFAULT_OCR_LANG;
use crate::toc::Side;

#[derive(Parser, Debug)]
#[command(
    name = "auditor",
    version,
    about = "Medical record TOC reconciliation and discrepancy reporting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Parse(ParseArgs),
    Reconcile(ReconcileArgs),
    Mappings(MappingsArgs),
    Report(ReportArgs),
    Investigate(InvestigateArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SideArg {
    Yours,
    Theirs,
}

impl From<SideArg> for Side {
    fn from(value: SideArg) -> Self {
        match value {
            SideArg::Yours => Side::Yours,
            SideArg::Theirs => Side::Theirs,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TocOptions {
    #[arg(long, default_value_t = 25)]
    pub toc_pages: usize,

    #[arg(long, default_value_t = 500)]
    pub max_page_number: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(long, value_enum)]
    pub side: SideArg,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub toc: TocOptions,
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    #[arg(long)]
    pub case_dir: PathBuf,

    #[arg(long)]
    pub yours: PathBuf,

    #[arg(long)]
    pub theirs: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub toc: TocOptions,
}

#[derive(Args, Debug, Clone)]
pub struct MappingsArgs {
    #[arg(long)]
    pub case_dir: PathBuf,

    #[arg(long)]
    pub yours_pdf: PathBuf,

    #[arg(long)]
    pub theirs_pdf: PathBuf,

    #[arg(long)]
    pub fallback_offset: Option<u32>,

    #[arg(long, default_value_t = DEFAULT_MAX_LOGICAL_PAGE)]
    pub max_logical_page: u32,

    #[arg(long, default_value_t = false)]
    pub rebuild_theirs: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long)]
    pub case_dir: PathBuf,

    #[arg(long)]
    pub yours_pdf: PathBuf,

    #[arg(long)]
    pub theirs_pdf: PathBuf,

    #[arg(long)]
    pub reconciliation: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_OCR_LANG)]
    pub ocr_lang: String,
}

#[derive(Args, Debug, Clone)]
pub struct InvestigateArgs {
    #[arg(long)]
    pub case_dir: PathBuf,

    #[arg(long)]
    pub yours_pdf: PathBuf,

    #[arg(long)]
    pub theirs_pdf: PathBuf,

    #[arg(long)]
    pub your_page: u32,

    #[arg(long)]
    pub their_page: u32,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long, default_value = DEFAULT_OCR_LANG)]
    pub ocr_lang: String,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub case_dir: PathBuf,
}
