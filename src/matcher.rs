use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::fingerprint::{
    ComponentScore, ConfidencePolicy, Fingerprinter, MATCH_POLICY, MatchConfidence,
    component_scores, similarity_score,
};
use crate::mapping::PageMapping;
use crate::ocr::PageTextProvider;
use crate::toc::Side;

#[derive(Debug, Clone)]
pub struct MappedDocument {
    pub path: PathBuf,
    pub mapping: PageMapping,
}

impl MappedDocument {
    pub fn new(path: impl Into<PathBuf>, mapping: PageMapping) -> Self {
        Self {
            path: path.into(),
            mapping,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDirection {
    YoursToTheirs,
    TheirsToYours,
}

impl MatchDirection {
    pub fn from_side(side: Side) -> Self {
        match side {
            Side::Yours => MatchDirection::YoursToTheirs,
            Side::Theirs => MatchDirection::TheirsToYours,
        }
    }

    pub fn source(self) -> Side {
        match self {
            MatchDirection::YoursToTheirs => Side::Yours,
            MatchDirection::TheirsToYours => Side::Theirs,
        }
    }

    pub fn target(self) -> Side {
        self.source().counterpart()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredPage {
    pub logical: u32,
    pub source_physical: u32,
    pub target_physical: u32,
    pub score: f64,
    pub confidence: MatchConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageMatch {
    NotInDocument { logical: u32 },
    NotInCounterpartToc { logical: u32, physical: u32 },
    Scored(ScoredPage),
}

pub struct PageMatcher<'a> {
    yours: &'a MappedDocument,
    theirs: &'a MappedDocument,
    pages: &'a dyn PageTextProvider,
    fingerprinter: &'a Fingerprinter,
    policy: ConfidencePolicy,
}

impl<'a> PageMatcher<'a> {
    pub fn new(
        yours: &'a MappedDocument,
        theirs: &'a MappedDocument,
        pages: &'a dyn PageTextProvider,
        fingerprinter: &'a Fingerprinter,
    ) -> Self {
        Self {
            yours,
            theirs,
            pages,
            fingerprinter,
            policy: MATCH_POLICY,
        }
    }

    pub fn document(&self, side: Side) -> &'a MappedDocument {
        match side {
            Side::Yours => self.yours,
            Side::Theirs => self.theirs,
        }
    }

    pub fn match_page(&self, direction: MatchDirection, logical: u32) -> PageMatch {
        let source = self.document(direction.source());
        let target = self.document(direction.target());

        let Some(source_physical) = source.mapping.get(logical) else {
            return PageMatch::NotInDocument { logical };
        };
        let Some(target_physical) = target.mapping.get(logical) else {
            return PageMatch::NotInCounterpartToc {
                logical,
                physical: source_physical,
            };
        };

        let score = self.score_physical(
            &source.path,
            source_physical,
            &target.path,
            target_physical,
        );
        PageMatch::Scored(ScoredPage {
            logical,
            source_physical,
            target_physical,
            score,
            confidence: self.policy.band(score),
        })
    }

    pub fn score_physical(
        &self,
        left_document: &Path,
        left_page: u32,
        right_document: &Path,
        right_page: u32,
    ) -> f64 {
        similarity_score(
            &self.fingerprinter.fingerprint(&self.pages.page_text(left_document, left_page)),
            &self
                .fingerprinter
                .fingerprint(&self.pages.page_text(right_document, right_page)),
        )
    }

    pub fn explain_physical(
        &self,
        left_document: &Path,
        left_page: u32,
        right_document: &Path,
        right_page: u32,
    ) -> Vec<ComponentScore> {
        component_scores(
            &self.fingerprinter.fingerprint(&self.pages.page_text(left_document, left_page)),
            &self
                .fingerprinter
                .fingerprint(&self.pages.page_text(right_document, right_page)),
        )
    }
}
