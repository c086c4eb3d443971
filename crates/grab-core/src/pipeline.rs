use crate::config::Heuristics;
use crate::error::Result;
use crate::extract::extract_blocks;
use crate::filter::SnippetFilter;
use crate::fingerprint::SeenBlocks;
use crate::resolve::Resolver;
use crate::types::{RawBlock, ResolvedFile};

/// One compiled instance of the snapshot pipeline: extract, deduplicate,
/// filter, resolve. Sessions run it repeatedly against snapshots of a
/// growing output, sharing one [`SeenBlocks`] so every block is emitted at
/// most once per session.
pub struct Pipeline {
    resolver: Resolver,
    filter: SnippetFilter,
}

impl Pipeline {
    pub fn new(tables: &Heuristics) -> Result<Self> {
        Ok(Self {
            resolver: Resolver::new(tables)?,
            filter: SnippetFilter::new(tables),
        })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn filter(&self) -> &SnippetFilter {
        &self.filter
    }

    /// Full pass over one snapshot.
    pub fn process_snapshot(&self, snapshot: &str, seen: &mut SeenBlocks) -> Vec<ResolvedFile> {
        self.process_blocks(extract_blocks(snapshot), seen)
    }

    /// Dedup, filter and name already-extracted blocks. Fallback names are
    /// keyed by the session-wide novel-block count, so names stay unique
    /// across repeated passes.
    pub fn process_blocks(
        &self,
        blocks: Vec<RawBlock>,
        seen: &mut SeenBlocks,
    ) -> Vec<ResolvedFile> {
        let mut files = Vec::new();
        for block in blocks {
            if !seen.insert_novel(&block.content) {
                continue;
            }
            let index = seen.len() - 1;
            let evidence = self.resolver.path_evidence(&block);
            if self.filter.is_noise(&block.content, evidence.as_ref()) {
                continue;
            }
            files.push(self.resolver.assign(&block, evidence.as_ref(), index));
        }
        files
    }
}
