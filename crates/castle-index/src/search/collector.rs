//! Top-hits collection with "search after" pagination.
//!
//! Hits are ranked by descending score, ties broken by ascending document address, so
//! the ranking is total and a page can resume strictly after the last hit of the
//! previous one.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use tantivy::{
    DocAddress, DocId, Score, SegmentOrdinal, SegmentReader,
    collector::{Collector, SegmentCollector},
};

/// A scored hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    /// Relevance score.
    pub score: Score,
    /// Document address in the searched snapshot.
    pub address: DocAddress,
}

impl ScoredDoc {
    /// Whether `self` ranks strictly after `other`.
    pub fn ranks_after(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Less
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    /// Greater means ranked earlier.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score).then_with(|| {
            (other.address.segment_ord, other.address.doc_id)
                .cmp(&(self.address.segment_ord, self.address.doc_id))
        })
    }
}

/// Hits for one page plus the number of matching documents.
#[derive(Debug, Default)]
pub struct PageFruit {
    /// Best hits after the cursor, best first.
    pub hits: Vec<ScoredDoc>,
    /// Every matching document, including those before the cursor.
    pub total: usize,
}

/// Collects the best `limit` hits ranked after an optional previous hit.
pub struct SearchAfterCollector {
    /// Page size.
    limit: usize,
    /// Last hit of the previous page.
    after: Option<ScoredDoc>,
}

impl SearchAfterCollector {
    /// Creates a collector for a page of `limit` hits after `after`.
    pub fn new(limit: usize, after: Option<ScoredDoc>) -> Self {
        Self {
            limit: limit.max(1),
            after,
        }
    }
}

/// Per-segment state of [`SearchAfterCollector`].
pub struct SearchAfterSegmentCollector {
    /// Ordinal of the collected segment.
    segment_ord: SegmentOrdinal,
    /// Page size.
    limit: usize,
    /// Last hit of the previous page.
    after: Option<ScoredDoc>,
    /// Worst hit on top so it is evicted first.
    heap: BinaryHeap<Reverse<ScoredDoc>>,
    /// Matching documents seen.
    total: usize,
}

impl Collector for SearchAfterCollector {
    type Fruit = PageFruit;
    type Child = SearchAfterSegmentCollector;

    fn for_segment(
        &self,
        segment_local_id: SegmentOrdinal,
        _segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        Ok(SearchAfterSegmentCollector {
            segment_ord: segment_local_id,
            limit: self.limit,
            after: self.after,
            heap: BinaryHeap::with_capacity(self.limit + 1),
            total: 0,
        })
    }

    fn requires_scoring(&self) -> bool {
        true
    }

    fn merge_fruits(&self, segment_fruits: Vec<PageFruit>) -> tantivy::Result<PageFruit> {
        let total = segment_fruits.iter().map(|f| f.total).sum();
        let mut hits: Vec<ScoredDoc> = segment_fruits.into_iter().flat_map(|f| f.hits).collect();
        hits.sort_by(|a, b| b.cmp(a));
        hits.truncate(self.limit);
        Ok(PageFruit { hits, total })
    }
}

impl SegmentCollector for SearchAfterSegmentCollector {
    type Fruit = PageFruit;

    fn collect(&mut self, doc: DocId, score: Score) {
        self.total += 1;
        let hit = ScoredDoc {
            score,
            address: DocAddress::new(self.segment_ord, doc),
        };
        if let Some(after) = &self.after
            && !hit.ranks_after(after)
        {
            return;
        }
        self.heap.push(Reverse(hit));
        if self.heap.len() > self.limit {
            self.heap.pop();
        }
    }

    fn harvest(self) -> PageFruit {
        let mut hits: Vec<ScoredDoc> = self.heap.into_iter().map(|Reverse(hit)| hit).collect();
        hits.sort_by(|a, b| b.cmp(a));
        PageFruit {
            hits,
            total: self.total,
        }
    }
}
