//! # Search
//!
//! Case-insensitive substring search over active pages. A page matches when
//! its title or the content of any of its blocks contains the query. Hits come
//! back in listing order: there is no ranking.
//!
//! Each hit carries its title split into [`MatchSegment`]s and, when a block
//! matched, the first matching block split the same way, so callers can
//! render highlights without searching again.

use crate::model::{BlockId, Page, PageId};
use crate::tree::PageTree;

/// A segment of text in a search hit, either plain text or a matched term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSegment {
    Plain(String),
    Match(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    pub block_id: BlockId,
    pub segments: Vec<MatchSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub page_id: PageId,
    pub title_matched: bool,
    pub title: Vec<MatchSegment>,
    pub block: Option<BlockMatch>,
}

/// Searches the active pages of `tree`. A blank query finds nothing.
pub fn search(tree: &PageTree, query: &str) -> Vec<SearchHit> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    tree.pages()
        .filter(|page| page.is_active())
        .filter_map(|page| hit_for(page, &needle))
        .collect()
}

fn hit_for(page: &Page, needle: &str) -> Option<SearchHit> {
    let title = highlight_matches(&page.title, needle);
    let title_matched = title.iter().any(|s| matches!(s, MatchSegment::Match(_)));

    let block = page.blocks.iter().find_map(|block| {
        let segments = highlight_matches(&block.content, needle);
        segments
            .iter()
            .any(|s| matches!(s, MatchSegment::Match(_)))
            .then(|| BlockMatch {
                block_id: block.id,
                segments,
            })
    });

    (title_matched || block.is_some()).then(|| SearchHit {
        page_id: page.id,
        title_matched,
        title,
        block,
    })
}

/// Splits `text` around every case-insensitive occurrence of `needle`.
///
/// `needle` must already be lowercase. Lowercasing can change byte lengths
/// (`İ` becomes two chars), so matches are found in the lowered text and then
/// mapped back to char boundaries of the original.
pub fn highlight_matches(text: &str, needle: &str) -> Vec<MatchSegment> {
    if needle.is_empty() {
        return vec![MatchSegment::Plain(text.to_string())];
    }

    let mut lowered = String::with_capacity(text.len());
    // origin[i] = byte offset in `text` of the char that produced lowered byte i
    let mut origin = Vec::with_capacity(text.len() + 1);
    for (idx, c) in text.char_indices() {
        for lc in c.to_lowercase() {
            let before = lowered.len();
            lowered.push(lc);
            origin.extend(std::iter::repeat(idx).take(lowered.len() - before));
        }
    }
    origin.push(text.len());

    let mut segments = Vec::new();
    let mut last = 0;
    for (start, matched) in lowered.match_indices(needle) {
        let from = origin[start];
        let to = origin[start + matched.len()];
        if from < last || from == to {
            continue;
        }
        if from > last {
            segments.push(MatchSegment::Plain(text[last..from].to_string()));
        }
        segments.push(MatchSegment::Match(text[from..to].to_string()));
        last = to;
    }
    if last < text.len() {
        segments.push(MatchSegment::Plain(text[last..].to_string()));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockPatch, NewBlock};

    #[test]
    fn highlights_every_occurrence_keeping_case() {
        let segments = highlight_matches("Rust and rust", "rust");
        assert_eq!(
            segments,
            vec![
                MatchSegment::Match("Rust".into()),
                MatchSegment::Plain(" and ".into()),
                MatchSegment::Match("rust".into()),
            ]
        );
    }

    #[test]
    fn highlights_non_ascii_text() {
        let segments = highlight_matches("Заметки о Проекте", "проект");
        assert_eq!(
            segments,
            vec![
                MatchSegment::Plain("Заметки о ".into()),
                MatchSegment::Match("Проект".into()),
                MatchSegment::Plain("е".into()),
            ]
        );
    }

    #[test]
    fn no_match_is_one_plain_segment() {
        assert_eq!(
            highlight_matches("hello", "xyz"),
            vec![MatchSegment::Plain("hello".into())]
        );
    }

    #[test]
    fn finds_pages_by_title_or_block_content() {
        let mut tree = PageTree::new();
        let a = tree.create("Groceries", None).unwrap();
        let b = tree.create("Work", None).unwrap();
        tree.insert_block(b.id, None, NewBlock::todo("buy new keyboard"))
            .unwrap();
        tree.create("Unrelated", None).unwrap();

        let hits = search(&tree, "BUY");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page_id, b.id);
        assert!(!hits[0].title_matched);
        assert!(hits[0].block.is_some());

        let hits = search(&tree, "gro");
        assert_eq!(hits[0].page_id, a.id);
        assert!(hits[0].title_matched);
        assert!(hits[0].block.is_none());
    }

    #[test]
    fn archived_pages_are_not_searched() {
        let mut tree = PageTree::new();
        let a = tree.create("Secret plan", None).unwrap();
        tree.archive(a.id).unwrap();
        assert!(search(&tree, "secret").is_empty());
    }

    #[test]
    fn blank_query_finds_nothing() {
        let mut tree = PageTree::new();
        tree.create("Anything", None).unwrap();
        assert!(search(&tree, "   ").is_empty());
    }

    #[test]
    fn first_matching_block_is_reported() {
        let mut tree = PageTree::new();
        let page = tree.create("Notes", None).unwrap();
        let first = page.blocks.ids()[0];
        tree.update_block(page.id, first, &BlockPatch::content("alpha beta"))
            .unwrap();
        tree.insert_block(page.id, None, NewBlock::text("beta again"))
            .unwrap();

        let hits = search(&tree, "beta");
        assert_eq!(hits[0].block.as_ref().unwrap().block_id, first);
    }
}
