//! # Page Breaks
//!
//! Each page template is formatted as one tall flow. Pagination then cuts
//! the body children of that flow into physical pages, keeping every child
//! whole, and gives every extra physical page its own copy of the
//! template's headers and footers.

use crate::model::FixedPosition;
use crate::runtime::PageContext;
use crate::tree::{NodeId, NodeKind, NodeTree};

/// Decide what to do when a run of items doesn't fit on the current page.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// Place every item on the current page (they fit).
    Place,
    /// Move the whole run to the next page.
    MoveToNextPage,
    /// Place some items here and continue on the next page.
    Split {
        /// How many items fit on the current page.
        items_on_current_page: usize,
    },
}

/// Given the remaining space on a page and a list of item heights,
/// decide how to break.
pub fn decide_break(
    remaining_height: f64,
    item_heights: &[f64],
    min_orphan_items: usize,
    min_widow_items: usize,
) -> BreakDecision {
    let total: f64 = item_heights.iter().sum();

    if total <= remaining_height {
        return BreakDecision::Place;
    }

    let fit_count = greedy_fit(remaining_height, item_heights);
    let total_items = item_heights.len();

    // Too few items would stay behind on this page.
    if fit_count < min_orphan_items && fit_count < total_items {
        return BreakDecision::MoveToNextPage;
    }

    // Too few items would be carried over; pull some back.
    let remaining_items = total_items - fit_count;
    if remaining_items < min_widow_items && remaining_items > 0 {
        let adjusted = fit_count.saturating_sub(min_widow_items - remaining_items);
        if adjusted == 0 {
            return BreakDecision::MoveToNextPage;
        }
        return BreakDecision::Split {
            items_on_current_page: adjusted,
        };
    }

    if fit_count == 0 {
        return BreakDecision::MoveToNextPage;
    }

    BreakDecision::Split {
        items_on_current_page: fit_count,
    }
}

fn greedy_fit(remaining_height: f64, item_heights: &[f64]) -> usize {
    let mut running = 0.0;
    let mut fit_count = 0;
    for &h in item_heights {
        if running + h > remaining_height {
            break;
        }
        running += h;
        fit_count += 1;
    }
    fit_count
}

/// One output page cut from a page template.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalPage {
    /// The `Page` node this page was cut from.
    pub template: NodeId,
    /// 1-based, counted across the whole document.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    /// Header and footer roots: the template's own on its first page,
    /// copies on every later one.
    pub fixed: Vec<NodeId>,
    /// Body children of the template placed on this page.
    pub body: Vec<NodeId>,
    /// Vertical shift applied to the body's tasks.
    pub offset_y: f64,
}

/// The physical pages of a formatted document, in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pagination {
    pages: Vec<PhysicalPage>,
}

impl Pagination {
    /// Cut every page template of a formatted tree into physical pages.
    pub fn paginate(tree: &mut NodeTree) -> Self {
        let mut pages = Vec::new();
        let templates: Vec<NodeId> = tree
            .children(tree.root())
            .iter()
            .copied()
            .filter(|&c| matches!(tree.kind(c), NodeKind::Page { .. }))
            .collect();
        for template in templates {
            paginate_template(tree, template, &mut pages);
        }
        log::debug!("paginated into {} physical pages", pages.len());
        Self { pages }
    }

    pub fn pages(&self) -> &[PhysicalPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageContext for Pagination {
    fn page_number(&self, page_index: usize) -> Option<usize> {
        self.pages.get(page_index).map(|p| p.number)
    }

    fn total_pages(&self) -> usize {
        self.pages.len()
    }
}

/// Top and bottom of a node's margin box.
fn outer_span(tree: &NodeTree, id: NodeId) -> (f64, f64) {
    let g = tree.geometry(id);
    let margin = tree.margin(id);
    (g.y - margin.top, g.y + g.height.unwrap_or(0.0) + margin.bottom)
}

fn paginate_template(tree: &mut NodeTree, template: NodeId, pages: &mut Vec<PhysicalPage>) {
    let NodeKind::Page { config } = tree.kind(template) else {
        return;
    };
    let (width, height) = config.size.dimensions();
    let (min_orphan, min_widow) = (config.min_orphan_items, config.min_widow_items);

    let mut fixed = Vec::new();
    let mut body = Vec::new();
    let (mut header_bottom, mut footer_top): (Option<f64>, Option<f64>) = (None, None);
    for &child in tree.children(template) {
        match tree.kind(child) {
            NodeKind::Fixed { position } => {
                let (top, bottom) = outer_span(tree, child);
                match position {
                    FixedPosition::Header => {
                        header_bottom = Some(header_bottom.map_or(bottom, |b| b.max(bottom)))
                    }
                    FixedPosition::Footer => {
                        footer_top = Some(footer_top.map_or(top, |t| t.min(top)))
                    }
                }
                fixed.push(child);
            }
            _ => body.push(child),
        }
    }

    let (_, content_top) = tree.start_drawing_point(template);
    let content_bottom = height - tree.padding(template).bottom;
    let body_top = header_bottom.unwrap_or(content_top);
    let body_bottom = footer_top.unwrap_or(content_bottom);
    let available = (body_bottom - body_top).max(0.0);

    // Heights as steps between cumulative bottoms, so inline siblings
    // sharing a line are counted once.
    let first_top = body.first().map_or(body_top, |&c| outer_span(tree, c).0);
    let mut bottoms = Vec::with_capacity(body.len());
    let mut prev = first_top;
    for &child in &body {
        prev = prev.max(outer_span(tree, child).1);
        bottoms.push(prev);
    }
    let heights: Vec<f64> = bottoms
        .iter()
        .enumerate()
        .map(|(i, &b)| b - if i == 0 { first_top } else { bottoms[i - 1] })
        .collect();

    let mut start = 0;
    let mut first = true;
    while first || start < body.len() {
        let rest = &heights[start..];
        let count = match decide_break(available, rest, min_orphan, min_widow) {
            BreakDecision::Place => rest.len(),
            BreakDecision::Split {
                items_on_current_page,
            } => items_on_current_page,
            BreakDecision::MoveToNextPage => 0,
        };
        // A fresh page is as good as it gets; take at least one item.
        let count = if count == 0 && !rest.is_empty() {
            greedy_fit(available, rest).max(1)
        } else {
            count
        };

        let chunk_top = if start == 0 { first_top } else { bottoms[start - 1] };
        let page_fixed = if first {
            fixed.clone()
        } else {
            fixed.iter().map(|&f| tree.copy_as_runtime(f)).collect()
        };
        pages.push(PhysicalPage {
            template,
            number: pages.len() + 1,
            width,
            height,
            fixed: page_fixed,
            body: body[start..start + count].to_vec(),
            offset_y: body_top - chunk_top,
        });

        start += count;
        first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::with_env;
    use crate::format::FormatterChain;
    use crate::model::{Edges, PageConfig, PageSize};
    use crate::tree::Attribute;

    #[test]
    fn exact_fit_is_placed() {
        assert_eq!(decide_break(75.0, &[25.0, 25.0, 25.0], 1, 1), BreakDecision::Place);
    }

    #[test]
    fn zero_steps_ride_with_their_line() {
        // Inline siblings on one line contribute no height of their own.
        let decision = decide_break(80.0, &[25.0, 0.0, 25.0, 25.0, 25.0], 1, 1);
        assert_eq!(
            decision,
            BreakDecision::Split {
                items_on_current_page: 4,
            }
        );
    }

    #[test]
    fn widow_rule_never_empties_the_page() {
        let decision = decide_break(30.0, &[25.0, 25.0], 1, 2);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }

    fn document(heights: &[f64], min_widow_items: usize, with_footer: bool) -> NodeTree {
        let mut tree = NodeTree::new();
        let config = PageConfig {
            size: PageSize::Custom {
                width: 100.0,
                height: 100.0,
            },
            margin: Edges::uniform(10.0),
            min_widow_items,
            ..PageConfig::default()
        };
        let page = tree.append(tree.root(), NodeKind::Page { config }).unwrap();
        if with_footer {
            let footer = tree
                .append(page, NodeKind::Fixed { position: FixedPosition::Footer })
                .unwrap();
            tree.set_attribute(footer, Attribute::Height, 20.0).unwrap();
        }
        for &height in heights {
            let block = tree.append(page, NodeKind::Block).unwrap();
            tree.set_attribute(block, Attribute::Height, height).unwrap();
        }
        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();
        tree
    }

    fn tall_document(blocks: usize, with_footer: bool) -> NodeTree {
        document(&vec![25.0; blocks], 1, with_footer)
    }

    fn body_counts(pagination: &Pagination) -> Vec<usize> {
        pagination.pages().iter().map(|p| p.body.len()).collect()
    }

    #[test]
    fn widow_minimum_carries_a_pair_over() {
        let mut tree = document(&[25.0; 4], 2, false);
        let pagination = Pagination::paginate(&mut tree);
        // Three would fit, but the last block must not be left alone.
        assert_eq!(body_counts(&pagination), vec![2, 2]);
        assert_eq!(pagination.pages()[1].offset_y, -50.0);
    }

    #[test]
    fn oversized_block_gets_its_own_page() {
        let mut tree = document(&[90.0, 10.0, 10.0], 1, false);
        let pagination = Pagination::paginate(&mut tree);
        assert_eq!(body_counts(&pagination), vec![1, 2]);
        assert_eq!(pagination.pages()[1].offset_y, -90.0);
    }

    #[test]
    fn body_is_cut_into_pages() {
        let mut tree = tall_document(5, false);
        let pagination = Pagination::paginate(&mut tree);

        // 80pt of content height fits three 25pt blocks.
        assert_eq!(body_counts(&pagination), vec![3, 2]);
        let second = &pagination.pages()[1];
        assert_eq!(second.number, 2);
        assert_eq!(second.offset_y, -75.0);
        assert_eq!(pagination.total_pages(), 2);
        assert_eq!(pagination.page_number(1), Some(2));
        assert_eq!(pagination.page_number(2), None);
    }

    #[test]
    fn footers_shrink_the_body_and_are_copied() {
        let mut tree = tall_document(4, true);
        let pagination = Pagination::paginate(&mut tree);

        // 60pt left above the footer: two blocks per page.
        assert_eq!(pagination.len(), 2);
        let (first, second) = (&pagination.pages()[0], &pagination.pages()[1]);
        assert_eq!(first.body.len(), 2);
        assert_ne!(first.fixed, second.fixed);
        assert_eq!(tree.parent(second.fixed[0]), tree.parent(first.fixed[0]));
    }

    #[test]
    fn empty_template_still_yields_a_page() {
        let mut tree = tall_document(0, true);
        let pagination = Pagination::paginate(&mut tree);
        assert_eq!(pagination.len(), 1);
        assert!(pagination.pages()[0].body.is_empty());
        assert_eq!(pagination.pages()[0].fixed.len(), 1);
    }
}
