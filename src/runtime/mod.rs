//! # Runtime Content
//!
//! Text whose value is only known once the whole document has been
//! paginated: page numbers and page counts.
//!
//! During formatting a runtime node flows filler text (the `dummy-text`
//! attribute, `999` by default) so it reserves roughly the right amount of
//! space. After pagination the resolution pass asks a [`PageContext`] for
//! the real numbers, re-wraps only that node inside its already fixed box,
//! and swaps its line parts' queued tasks for new ones.

use crate::error::QuireError;
use crate::font::FontMetrics;
use crate::text::{TextFlow, TextStyle};
use crate::tree::{NodeId, NodeTree};

/// What a runtime node renders.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeText {
    CurrentPageNumber,
    NumberOfPages,
    /// Free text with `{n}` (page number) and `{total}` (page count).
    Template(String),
}

impl RuntimeText {
    pub fn resolve(&self, page_number: usize, total_pages: usize) -> String {
        self.render(&page_number.to_string(), &total_pages.to_string())
    }

    /// Placeholder text used while the real values are unknown.
    pub fn filler(&self, dummy: &str) -> String {
        self.render(dummy, dummy)
    }

    fn render(&self, number: &str, total: &str) -> String {
        match self {
            RuntimeText::CurrentPageNumber => number.to_string(),
            RuntimeText::NumberOfPages => total.to_string(),
            RuntimeText::Template(template) => {
                template.replace("{n}", number).replace("{total}", total)
            }
        }
    }
}

/// Final page numbering, supplied after pagination.
pub trait PageContext {
    /// 1-based number of the physical page at `page_index`, if known.
    fn page_number(&self, page_index: usize) -> Option<usize>;

    fn total_pages(&self) -> usize;
}

/// Resolve every runtime node below `roots` for the physical page at
/// `page_index`.
///
/// A node without page context keeps its filler; the failure is logged and
/// returned, and the remaining nodes are still resolved.
pub(crate) fn resolve_page(
    tree: &mut NodeTree,
    roots: &[NodeId],
    page_index: usize,
    tracked: bool,
    context: &dyn PageContext,
    metrics: &dyn FontMetrics,
) -> Vec<QuireError> {
    let mut skipped = Vec::new();
    let number = context.page_number(page_index).filter(|_| tracked);
    let total = context.total_pages();

    for &root in roots {
        for id in tree.runtime_nodes(root) {
            let Some(number) = number else {
                let err = QuireError::MissingPageContext {
                    node: tree.label(id),
                };
                log::warn!("{} (page index {}), keeping filler text", err, page_index);
                skipped.push(err);
                continue;
            };
            resolve_node(tree, id, number, total, metrics);
        }
    }
    skipped
}

/// Give one runtime node its real text and fresh drawing tasks.
pub(crate) fn resolve_node(
    tree: &mut NodeTree,
    id: NodeId,
    page_number: usize,
    total_pages: usize,
    metrics: &dyn FontMetrics,
) {
    let crate::tree::NodeKind::Runtime(runtime) = tree.kind(id) else {
        return;
    };
    let text = runtime.resolve(page_number, total_pages);
    log::debug!("resolved {} to {:?}", tree.label(id), text);
    tree.node_mut(id).resolved_text = Some(text);

    TextFlow::new(metrics).rewrap_fixed(tree, id);

    let style = TextStyle::of(tree, id);
    for part in &mut tree.node_mut(id).line_parts {
        let task = part.render_task(&style);
        part.tasks_mut().replace(vec![task]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholders() {
        let text = RuntimeText::Template("Page {n} of {total}".to_string());
        assert_eq!(text.resolve(2, 7), "Page 2 of 7");
        assert_eq!(text.filler("999"), "Page 999 of 999");
    }

    #[test]
    fn number_kinds() {
        assert_eq!(RuntimeText::CurrentPageNumber.resolve(4, 9), "4");
        assert_eq!(RuntimeText::NumberOfPages.resolve(4, 9), "9");
        assert_eq!(RuntimeText::NumberOfPages.filler("00"), "00");
    }

    struct Numbered(Option<usize>);

    impl PageContext for Numbered {
        fn page_number(&self, _page_index: usize) -> Option<usize> {
            self.0
        }

        fn total_pages(&self) -> usize {
            12
        }
    }

    fn formatted_counter() -> (NodeTree, NodeId, NodeId) {
        use crate::format::test_support::with_env;
        use crate::format::FormatterChain;
        use crate::model::PageConfig;
        use crate::tree::NodeKind;

        let mut tree = NodeTree::new();
        let page = tree
            .append(tree.root(), NodeKind::Page { config: PageConfig::default() })
            .unwrap();
        let counter = tree
            .append(page, NodeKind::Runtime(RuntimeText::Template("{n}/{total}".into())))
            .unwrap();
        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();
        (tree, page, counter)
    }

    fn queued_texts(tree: &NodeTree, id: NodeId) -> Vec<String> {
        tree.node(id)
            .line_parts()
            .iter()
            .flat_map(|p| p.tasks().iter())
            .filter_map(|t| t.text().map(str::to_string))
            .collect()
    }

    #[test]
    fn resolution_replaces_filler_tasks() {
        let (mut tree, page, counter) = formatted_counter();
        assert_eq!(queued_texts(&tree, counter), vec!["999/999"]);
        let width = tree.geometry(counter).width;

        let metrics = crate::format::test_support::PerChar;
        let skipped = resolve_page(&mut tree, &[page], 0, true, &Numbered(Some(3)), &metrics);
        assert!(skipped.is_empty());
        assert_eq!(queued_texts(&tree, counter), vec!["3/12"]);
        assert_eq!(tree.geometry(counter).width, width);
    }

    #[test]
    fn missing_context_keeps_filler() {
        let (mut tree, page, counter) = formatted_counter();
        let metrics = crate::format::test_support::PerChar;

        let skipped = resolve_page(&mut tree, &[page], 0, true, &Numbered(None), &metrics);
        assert_eq!(skipped.len(), 1);
        assert!(matches!(skipped[0], QuireError::MissingPageContext { .. }));

        let untracked = resolve_page(&mut tree, &[page], 0, false, &Numbered(Some(1)), &metrics);
        assert_eq!(untracked.len(), 1);
        assert_eq!(queued_texts(&tree, counter), vec!["999/999"]);
    }
}
