//! # Layout Engine
//!
//! Drives a document build through its two stages:
//!
//! 1. [`LayoutEngine::layout`] runs the formatter chain over the whole tree,
//!    re-runs it over any subtree that became dirty, and cuts the page
//!    templates into physical pages. Runtime nodes still hold filler text.
//! 2. [`LayoutResult::resolve`] asks a [`PageContext`] for the final page
//!    numbers, rewrites only the runtime nodes, and collects every queued
//!    drawing task into a [`FinalDrawProgram`].
//!
//! No drawing task leaves the tree before the second stage, so placeholder
//! tasks can still be replaced.

pub mod page_break;

use std::collections::BTreeSet;

pub use page_break::{decide_break, BreakDecision, Pagination, PhysicalPage};

use crate::draw::{DrawingTask, FinalDrawProgram, PageProgram};
use crate::error::Result;
use crate::font::FontMetrics;
use crate::format::{FormatEnv, Formatter, FormatterChain};
use crate::model::PageConfig;
use crate::runtime::{self, PageContext};
use crate::tree::{NodeId, NodeTree};

/// Upper bound on dirty re-format rounds per build.
const MAX_REFORMAT_ROUNDS: usize = 8;

pub struct LayoutEngine {
    chain: FormatterChain,
    default_page: PageConfig,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self {
            chain: FormatterChain::standard(),
            default_page: PageConfig::default(),
        }
    }

    /// Page configuration for content placed directly under the root.
    pub fn with_default_page(mut self, config: PageConfig) -> Self {
        self.default_page = config;
        self
    }

    /// Append a custom formatter after the built-in ones.
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.chain.push(formatter);
        self
    }

    pub fn chain(&self) -> &FormatterChain {
        &self.chain
    }

    /// Format the tree. The first call formats everything; later calls
    /// only revisit dirty subtrees.
    pub fn format(&self, tree: &mut NodeTree, env: &FormatEnv<'_>) -> Result<()> {
        let root = tree.root();
        if tree.node(root).is_formatted() {
            self.reformat_dirty(tree, env)?;
            return Ok(());
        }
        let wrapped = tree.wrap_loose_children(&self.default_page);
        if wrapped > 0 {
            log::debug!("wrapped loose content into {} default pages", wrapped);
        }
        self.chain.run(tree, root, env)?;
        self.reformat_dirty(tree, env)?;
        Ok(())
    }

    /// Re-run the chain over every page holding a dirty node. Returns the
    /// number of subtrees re-formatted.
    pub fn reformat_dirty(&self, tree: &mut NodeTree, env: &FormatEnv<'_>) -> Result<usize> {
        let root = tree.root();
        let mut total = 0;
        for round in 0.. {
            let scopes: BTreeSet<NodeId> = tree
                .descendants(root)
                .into_iter()
                .filter(|&n| tree.node(n).is_dirty())
                .map(|n| tree.page_of(n).unwrap_or(root))
                .collect();
            if scopes.is_empty() {
                break;
            }
            if round == MAX_REFORMAT_ROUNDS {
                log::warn!(
                    "{} subtrees still dirty after {} re-format rounds, giving up",
                    scopes.len(),
                    round
                );
                break;
            }
            let scopes: Vec<NodeId> = if scopes.contains(&root) {
                vec![root]
            } else {
                scopes.into_iter().collect()
            };
            for scope in scopes {
                log::debug!("re-formatting {}", tree.label(scope));
                for n in tree.descendants(scope) {
                    tree.node_mut(n).reset_layout();
                }
                self.chain.run(tree, scope, env)?;
                total += 1;
            }
        }
        Ok(total)
    }

    /// Format and paginate a tree.
    pub fn layout(&self, mut tree: NodeTree, env: &FormatEnv<'_>) -> Result<LayoutResult> {
        self.format(&mut tree, env)?;
        let pagination = Pagination::paginate(&mut tree);
        Ok(LayoutResult { tree, pagination })
    }
}

/// A formatted, paginated tree whose runtime nodes are not resolved yet.
#[derive(Debug)]
pub struct LayoutResult {
    tree: NodeTree,
    pagination: Pagination,
}

impl LayoutResult {
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn into_tree(self) -> NodeTree {
        self.tree
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn page_count(&self) -> usize {
        self.pagination.len()
    }

    /// Resolve runtime nodes with the layout's own page numbering.
    pub fn resolve_paginated(self, metrics: &dyn FontMetrics) -> Result<FinalDrawProgram> {
        let context = self.pagination.clone();
        self.resolve(&context, metrics)
    }

    /// Resolve runtime nodes against `context` and collect the final draw
    /// program.
    ///
    /// A runtime node on a page the context cannot number keeps its filler
    /// text; this is logged and does not stop the other nodes.
    pub fn resolve(
        mut self,
        context: &dyn PageContext,
        metrics: &dyn FontMetrics,
    ) -> Result<FinalDrawProgram> {
        let skipped = self.resolve_runtime(context, metrics);
        if skipped > 0 {
            log::info!("{} runtime nodes kept their filler text", skipped);
        }
        Ok(self.into_program(context))
    }

    fn resolve_runtime(&mut self, context: &dyn PageContext, metrics: &dyn FontMetrics) -> usize {
        let mut skipped = 0;
        for (index, page) in self.pagination.pages().iter().enumerate() {
            let roots: Vec<NodeId> = page.fixed.iter().chain(&page.body).copied().collect();
            let tracked = self.tree.is_runtime_page(page.template);
            skipped +=
                runtime::resolve_page(&mut self.tree, &roots, index, tracked, context, metrics).len();
        }
        skipped
    }

    fn into_program(mut self, context: &dyn PageContext) -> FinalDrawProgram {
        let mut pages = Vec::with_capacity(self.pagination.len());
        for (index, page) in self.pagination.pages().iter().enumerate() {
            let mut tasks: Vec<DrawingTask> =
                self.tree.node(page.template).tasks().iter().cloned().collect();
            for &fixed in &page.fixed {
                tasks.extend(self.tree.collect_tasks(fixed));
            }
            for &body in &page.body {
                for mut task in self.tree.collect_tasks(body) {
                    task.translate(0.0, page.offset_y);
                    tasks.push(task);
                }
            }
            pages.push(PageProgram {
                number: context.page_number(index).unwrap_or(page.number),
                width: page.width,
                height: page.height,
                tasks,
            });
        }
        FinalDrawProgram { pages }
    }
}
