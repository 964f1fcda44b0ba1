use crate::error::{QuireError, Result};
use crate::list::EnumerationStrategy;
use crate::style::ListPosition;
use crate::tree::{Attribute, NodeId, NodeKind, NodeTree};

use super::{FormatEnv, Formatter};

/// Resolves a list's enumeration strategy and, for inside markers, reserves
/// room for the widest marker on every item.
///
/// The reserve is recorded as each direct child's list indent, which the
/// tree adds on top of the child's own left margin. Setting it again on a
/// later pass replaces the old value, so re-formatting never stacks it.
pub struct ListFormatter;

impl Formatter for ListFormatter {
    fn name(&self) -> &'static str {
        "list"
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, env: &FormatEnv<'_>) -> Result<()> {
        if tree.kind(id) != &NodeKind::List {
            return Ok(());
        }
        let style = tree.attribute(id, Attribute::ListType).as_text().to_string();
        let mut enumeration =
            env.strategies
                .create(&style)
                .ok_or_else(|| QuireError::UnresolvedStrategy {
                    node: tree.label(id),
                    style: style.clone(),
                })?;

        let children = tree.children(id).to_vec();
        let reserve = match tree.list_position(id) {
            ListPosition::Inside => enumeration.reserved_width(
                env.metrics,
                &tree.font_family(id),
                tree.font_size(id),
                children.len(),
            ),
            ListPosition::Outside => 0.0,
        };
        log::debug!(
            "{}: list style `{}`, {} items, reserve {:.2}",
            tree.label(id),
            style,
            children.len(),
            reserve
        );

        for child in children {
            tree.set_list_indent(child, reserve);
        }

        enumeration.reset();
        tree.node_mut(id).enumeration = Some(enumeration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::with_env;
    use crate::format::FormatterChain;
    use crate::model::PageConfig;

    fn list_with_items(count: usize, position: ListPosition) -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new();
        let page = tree
            .append(tree.root(), NodeKind::Page { config: PageConfig::default() })
            .unwrap();
        let list = tree.append(page, NodeKind::List).unwrap();
        tree.set_attribute(list, Attribute::ListType, "decimal").unwrap();
        tree.set_attribute(list, Attribute::ListPosition, position).unwrap();
        for i in 0..count {
            let item = tree.append(list, NodeKind::Text).unwrap();
            tree.set_attribute(item, Attribute::Text, format!("item {i}")).unwrap();
            tree.set_attribute(item, Attribute::MarginLeft, 3.0).unwrap();
        }
        (tree, list)
    }

    #[test]
    fn inside_list_adds_reserve_to_existing_margin() {
        let (mut tree, list) = list_with_items(12, ListPosition::Inside);
        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        // "12." is three characters at 5pt each.
        for &item in tree.children(list) {
            assert_eq!(tree.margin(item).left, 3.0 + 15.0);
        }
    }

    #[test]
    fn outside_list_leaves_margins_alone() {
        let (mut tree, list) = list_with_items(3, ListPosition::Outside);
        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();
        let item = tree.children(list)[0];
        assert_eq!(tree.margin(item).left, 3.0);
    }

    #[test]
    fn running_twice_does_not_stack_the_reserve() {
        let (mut tree, list) = list_with_items(2, ListPosition::Inside);
        with_env(|env| {
            ListFormatter.format(&mut tree, list, env)?;
            ListFormatter.format(&mut tree, list, env)
        })
        .unwrap();
        let item = tree.children(list)[0];
        assert_eq!(tree.margin(item).left, 3.0 + 10.0);
    }

    #[test]
    fn reserve_is_reported_as_a_margin_change() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let (mut tree, list) = list_with_items(2, ListPosition::Inside);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        tree.subscribe(move |node: NodeId, attr: Attribute, old: Option<&crate::tree::AttributeValue>| {
            sink.borrow_mut().push((node, attr, old.cloned()));
        });

        with_env(|env| {
            ListFormatter.format(&mut tree, list, env)?;
            ListFormatter.format(&mut tree, list, env)
        })
        .unwrap();

        // The second pass reserves the same width and stays silent.
        let items = tree.children(list).to_vec();
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        for (event, &item) in seen.iter().zip(&items) {
            assert_eq!(
                event,
                &(item, Attribute::MarginLeft, Some(crate::tree::AttributeValue::Number(3.0)))
            );
        }
        assert_eq!(tree.list_indent(items[0]), 10.0);
    }

    #[test]
    fn unknown_style_is_fatal() {
        let (mut tree, list) = list_with_items(1, ListPosition::Outside);
        tree.set_attribute(list, Attribute::ListType, "klingon").unwrap();
        let err = with_env(|env| ListFormatter.format(&mut tree, list, env)).unwrap_err();
        assert!(matches!(err, QuireError::UnresolvedStrategy { ref style, .. } if style == "klingon"));
    }
}
