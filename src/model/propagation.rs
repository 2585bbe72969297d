//! 复选框联动：向下同步子孙节点，向上重算祖先三态，并收集对外可见的选中集合

use std::collections::HashSet;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::model::arena::{NodeId, TreeArena, TreeError};
use crate::model::check_state::{aggregate, CheckState};
use crate::model::search::normalize_check_states_except;
use crate::model::traverse::{preorder, preorder_forest};

/// 多选（勾选）集合的汇总方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleSelectionMode {
    /// 只收集完全勾选的节点
    #[default]
    AllSelection,
    /// 收集勾选和部分勾选的节点
    HasSelection,
}

impl MultipleSelectionMode {
    pub fn accepts(self, state: CheckState) -> bool {
        match self {
            MultipleSelectionMode::AllSelection => state == CheckState::Checked,
            MultipleSelectionMode::HasSelection => state != CheckState::Unchecked,
        }
    }
}

/// 一次勾选联动的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// 被写入新状态的节点数（含自身）
    pub descendants: usize,
    /// 状态发生变化的祖先，自下而上
    pub updated_ancestors: Vec<NodeId>,
}

/// 勾选/取消勾选 `node`
///
/// 新状态无条件写入自身和全部子孙；随后自父节点向上逐级重算，
/// 遇到重算结果与当前状态相同的祖先即停止。
pub fn propagate_check(arena: &mut TreeArena, node: NodeId, checked: bool) -> Result<ToggleOutcome, TreeError> {
    if !arena.contains(node) {
        return Err(TreeError::NodeNotFound(node));
    }
    let state = CheckState::from_bool(checked);

    let subtree: Vec<NodeId> = preorder(arena, node).collect();
    for id in &subtree {
        arena.set_checked(*id, state)?;
    }

    let mut outcome = ToggleOutcome {
        descendants: subtree.len(),
        updated_ancestors: Vec::new(),
    };

    let mut current = arena.parent(node);
    while let Some(ancestor) = current {
        let recomputed = aggregate(
            arena
                .children(ancestor)
                .iter()
                .filter_map(|child| arena.check_state(*child)),
        );
        let Some(recomputed) = recomputed else {
            break;
        };
        if arena.check_state(ancestor) == Some(recomputed) {
            tracing::debug!("祖先 {} 状态未变化({:?})，停止向上联动", ancestor, recomputed);
            break;
        }
        arena.set_checked(ancestor, recomputed)?;
        outcome.updated_ancestors.push(ancestor);
        current = arena.parent(ancestor);
    }

    Ok(outcome)
}

/// 在显示的投影树上勾选/取消勾选 `node`
///
/// 联动只沿投影树进行：向下只覆盖显示出来的子孙，向上只走投影中的父节点，
/// 每次写入经镜像落到真实节点。被过滤隐藏的真实节点不会被改写。
/// 随后按子节点重新归约 `real_roots` 下其余内部节点，联动写入过的真实节点保留写入值。
pub fn propagate_projected_check(
    arena: &mut TreeArena,
    real_roots: &[NodeId],
    node: NodeId,
    checked: bool,
) -> Result<ToggleOutcome, TreeError> {
    let outcome = propagate_check(arena, node, checked)?;

    let view: &TreeArena = arena;
    let mut pinned: HashSet<NodeId> = preorder(view, node).map(|id| view.resolve(id)).collect();
    pinned.extend(outcome.updated_ancestors.iter().map(|id| view.resolve(*id)));
    normalize_check_states_except(arena, real_roots, &pinned)?;
    Ok(outcome)
}

/// 按汇总方式收集 `roots` 下所有被选中的节点（先序）
///
/// `translate` 为真时投影节点替换为其镜像；缺少镜像的投影节点属于调用方违约。
pub fn collect_selected(
    arena: &TreeArena,
    roots: &[NodeId],
    mode: MultipleSelectionMode,
    translate: bool,
) -> Result<IndexSet<NodeId>, TreeError> {
    let mut selected = IndexSet::new();
    for id in preorder_forest(arena, roots) {
        let Some(state) = arena.check_state(id) else {
            continue;
        };
        if !mode.accepts(state) {
            continue;
        }
        let id = if translate && arena.is_derived(id) {
            match arena.mirror(id) {
                Some(mirror) => mirror,
                None => {
                    tracing::error!("投影节点 {} 没有镜像节点，无法转换为选中项", id);
                    debug_assert!(false, "投影节点 {} 没有镜像节点", id);
                    return Err(TreeError::MissingMirror(id));
                }
            }
        } else {
            id
        };
        selected.insert(id);
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::arena::{NodeOrigin, TreeNode};
    use crate::model::projection::Projection;
    use crate::model::search::{search, SearchMode};

    #[test]
    fn test_toggle_pushes_down_and_recomputes_parent() {
        let mut arena = TreeArena::new();
        let root = arena.add_node("root", CheckState::Unchecked);
        let node = arena.add_child(root, "node", CheckState::Mixed).unwrap();
        let a = arena.add_child(node, "A", CheckState::Unchecked).unwrap();
        let b = arena.add_child(node, "B", CheckState::Checked).unwrap();
        let sibling = arena.add_child(root, "sibling", CheckState::Unchecked).unwrap();

        let outcome = propagate_check(&mut arena, node, true).unwrap();

        assert_eq!(arena.check_state(a), Some(CheckState::Checked));
        assert_eq!(arena.check_state(b), Some(CheckState::Checked));
        assert_eq!(arena.check_state(node), Some(CheckState::Checked));
        assert_eq!(arena.check_state(sibling), Some(CheckState::Unchecked));
        assert_eq!(arena.check_state(root), Some(CheckState::Mixed));
        assert_eq!(outcome.descendants, 3);
        assert_eq!(outcome.updated_ancestors, vec![root]);
    }

    #[test]
    fn test_upward_walk_stops_at_unchanged_ancestor() {
        // top(Mixed) ── mid(Mixed) ── { leaf1(Unchecked), leaf2(Checked) }
        //           └── other(Unchecked)
        let mut arena = TreeArena::new();
        let top = arena.add_node("top", CheckState::Mixed);
        let mid = arena.add_child(top, "mid", CheckState::Mixed).unwrap();
        let leaf1 = arena.add_child(mid, "leaf1", CheckState::Unchecked).unwrap();
        arena.add_child(mid, "leaf2", CheckState::Checked).unwrap();
        arena.add_child(top, "other", CheckState::Unchecked).unwrap();

        let outcome = propagate_check(&mut arena, leaf1, true).unwrap();

        // mid 变为 Checked；top 重算仍为 Mixed，在此停止
        assert_eq!(arena.check_state(mid), Some(CheckState::Checked));
        assert_eq!(arena.check_state(top), Some(CheckState::Mixed));
        assert_eq!(outcome.updated_ancestors, vec![mid]);
    }

    #[test]
    fn test_uncheck_never_leaves_mixed_descendants() {
        let mut arena = TreeArena::new();
        let root = arena.add_node("root", CheckState::Mixed);
        let a = arena.add_child(root, "A", CheckState::Mixed).unwrap();
        let a1 = arena.add_child(a, "A1", CheckState::Checked).unwrap();

        propagate_check(&mut arena, root, false).unwrap();
        for id in [root, a, a1] {
            assert_eq!(arena.check_state(id), Some(CheckState::Unchecked));
        }
    }

    #[test]
    fn test_projected_toggle_skips_pruned_siblings() {
        // root ── { apple, date }，叶子搜索只保留 apple
        let mut arena = TreeArena::new();
        let root = arena.add_node("root", CheckState::Unchecked);
        let apple = arena.add_child(root, "apple", CheckState::Unchecked).unwrap();
        let date = arena.add_child(root, "date", CheckState::Unchecked).unwrap();

        let projection = search(&mut arena, &[root], SearchMode::LeafNodeSearch, "apple").unwrap();
        let shown = projection.roots()[0];
        assert_eq!(arena.children(shown).len(), 1);

        let outcome = propagate_projected_check(&mut arena, &[root], shown, true).unwrap();
        assert_eq!(outcome.descendants, 2);
        assert_eq!(arena.check_state(apple), Some(CheckState::Checked));
        assert_eq!(arena.check_state(date), Some(CheckState::Unchecked));
        // 被点击的节点保留写入值
        assert_eq!(arena.check_state(root), Some(CheckState::Checked));
    }

    #[test]
    fn test_projected_toggle_on_promoted_node() {
        // root ── { apple ── { core }, date }，节点搜索下 apple 成为无父节点的顶层结果
        let mut arena = TreeArena::new();
        let root = arena.add_node("root", CheckState::Unchecked);
        let apple = arena.add_child(root, "apple", CheckState::Unchecked).unwrap();
        let core = arena.add_child(apple, "core", CheckState::Unchecked).unwrap();
        let date = arena.add_child(root, "date", CheckState::Unchecked).unwrap();

        let projection = search(&mut arena, &[root], SearchMode::NodeSearch, "apple").unwrap();
        let shown = projection.roots()[0];
        assert_eq!(arena.parent(shown), None);
        assert!(arena.children(shown).is_empty());

        let outcome = propagate_projected_check(&mut arena, &[root], shown, true).unwrap();
        assert!(outcome.updated_ancestors.is_empty());
        assert_eq!(arena.check_state(apple), Some(CheckState::Checked));
        assert_eq!(arena.check_state(core), Some(CheckState::Unchecked), "隐藏的子节点不受影响");
        assert_eq!(arena.check_state(date), Some(CheckState::Unchecked));
        // 投影中没有链接的真实祖先按子节点重新归约
        assert_eq!(arena.check_state(root), Some(CheckState::Mixed));
    }

    #[test]
    fn test_collect_selected_policies() {
        let mut arena = TreeArena::new();
        let root = arena.add_node("root", CheckState::Checked);
        let a = arena.add_child(root, "A", CheckState::Checked).unwrap();
        let b = arena.add_child(root, "B", CheckState::Checked).unwrap();

        let all = collect_selected(&arena, &[root], MultipleSelectionMode::AllSelection, false).unwrap();
        assert_eq!(all.iter().copied().collect::<Vec<_>>(), vec![root, a, b]);

        propagate_check(&mut arena, b, false).unwrap();
        assert_eq!(arena.check_state(root), Some(CheckState::Mixed));

        let all = collect_selected(&arena, &[root], MultipleSelectionMode::AllSelection, false).unwrap();
        assert_eq!(all.iter().copied().collect::<Vec<_>>(), vec![a]);
        let has = collect_selected(&arena, &[root], MultipleSelectionMode::HasSelection, false).unwrap();
        assert_eq!(has.iter().copied().collect::<Vec<_>>(), vec![root, a]);
    }

    #[test]
    fn test_collect_translates_projection_nodes() {
        let mut arena = TreeArena::new();
        let root = arena.add_node("root", CheckState::Checked);
        let a = arena.add_child(root, "A", CheckState::Checked).unwrap();

        let mut projection = Projection::new();
        let copy = projection.derive_subtree(&mut arena, root).unwrap();

        let selected = collect_selected(&arena, &[copy], MultipleSelectionMode::AllSelection, true).unwrap();
        assert_eq!(selected.iter().copied().collect::<Vec<_>>(), vec![root, a]);

        let raw = collect_selected(&arena, &[copy], MultipleSelectionMode::AllSelection, false).unwrap();
        assert!(raw.iter().all(|id| arena.is_derived(*id)));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_unmirrored_projection_is_an_error() {
        let mut arena = TreeArena::new();
        let mut orphan = TreeNode::new("orphan").with_checked(CheckState::Checked);
        orphan.origin = NodeOrigin::Derived { mirror: None };
        let orphan = arena.insert(orphan);

        let err = collect_selected(&arena, &[orphan], MultipleSelectionMode::AllSelection, true).unwrap_err();
        assert!(matches!(err, TreeError::MissingMirror(id) if id == orphan));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "没有镜像节点")]
    fn test_unmirrored_projection_asserts_in_debug() {
        let mut arena = TreeArena::new();
        let mut orphan = TreeNode::new("orphan").with_checked(CheckState::Checked);
        orphan.origin = NodeOrigin::Derived { mirror: None };
        let orphan = arena.insert(orphan);

        let _ = collect_selected(&arena, &[orphan], MultipleSelectionMode::AllSelection, true);
    }

    #[test]
    fn test_missing_node() {
        let mut arena = TreeArena::new();
        let a = arena.add_node("A", CheckState::Unchecked);
        arena.remove(a);
        assert!(matches!(propagate_check(&mut arena, a, true), Err(TreeError::NodeNotFound(_))));
    }
}
