//! 搜索过滤：按三种模式从真实树生成投影树
//!
//! - 节点搜索：每个节点单独看待，只保留匹配节点，匹配节点挂到最近的匹配祖先下
//! - 文件夹搜索：匹配节点连同整棵子树作为一个结果，不再向下搜索
//! - 叶子节点搜索：复制整棵树后自底向上剪枝，只保留匹配叶子及其祖先链

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::model::arena::{NodeId, TreeArena, TreeError, TreeNode};
use crate::model::check_state::aggregate;
use crate::model::projection::Projection;
use crate::model::traverse::postorder;

/// 搜索模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// 节点搜索：将树的所有节点当作单一节点看待，仅搜索出符合条件的节点
    #[default]
    NodeSearch,
    /// 文件夹搜索：匹配的节点是文件夹时展示其下所有节点
    FolderSearch,
    /// 叶子节点搜索：仅搜索叶子节点，匹配的节点展示其父节点直到根节点
    LeafNodeSearch,
}

/// 按标题做区分大小写的子串匹配
pub fn search(
    arena: &mut TreeArena,
    roots: &[NodeId],
    mode: SearchMode,
    text: &str,
) -> Result<Projection, TreeError> {
    let start = Instant::now();
    let projection = search_with(arena, roots, mode, |node: &TreeNode| node.title().contains(text))?;
    tracing::info!(
        "搜索过滤 {:?}: \"{}\"，结果根节点 {} 个，投影节点 {} 个，耗时: {}ms",
        mode,
        text,
        projection.roots().len(),
        projection.derived().len(),
        start.elapsed().as_millis()
    );
    Ok(projection)
}

/// 使用任意谓词生成投影树
pub fn search_with<P>(
    arena: &mut TreeArena,
    roots: &[NodeId],
    mode: SearchMode,
    predicate: P,
) -> Result<Projection, TreeError>
where
    P: Fn(&TreeNode) -> bool,
{
    let mut projection = Projection::new();
    let result = match mode {
        SearchMode::NodeSearch => node_search(arena, &mut projection, roots, &predicate),
        SearchMode::FolderSearch => folder_search(arena, &mut projection, roots, &predicate),
        SearchMode::LeafNodeSearch => leaf_node_search(arena, &mut projection, roots, &predicate),
    };
    match result {
        Ok(found) => {
            projection.set_roots(found);
            Ok(projection)
        }
        Err(e) => {
            // 中途失败时不留下半成品投影
            projection.release(arena);
            Err(e)
        }
    }
}

fn matches<P>(arena: &TreeArena, id: NodeId, predicate: &P) -> bool
where
    P: Fn(&TreeNode) -> bool,
{
    arena.get(id).is_some_and(predicate)
}

fn node_search<P>(
    arena: &mut TreeArena,
    projection: &mut Projection,
    roots: &[NodeId],
    predicate: &P,
) -> Result<Vec<NodeId>, TreeError>
where
    P: Fn(&TreeNode) -> bool,
{
    let mut result = Vec::new();
    for &item in roots {
        let root = projection.derive_shallow(arena, item)?;
        let root_matches = matches(arena, item, predicate);
        let candidates = arena.children(item).to_vec();
        collect_node_matches(arena, projection, root, root_matches, &candidates, predicate)?;

        if root_matches {
            result.push(root);
        } else {
            // 根节点不匹配：其收集到的匹配节点各自成为顶层结果
            let promoted = arena.children(root).to_vec();
            projection.discard(arena, root);
            result.extend(promoted);
        }
    }
    Ok(result)
}

/// 把 `candidates` 中的匹配节点挂到 `target` 下；不匹配节点的子节点提升到同一层继续匹配
///
/// `link_parent` 为 false 表示 `target` 是不匹配的根，此时匹配节点不设置父节点引用。
fn collect_node_matches<P>(
    arena: &mut TreeArena,
    projection: &mut Projection,
    target: NodeId,
    link_parent: bool,
    candidates: &[NodeId],
    predicate: &P,
) -> Result<(), TreeError>
where
    P: Fn(&TreeNode) -> bool,
{
    for &node in candidates {
        let children = arena.children(node).to_vec();
        if matches(arena, node, predicate) {
            let copy = projection.derive_shallow(arena, node)?;
            if link_parent {
                arena.append_child(target, copy)?;
            } else {
                arena.push_child(target, copy)?;
            }
            collect_node_matches(arena, projection, copy, true, &children, predicate)?;
        } else {
            collect_node_matches(arena, projection, target, link_parent, &children, predicate)?;
        }
    }
    Ok(())
}

fn folder_search<P>(
    arena: &mut TreeArena,
    projection: &mut Projection,
    nodes: &[NodeId],
    predicate: &P,
) -> Result<Vec<NodeId>, TreeError>
where
    P: Fn(&TreeNode) -> bool,
{
    let mut result = Vec::new();
    for &node in nodes {
        if matches(arena, node, predicate) {
            result.push(projection.derive_full(arena, node)?);
        } else {
            let children = arena.children(node).to_vec();
            result.extend(folder_search(arena, projection, &children, predicate)?);
        }
    }
    Ok(result)
}

fn leaf_node_search<P>(
    arena: &mut TreeArena,
    projection: &mut Projection,
    roots: &[NodeId],
    predicate: &P,
) -> Result<Vec<NodeId>, TreeError>
where
    P: Fn(&TreeNode) -> bool,
{
    let mut result = Vec::new();
    for &item in roots {
        let root = projection.derive_subtree(arena, item)?;
        if prune_leaves(arena, projection, root, predicate)? {
            result.push(root);
        } else {
            projection.discard(arena, root);
        }
    }
    Ok(result)
}

/// 自底向上剪枝，返回该节点是否保留
fn prune_leaves<P>(
    arena: &mut TreeArena,
    projection: &mut Projection,
    node: NodeId,
    predicate: &P,
) -> Result<bool, TreeError>
where
    P: Fn(&TreeNode) -> bool,
{
    let children = arena.children(node).to_vec();
    if children.is_empty() {
        return Ok(matches(arena, node, predicate));
    }

    let mut kept = Vec::with_capacity(children.len());
    for child in children {
        if prune_leaves(arena, projection, child, predicate)? {
            kept.push(child);
        } else {
            // 被剪掉的内部节点此时已没有子节点
            projection.discard(arena, child);
        }
    }
    let survives = !kept.is_empty();
    arena.set_children(node, kept)?;
    Ok(survives)
}

/// 按子节点重新归约所有内部节点的三态（后序，作用于真实树）
pub fn normalize_check_states(arena: &mut TreeArena, roots: &[NodeId]) -> Result<(), TreeError> {
    normalize_check_states_except(arena, roots, &HashSet::new())
}

/// 同 [`normalize_check_states`]，但 `pinned` 中的节点保留当前状态
///
/// 其祖先仍按子节点（含 `pinned` 节点的当前状态）重新归约。
pub fn normalize_check_states_except(
    arena: &mut TreeArena,
    roots: &[NodeId],
    pinned: &HashSet<NodeId>,
) -> Result<(), TreeError> {
    for &root in roots {
        for id in postorder(arena, root) {
            if pinned.contains(&id) {
                continue;
            }
            let state = aggregate(
                arena
                    .children(id)
                    .iter()
                    .filter_map(|child| arena.check_state(*child)),
            );
            if let Some(state) = state {
                arena.set_checked(id, state)?;
            }
        }
    }
    Ok(())
}
