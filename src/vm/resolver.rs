//! 选中项定位：把逻辑节点映射为界面容器，沿途展开并实现虚拟化条目

use crate::model::arena::{NodeId, TreeArena, TreeError};
use crate::vm::host::{ItemsHost, SelectionTransition};

/// 从顶层到 `node` 的索引路径
///
/// 沿父节点向上，记录每一层在父节点子列表中的位置，最后定位根在 `roots` 中的位置。
/// 任一层找不到（树已脱离或被外部修改）时返回空路径。
pub fn node_path(arena: &TreeArena, roots: &[NodeId], node: NodeId) -> Vec<usize> {
    if !arena.contains(node) {
        return Vec::new();
    }
    let mut path = Vec::new();
    let mut now = node;
    while let Some(parent) = arena.parent(now) {
        let Some(index) = arena.children(parent).iter().position(|c| *c == now) else {
            tracing::debug!("节点 {} 不在父节点 {} 的子列表中", now, parent);
            return Vec::new();
        };
        path.push(index);
        now = parent;
    }
    let Some(start) = roots.iter().position(|r| *r == now) else {
        tracing::debug!("根节点 {} 不在当前数据源中", now);
        return Vec::new();
    };
    path.push(start);
    path.reverse();
    path
}

/// 在显示的投影树中查找代理 `target` 的节点（深度优先，首个命中即返回）
///
/// 文件夹搜索的结果直接引用真实子节点，因此节点本身等于 `target` 也算命中。
/// 路径在遍历时一并记录，不依赖父节点引用。
pub fn locate_in_projection(arena: &TreeArena, roots: &[NodeId], target: NodeId) -> Option<(NodeId, Vec<usize>)> {
    let mut stack: Vec<(NodeId, Vec<usize>)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(i, r)| (*r, vec![i]))
        .collect();
    while let Some((id, path)) = stack.pop() {
        if !arena.contains(id) {
            continue;
        }
        if id == target || arena.mirror(id) == Some(target) {
            return Some((id, path));
        }
        for (i, child) in arena.children(id).iter().enumerate().rev() {
            let mut child_path = path.clone();
            child_path.push(i);
            stack.push((*child, child_path));
        }
    }
    None
}

fn is_target(arena: &TreeArena, data: NodeId, target: NodeId) -> bool {
    data == target || arena.mirror(data) == Some(target)
}

/// 沿路径逐层下钻，返回 `target` 对应的容器
///
/// 每一层：必要时展开容器、应用模板（找不到展示区时再做一次布局）、实现路径上的子条目。
/// 下层失败时把刚展开的子容器重新折叠。
pub fn resolve_container<H: ItemsHost>(
    host: &mut H,
    arena: &mut TreeArena,
    container: H::Container,
    target: NodeId,
    path: &[usize],
    pointer: usize,
) -> Result<Option<H::Container>, TreeError> {
    if !arena.contains(target) {
        return Err(TreeError::InvalidArgument(format!("目标节点不存在: {}", target)));
    }
    if let Some(data) = host.data_context(container) {
        if !arena.contains(data) {
            return Err(TreeError::InvalidArgument(format!("容器绑定的节点不存在: {}", data)));
        }
        if is_target(arena, data, target) {
            return Ok(Some(container));
        }
    }

    if host.is_item(container) && !host.is_expanded(arena, container) {
        host.set_expanded(arena, container, true)?;
    }

    host.apply_template(container);
    if !host.has_items_presenter(container) {
        host.update_layout(container);
        if !host.has_items_presenter(container) {
            return Ok(None);
        }
    }

    let Some(&index) = path.get(pointer) else {
        return Ok(None);
    };
    if index >= host.items_count(arena, container) {
        return Ok(None);
    }

    host.realize_index(arena, container, index);
    let Some(sub) = host.container_from_index(arena, container, index) else {
        return Ok(None);
    };

    if let Some(found) = resolve_container(host, arena, sub, target, path, pointer + 1)? {
        return Ok(Some(found));
    }
    host.set_expanded(arena, sub, false)?;
    Ok(None)
}

/// 让界面选中 `target`
///
/// 宿主当前选中值（投影节点解包后）已是 `target` 时什么都不做。
/// `filtering` 为真时在投影树中定位，否则按父节点链计算路径。
/// 定位失败静默放弃，返回 `Ok(None)`。
pub fn load_selected_item<H: ItemsHost>(
    host: &mut H,
    arena: &mut TreeArena,
    target: Option<NodeId>,
    filtering: bool,
) -> Result<Option<SelectionTransition>, TreeError> {
    let Some(target) = target else {
        return Ok(None);
    };
    let current = host.selected_value().map(|v| arena.resolve(v));
    if current == Some(target) {
        return Ok(None);
    }

    let roots = host.items_source().to_vec();
    let path = if filtering {
        locate_in_projection(arena, &roots, target)
            .map(|(_, path)| path)
            .unwrap_or_default()
    } else {
        node_path(arena, &roots, target)
    };
    if path.is_empty() {
        tracing::debug!("选中项 {} 不在当前显示的树中，跳过定位", target);
        return Ok(None);
    }

    let root = host.root_container();
    match resolve_container(host, arena, root, target, &path, 0)? {
        Some(container) => Ok(host.select(arena, container)),
        None => {
            tracing::debug!("选中项 {} 的容器未能实现，路径: {:?}", target, path);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::check_state::CheckState;
    use crate::model::search::{search, SearchMode};
    use crate::vm::host::VirtualizedItems;

    /// r0
    /// r1
    /// ├── x
    /// └── y
    ///     ├── y0
    ///     └── y1
    ///         ├── z0
    ///         ├── z1
    ///         └── target
    fn sample() -> (TreeArena, Vec<NodeId>, NodeId) {
        let mut arena = TreeArena::new();
        let r0 = arena.add_node("r0", CheckState::Unchecked);
        let r1 = arena.add_node("r1", CheckState::Unchecked);
        arena.add_child(r1, "x", CheckState::Unchecked).unwrap();
        let y = arena.add_child(r1, "y", CheckState::Unchecked).unwrap();
        arena.add_child(y, "y0", CheckState::Unchecked).unwrap();
        let y1 = arena.add_child(y, "y1", CheckState::Unchecked).unwrap();
        arena.add_child(y1, "z0", CheckState::Unchecked).unwrap();
        arena.add_child(y1, "z1", CheckState::Unchecked).unwrap();
        let target = arena.add_child(y1, "target", CheckState::Unchecked).unwrap();
        (arena, vec![r0, r1], target)
    }

    #[test]
    fn test_node_path_three_levels_deep() {
        let (arena, roots, target) = sample();
        assert_eq!(node_path(&arena, &roots, target), vec![1, 1, 1, 2]);
        assert_eq!(node_path(&arena, &roots, roots[0]), vec![0]);
    }

    #[test]
    fn test_node_path_detached() {
        let (mut arena, roots, target) = sample();
        // 根不在数据源中
        assert!(node_path(&arena, &roots[..1], target).is_empty());

        // 父节点的子列表里已没有该节点
        let y1 = arena.parent(target).unwrap();
        let remaining = arena.children(y1)[..2].to_vec();
        arena.set_children(y1, remaining).unwrap();
        assert!(node_path(&arena, &roots, target).is_empty());
    }

    #[test]
    fn test_load_selected_item_expands_and_selects() {
        let (mut arena, roots, target) = sample();
        let mut host = VirtualizedItems::new();
        host.set_items_source(roots.clone());

        let transition = load_selected_item(&mut host, &mut arena, Some(target), false)
            .unwrap()
            .unwrap();
        assert_eq!(transition.new, Some(target));
        assert_eq!(host.selected_value(), Some(target));
        assert_eq!(host.realizations(), 4);

        // 沿途的祖先被展开
        let y1 = arena.parent(target).unwrap();
        assert!(arena.is_expanded(y1));
        assert!(arena.is_expanded(roots[1]));
        assert!(!arena.is_expanded(target), "命中的容器本身不展开");
    }

    #[test]
    fn test_second_call_is_noop() {
        let (mut arena, roots, target) = sample();
        let mut host = VirtualizedItems::new();
        host.set_items_source(roots);

        load_selected_item(&mut host, &mut arena, Some(target), false).unwrap();
        let realized = host.realizations();
        let layouts = host.layout_passes();

        let again = load_selected_item(&mut host, &mut arena, Some(target), false).unwrap();
        assert_eq!(again, None);
        assert_eq!(host.realizations(), realized, "重复定位不应实现任何容器");
        assert_eq!(host.layout_passes(), layouts);
    }

    #[test]
    fn test_out_of_range_path_collapses_back() {
        let (mut arena, roots, target) = sample();
        let mut host = VirtualizedItems::new();
        host.set_items_source(roots.clone());

        let tree = host.root_container();
        let found = resolve_container(&mut host, &mut arena, tree, target, &[1, 7], 0).unwrap();
        assert_eq!(found, None);
        assert!(!arena.is_expanded(roots[1]), "失败后应折叠回去");
    }

    #[test]
    fn test_missing_target_is_invalid_argument() {
        let (mut arena, roots, target) = sample();
        let mut host = VirtualizedItems::new();
        host.set_items_source(roots);
        arena.remove(target);

        let tree = host.root_container();
        let err = resolve_container(&mut host, &mut arena, tree, target, &[0], 0).unwrap_err();
        assert!(matches!(err, TreeError::InvalidArgument(_)));
    }

    #[test]
    fn test_locate_in_node_search_projection() {
        let (mut arena, roots, target) = sample();
        let projection = search(&mut arena, &roots, SearchMode::NodeSearch, "target").unwrap();
        let (found, path) = locate_in_projection(&arena, projection.roots(), target).unwrap();
        assert_eq!(arena.mirror(found), Some(target));
        assert_eq!(path, vec![0]);

        let mut host = VirtualizedItems::new();
        host.set_items_source(projection.roots().to_vec());
        let transition = load_selected_item(&mut host, &mut arena, Some(target), true)
            .unwrap()
            .unwrap();
        assert_eq!(transition.new, Some(found));
    }

    #[test]
    fn test_locate_inside_folder_result() {
        let (mut arena, roots, target) = sample();
        let projection = search(&mut arena, &roots, SearchMode::FolderSearch, "y1").unwrap();
        let (found, path) = locate_in_projection(&arena, projection.roots(), target).unwrap();
        // 文件夹结果共享真实子节点
        assert_eq!(found, target);
        assert_eq!(path, vec![0, 2]);

        let mut host = VirtualizedItems::new();
        host.set_items_source(projection.roots().to_vec());
        let transition = load_selected_item(&mut host, &mut arena, Some(target), true).unwrap();
        assert!(transition.is_some());
        assert_eq!(host.selected_value(), Some(target));
    }
}
