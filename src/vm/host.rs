//! 条目宿主：树控件的界面容器契约，以及一个无界面的虚拟化实现
//!
//! 容器是树本身或某个条目；条目的子容器只有在被"实现"（realize）后才能取到，
//! 折叠时回收已实现的子容器，模拟虚拟化面板的行为。

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::model::arena::{ImageRef, NodeId, TreeArena, TreeError};
use crate::model::check_state::CheckState;

/// 宿主选中项变化（显示树中的节点，可能是投影节点）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTransition {
    pub old: Option<NodeId>,
    pub new: Option<NodeId>,
}

/// 界面容器契约
pub trait ItemsHost {
    type Container: Copy + PartialEq + fmt::Debug;

    /// 顶层容器（树本身）
    fn root_container(&self) -> Self::Container;

    /// 当前显示的顶层节点
    fn items_source(&self) -> &[NodeId];

    /// 更换显示的顶层节点；已实现的容器全部作废
    fn set_items_source(&mut self, roots: Vec<NodeId>);

    /// 容器绑定的节点；树容器没有数据上下文
    fn data_context(&self, container: Self::Container) -> Option<NodeId>;

    /// 是否为条目容器（可展开/折叠/选中）
    fn is_item(&self, container: Self::Container) -> bool;

    fn is_expanded(&self, arena: &TreeArena, container: Self::Container) -> bool;

    fn set_expanded(
        &mut self,
        arena: &mut TreeArena,
        container: Self::Container,
        expanded: bool,
    ) -> Result<(), TreeError>;

    fn apply_template(&mut self, container: Self::Container);

    /// 模板中是否已能找到子条目展示区
    fn has_items_presenter(&self, container: Self::Container) -> bool;

    fn update_layout(&mut self, container: Self::Container);

    fn items_count(&self, arena: &TreeArena, container: Self::Container) -> usize;

    /// 把第 `index` 个子条目滚动到可见区域并生成其容器
    fn realize_index(&mut self, arena: &TreeArena, container: Self::Container, index: usize) -> bool;

    fn container_from_index(
        &self,
        arena: &TreeArena,
        container: Self::Container,
        index: usize,
    ) -> Option<Self::Container>;

    /// 标记容器为选中；选中项确实改变时返回变化
    fn select(&mut self, arena: &TreeArena, container: Self::Container) -> Option<SelectionTransition>;

    /// 取消选中；原先有选中项时返回变化
    fn clear_selection(&mut self) -> Option<SelectionTransition>;

    fn selected_value(&self) -> Option<NodeId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemContainer {
    Tree,
    Item(NodeId),
}

/// 一行显示数据
#[derive(Debug, Clone, PartialEq)]
pub struct RowInfo {
    pub node: NodeId,
    pub title: String,
    pub image: Option<ImageRef>,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub checked: CheckState,
    pub selected: bool,
    /// 是否为父节点的最后一个子节点（连线在此处收尾）
    pub is_last: bool,
    /// 每一层祖先是否还有后续兄弟节点（该层竖线是否继续）
    pub guides: Vec<bool>,
}

/// 无界面的虚拟化条目宿主
#[derive(Debug, Default)]
pub struct VirtualizedItems {
    items_source: Vec<NodeId>,
    templated: HashSet<ItemContainer>,
    laid_out: HashSet<ItemContainer>,
    realized: HashMap<ItemContainer, HashSet<usize>>,
    selected: Option<NodeId>,
    realizations: usize,
    layout_passes: usize,
}

impl VirtualizedItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计实现的子容器次数
    pub fn realizations(&self) -> usize {
        self.realizations
    }

    pub fn layout_passes(&self) -> usize {
        self.layout_passes
    }

    fn drop_realized(&mut self, container: ItemContainer) {
        self.realized.remove(&container);
        self.laid_out.remove(&container);
    }

    /// 按展开状态展开为行列表
    pub fn visible_rows(&self, arena: &TreeArena) -> Vec<RowInfo> {
        let mut rows = Vec::new();
        let mut guides = Vec::new();
        self.push_rows(arena, &self.items_source, 0, &mut guides, &mut rows);
        rows
    }

    fn push_rows(
        &self,
        arena: &TreeArena,
        nodes: &[NodeId],
        depth: usize,
        guides: &mut Vec<bool>,
        rows: &mut Vec<RowInfo>,
    ) {
        let live: Vec<NodeId> = nodes.iter().copied().filter(|id| arena.contains(*id)).collect();
        let count = live.len();
        for (i, id) in live.into_iter().enumerate() {
            let Some(node) = arena.get(id) else {
                continue;
            };
            let is_last = i + 1 == count;
            let children = node.children();
            rows.push(RowInfo {
                node: id,
                title: node.title().to_string(),
                image: node.image().cloned(),
                depth,
                has_children: !children.is_empty(),
                expanded: node.is_expanded(),
                checked: node.checked(),
                selected: self.selected == Some(id),
                is_last,
                guides: guides.clone(),
            });
            if node.is_expanded() && !children.is_empty() {
                guides.push(!is_last);
                self.push_rows(arena, children, depth + 1, guides, rows);
                guides.pop();
            }
        }
    }
}

impl ItemsHost for VirtualizedItems {
    type Container = ItemContainer;

    fn root_container(&self) -> ItemContainer {
        ItemContainer::Tree
    }

    fn items_source(&self) -> &[NodeId] {
        &self.items_source
    }

    fn set_items_source(&mut self, roots: Vec<NodeId>) {
        self.items_source = roots;
        self.templated.clear();
        self.laid_out.clear();
        self.realized.clear();
        self.selected = None;
    }

    fn data_context(&self, container: ItemContainer) -> Option<NodeId> {
        match container {
            ItemContainer::Tree => None,
            ItemContainer::Item(id) => Some(id),
        }
    }

    fn is_item(&self, container: ItemContainer) -> bool {
        matches!(container, ItemContainer::Item(_))
    }

    fn is_expanded(&self, arena: &TreeArena, container: ItemContainer) -> bool {
        match container {
            ItemContainer::Tree => true,
            ItemContainer::Item(id) => arena.is_expanded(id),
        }
    }

    fn set_expanded(
        &mut self,
        arena: &mut TreeArena,
        container: ItemContainer,
        expanded: bool,
    ) -> Result<(), TreeError> {
        let ItemContainer::Item(id) = container else {
            return Ok(());
        };
        arena.set_expanded(id, expanded)?;
        if !expanded {
            self.drop_realized(container);
        }
        Ok(())
    }

    fn apply_template(&mut self, container: ItemContainer) {
        self.templated.insert(container);
    }

    fn has_items_presenter(&self, container: ItemContainer) -> bool {
        match container {
            ItemContainer::Tree => self.templated.contains(&container),
            ItemContainer::Item(_) => self.templated.contains(&container) && self.laid_out.contains(&container),
        }
    }

    fn update_layout(&mut self, container: ItemContainer) {
        self.layout_passes += 1;
        if self.templated.contains(&container) {
            self.laid_out.insert(container);
        }
    }

    fn items_count(&self, arena: &TreeArena, container: ItemContainer) -> usize {
        match container {
            ItemContainer::Tree => self.items_source.len(),
            ItemContainer::Item(id) => arena.children(id).len(),
        }
    }

    fn realize_index(&mut self, arena: &TreeArena, container: ItemContainer, index: usize) -> bool {
        if index >= self.items_count(arena, container) {
            return false;
        }
        self.realized.entry(container).or_default().insert(index);
        self.realizations += 1;
        true
    }

    fn container_from_index(&self, arena: &TreeArena, container: ItemContainer, index: usize) -> Option<ItemContainer> {
        if !self.realized.get(&container)?.contains(&index) {
            return None;
        }
        let id = match container {
            ItemContainer::Tree => self.items_source.get(index).copied(),
            ItemContainer::Item(parent) => arena.children(parent).get(index).copied(),
        }?;
        Some(ItemContainer::Item(id))
    }

    fn select(&mut self, arena: &TreeArena, container: ItemContainer) -> Option<SelectionTransition> {
        let ItemContainer::Item(id) = container else {
            return None;
        };
        if !arena.contains(id) || self.selected == Some(id) {
            return None;
        }
        let old = self.selected.replace(id);
        Some(SelectionTransition { old, new: Some(id) })
    }

    fn clear_selection(&mut self) -> Option<SelectionTransition> {
        let old = self.selected.take()?;
        Some(SelectionTransition { old: Some(old), new: None })
    }

    fn selected_value(&self) -> Option<NodeId> {
        self.selected
    }
}
