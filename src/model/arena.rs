//! 节点仓库（Arena）：调用方拥有的树与过滤期间的投影节点共用同一张表
//!
//! 父子关系全部用 `NodeId` 索引表达，不存在悬空引用；已删除的槽位进入空闲链表复用。

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::check_state::CheckState;

/// 节点索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 图片句柄（资源键或文件路径），控件本身不解释其内容
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

/// 节点来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    /// 调用方的真实节点
    Original,
    /// 过滤时生成的投影节点，`mirror` 为其代理的真实节点
    Derived { mirror: Option<NodeId> },
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) title: String,
    pub(crate) checked: CheckState,
    pub(crate) image: Option<ImageRef>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) expanded: bool,
    pub(crate) children: Vec<NodeId>,
    pub(crate) origin: NodeOrigin,
}

impl TreeNode {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            checked: CheckState::Unchecked,
            image: None,
            parent: None,
            expanded: false,
            children: Vec::new(),
            origin: NodeOrigin::Original,
        }
    }

    pub fn with_checked(mut self, checked: CheckState) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_image(mut self, image: Option<ImageRef>) -> Self {
        self.image = image;
        self
    }

    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn checked(&self) -> CheckState {
        self.checked
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn origin(&self) -> NodeOrigin {
        self.origin
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.origin, NodeOrigin::Derived { .. })
    }

    /// 投影节点代理的真实节点
    pub fn mirror(&self) -> Option<NodeId> {
        match self.origin {
            NodeOrigin::Derived { mirror } => mirror,
            NodeOrigin::Original => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("节点不存在: {0}")]
    NodeNotFound(NodeId),
    #[error("参数无效: {0}")]
    InvalidArgument(String),
    #[error("投影节点缺少镜像: {0}")]
    MissingMirror(NodeId),
    #[error("状态错误: {0}")]
    State(String),
}

#[derive(Debug, Default)]
pub struct TreeArena {
    slots: Vec<Option<TreeNode>>,
    free: Vec<usize>,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// 存活节点数量
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 插入一个节点（不处理父子关系）
    pub fn insert(&mut self, node: TreeNode) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// 新建一个无父节点的真实节点
    pub fn add_node(&mut self, title: impl Into<String>, checked: CheckState) -> NodeId {
        self.insert(TreeNode::new(title).with_checked(checked))
    }

    /// 新建真实节点并挂到 `parent` 的子节点末尾
    pub fn add_child(
        &mut self,
        parent: NodeId,
        title: impl Into<String>,
        checked: CheckState,
    ) -> Result<NodeId, TreeError> {
        if !self.contains(parent) {
            return Err(TreeError::NodeNotFound(parent));
        }
        let child = self.add_node(title, checked);
        self.append_child(parent, child)?;
        Ok(child)
    }

    /// 把已有节点挂到 `parent` 下，同时设置其父节点引用
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.push_child(parent, child)?;
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// 只追加到子节点列表，不改动子节点的父节点引用
    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if !self.contains(child) {
            return Err(TreeError::NodeNotFound(child));
        }
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    pub(crate) fn set_children(&mut self, node: NodeId, children: Vec<NodeId>) -> Result<(), TreeError> {
        self.node_mut(node)?.children = children;
        Ok(())
    }

    /// 删除节点槽位；不会级联删除子节点
    pub fn remove(&mut self, id: NodeId) -> Option<TreeNode> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode, TreeError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::NodeNotFound(id))
    }

    pub fn title(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(TreeNode::title)
    }

    pub fn check_state(&self, id: NodeId) -> Option<CheckState> {
        self.get(id).map(TreeNode::checked)
    }

    pub fn image(&self, id: NodeId) -> Option<&ImageRef> {
        self.get(id).and_then(TreeNode::image)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(TreeNode::parent)
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(TreeNode::is_expanded)
    }

    /// 子节点列表；节点不存在时为空
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(TreeNode::children).unwrap_or(&[])
    }

    pub fn mirror(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(TreeNode::mirror)
    }

    pub fn is_derived(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(TreeNode::is_derived)
    }

    /// 投影节点解包为其镜像，其余节点原样返回
    pub fn resolve(&self, id: NodeId) -> NodeId {
        self.mirror(id).unwrap_or(id)
    }

    /// 投影节点的写操作同步到镜像节点
    fn write_through<F>(&mut self, id: NodeId, mut apply: F) -> Result<(), TreeError>
    where
        F: FnMut(&mut TreeNode),
    {
        let node = self.node_mut(id)?;
        apply(node);
        if let Some(mirror) = node.mirror() {
            if let Some(target) = self.slots.get_mut(mirror.0).and_then(Option::as_mut) {
                apply(target);
            }
        }
        Ok(())
    }

    pub fn set_title(&mut self, id: NodeId, title: &str) -> Result<(), TreeError> {
        self.write_through(id, |n| n.title = title.to_string())
    }

    pub fn set_checked(&mut self, id: NodeId, checked: CheckState) -> Result<(), TreeError> {
        self.write_through(id, |n| n.checked = checked)
    }

    pub fn set_image(&mut self, id: NodeId, image: Option<ImageRef>) -> Result<(), TreeError> {
        self.write_through(id, |n| n.image = image.clone())
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<(), TreeError> {
        self.write_through(id, |n| n.expanded = expanded)
    }

    /// 只修改节点自身的勾选状态，不回写镜像
    pub(crate) fn set_checked_local(&mut self, id: NodeId, checked: CheckState) -> Result<(), TreeError> {
        self.node_mut(id)?.checked = checked;
        Ok(())
    }
}
