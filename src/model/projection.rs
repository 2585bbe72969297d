//! 投影树：过滤期间生成的影子节点，每次过滤重新生成，清空过滤后整体释放

use indexmap::IndexSet;

use crate::model::arena::{NodeId, NodeOrigin, TreeArena, TreeError, TreeNode};
use crate::model::traverse::preorder_forest;

/// 一次过滤生成的投影
///
/// 记录本次分配的所有投影节点，`release` 时从 arena 中移除；真实节点不受影响。
#[derive(Debug, Default)]
pub struct Projection {
    roots: Vec<NodeId>,
    derived: IndexSet<NodeId>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 投影树的顶层节点（即当前显示的数据源）
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn set_roots(&mut self, roots: Vec<NodeId>) {
        self.roots = roots;
    }

    /// 本次过滤分配的全部投影节点
    pub fn derived(&self) -> &IndexSet<NodeId> {
        &self.derived
    }

    fn derive(&mut self, arena: &mut TreeArena, source: NodeId) -> Result<NodeId, TreeError> {
        let src = arena.get(source).ok_or(TreeError::NodeNotFound(source))?;
        let node = TreeNode {
            title: src.title.clone(),
            checked: src.checked,
            image: src.image.clone(),
            parent: None,
            expanded: src.expanded,
            children: Vec::new(),
            origin: NodeOrigin::Derived {
                mirror: Some(source),
            },
        };
        let id = arena.insert(node);
        self.derived.insert(id);
        Ok(id)
    }

    /// 浅拷贝：只复制标题/勾选/图片/展开状态，父子关系由调用方填充
    pub fn derive_shallow(&mut self, arena: &mut TreeArena, source: NodeId) -> Result<NodeId, TreeError> {
        self.derive(arena, source)
    }

    /// 全拷贝：与源节点共享子节点（按索引引用真实子树）
    ///
    /// 生成的节点作为投影树的顶层结果使用，因此不携带父节点引用。
    pub fn derive_full(&mut self, arena: &mut TreeArena, source: NodeId) -> Result<NodeId, TreeError> {
        let id = self.derive(arena, source)?;
        let children = arena.children(source).to_vec();
        arena.set_children(id, children)?;
        Ok(id)
    }

    /// 深拷贝整棵子树，每个节点都是镜像对应真实节点的投影节点
    pub fn derive_subtree(&mut self, arena: &mut TreeArena, source: NodeId) -> Result<NodeId, TreeError> {
        let id = self.derive(arena, source)?;
        let children = arena.children(source).to_vec();
        for child in children {
            let copy = self.derive_subtree(arena, child)?;
            arena.append_child(id, copy)?;
        }
        Ok(id)
    }

    /// 丢弃单个投影节点（不级联）
    pub fn discard(&mut self, arena: &mut TreeArena, id: NodeId) {
        if self.derived.swap_remove(&id) {
            arena.remove(id);
        }
    }

    /// 在当前投影树中查找镜像为 `mirror` 的投影节点（先序，首个命中即返回）
    pub fn find_derived(&self, arena: &TreeArena, mirror: NodeId) -> Option<NodeId> {
        preorder_forest(arena, &self.roots).find(|id| arena.mirror(*id) == Some(mirror))
    }

    /// 从镜像节点刷新投影节点的显示状态（真实树被重新归约后调用）
    pub fn sync_from_mirrors(&self, arena: &mut TreeArena) {
        for id in &self.derived {
            let Some(state) = arena.mirror(*id).and_then(|m| arena.check_state(m)) else {
                continue;
            };
            // 只改投影节点自身，镜像已经是最新状态
            let _ = arena.set_checked_local(*id, state);
        }
    }

    /// 释放所有投影节点
    pub fn release(self, arena: &mut TreeArena) {
        for id in self.derived {
            arena.remove(id);
        }
    }
}
