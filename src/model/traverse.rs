//! 树遍历：沿 arena 的 children 做先序/后序遍历

use crate::model::arena::{NodeId, TreeArena};

/// 先序遍历迭代器（根 → 子节点，按插入顺序）
pub struct Preorder<'a> {
    arena: &'a TreeArena,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let id = self.stack.pop()?;
            // 已删除的节点直接跳过
            if !self.arena.contains(id) {
                continue;
            }
            self.stack.extend(self.arena.children(id).iter().rev().copied());
            return Some(id);
        }
    }
}

pub fn preorder(arena: &TreeArena, root: NodeId) -> Preorder<'_> {
    Preorder {
        arena,
        stack: vec![root],
    }
}

/// 多个根依次先序遍历
pub fn preorder_forest<'a>(arena: &'a TreeArena, roots: &[NodeId]) -> Preorder<'a> {
    Preorder {
        arena,
        stack: roots.iter().rev().copied().collect(),
    }
}

/// 后序遍历（子节点先于父节点），返回节点列表便于调用方随后修改 arena
pub fn postorder(arena: &TreeArena, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, visited)) = stack.pop() {
        if !arena.contains(id) {
            continue;
        }
        if visited {
            out.push(id);
        } else {
            stack.push((id, true));
            for child in arena.children(id).iter().rev() {
                stack.push((*child, false));
            }
        }
    }
    out
}
