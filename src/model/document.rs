//! 树文档：JSON 描述的节点树与控件配置，加载后构建进 arena

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::model::arena::{ImageRef, NodeId, TreeArena, TreeError, TreeNode};
use crate::model::check_state::CheckState;
use crate::model::propagation::MultipleSelectionMode;
use crate::model::search::SearchMode;
use crate::utils::fs::{read_json_file, write_json_file};

/// 控件配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeViewOptions {
    pub multiple_selection_mode: MultipleSelectionMode,
    pub search_mode: SearchMode,
    /// true：输入即过滤；false：确认（回车）后才过滤
    pub is_active_search: bool,
    pub show_check_box: bool,
    pub show_image: bool,
    pub show_search_panel: bool,
}

/// 文档中的单个节点；`checked: null` 表示部分勾选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub title: String,
    #[serde(default)]
    pub checked: CheckState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn leaf(title: impl Into<String>, checked: CheckState) -> Self {
        Self {
            title: title.into(),
            checked,
            image: None,
            expanded: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    #[serde(default)]
    pub options: TreeViewOptions,
    #[serde(default)]
    pub roots: Vec<NodeSpec>,
}

impl TreeDocument {
    pub fn save(&self, path: &Path) -> Result<(), TreeError> {
        write_json_file(path, self)
    }
}

/// 加载树文档
pub fn load_document(path: &Path) -> Result<TreeDocument, TreeError> {
    let start = Instant::now();
    let doc: TreeDocument = read_json_file(path)?;
    tracing::info!(
        "树文档加载完成: {}，根节点 {} 个，耗时: {}ms",
        path.display(),
        doc.roots.len(),
        start.elapsed().as_millis()
    );
    Ok(doc)
}

/// 把节点描述构建为真实节点，返回根节点列表（保持文档顺序）
pub fn build_forest(arena: &mut TreeArena, specs: &[NodeSpec]) -> Result<Vec<NodeId>, TreeError> {
    let mut roots = Vec::with_capacity(specs.len());
    // (描述, 父节点) 显式栈，避免深树递归
    let mut stack: Vec<(&NodeSpec, Option<NodeId>)> = specs.iter().rev().map(|s| (s, None)).collect();
    while let Some((spec, parent)) = stack.pop() {
        let node = TreeNode::new(spec.title.clone())
            .with_checked(spec.checked)
            .with_image(spec.image.clone())
            .with_expanded(spec.expanded);
        let id = arena.insert(node);
        match parent {
            Some(p) => arena.append_child(p, id)?,
            None => roots.push(id),
        }
        stack.extend(spec.children.iter().rev().map(|c| (c, Some(id))));
    }
    Ok(roots)
}

/// 把 arena 中的树导出为节点描述（投影节点按其自身内容导出）
pub fn to_specs(arena: &TreeArena, roots: &[NodeId]) -> Vec<NodeSpec> {
    roots
        .iter()
        .filter_map(|id| {
            let node = arena.get(*id)?;
            Some(NodeSpec {
                title: node.title().to_string(),
                checked: node.checked(),
                image: node.image().cloned(),
                expanded: node.is_expanded(),
                children: to_specs(arena, node.children()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "options": { "search_mode": "folder_search", "show_check_box": true },
        "roots": [
            { "title": "水果", "checked": null, "expanded": true, "children": [
                { "title": "苹果", "checked": true, "image": "apple.png" },
                { "title": "香蕉", "checked": false }
            ]},
            { "title": "蔬菜" }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let doc: TreeDocument = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(doc.options.search_mode, SearchMode::FolderSearch);
        assert!(doc.options.show_check_box);
        assert!(!doc.options.is_active_search);
        assert_eq!(doc.options.multiple_selection_mode, MultipleSelectionMode::AllSelection);

        assert_eq!(doc.roots.len(), 2);
        assert_eq!(doc.roots[0].checked, CheckState::Mixed);
        assert_eq!(doc.roots[0].children[0].image, Some(ImageRef("apple.png".into())));
        assert_eq!(doc.roots[1].checked, CheckState::Unchecked, "缺省 checked 为未勾选");
    }

    #[test]
    fn test_build_forest_keeps_order_and_links() {
        let doc: TreeDocument = serde_json::from_str(SAMPLE).unwrap();
        let mut arena = TreeArena::new();
        let roots = build_forest(&mut arena, &doc.roots).unwrap();

        assert_eq!(roots.len(), 2);
        assert_eq!(arena.title(roots[0]), Some("水果"));
        assert!(arena.is_expanded(roots[0]));
        let children = arena.children(roots[0]).to_vec();
        assert_eq!(arena.title(children[0]), Some("苹果"));
        assert_eq!(arena.title(children[1]), Some("香蕉"));
        assert_eq!(arena.parent(children[1]), Some(roots[0]));
        assert_eq!(arena.parent(roots[1]), None);
    }

    #[test]
    fn test_export_matches_source() {
        let doc: TreeDocument = serde_json::from_str(SAMPLE).unwrap();
        let mut arena = TreeArena::new();
        let roots = build_forest(&mut arena, &doc.roots).unwrap();
        assert_eq!(to_specs(&arena, &roots), doc.roots);
    }

    #[test]
    fn test_load_document_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), SAMPLE).unwrap();
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.roots[0].children.len(), 2);

        let out = NamedTempFile::new().unwrap();
        doc.save(out.path()).unwrap();
        assert_eq!(load_document(out.path()).unwrap(), doc);
    }
}
