//! 树控件：数据源、选中项、勾选集合与搜索过滤的对外接口
//!
//! 所有操作都在界面线程中同步执行。宿主报告的选中变化需要交回
//! [`TreeViewControl::host_selection_changed`]，控件内部的定位流程会自动完成这一步。

use indexmap::IndexSet;

use crate::model::arena::{NodeId, TreeArena, TreeError};
use crate::model::document::TreeViewOptions;
use crate::model::projection::Projection;
use crate::model::propagation::{collect_selected, propagate_check, propagate_projected_check, MultipleSelectionMode};
use crate::model::search::{normalize_check_states, search, SearchMode};
use crate::vm::host::{ItemContainer, ItemsHost, RowInfo, SelectionTransition, VirtualizedItems};
use crate::vm::notify::PropertyNotifier;
use crate::vm::resolver::load_selected_item;

pub const PROP_ITEMS_SOURCE: &str = "items_source";
pub const PROP_SELECTED_ITEM: &str = "selected_item";
pub const PROP_SELECTED_ITEMS: &str = "selected_items";
pub const PROP_SEARCH_TEXT: &str = "search_text";
pub const PROP_OPTIONS: &str = "options";

/// 属性变更事件参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChanged<T> {
    pub old: T,
    pub new: T,
}

type SelectedItemHandler = Box<dyn FnMut(&ValueChanged<Option<NodeId>>)>;
type SelectedItemsHandler = Box<dyn FnMut(&ValueChanged<Vec<NodeId>>)>;

pub struct TreeViewControl<H: ItemsHost = VirtualizedItems> {
    arena: TreeArena,
    host: H,
    items_source: Vec<NodeId>,
    options: TreeViewOptions,
    search_text: String,
    projection: Option<Projection>,
    selected_item: Option<NodeId>,
    selected_items: IndexSet<NodeId>,
    selected_item_handlers: Vec<SelectedItemHandler>,
    selected_items_handlers: Vec<SelectedItemsHandler>,
    notifier: PropertyNotifier,
}

impl TreeViewControl<VirtualizedItems> {
    pub fn new(arena: TreeArena) -> Self {
        Self::with_host(arena, VirtualizedItems::new())
    }

    /// 当前显示的行
    pub fn visible_rows(&self) -> Vec<RowInfo> {
        self.host.visible_rows(&self.arena)
    }

    /// 用户展开/折叠某一行
    pub fn toggle_expanded(&mut self, node: NodeId) -> Result<bool, TreeError> {
        let expanded = !self.arena.is_expanded(node);
        self.host
            .set_expanded(&mut self.arena, ItemContainer::Item(node), expanded)?;
        Ok(expanded)
    }

    /// 用户点击某一行
    pub fn select_row(&mut self, node: NodeId) -> Result<(), TreeError> {
        if !self.arena.contains(node) {
            return Err(TreeError::NodeNotFound(node));
        }
        if let Some(transition) = self.host.select(&self.arena, ItemContainer::Item(node)) {
            self.host_selection_changed(transition)?;
        }
        Ok(())
    }
}

impl<H: ItemsHost> TreeViewControl<H> {
    pub fn with_host(arena: TreeArena, host: H) -> Self {
        Self {
            arena,
            host,
            items_source: Vec::new(),
            options: TreeViewOptions::default(),
            search_text: String::new(),
            projection: None,
            selected_item: None,
            selected_items: IndexSet::new(),
            selected_item_handlers: Vec::new(),
            selected_items_handlers: Vec::new(),
            notifier: PropertyNotifier::new(),
        }
    }

    pub fn arena(&self) -> &TreeArena {
        &self.arena
    }

    /// 直接修改调用方的树；修改结构后应重新设置数据源
    pub fn arena_mut(&mut self) -> &mut TreeArena {
        &mut self.arena
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn items_source(&self) -> &[NodeId] {
        &self.items_source
    }

    pub fn options(&self) -> &TreeViewOptions {
        &self.options
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn selected_item(&self) -> Option<NodeId> {
        self.selected_item
    }

    pub fn selected_items(&self) -> &IndexSet<NodeId> {
        &self.selected_items
    }

    pub fn notifier_mut(&mut self) -> &mut PropertyNotifier {
        &mut self.notifier
    }

    pub fn on_selected_item_changed<F>(&mut self, handler: F)
    where
        F: FnMut(&ValueChanged<Option<NodeId>>) + 'static,
    {
        self.selected_item_handlers.push(Box::new(handler));
    }

    pub fn on_selected_items_changed<F>(&mut self, handler: F)
    where
        F: FnMut(&ValueChanged<Vec<NodeId>>) + 'static,
    {
        self.selected_items_handlers.push(Box::new(handler));
    }

    /// 是否正在显示过滤后的投影树
    pub fn is_filtering(&self) -> bool {
        self.projection.is_some()
    }

    /// 当前显示的顶层节点
    pub fn displayed_roots(&self) -> &[NodeId] {
        match &self.projection {
            Some(projection) => projection.roots(),
            None => &self.items_source,
        }
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// 更换数据源；已有搜索文本时立即按新数据源重新过滤
    pub fn set_items_source(&mut self, roots: Vec<NodeId>) -> Result<(), TreeError> {
        if let Some(missing) = roots.iter().find(|id| !self.arena.contains(**id)) {
            return Err(TreeError::NodeNotFound(*missing));
        }
        self.items_source = roots;
        self.notifier.notify(PROP_ITEMS_SOURCE);
        self.apply_search()
    }

    pub fn set_options(&mut self, options: TreeViewOptions) -> Result<(), TreeError> {
        let mode_changed = options.search_mode != self.options.search_mode;
        if !self.notifier.set_field(&mut self.options, options, PROP_OPTIONS) {
            return Ok(());
        }
        if mode_changed && self.is_filtering() {
            self.apply_search()?;
        }
        Ok(())
    }

    /// 切换搜索模式；正在过滤时按新模式重新过滤
    pub fn set_search_mode(&mut self, mode: SearchMode) -> Result<(), TreeError> {
        let options = TreeViewOptions {
            search_mode: mode,
            ..self.options.clone()
        };
        self.set_options(options)
    }

    pub fn set_multiple_selection_mode(&mut self, mode: MultipleSelectionMode) {
        let options = TreeViewOptions {
            multiple_selection_mode: mode,
            ..self.options.clone()
        };
        self.notifier.set_field(&mut self.options, options, PROP_OPTIONS);
    }

    pub fn set_is_active_search(&mut self, active: bool) {
        let options = TreeViewOptions {
            is_active_search: active,
            ..self.options.clone()
        };
        self.notifier.set_field(&mut self.options, options, PROP_OPTIONS);
    }

    pub fn set_show_check_box(&mut self, show: bool) {
        let options = TreeViewOptions {
            show_check_box: show,
            ..self.options.clone()
        };
        self.notifier.set_field(&mut self.options, options, PROP_OPTIONS);
    }

    pub fn set_show_image(&mut self, show: bool) {
        let options = TreeViewOptions {
            show_image: show,
            ..self.options.clone()
        };
        self.notifier.set_field(&mut self.options, options, PROP_OPTIONS);
    }

    pub fn set_show_search_panel(&mut self, show: bool) {
        let options = TreeViewOptions {
            show_search_panel: show,
            ..self.options.clone()
        };
        self.notifier.set_field(&mut self.options, options, PROP_OPTIONS);
    }

    /// 搜索框文本变化；主动搜索时立即过滤，返回是否执行了过滤
    pub fn search_text_changed(&mut self, text: &str) -> Result<bool, TreeError> {
        let text = text.to_string();
        self.notifier.set_field(&mut self.search_text, text, PROP_SEARCH_TEXT);
        if !self.options.is_active_search {
            return Ok(false);
        }
        self.apply_search()?;
        Ok(true)
    }

    /// 搜索框确认（回车）；非主动搜索时才过滤，返回是否执行了过滤
    pub fn confirm_search(&mut self) -> Result<bool, TreeError> {
        if self.options.is_active_search {
            return Ok(false);
        }
        self.apply_search()?;
        Ok(true)
    }

    /// 按当前搜索文本重建显示树
    ///
    /// 空文本恢复原始数据源；随后重新定位选中项，并按真实树重算所有内部节点的三态。
    pub fn apply_search(&mut self) -> Result<(), TreeError> {
        if let Some(old) = self.projection.take() {
            old.release(&mut self.arena);
        }

        if self.search_text.is_empty() {
            self.host.set_items_source(self.items_source.clone());
        } else {
            let projection = search(
                &mut self.arena,
                &self.items_source,
                self.options.search_mode,
                &self.search_text,
            )?;
            self.host.set_items_source(projection.roots().to_vec());
            self.projection = Some(projection);
        }

        self.reload_selected_item()?;

        normalize_check_states(&mut self.arena, &self.items_source)?;
        if let Some(projection) = &self.projection {
            projection.sync_from_mirrors(&mut self.arena);
        }
        Ok(())
    }

    /// 勾选框切换
    ///
    /// 过滤期间联动沿显示的投影树进行，隐藏的真实节点不受影响；
    /// 真实树其余内部节点随后重新归约，再刷新投影并重新收集选中集合。
    pub fn toggle_check(&mut self, node: NodeId, checked: bool) -> Result<ValueChanged<Vec<NodeId>>, TreeError> {
        if !self.arena.contains(node) {
            return Err(TreeError::NodeNotFound(node));
        }
        let outcome = match &self.projection {
            Some(projection) => {
                let outcome = propagate_projected_check(&mut self.arena, &self.items_source, node, checked)?;
                projection.sync_from_mirrors(&mut self.arena);
                outcome
            }
            None => propagate_check(&mut self.arena, node, checked)?,
        };
        tracing::debug!(
            "勾选联动 {}: 子孙 {} 个，祖先更新 {} 个",
            node,
            outcome.descendants,
            outcome.updated_ancestors.len()
        );

        let selected = collect_selected(
            &self.arena,
            self.displayed_roots(),
            self.options.multiple_selection_mode,
            self.is_filtering(),
        )?;
        let old: Vec<NodeId> = std::mem::replace(&mut self.selected_items, selected)
            .into_iter()
            .collect();
        let new: Vec<NodeId> = self.selected_items.iter().copied().collect();
        tracing::info!("选中项集合更新: {} -> {} 项", old.len(), new.len());

        let args = ValueChanged { old, new };
        self.notifier.notify(PROP_SELECTED_ITEMS);
        for handler in &mut self.selected_items_handlers {
            handler(&args);
        }
        Ok(args)
    }

    /// 外部设置选中项，在当前显示的树中定位并选中
    pub fn set_selected_item(&mut self, node: Option<NodeId>) -> Result<(), TreeError> {
        let node = node.map(|n| self.arena.resolve(n));
        if let Some(n) = node {
            if !self.arena.contains(n) {
                return Err(TreeError::NodeNotFound(n));
            }
        }
        self.notifier.set_field(&mut self.selected_item, node, PROP_SELECTED_ITEM);
        if node.is_none() {
            return match self.host.clear_selection() {
                Some(transition) => self.host_selection_changed(transition),
                None => Ok(()),
            };
        }
        self.reload_selected_item()
    }

    /// 宿主选中项变化：投影节点解包为镜像后发布
    pub fn host_selection_changed(&mut self, transition: SelectionTransition) -> Result<(), TreeError> {
        let old = transition.old.map(|id| self.arena.resolve(id));
        let new = match transition.new {
            Some(id) if self.is_filtering() && self.arena.is_derived(id) => match self.arena.mirror(id) {
                Some(mirror) => Some(mirror),
                None => {
                    tracing::error!("选中的投影节点 {} 没有镜像节点", id);
                    debug_assert!(false, "选中的投影节点 {} 没有镜像节点", id);
                    return Err(TreeError::MissingMirror(id));
                }
            },
            other => other,
        };

        if new.is_some() {
            self.notifier.set_field(&mut self.selected_item, new, PROP_SELECTED_ITEM);
        }
        let args = ValueChanged { old, new };
        for handler in &mut self.selected_item_handlers {
            handler(&args);
        }
        Ok(())
    }

    /// 控件加载完成后定位初始选中项
    pub fn loaded(&mut self) -> Result<(), TreeError> {
        self.reload_selected_item()
    }

    fn reload_selected_item(&mut self) -> Result<(), TreeError> {
        let filtering = self.is_filtering();
        let transition = load_selected_item(&mut self.host, &mut self.arena, self.selected_item, filtering)?;
        if let Some(transition) = transition {
            self.host_selection_changed(transition)?;
        }
        Ok(())
    }
}
