//! 程序入口：初始化日志、加载 Slint UI，并把界面事件转交给树控件

use std::{cell::RefCell, path::{Path, PathBuf}, rc::Rc, time::Instant};
use tracing_subscriber::fmt::SubscriberBuilder;
use slint::{ComponentHandle, ModelRc, VecModel};

use checktree::model::document::build_forest;
use checktree::model::performance::run_performance_suite;
use checktree::vm::bridge::*;
use checktree::vm::host::RowInfo;
use checktree::{
    load_document, CheckState, MultipleSelectionMode, NodeId, SearchMode, TreeArena, TreeError,
    TreeViewControl,
};

slint::include_modules!();

/// 勾选集合在状态栏中最多列出的条目数
const MAX_LISTED_ITEMS: usize = 8;

fn check_state_code(state: CheckState) -> i32 {
    match state {
        CheckState::Unchecked => 0,
        CheckState::Checked => 1,
        CheckState::Mixed => 2,
    }
}

fn search_mode_index(mode: SearchMode) -> i32 {
    match mode {
        SearchMode::NodeSearch => 0,
        SearchMode::FolderSearch => 1,
        SearchMode::LeafNodeSearch => 2,
    }
}

fn search_mode_from_index(index: i32) -> SearchMode {
    match index {
        1 => SearchMode::FolderSearch,
        2 => SearchMode::LeafNodeSearch,
        _ => SearchMode::NodeSearch,
    }
}

fn selection_mode_index(mode: MultipleSelectionMode) -> i32 {
    match mode {
        MultipleSelectionMode::AllSelection => 0,
        MultipleSelectionMode::HasSelection => 1,
    }
}

fn selection_mode_from_index(index: i32) -> MultipleSelectionMode {
    match index {
        1 => MultipleSelectionMode::HasSelection,
        _ => MultipleSelectionMode::AllSelection,
    }
}

/// 界面侧状态：控件本身 + 当前显示行（行号 → 节点）
struct ShellState {
    control: TreeViewControl,
    rows: Vec<RowInfo>,
    document_dir: Option<PathBuf>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            control: TreeViewControl::new(TreeArena::new()),
            rows: Vec::new(),
            document_dir: None,
        }
    }
}

impl ShellState {
    fn row_node(&self, row: i32) -> Option<NodeId> {
        usize::try_from(row).ok().and_then(|i| self.rows.get(i)).map(|r| r.node)
    }

    fn to_row_data(&self, row: &RowInfo) -> TreeRowData {
        // 图片路径相对于树文档所在目录
        let image = row.image.as_ref().and_then(|image_ref| {
            let path = match &self.document_dir {
                Some(dir) => dir.join(&image_ref.0),
                None => PathBuf::from(&image_ref.0),
            };
            slint::Image::load_from_path(&path).ok()
        });

        TreeRowData {
            title: row.title.clone().into(),
            depth: row.depth as i32,
            has_children: row.has_children,
            expanded: row.expanded,
            checked: check_state_code(row.checked),
            selected: row.selected,
            is_last: row.is_last,
            guides: ModelRc::new(VecModel::from(row.guides.clone())),
            has_image: image.is_some(),
            image: image.unwrap_or_default(),
        }
    }

    fn title_of(&self, node: NodeId) -> String {
        self.control.arena().title(node).unwrap_or_default().to_string()
    }
}

/// VM桥接器：管理UI与树控件的交互
struct ViewModelBridge {
    state: Rc<RefCell<ShellState>>,
}

impl ViewModelBridge {
    /// 创建新的VM桥接器并绑定所有回调
    fn new(app_window: &AppWindow, state: Rc<RefCell<ShellState>>) -> Self {
        let bridge = Self { state };

        // 绑定所有UI回调
        bridge.setup_callbacks(app_window);
        bridge
    }

    /// 设置所有UI回调函数
    fn setup_callbacks(&self, app_window: &AppWindow) {
        // === 打开文件回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_load_file(move || {
                if let Some(app_window) = app_window_weak.upgrade() {
                    if let Some(path) = Self::show_file_dialog() {
                        Self::handle_load_path(&app_window, &state, &path);
                    } else {
                        app_window.set_status_message("未选择文件".into());
                    }
                }
            });
        }

        // === 搜索框输入回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_search_edited(move |text| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_search(&app_window, &state, &text, false);
                }
            });
        }

        // === 搜索框回车回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_search_accepted(move |text| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_search(&app_window, &state, &text, true);
                }
            });
        }

        // === 行点击（选中）回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_row_clicked(move |row| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    let result = {
                        let mut s = state.borrow_mut();
                        match s.row_node(row) {
                            Some(node) => s.control.select_row(node),
                            None => Ok(()),
                        }
                    };
                    Self::finish(&app_window, &state, result, None);
                }
            });
        }

        // === 勾选框回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_row_toggled(move |row| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    let result = {
                        let mut s = state.borrow_mut();
                        match s.row_node(row) {
                            Some(node) => {
                                // 部分勾选和未勾选都切换为勾选
                                let checked = s.control.arena().check_state(node) != Some(CheckState::Checked);
                                s.control.toggle_check(node, checked).map(|_| ())
                            }
                            None => Ok(()),
                        }
                    };
                    Self::finish(&app_window, &state, result, None);
                }
            });
        }

        // === 展开/折叠回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_row_expand_toggled(move |row| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    let result = {
                        let mut s = state.borrow_mut();
                        match s.row_node(row) {
                            Some(node) => s.control.toggle_expanded(node).map(|_| ()),
                            None => Ok(()),
                        }
                    };
                    Self::finish(&app_window, &state, result, None);
                }
            });
        }

        // === 搜索模式回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_search_mode_changed(move |index| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    let mode = search_mode_from_index(index);
                    let result = state.borrow_mut().control.set_search_mode(mode);
                    tracing::info!("搜索模式切换: {:?}", mode);
                    Self::finish(&app_window, &state, result, None);
                }
            });
        }

        // === 多选模式回调 ===
        {
            let state = self.state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_selection_mode_changed(move |index| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    let mode = selection_mode_from_index(index);
                    state.borrow_mut().control.set_multiple_selection_mode(mode);
                    tracing::info!("多选模式切换: {:?}", mode);
                    Self::finish(&app_window, &state, Ok(()), None);
                }
            });
        }

        // === 主动搜索开关回调 ===
        {
            let state = self.state.clone();
            app_window.on_active_search_toggled(move |active| {
                state.borrow_mut().control.set_is_active_search(active);
                tracing::info!("主动搜索: {}", active);
            });
        }
    }

    /// 初始化UI状态
    fn initialize_ui(&self, app_window: &AppWindow) {
        app_window.set_status_message(STATUS_READY.into());
        app_window.set_current_path("".into());
        app_window.set_selected_item_text(NO_SELECTION.into());
        app_window.set_selected_items_text(NO_SELECTION.into());
        app_window.set_performance_info("".into());

        // 设置空的树模型
        let empty_model = ModelRc::new(VecModel::<TreeRowData>::default());
        app_window.set_tree_model(empty_model);
    }

    /// 显示文件选择对话框
    fn show_file_dialog() -> Option<PathBuf> {
        use rfd::FileDialog;

        // 使用原生文件对话框选择树文档
        let file_path = FileDialog::new()
            .add_filter("树文档", &["json"])
            .add_filter("所有文件", &["*"])
            .set_title("选择树文档")
            .pick_file();

        match file_path {
            Some(path) => {
                tracing::info!("用户选择了文件: {}", path.display());
                Some(path)
            }
            None => {
                tracing::info!("用户取消了文件选择");
                None
            }
        }
    }

    /// 加载树文档并重建控件
    fn handle_load_path(app_window: &AppWindow, state: &Rc<RefCell<ShellState>>, path: &Path) {
        let start_time = Instant::now();

        let result = (|| -> Result<TreeViewControl, TreeError> {
            let doc = load_document(path)?;
            let mut arena = TreeArena::new();
            let roots = build_forest(&mut arena, &doc.roots)?;
            let mut control = TreeViewControl::new(arena);
            control.set_options(doc.options)?;
            control.set_items_source(roots)?;
            control.loaded()?;
            Ok(control)
        })();

        match result {
            Ok(mut control) => {
                control.on_selected_item_changed(|args| {
                    tracing::info!("选中项变化: {:?} -> {:?}", args.old, args.new);
                });
                control.on_selected_items_changed(|args| {
                    tracing::info!("勾选集合变化: {} -> {} 项", args.old.len(), args.new.len());
                });

                let options = control.options().clone();
                let node_count = control.arena().len();
                {
                    let mut s = state.borrow_mut();
                    s.control = control;
                    s.document_dir = path.parent().map(Path::to_path_buf);
                }

                app_window.set_current_path(path.to_string_lossy().to_string().into());
                app_window.set_show_check_box(options.show_check_box);
                app_window.set_show_image(options.show_image);
                app_window.set_is_active_search(options.is_active_search);
                app_window.set_search_mode_index(search_mode_index(options.search_mode));
                app_window.set_selection_mode_index(selection_mode_index(options.multiple_selection_mode));

                let load_duration = start_time.elapsed();
                app_window.set_performance_info(
                    format!("加载: {}ms | 节点: {}", load_duration.as_millis(), node_count).into(),
                );
                Self::finish(app_window, state, Ok(()), Some(STATUS_LOADED));
                tracing::info!("文件加载成功: {} 个节点，耗时: {}ms", node_count, load_duration.as_millis());
            }
            Err(e) => {
                let error_msg = format!("{}{}", STATUS_ERROR_PREFIX, e);
                app_window.set_status_message(error_msg.into());
                tracing::error!("文件加载失败: {}", e);
            }
        }
    }

    /// 搜索框输入/确认
    fn handle_search(app_window: &AppWindow, state: &Rc<RefCell<ShellState>>, text: &str, confirmed: bool) {
        let start_time = Instant::now();
        let result = {
            let mut s = state.borrow_mut();
            s.control.search_text_changed(text).and_then(|filtered| {
                if confirmed && !filtered {
                    s.control.confirm_search()
                } else {
                    Ok(filtered)
                }
            })
        };

        match result {
            Ok(true) => {
                let filtering = state.borrow().control.is_filtering();
                let message = if filtering {
                    format!("{}: {}", STATUS_FILTERING, text)
                } else {
                    STATUS_FILTER_CLEARED.to_string()
                };
                app_window.set_performance_info(format!("过滤: {}ms", start_time.elapsed().as_millis()).into());
                Self::finish(app_window, state, Ok(()), Some(&message));
            }
            Ok(false) => {}
            Err(e) => Self::finish(app_window, state, Err(e), None),
        }
    }

    /// 操作完成后刷新界面；出错时在状态栏显示
    fn finish(app_window: &AppWindow, state: &Rc<RefCell<ShellState>>, result: Result<(), TreeError>, status: Option<&str>) {
        if let Err(e) = result {
            tracing::warn!("操作被拒绝: {}", e);
            app_window.set_status_message(format!("{}{}", STATUS_ERROR_PREFIX, e).into());
        } else if let Some(status) = status {
            app_window.set_status_message(status.into());
        }
        Self::refresh_view(app_window, state);
    }

    /// 把控件当前状态同步到界面
    fn refresh_view(app_window: &AppWindow, state: &Rc<RefCell<ShellState>>) {
        let mut s = state.borrow_mut();
        let rows = s.control.visible_rows();
        s.rows = rows;

        let tree_data: Vec<TreeRowData> = s.rows.iter().map(|row| s.to_row_data(row)).collect();
        app_window.set_tree_model(ModelRc::new(VecModel::from(tree_data)));

        let selected_item = match s.control.selected_item() {
            Some(node) => s.title_of(node),
            None => NO_SELECTION.to_string(),
        };
        app_window.set_selected_item_text(selected_item.into());

        let selected_items = s.control.selected_items();
        let selected_items_text = if selected_items.is_empty() {
            NO_SELECTION.to_string()
        } else {
            let mut titles: Vec<String> = selected_items
                .iter()
                .take(MAX_LISTED_ITEMS)
                .map(|node| s.title_of(*node))
                .collect();
            if selected_items.len() > MAX_LISTED_ITEMS {
                titles.push(format!("…共 {} 项", selected_items.len()));
            }
            titles.join("、")
        };
        app_window.set_selected_items_text(selected_items_text.into());
    }
}

fn main() -> anyhow::Result<()> {
    // 初始化日志输出
    let _ = SubscriberBuilder::default()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let first_arg = std::env::args().nth(1);

    // --bench：只跑性能测试并输出到日志，不启动界面
    if first_arg.as_deref() == Some("--bench") {
        for result in run_performance_suite() {
            tracing::info!(
                "{} [{}] {}ms {}",
                result.operation,
                if result.success { "成功" } else { "失败" },
                result.duration_ms,
                result.details
            );
        }
        return Ok(());
    }

    let app = AppWindow::new()?;
    let state = Rc::new(RefCell::new(ShellState::default()));

    // 创建VM桥接器并绑定UI回调
    let bridge = ViewModelBridge::new(&app, state.clone());
    bridge.initialize_ui(&app);

    // 命令行第一个参数可直接指定树文档
    if let Some(path) = first_arg {
        ViewModelBridge::handle_load_path(&app, &state, Path::new(&path));
    }

    tracing::info!("应用启动成功，UI已初始化");
    app.run()?;
    Ok(())
}
