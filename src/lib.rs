//! 树形选择控件库
//! 
//! 提供三态勾选树、三种搜索过滤模式、勾选联动、选中项定位和业务绑定中介
//! 遵循MVVM架构模式：model 为纯数据与算法，vm 为控件状态与界面容器契约

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::arena::{ImageRef, NodeId, NodeOrigin, TreeArena, TreeError, TreeNode};
pub use model::check_state::CheckState;
pub use model::document::{load_document, NodeSpec, TreeDocument, TreeViewOptions};
pub use model::propagation::MultipleSelectionMode;
pub use model::search::SearchMode;
pub use vm::control::{TreeViewControl, ValueChanged};
