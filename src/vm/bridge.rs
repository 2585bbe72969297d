//! VM桥接层：连接Slint UI与TreeViewControl
//!
//! 注意：此模块的具体实现在main.rs中，因为依赖于Slint生成的类型
//! 这里只提供公共常量

// === 常量定义（消除魔法值） ===
pub const STATUS_READY: &str = "就绪";
pub const STATUS_LOADED: &str = "树文档加载完成";
pub const STATUS_FILTERING: &str = "搜索结果";
pub const STATUS_FILTER_CLEARED: &str = "已清除搜索";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";
/// 未选中任何节点时的显示文本
pub const NO_SELECTION: &str = "（无）";
