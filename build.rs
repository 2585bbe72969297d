//! 构建脚本：启用 gui 特性时把 Slint 界面定义编译为 Rust 代码

fn main() {
    #[cfg(feature = "gui")]
    slint_build::compile("ui/app.slint").expect("Slint 界面编译失败");
}
