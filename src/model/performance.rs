//! 性能基准测试模块
//!
//! 用于测试大树的构建、三种搜索模式、勾选联动和选中集合收集的耗时
//! 所有操作都在界面线程同步执行，大树上的耗时即为界面卡顿时间

use std::time::Instant;

use crate::model::arena::{NodeId, TreeArena};
use crate::model::check_state::CheckState;
use crate::model::document::{build_forest, NodeSpec};
use crate::model::propagation::{collect_selected, propagate_check, MultipleSelectionMode};
use crate::model::search::{normalize_check_states, search, SearchMode};

/// 性能测试结果
#[derive(Debug)]
pub struct PerformanceResult {
    pub operation: String,
    pub duration_ms: u128,
    pub success: bool,
    pub details: String,
}

impl PerformanceResult {
    pub fn new(operation: &str, duration_ms: u128, success: bool, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_ms,
            success,
            details: details.to_string(),
        }
    }
}

/// 生成测试用的节点描述：`roots` 个根，每层 `width` 个子节点，共 `depth` 层
pub fn generate_forest(roots: usize, depth: usize, width: usize) -> Vec<NodeSpec> {
    fn create_node(path: &str, current_depth: usize, max_depth: usize, width: usize) -> NodeSpec {
        // 按位置交替设置勾选状态，让归约结果包含三种状态
        let checked = match path.len() % 3 {
            0 => CheckState::Checked,
            _ => CheckState::Unchecked,
        };
        let mut node = NodeSpec::leaf(format!("节点_{}", path), checked);
        if current_depth < max_depth {
            node.children = (0..width)
                .map(|i| create_node(&format!("{}-{}", path, i), current_depth + 1, max_depth, width))
                .collect();
        }
        node
    }

    (0..roots)
        .map(|i| create_node(&i.to_string(), 1, depth, width))
        .collect()
}

/// 测试树构建性能
pub fn benchmark_build(specs: &[NodeSpec]) -> (TreeArena, Vec<NodeId>, PerformanceResult) {
    let start = Instant::now();
    let mut arena = TreeArena::new();
    let built = build_forest(&mut arena, specs);
    let duration = start.elapsed();

    match built {
        Ok(roots) => {
            let result = PerformanceResult::new(
                "树构建",
                duration.as_millis(),
                !roots.is_empty(),
                &format!("构建了 {} 个节点", arena.len()),
            );
            (arena, roots, result)
        }
        Err(e) => {
            let result = PerformanceResult::new("树构建", duration.as_millis(), false, &format!("构建失败: {}", e));
            (arena, Vec::new(), result)
        }
    }
}

/// 测试搜索过滤性能（生成投影后立即释放）
pub fn benchmark_search(arena: &mut TreeArena, roots: &[NodeId], mode: SearchMode, text: &str) -> PerformanceResult {
    let start = Instant::now();
    let result = search(arena, roots, mode, text);
    let duration = start.elapsed();

    match result {
        Ok(projection) => {
            let details = format!(
                "\"{}\" 命中 {} 个根，投影 {} 个节点",
                text,
                projection.roots().len(),
                projection.derived().len()
            );
            projection.release(arena);
            PerformanceResult::new(&format!("搜索: {:?}", mode), duration.as_millis(), true, &details)
        }
        Err(e) => PerformanceResult::new(
            &format!("搜索: {:?}", mode),
            duration.as_millis(),
            false,
            &format!("搜索失败: {}", e),
        ),
    }
}

/// 测试勾选联动 + 选中集合收集性能
pub fn benchmark_toggle(arena: &mut TreeArena, roots: &[NodeId], node: NodeId) -> PerformanceResult {
    let start = Instant::now();
    let outcome = propagate_check(arena, node, true)
        .and_then(|_| collect_selected(arena, roots, MultipleSelectionMode::HasSelection, false));
    let duration = start.elapsed();

    match outcome {
        Ok(selected) => PerformanceResult::new(
            "勾选联动",
            duration.as_millis(),
            true,
            &format!("选中集合 {} 项", selected.len()),
        ),
        Err(e) => PerformanceResult::new("勾选联动", duration.as_millis(), false, &format!("联动失败: {}", e)),
    }
}

/// 测试过滤后归约性能
pub fn benchmark_normalize(arena: &mut TreeArena, roots: &[NodeId]) -> PerformanceResult {
    let start = Instant::now();
    let result = normalize_check_states(arena, roots);
    let duration = start.elapsed();

    PerformanceResult::new(
        "三态归约",
        duration.as_millis(),
        result.is_ok(),
        &format!("归约了 {} 棵树", roots.len()),
    )
}

/// 运行综合性能测试
pub fn run_performance_suite() -> Vec<PerformanceResult> {
    let mut results = Vec::new();

    // 测试不同规模的数据
    let test_cases = [
        (2, 4, 5),  // 小型：2个根，深度4，宽度5
        (4, 5, 6),  // 中型：4个根，深度5，宽度6
        (8, 6, 6),  // 大型：8个根，深度6，宽度6
    ];

    for (root_count, depth, width) in test_cases {
        tracing::info!("测试规模：根{}，深度{}，宽度{}", root_count, depth, width);

        let start = Instant::now();
        let specs = generate_forest(root_count, depth, width);
        results.push(PerformanceResult::new(
            &format!("数据生成({}x{}x{})", root_count, depth, width),
            start.elapsed().as_millis(),
            true,
            &format!("生成了 {} 个根", specs.len()),
        ));

        let (mut arena, roots, build) = benchmark_build(&specs);
        results.push(build);

        for mode in [SearchMode::NodeSearch, SearchMode::FolderSearch, SearchMode::LeafNodeSearch] {
            results.push(benchmark_search(&mut arena, &roots, mode, "-1"));
        }

        results.push(benchmark_normalize(&mut arena, &roots));

        if let Some(&first) = roots.first() {
            results.push(benchmark_toggle(&mut arena, &roots, first));
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_forest() {
        let specs = generate_forest(2, 3, 2);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].children.len(), 2);
        assert_eq!(specs[0].children[0].children.len(), 2);
        assert!(specs[0].children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_performance_benchmarks() {
        let specs = generate_forest(2, 4, 3);
        let (mut arena, roots, build) = benchmark_build(&specs);
        assert!(build.success);
        // 2 * (1 + 3 + 9 + 27)
        assert_eq!(arena.len(), 80);

        let before = arena.len();
        for mode in [SearchMode::NodeSearch, SearchMode::FolderSearch, SearchMode::LeafNodeSearch] {
            let result = benchmark_search(&mut arena, &roots, mode, "-1");
            assert!(result.success);
            assert!(result.duration_ms < 1000); // 应该在1秒内完成
        }
        assert_eq!(arena.len(), before, "基准测试不应残留投影节点");

        assert!(benchmark_normalize(&mut arena, &roots).success);
        let toggle = benchmark_toggle(&mut arena, &roots, roots[0]);
        assert!(toggle.success);
        assert!(toggle.duration_ms < 1000);
    }

    #[test]
    fn test_leaf_search_prunes_large_tree_quickly() {
        // 1 + 250 + 62500 个节点，没有任何叶子匹配，全部投影节点都要被剪掉
        let specs = generate_forest(1, 3, 250);
        let (mut arena, roots, _) = benchmark_build(&specs);
        let before = arena.len();

        let result = benchmark_search(&mut arena, &roots, SearchMode::LeafNodeSearch, "不存在");
        assert!(result.success);
        assert!(result.details.contains("命中 0 个根"), "{}", result.details);
        assert!(result.duration_ms < 1000, "剪枝耗时 {}ms", result.duration_ms);
        assert_eq!(arena.len(), before);
    }
}
