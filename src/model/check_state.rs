//! 三态勾选（Checked / Unchecked / Mixed）与子节点归约

use serde::{Deserialize, Serialize};

/// 复选框三态
///
/// 序列化为 `true` / `false` / `null`，与树文档中的 `checked` 字段一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum CheckState {
    Checked,
    #[default]
    Unchecked,
    /// 子节点部分勾选
    Mixed,
}

impl CheckState {
    pub fn from_bool(checked: bool) -> Self {
        if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        }
    }

    pub fn as_option(self) -> Option<bool> {
        match self {
            CheckState::Checked => Some(true),
            CheckState::Unchecked => Some(false),
            CheckState::Mixed => None,
        }
    }

    pub fn is_checked(self) -> bool {
        self == CheckState::Checked
    }

    pub fn is_mixed(self) -> bool {
        self == CheckState::Mixed
    }
}

impl From<Option<bool>> for CheckState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => CheckState::Checked,
            Some(false) => CheckState::Unchecked,
            None => CheckState::Mixed,
        }
    }
}

impl From<CheckState> for Option<bool> {
    fn from(state: CheckState) -> Self {
        state.as_option()
    }
}

impl From<bool> for CheckState {
    fn from(checked: bool) -> Self {
        CheckState::from_bool(checked)
    }
}

/// 由子节点状态归约父节点状态
///
/// 全部勾选 ⇒ Checked，全部未勾选 ⇒ Unchecked，其余 ⇒ Mixed。
/// 没有子节点时返回 `None`（叶子节点的状态不由子节点决定）。
pub fn aggregate<I>(states: I) -> Option<CheckState>
where
    I: IntoIterator<Item = CheckState>,
{
    let mut iter = states.into_iter();
    let first = iter.next()?;
    if first == CheckState::Mixed {
        return Some(CheckState::Mixed);
    }
    for state in iter {
        if state != first {
            return Some(CheckState::Mixed);
        }
    }
    Some(first)
}
