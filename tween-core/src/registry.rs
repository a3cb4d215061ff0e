//! # Registry 模块
//!
//! 目标注册表：目标身份 -> 正在驱动它的补间列表。
//!
//! 不变量：补间已注册，当且仅当它既未完成也未被销毁。
//! 批量操作先对列表做快照再逐个处理，回调中对注册表的修改不会打断遍历。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::tween::Tween;

/// 目标身份
///
/// 取目标 `Rc` 的分配地址。补间持有目标的 `Weak`，
/// 只要补间还在，这块分配就不会被复用，地址保持唯一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(usize);

impl TargetKey {
    /// 从目标的强引用计算身份
    pub fn of<T: ?Sized>(target: &Rc<T>) -> Self {
        Self(Rc::as_ptr(target).cast::<()>() as usize)
    }

    /// 从目标的弱引用计算身份
    pub fn of_weak<T: ?Sized>(target: &Weak<T>) -> Self {
        Self(Weak::as_ptr(target).cast::<()>() as usize)
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({:#x})", self.0)
    }
}

/// 目标注册表
///
/// 克隆得到的是同一个注册表的句柄。
#[derive(Clone, Default)]
pub struct Registry {
    entries: Rc<RefCell<HashMap<TargetKey, Vec<Tween>>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("targets", &self.target_count())
            .field("tweens", &self.len())
            .finish()
    }
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册补间（追加到目标列表末尾）
    pub fn register(&self, tween: &Tween) {
        self.entries
            .borrow_mut()
            .entry(tween.target_key())
            .or_default()
            .push(tween.clone());
    }

    /// 注销补间
    ///
    /// 只移除一次出现；列表为空时移除整个条目。未注册的补间是空操作。
    pub fn unregister(&self, tween: &Tween) {
        let key = tween.target_key();
        // 被移除的句柄在释放借用之后再析构
        let _removed = {
            let mut entries = self.entries.borrow_mut();
            let Some(list) = entries.get_mut(&key) else {
                return;
            };
            let removed = list
                .iter()
                .position(|t| t == tween)
                .map(|index| list.remove(index));
            if list.is_empty() {
                entries.remove(&key);
            }
            removed
        };
    }

    /// 补间是否已注册
    pub fn contains(&self, tween: &Tween) -> bool {
        self.entries
            .borrow()
            .get(&tween.target_key())
            .is_some_and(|list| list.contains(tween))
    }

    /// 目标上所有补间的快照
    pub fn tweens_for(&self, key: TargetKey) -> Vec<Tween> {
        self.entries
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// 目标上的补间数量
    pub fn count_for(&self, key: TargetKey) -> usize {
        self.entries.borrow().get(&key).map_or(0, Vec::len)
    }

    /// 有补间的目标数量
    pub fn target_count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// 已注册的补间总数
    pub fn len(&self) -> usize {
        self.entries.borrow().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// 停止目标上的所有补间
    ///
    /// 补间保持注册，可以重新启动。
    pub fn stop_all(&self, key: TargetKey) {
        let tweens = self.tweens_for(key);
        debug!(target_key = %key, count = tweens.len(), "停止目标上的所有补间");
        for tween in tweens {
            tween.stop();
        }
    }

    /// 停止并销毁目标上的所有补间，然后移除条目
    pub fn remove_all(&self, key: TargetKey) {
        let tweens = self.tweens_for(key);
        debug!(target_key = %key, count = tweens.len(), "移除目标上的所有补间");
        for tween in tweens {
            tween.stop();
            tween.destroy();
        }

        // 销毁时已逐个注销，这里只清掉残留的空条目
        let mut entries = self.entries.borrow_mut();
        if entries.get(&key).is_some_and(Vec::is_empty) {
            entries.remove(&key);
        }
    }

    /// 销毁目标已释放的补间，返回清理掉的目标数量
    ///
    /// 运行中的补间会在下一次推进时自行发现目标失效，
    /// 未启动或已暂停的补间不会被推进，需要在这里清理。
    pub fn prune_dead(&self) -> usize {
        let dead: Vec<TargetKey> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, list)| list.first().is_some_and(|t| !t.is_target_alive()))
            .map(|(key, _)| *key)
            .collect();
        for key in &dead {
            debug!(target_key = %key, "目标已释放，清理残留补间");
            self.remove_all(*key);
        }
        dead.len()
    }

    /// 所有已注册补间的快照
    pub fn snapshot(&self) -> Vec<Tween> {
        self.entries
            .borrow()
            .values()
            .flat_map(|list| list.iter().cloned())
            .collect()
    }

    /// 销毁所有已注册的补间
    pub fn clear(&self) {
        let tweens = self.snapshot();
        debug!(count = tweens.len(), "清空注册表");
        for tween in tweens {
            tween.destroy();
        }
        let _leftover = std::mem::take(&mut *self.entries.borrow_mut());
    }
}
