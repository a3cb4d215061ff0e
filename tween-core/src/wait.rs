//! # Wait 模块
//!
//! 事件等待：登记一组事件名与回调，全部事件被标记完成后回调触发一次。
//!
//! ```rust,ignore
//! let waiter = EventWaiter::new();
//! waiter.wait_for(&[wait::STARTUP, "assets"], || println!("就绪"));
//! waiter.complete(wait::STARTUP);
//! waiter.complete("assets"); // 触发回调
//! ```
//!
//! 回调在内部状态释放后执行，回调中可以继续登记或完成事件。

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use tracing::debug;

/// 每帧心跳事件
pub const HEARTBEAT: &str = "heartbeat";
/// 启动完成事件
pub const STARTUP: &str = "startup";

struct Waiting {
    events: Vec<String>,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct WaiterState {
    waiting: Vec<Waiting>,
    completed: HashSet<String>,
}

impl WaiterState {
    fn is_satisfied(&self, events: &[String]) -> bool {
        events.iter().all(|event| self.completed.contains(event))
    }

    /// 取出所有已满足的等待项，保持登记顺序
    fn take_ready(&mut self) -> Vec<Waiting> {
        let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.waiting)
            .into_iter()
            .partition(|w| self.is_satisfied(&w.events));
        self.waiting = pending;
        ready
    }
}

/// 事件等待器
#[derive(Default)]
pub struct EventWaiter {
    state: RefCell<WaiterState>,
}

impl fmt::Debug for EventWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventWaiter")
            .field("pending", &state.waiting.len())
            .field("completed", &state.completed.len())
            .finish()
    }
}

impl EventWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记等待
    ///
    /// 所有事件都已完成时立即触发回调。
    pub fn wait_for<S: AsRef<str>>(&self, events: &[S], callback: impl FnOnce() + 'static) {
        let events: Vec<String> = events.iter().map(|e| e.as_ref().to_string()).collect();
        debug!(events = ?events, "登记事件等待");
        self.state.borrow_mut().waiting.push(Waiting {
            events,
            callback: Box::new(callback),
        });
        self.flush();
    }

    /// 标记事件完成，并触发所有已满足的等待
    pub fn complete(&self, event: &str) {
        let inserted = self.state.borrow_mut().completed.insert(event.to_string());
        if inserted {
            debug!(event, "事件完成");
        }
        self.flush();
    }

    /// 事件是否已完成
    pub fn is_complete(&self, event: &str) -> bool {
        self.state.borrow().completed.contains(event)
    }

    /// 所有事件是否都已完成
    pub fn are_complete<S: AsRef<str>>(&self, events: &[S]) -> bool {
        let state = self.state.borrow();
        events
            .iter()
            .all(|event| state.completed.contains(event.as_ref()))
    }

    /// 撤销事件的完成标记，之后登记的等待需要重新完成它
    pub fn remove_completed(&self, event: &str) {
        self.state.borrow_mut().completed.remove(event);
    }

    /// 批量撤销完成标记
    pub fn remove_completed_many<S: AsRef<str>>(&self, events: &[S]) {
        let mut state = self.state.borrow_mut();
        for event in events {
            state.completed.remove(event.as_ref());
        }
    }

    /// 尚未触发的等待数量
    pub fn pending_count(&self) -> usize {
        self.state.borrow().waiting.len()
    }

    /// 清空所有等待与完成标记，未触发的回调直接丢弃
    pub fn clear(&self) {
        let state = std::mem::take(&mut *self.state.borrow_mut());
        drop(state);
    }

    fn flush(&self) {
        loop {
            let ready = self.state.borrow_mut().take_ready();
            if ready.is_empty() {
                return;
            }
            for waiting in ready {
                (waiting.callback)();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_fires_after_all_events_complete() {
        let waiter = EventWaiter::new();
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        waiter.wait_for(&[STARTUP, "assets"], move || f.set(f.get() + 1));

        waiter.complete(STARTUP);
        assert_eq!(fired.get(), 0);
        assert_eq!(waiter.pending_count(), 1);

        waiter.complete("assets");
        assert_eq!(fired.get(), 1);
        assert_eq!(waiter.pending_count(), 0);

        // 只触发一次
        waiter.complete("assets");
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_already_complete_fires_immediately() {
        let waiter = EventWaiter::new();
        waiter.complete(HEARTBEAT);
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        waiter.wait_for(&[HEARTBEAT], move || f.set(true));
        assert!(fired.get());
    }

    #[test]
    fn test_is_complete_checks_exact_name() {
        let waiter = EventWaiter::new();
        assert!(!waiter.is_complete("load"));
        waiter.complete("loading");
        assert!(!waiter.is_complete("load"));
        assert!(waiter.is_complete("loading"));
        assert!(waiter.are_complete(&["loading"]));
        assert!(!waiter.are_complete(&["loading", "ready"]));
    }

    #[test]
    fn test_remove_completed() {
        let waiter = EventWaiter::new();
        waiter.complete("a");
        waiter.complete("b");
        waiter.remove_completed("a");
        assert!(!waiter.is_complete("a"));

        waiter.remove_completed_many(&["b", "missing"]);
        assert!(!waiter.is_complete("b"));
    }

    #[test]
    fn test_callback_can_reenter() {
        let waiter = Rc::new(EventWaiter::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let w = waiter.clone();
        let l = log.clone();
        waiter.wait_for(&["first"], move || {
            l.borrow_mut().push("first");
            w.complete("second");
        });
        let l = log.clone();
        waiter.wait_for(&["second"], move || l.borrow_mut().push("second"));

        waiter.complete("first");
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_clear_drops_pending() {
        let waiter = EventWaiter::new();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        waiter.wait_for(&["never"], move || f.set(true));
        waiter.complete("other");

        waiter.clear();
        waiter.complete("never");

        assert!(!fired.get());
        assert_eq!(waiter.pending_count(), 0);
        assert!(!waiter.is_complete("other"));
    }
}
