//! # Heartbeat 模块
//!
//! 逐帧心跳：订阅者每帧按订阅顺序收到一次回调。
//!
//! 心跳只持有订阅者的弱引用，不延长其生命周期；
//! 分发时先对订阅列表做快照，回调内部可以任意订阅或退订。
//! 同一帧内已退订的订阅者不会再被调用。
//!
//! 退订只清除订阅的活跃标记，列表在下一帧开始时统一压缩。
//! 压缩之前可以用 [`Heartbeat::resume`] 恢复原订阅，保留原来的分发位置。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

/// 心跳回调
pub trait TickHandler {
    /// 每帧调用一次，可通过 `heartbeat.delta_time()` 读取帧间隔
    fn on_heartbeat(&self, heartbeat: &Heartbeat);
}

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// 获取原始值
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({})", self.0)
    }
}

struct Subscriber {
    id: SubscriptionId,
    handler: Weak<dyn TickHandler>,
    active: Rc<Cell<bool>>,
}

#[derive(Default)]
struct HeartbeatInner {
    /// 按订阅顺序排列，可能包含尚未压缩的已退订项
    subscribers: Vec<Subscriber>,
    /// 列表中每一项的活跃标记
    slots: HashMap<SubscriptionId, Rc<Cell<bool>>>,
    live: usize,
    stale: bool,
    next_id: u64,
    delta_time: f32,
    frame: u64,
}

impl HeartbeatInner {
    /// 移除已退订的项
    fn compact(&mut self) {
        if !self.stale {
            return;
        }
        self.subscribers.retain(|s| s.active.get());
        self.slots.retain(|_, active| active.get());
        self.stale = false;
    }
}

/// 心跳驱动器
///
/// 克隆得到的是同一个心跳的句柄。
#[derive(Clone, Default)]
pub struct Heartbeat {
    inner: Rc<RefCell<HeartbeatInner>>,
}

impl fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Heartbeat")
            .field("subscribers", &inner.live)
            .field("delta_time", &inner.delta_time)
            .field("frame", &inner.frame)
            .finish()
    }
}

impl Heartbeat {
    /// 创建新的心跳
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅心跳
    ///
    /// 订阅者追加到末尾，从下一次 `advance` 开始收到回调。
    pub fn subscribe(&self, handler: Weak<dyn TickHandler>) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        let active = Rc::new(Cell::new(true));
        inner.subscribers.push(Subscriber {
            id,
            handler,
            active: active.clone(),
        });
        inner.slots.insert(id, active);
        inner.live += 1;
        id
    }

    /// 恢复刚退订的订阅
    ///
    /// 原订阅尚未被压缩时重新激活它，保留原来的分发位置，
    /// 当前帧还没轮到它的话本帧仍会收到回调；否则等同于 `subscribe`。
    pub fn resume(&self, id: SubscriptionId, handler: Weak<dyn TickHandler>) -> SubscriptionId {
        {
            let mut inner = self.inner.borrow_mut();
            let slot = inner.slots.get(&id).cloned();
            if let Some(active) = slot {
                if !active.replace(true) {
                    inner.live += 1;
                }
                return id;
            }
        }
        self.subscribe(handler)
    }

    /// 退订心跳
    ///
    /// 对不存在的订阅是空操作。
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.borrow_mut();
        let Some(active) = inner.slots.get(&id).cloned() else {
            return;
        };
        if active.replace(false) {
            inner.live -= 1;
            inner.stale = true;
        }
    }

    /// 订阅是否仍然有效
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner
            .borrow()
            .slots
            .get(&id)
            .is_some_and(|active| active.get())
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().live
    }

    /// 当前帧的时间间隔（秒）
    pub fn delta_time(&self) -> f32 {
        self.inner.borrow().delta_time
    }

    /// 已推进的帧数
    pub fn frame(&self) -> u64 {
        self.inner.borrow().frame
    }

    /// 推进一帧
    ///
    /// 按订阅顺序调用每个订阅者，已被释放的订阅者会被退订。
    pub fn advance(&self, delta_time: f32) {
        let (frame, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            inner.delta_time = delta_time;
            inner.frame += 1;
            inner.compact();
            let snapshot: Vec<(SubscriptionId, Weak<dyn TickHandler>, Rc<Cell<bool>>)> = inner
                .subscribers
                .iter()
                .map(|s| (s.id, s.handler.clone(), s.active.clone()))
                .collect();
            (inner.frame, snapshot)
        };

        trace!(
            frame,
            delta_time,
            subscribers = snapshot.len(),
            "心跳分发"
        );

        for (id, handler, active) in snapshot {
            // 本帧内已退订的跳过
            if !active.get() {
                continue;
            }
            match handler.upgrade() {
                Some(handler) => handler.on_heartbeat(self),
                None => self.unsubscribe(id),
            }
        }
    }
}
