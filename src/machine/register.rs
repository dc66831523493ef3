//! 状态寄存器：当前状态 + 确定性转移表 + 进入/退出动作
//!
//! transition(event, data) 查 (current, event)：
//! - 无转移：返回 Transition::Ignored，状态不变（调用方需检查，不视为错误）
//! - 有转移：旧状态 on_exit(data) -> 修改 current -> 新状态 on_enter(data)
//!
//! 动作失败以 ActionError 返回。退出动作在修改前执行，失败时状态不变；
//! 进入动作在修改后执行，失败时寄存器已处于新状态。

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::MachineError;

/// 进入 / 退出动作：读取事件数据，失败返回描述
pub type Action<D> = Box<dyn Fn(&D) -> Result<(), String> + Send + Sync>;

/// 动作所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Exit,
    Entry,
}

/// 进入 / 退出动作失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{phase:?} action for state {state:?} failed: {message}")]
pub struct ActionError<S: Debug> {
    pub state: S,
    pub phase: ActionPhase,
    pub message: String,
}

/// 一次 transition 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S, E> {
    /// (state, event) 无定义，事件被忽略
    Ignored { state: S },
    Moved { from: S, event: E, to: S },
}

impl<S, E> Transition<S, E> {
    pub fn is_moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }
}

/// 状态寄存器。状态集合由 S 的类型封闭，构造后转移表不可变。
pub struct StateRegister<S, E, D = serde_json::Value> {
    current: S,
    transitions: HashMap<(S, E), S>,
    /// 声明顺序，用于 events_from 的稳定输出
    order: Vec<(S, E)>,
    on_enter: HashMap<S, Action<D>>,
    on_exit: HashMap<S, Action<D>>,
}

impl<S, E, D> StateRegister<S, E, D>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    /// 必须显式给出初始状态
    pub fn builder(initial: S) -> StateRegisterBuilder<S, E, D> {
        StateRegisterBuilder {
            initial,
            transitions: HashMap::new(),
            order: Vec::new(),
            on_enter: HashMap::new(),
            on_exit: HashMap::new(),
            conflict: None,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    /// 当前状态下该事件是否有定义的转移
    pub fn can_handle(&self, event: E) -> bool {
        self.transitions.contains_key(&(self.current, event))
    }

    /// 给定状态下所有可处理的事件（按声明顺序）
    pub fn events_from(&self, state: S) -> Vec<E> {
        self.order
            .iter()
            .filter(|(from, _)| *from == state)
            .map(|(_, event)| *event)
            .collect()
    }

    /// 没有任何出边的状态
    pub fn is_terminal(&self, state: S) -> bool {
        !self.order.iter().any(|(from, _)| *from == state)
    }

    pub fn transition(&mut self, event: E, data: &D) -> Result<Transition<S, E>, ActionError<S>> {
        let Some(&target) = self.transitions.get(&(self.current, event)) else {
            tracing::debug!(state = ?self.current, event = ?event, "no transition defined, event ignored");
            return Ok(Transition::Ignored {
                state: self.current,
            });
        };

        let from = self.current;
        tracing::debug!(from = ?from, event = ?event, to = ?target, "transitioning");

        if let Some(action) = self.on_exit.get(&from) {
            action(data).map_err(|message| ActionError {
                state: from,
                phase: ActionPhase::Exit,
                message,
            })?;
        }

        self.current = target;

        if let Some(action) = self.on_enter.get(&target) {
            action(data).map_err(|message| ActionError {
                state: target,
                phase: ActionPhase::Entry,
                message,
            })?;
        }

        Ok(Transition::Moved {
            from,
            event,
            to: target,
        })
    }
}

/// StateRegister 构造器：收集转移与动作，build 时检查冲突
pub struct StateRegisterBuilder<S, E, D> {
    initial: S,
    transitions: HashMap<(S, E), S>,
    order: Vec<(S, E)>,
    on_enter: HashMap<S, Action<D>>,
    on_exit: HashMap<S, Action<D>>,
    conflict: Option<MachineError>,
}

impl<S, E, D> StateRegisterBuilder<S, E, D>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    /// 声明 (from, event) -> to；同一对声明不同目标在 build 时报错
    pub fn transition(mut self, from: S, event: E, to: S) -> Self {
        match self.transitions.get(&(from, event)) {
            Some(existing) if *existing != to => {
                if self.conflict.is_none() {
                    self.conflict = Some(MachineError::ConflictingTransition {
                        from: format!("{from:?}"),
                        event: format!("{event:?}"),
                        existing: format!("{existing:?}"),
                        requested: format!("{to:?}"),
                    });
                }
            }
            Some(_) => {}
            None => {
                self.transitions.insert((from, event), to);
                self.order.push((from, event));
            }
        }
        self
    }

    pub fn on_enter<F>(mut self, state: S, action: F) -> Self
    where
        F: Fn(&D) -> Result<(), String> + Send + Sync + 'static,
    {
        self.on_enter.insert(state, Box::new(action));
        self
    }

    pub fn on_exit<F>(mut self, state: S, action: F) -> Self
    where
        F: Fn(&D) -> Result<(), String> + Send + Sync + 'static,
    {
        self.on_exit.insert(state, Box::new(action));
        self
    }

    pub fn build(self) -> Result<StateRegister<S, E, D>, MachineError> {
        if let Some(conflict) = self.conflict {
            return Err(conflict);
        }
        Ok(StateRegister {
            current: self.initial,
            transitions: self.transitions,
            order: self.order,
            on_enter: self.on_enter,
            on_exit: self.on_exit,
        })
    }
}

/// 跨任务共享的寄存器：transition 本身不是并发安全的，这里用互斥锁串行化
pub struct SharedStateRegister<S, E, D = serde_json::Value> {
    inner: Arc<Mutex<StateRegister<S, E, D>>>,
}

impl<S, E, D> Clone for SharedStateRegister<S, E, D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, E, D> SharedStateRegister<S, E, D>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    pub fn new(register: StateRegister<S, E, D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(register)),
        }
    }

    pub async fn transition(&self, event: E, data: &D) -> Result<Transition<S, E>, ActionError<S>> {
        self.inner.lock().await.transition(event, data)
    }

    pub async fn current(&self) -> S {
        self.inner.lock().await.current()
    }
}
