//! Операторы map / compact_map / flat_map: мост между деревьями двух типов.
//!
//! Оператор, меняющий тип значения, не может просто добавить типизированного
//! ребёнка в собственный `downstreams` (тот типизирован входом). Вместо
//! этого узел-оператор владеет внутренним мост-издателем выходного типа и
//! пере-вещает результаты трансформации через него. Возвращаемая ручка —
//! корневая подписка на мост-издателе; сам узел-оператор снаружи недостижим.
//!
//! Сцепка времени жизни двух деревьев держится на хуке `on_empty`
//! мост-издателя: как только выходная сторона пустеет, оператор отписывает
//! сам себя от входного дерева.

use std::rc::Rc;

use tracing::debug;

use crate::error::StreamResult;

use super::{
    publisher::Publisher,
    subscription::{Behavior, Node, Subscription},
};

/// Входная сторона map-семейства: прогоняет значение через трансформацию
/// и публикует результат(ы) в мост-издатель выходного типа.
pub(crate) trait BridgeBehavior<V> {
    fn receive(
        &mut self,
        value: &V,
    ) -> StreamResult<()>;
}

struct MapBridge<V, O> {
    transform: Box<dyn FnMut(&V) -> StreamResult<O>>,
    output: Publisher<O>,
}

impl<V, O: Clone> BridgeBehavior<V> for MapBridge<V, O> {
    fn receive(
        &mut self,
        value: &V,
    ) -> StreamResult<()> {
        let mapped = (self.transform)(value)?;
        self.output.publish(mapped);
        Ok(())
    }
}

struct CompactMapBridge<V, O> {
    transform: Box<dyn FnMut(&V) -> StreamResult<Option<O>>>,
    output: Publisher<O>,
}

impl<V, O: Clone> BridgeBehavior<V> for CompactMapBridge<V, O> {
    fn receive(
        &mut self,
        value: &V,
    ) -> StreamResult<()> {
        // `None` — тихий сброс, не ошибка
        if let Some(mapped) = (self.transform)(value)? {
            self.output.publish(mapped);
        }
        Ok(())
    }
}

struct FlatMapBridge<V, O> {
    transform: Box<dyn FnMut(&V) -> StreamResult<Vec<O>>>,
    output: Publisher<O>,
}

impl<V, O: Clone> BridgeBehavior<V> for FlatMapBridge<V, O> {
    fn receive(
        &mut self,
        value: &V,
    ) -> StreamResult<()> {
        for mapped in (self.transform)(value)? {
            self.output.publish(mapped);
        }
        Ok(())
    }
}

impl<V: Clone + 'static> Subscription<V> {
    /// Трансформация значения в возможно другой тип.
    ///
    /// Ошибка трансформации превращается в событие обработки ошибок на
    /// узле-операторе (входная сторона); в мост-издатель она не попадает.
    pub fn map<O: Clone + 'static>(
        &self,
        transform: impl FnMut(&V) -> StreamResult<O> + 'static,
    ) -> Subscription<O> {
        self.spawn_bridge(|output| {
            Box::new(MapBridge {
                transform: Box::new(transform),
                output,
            })
        })
    }

    /// Как [`map`](Subscription::map), но `Ok(None)` тихо гасит значение.
    pub fn compact_map<O: Clone + 'static>(
        &self,
        transform: impl FnMut(&V) -> StreamResult<Option<O>> + 'static,
    ) -> Subscription<O> {
        self.spawn_bridge(|output| {
            Box::new(CompactMapBridge {
                transform: Box::new(transform),
                output,
            })
        })
    }

    /// Трансформация значения в последовательность: каждый элемент
    /// публикуется в мост-издатель отдельно, с сохранением порядка.
    pub fn flat_map<O: Clone + 'static>(
        &self,
        transform: impl FnMut(&V) -> StreamResult<Vec<O>> + 'static,
    ) -> Subscription<O> {
        self.spawn_bridge(|output| {
            Box::new(FlatMapBridge {
                transform: Box::new(transform),
                output,
            })
        })
    }

    /// Общий каркас map-семейства: узел-оператор ребёнком вызывающего,
    /// мост-издатель с хуком обратной отписки, ручка — корневая подписка
    /// на мосте.
    fn spawn_bridge<O: Clone + 'static>(
        &self,
        make: impl FnOnce(Publisher<O>) -> Box<dyn BridgeBehavior<V>>,
    ) -> Subscription<O> {
        let output = Publisher::new();
        let node = Node::attach(&self.node, Behavior::Bridge(make(output.clone())));
        let operator = Rc::downgrade(&node);
        output.set_on_empty(move || {
            // Выходное дерево опустело — оператор больше никому не нужен.
            if let Some(node) = operator.upgrade() {
                debug!("bridge output drained, detaching operator");
                node.unsubscribe();
            }
        });
        output.subscribe(true)
    }
}
