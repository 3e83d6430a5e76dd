//! Издатель: вещающий корень дерева подписок.
//!
//! Хранит последнее опубликованное значение (для поздних подписчиков)
//! и владеет корневыми подписками. Доставка синхронная, в порядке
//! регистрации; один логический поток управления.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use tracing::{debug, trace};

use super::subscription::{Node, Subscription};
use crate::config::Settings;

/// Внутреннее состояние издателя; публичная ручка [`Publisher`] — тонкая
/// `Rc`-обёртка над ним, поэтому клоны ручки разделяют состояние.
pub(crate) struct PublisherCore<V> {
    /// Последнее опубликованное значение; сбрасывается только `reset`.
    last_value: RefCell<Option<V>>,
    /// Корневые подписки; порядок вставки = порядок доставки.
    roots: RefCell<Vec<Rc<Node<V>>>>,
    /// Хук «список корней опустел»; ставится только мост-издателями
    /// map-семейства.
    on_empty: RefCell<Option<Box<dyn Fn()>>>,
    /// Значение `receive_last_value` для [`Publisher::subscribe_default`].
    default_replay: bool,
    /// Общее количество вызовов `publish`.
    publish_count: Cell<usize>,
    /// Количество публикаций, не заставших ни одной живой корневой подписки.
    idle_publish_count: Cell<usize>,
}

impl<V> PublisherCore<V> {
    fn with_capacity(
        root_capacity: usize,
        default_replay: bool,
    ) -> Self {
        PublisherCore {
            last_value: RefCell::new(None),
            roots: RefCell::new(Vec::with_capacity(root_capacity)),
            on_empty: RefCell::new(None),
            default_replay,
            publish_count: Cell::new(0),
            idle_publish_count: Cell::new(0),
        }
    }

    /// Удаляет корневую подписку по идентичности узла. Если список корней
    /// при этом опустел — срабатывает хук `on_empty`.
    ///
    /// Вызывающий обязан держать сильную ссылку и на узел, и на сам core.
    pub(crate) fn remove_root(
        &self,
        target: &Node<V>,
    ) {
        let emptied = {
            let mut roots = self.roots.borrow_mut();
            let before = roots.len();
            roots.retain(|root| !std::ptr::eq(Rc::as_ptr(root), target));
            before != roots.len() && roots.is_empty()
        };
        if emptied {
            debug!("root subscriptions drained");
            let hook = self.on_empty.borrow();
            if let Some(on_empty) = hook.as_ref() {
                on_empty();
            }
        }
    }
}

/// Издатель значений типа `V`.
///
/// ```
/// use potok::Publisher;
///
/// let publisher = Publisher::new();
/// let sub = publisher.subscribe(true);
/// let doubled = sub.map(|v: &i64| Ok(v * 2));
/// doubled.consume(|v| {
///     println!("получено: {v}");
///     Ok(())
/// });
/// publisher.publish(21);
/// ```
pub struct Publisher<V> {
    core: Rc<PublisherCore<V>>,
}

impl<V> Publisher<V> {
    /// Создаёт издатель с пустым состоянием.
    pub fn new() -> Self {
        Publisher {
            core: Rc::new(PublisherCore::with_capacity(4, true)),
        }
    }

    /// Создаёт издатель с параметрами из [`Settings`].
    pub fn configured(settings: &Settings) -> Self {
        Publisher {
            core: Rc::new(PublisherCore::with_capacity(
                settings.root_capacity,
                settings.replay_last_value,
            )),
        }
    }

    /// Публикует значение: кэширует его и синхронно доставляет каждой
    /// живой корневой подписке в порядке регистрации.
    ///
    /// Обход идёт по снимку списка, поэтому колбэк может отписывать
    /// узлы прямо во время доставки; узел, отписанный по ходу обхода,
    /// значения уже не получит.
    pub fn publish(
        &self,
        value: V,
    ) where
        V: Clone,
    {
        *self.core.last_value.borrow_mut() = Some(value.clone());
        self.core.publish_count.set(self.core.publish_count.get() + 1);

        let roots: Vec<Rc<Node<V>>> = self.core.roots.borrow().clone();
        let mut delivered = 0usize;
        for root in &roots {
            if root.is_attached() {
                root.receive(&value);
                delivered += 1;
            }
        }
        if delivered == 0 {
            self.core
                .idle_publish_count
                .set(self.core.idle_publish_count.get() + 1);
        }
        trace!(delivered, "value published");
    }

    /// Создаёт корневую подписку.
    ///
    /// При `receive_last_value` закэшированное значение доставляется новой
    /// подписке ровно один раз — во время конструирования, строго до её
    /// регистрации в списке корней, чтобы следующий `publish` его
    /// не продублировал.
    pub fn subscribe(
        &self,
        receive_last_value: bool,
    ) -> Subscription<V>
    where
        V: Clone,
    {
        let node = Node::root(Rc::downgrade(&self.core));
        let replay = if receive_last_value {
            self.core.last_value.borrow().clone()
        } else {
            None
        };
        if let Some(value) = replay {
            node.receive(&value);
        }
        self.core.roots.borrow_mut().push(node.clone());
        debug!(roots = self.core.roots.borrow().len(), "root subscription added");
        Subscription { node }
    }

    /// Корневая подписка с настройкой replay по умолчанию
    /// (см. [`Publisher::configured`]).
    pub fn subscribe_default(&self) -> Subscription<V>
    where
        V: Clone,
    {
        self.subscribe(self.core.default_replay)
    }

    /// Сбрасывает закэшированное значение; подписки не трогает.
    /// Следующий `publish` заполнит кэш заново.
    pub fn reset(&self) {
        *self.core.last_value.borrow_mut() = None;
    }

    /// Последнее опубликованное значение, если публикации были.
    pub fn last_value(&self) -> Option<V>
    where
        V: Clone,
    {
        self.core.last_value.borrow().clone()
    }

    /// Количество живых корневых подписок.
    pub fn subscriber_count(&self) -> usize {
        self.core.roots.borrow().len()
    }

    /// Общее количество вызовов `publish`.
    pub fn publish_count(&self) -> usize {
        self.core.publish_count.get()
    }

    /// Количество публикаций без единого живого корневого подписчика.
    pub fn idle_publish_count(&self) -> usize {
        self.core.idle_publish_count.get()
    }

    /// Ставит хук «список корней опустел». Используется мост-издателями
    /// map-семейства для сцепки времени жизни двух деревьев.
    pub(crate) fn set_on_empty(
        &self,
        hook: impl Fn() + 'static,
    ) {
        *self.core.on_empty.borrow_mut() = Some(Box::new(hook));
    }
}

impl<V> Default for Publisher<V> {
    fn default() -> Self {
        Publisher::new()
    }
}

impl<V> Clone for Publisher<V> {
    fn clone(&self) -> Self {
        Publisher {
            core: self.core.clone(),
        }
    }
}
