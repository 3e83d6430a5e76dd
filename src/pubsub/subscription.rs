//! Узел дерева подписок: приём значений, приём ошибок и каскадная отписка.
//!
//! Дерево устроено как лес с владением строго вниз: родитель (или издатель
//! для корневых узлов) — единственный владелец своих детей, ребёнок держит
//! на владельца только слабую ссылку. Благодаря этому каскад отписки вверх
//! не требует разрывать циклы вручную: их просто нет.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use tracing::debug;

use super::{bridge::BridgeBehavior, publisher::PublisherCore};
use crate::error::{StreamError, StreamResult};

pub(crate) type ConsumeFn<V> = Box<dyn FnMut(&V) -> StreamResult<()>>;
pub(crate) type FilterFn<V> = Box<dyn FnMut(&V) -> StreamResult<bool>>;
pub(crate) type MatchFn<V> = Box<dyn FnMut(&V) -> bool>;
pub(crate) type CaseFn = Box<dyn FnMut() -> StreamResult<()>>;
pub(crate) type CatchFn = Box<dyn FnMut(&StreamError)>;

/// Поведение, закреплённое за узлом: что происходит при получении
/// значения и ошибки.
pub(crate) enum Behavior<V> {
    /// Базовый узел: пересылает значение детям без изменений.
    Relay,
    /// Побочный эффект над значением; ошибка колбэка гасит пересылку.
    Consume(ConsumeFn<V>),
    /// Пропускает значение дальше только если предикат вернул `true`.
    Filter(FilterFn<V>),
    /// Наблюдатель за конкретным значением; поток не фильтрует.
    Case { matches: MatchFn<V>, on_match: CaseFn },
    /// Перехватывает только ошибки; значения пересылает как базовый узел.
    Catch(CatchFn),
    /// map / compact_map / flat_map: пере-вещание через внутренний
    /// издатель выходного типа.
    Bridge(Box<dyn BridgeBehavior<V>>),
}

/// Что делать после отработки поведения над полученным значением.
enum Step {
    Forward,
    Silence,
    Raise(StreamError),
    RaiseAndForward(StreamError),
}

/// Узел дерева подписок.
///
/// Узел жив, пока он присутствует в коллекции владельца (состояние
/// «attached»). Отписка переводит его в терминальное состояние «detached»;
/// обратного перехода нет, повторная отписка — no-op.
pub(crate) struct Node<V> {
    /// Слабая ссылка на родительский узел (для не-корневых узлов).
    upstream: RefCell<Option<Weak<Node<V>>>>,
    /// Слабая ссылка на издатель (только для корневых узлов).
    publisher: RefCell<Option<Weak<PublisherCore<V>>>>,
    /// Дети; порядок вставки = порядок доставки.
    downstreams: RefCell<Vec<Rc<Node<V>>>>,
    /// Последнее значение, пересланное детям. Им засевается каждый новый
    /// ребёнок: оператор, навешанный на уже наполненный поток, синхронно
    /// получает текущее значение ровно один раз.
    last_forwarded: RefCell<Option<V>>,
    behavior: RefCell<Behavior<V>>,
    attached: Cell<bool>,
}

impl<V> Node<V> {
    pub(crate) fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub(crate) fn downstream_count(&self) -> usize {
        self.downstreams.borrow().len()
    }

    /// Приём ошибки: Catch запускает обработчик, затем ошибка в любом
    /// случае пересылается детям — цепочка Catch-узлов видит её целиком.
    pub(crate) fn handle(
        &self,
        error: &StreamError,
    ) {
        if !self.attached.get() {
            return;
        }
        {
            let mut behavior = self.behavior.borrow_mut();
            if let Behavior::Catch(on_error) = &mut *behavior {
                on_error(error);
            }
        }
        self.forward_error(error);
    }

    /// Отписка с каскадом вверх.
    ///
    /// Вызывающий обязан держать сильную ссылку на узел: коллекция
    /// владельца может оказаться последним владельцем.
    pub(crate) fn unsubscribe(&self) {
        if !self.attached.replace(false) {
            return; // уже отписан
        }
        let upstream = self.upstream.borrow_mut().take();
        if let Some(parent) = upstream.and_then(|weak| weak.upgrade()) {
            // `parent` удерживается локально до конца удаления
            parent.remove_downstream(self);
            return;
        }
        let publisher = self.publisher.borrow_mut().take();
        if let Some(publisher) = publisher.and_then(|weak| weak.upgrade()) {
            publisher.remove_root(self);
        }
    }

    /// Удаляет ребёнка по идентичности. Узел, оставшийся без наблюдателей,
    /// сам никому не нужен — каскад продолжается одним уровнем выше.
    fn remove_downstream(
        &self,
        target: &Node<V>,
    ) {
        let emptied = {
            let mut downstreams = self.downstreams.borrow_mut();
            let before = downstreams.len();
            downstreams.retain(|child| !std::ptr::eq(Rc::as_ptr(child), target));
            before != downstreams.len() && downstreams.is_empty()
        };
        if emptied {
            debug!("downstreams drained, cascading unsubscribe");
            self.unsubscribe();
        }
    }

    fn forward_error(
        &self,
        error: &StreamError,
    ) {
        // Снимок списка: обработчик ребёнка может отписывать узлы
        // прямо во время обхода.
        let downstreams: Vec<Rc<Node<V>>> = self.downstreams.borrow().clone();
        for child in downstreams {
            child.handle(error);
        }
    }
}

impl<V: Clone> Node<V> {
    /// Создаёт корневой узел, привязанный к издателю.
    pub(crate) fn root(publisher: Weak<PublisherCore<V>>) -> Rc<Self> {
        Rc::new(Node {
            upstream: RefCell::new(None),
            publisher: RefCell::new(Some(publisher)),
            downstreams: RefCell::new(Vec::new()),
            last_forwarded: RefCell::new(None),
            behavior: RefCell::new(Behavior::Relay),
            attached: Cell::new(true),
        })
    }

    /// Создаёт дочерний узел с заданным поведением, засевает его текущим
    /// значением потока и регистрирует в списке детей родителя.
    ///
    /// Засев идёт через обычный путь приёма и строго до регистрации,
    /// поэтому значение доставляется ровно один раз и не дублируется
    /// следующим `publish`.
    pub(crate) fn attach(
        parent: &Rc<Self>,
        behavior: Behavior<V>,
    ) -> Rc<Self> {
        let node = Rc::new(Node {
            upstream: RefCell::new(Some(Rc::downgrade(parent))),
            publisher: RefCell::new(None),
            downstreams: RefCell::new(Vec::new()),
            last_forwarded: RefCell::new(None),
            behavior: RefCell::new(behavior),
            attached: Cell::new(true),
        });
        let seed = parent.last_forwarded.borrow().clone();
        if let Some(value) = seed {
            node.receive(&value);
        }
        // колбэк мог отписать узел прямо при засеве
        if node.attached.get() {
            parent.downstreams.borrow_mut().push(node.clone());
        }
        node
    }

    /// Приём значения: поведение узла решает, что пойдёт детям.
    ///
    /// Заём `behavior` отпускается до пересылки и до обработки ошибки,
    /// иначе путь ошибки занял бы RefCell повторно.
    pub(crate) fn receive(
        &self,
        value: &V,
    ) {
        if !self.attached.get() {
            return;
        }
        let step = {
            let mut behavior = self.behavior.borrow_mut();
            match &mut *behavior {
                Behavior::Relay | Behavior::Catch(_) => Step::Forward,
                Behavior::Consume(consumer) => match consumer(value) {
                    Ok(()) => Step::Forward,
                    Err(err) => Step::Raise(err),
                },
                Behavior::Filter(predicate) => match predicate(value) {
                    Ok(true) => Step::Forward,
                    Ok(false) => Step::Silence,
                    Err(err) => Step::Raise(err),
                },
                Behavior::Case { matches, on_match } => {
                    if matches(value) {
                        match on_match() {
                            Ok(()) => Step::Forward,
                            // Case — наблюдатель, а не фильтр: значение идёт
                            // дальше даже после упавшего обработчика.
                            Err(err) => Step::RaiseAndForward(err),
                        }
                    } else {
                        Step::Forward
                    }
                }
                Behavior::Bridge(bridge) => match bridge.receive(value) {
                    Ok(()) => Step::Forward,
                    Err(err) => Step::Raise(err),
                },
            }
        };
        match step {
            Step::Forward => self.forward_value(value),
            Step::Silence => {}
            Step::Raise(err) => self.handle(&err),
            Step::RaiseAndForward(err) => {
                self.handle(&err);
                self.forward_value(value);
            }
        }
    }

    fn forward_value(
        &self,
        value: &V,
    ) {
        *self.last_forwarded.borrow_mut() = Some(value.clone());
        // Снимок списка: колбэк ребёнка может отписать себя или соседа
        // прямо во время обхода.
        let downstreams: Vec<Rc<Node<V>>> = self.downstreams.borrow().clone();
        for child in downstreams {
            child.receive(value);
        }
    }
}

/// Подписка — публичная ручка над узлом дерева.
///
/// Ручка не продлевает доставку: после отписки (явной или каскадной)
/// все операции над ней вырождаются в no-op.
pub struct Subscription<V> {
    pub(crate) node: Rc<Node<V>>,
}

impl<V> Subscription<V> {
    /// Отписывает узел от владельца; пустеющие предки снимаются каскадом.
    /// Повторный вызов — no-op.
    pub fn unsubscribe(&self) {
        self.node.unsubscribe();
    }

    /// `true`, пока узел присутствует в коллекции владельца.
    pub fn is_attached(&self) -> bool {
        self.node.is_attached()
    }

    /// Количество прямых потомков узла.
    pub fn downstream_count(&self) -> usize {
        self.node.downstream_count()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::pubsub::Publisher;

    /// Тест проверяет, что значение пересылается детям в порядке регистрации.
    #[test]
    fn test_forward_order_is_registration_order() {
        let publisher = Publisher::new();
        let root = publisher.subscribe(false);
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            root.consume(move |v: &i64| {
                seen.borrow_mut().push((tag, *v));
                Ok(())
            });
        }

        publisher.publish(7);
        assert_eq!(
            &*seen.borrow(),
            &[("first", 7), ("second", 7), ("third", 7)]
        );
    }

    /// Тест проверяет засев: оператор, навешанный на уже наполненный поток,
    /// синхронно получает текущее значение ровно один раз.
    #[test]
    fn test_attach_to_populated_stream_seeds_once() {
        let publisher = Publisher::new();
        let root = publisher.subscribe(true);
        publisher.publish(5);

        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            root.consume(move |v: &i64| {
                seen.borrow_mut().push(*v);
                Ok(())
            });
        }
        assert_eq!(&*seen.borrow(), &[5]);

        publisher.publish(6);
        assert_eq!(&*seen.borrow(), &[5, 6]);
    }

    /// Тест проверяет, что значение, отброшенное фильтром, новым детям
    /// фильтра не засевается: они видят последнее прошедшее значение.
    #[test]
    fn test_seed_is_last_passed_value_not_last_published() {
        let publisher = Publisher::new();
        let root = publisher.subscribe(false);
        let gate = root.filter(|v: &i64| Ok(*v >= 10));

        publisher.publish(50);
        publisher.publish(3); // гаситcя фильтром

        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            gate.consume(move |v: &i64| {
                seen.borrow_mut().push(*v);
                Ok(())
            });
        }
        assert_eq!(&*seen.borrow(), &[50]);
    }

    /// Тест проверяет каскад: отписка листа снимает пустеющих предков
    /// вплоть до издателя.
    #[test]
    fn test_leaf_unsubscribe_cascades_to_publisher() {
        let publisher = Publisher::<i64>::new();
        let root = publisher.subscribe(false);
        let gate = root.filter(|v| Ok(*v > 0));
        let leaf = gate.consume(|_| Ok(()));

        assert_eq!(publisher.subscriber_count(), 1);

        leaf.unsubscribe();

        assert!(!leaf.is_attached());
        assert!(!gate.is_attached());
        assert!(!root.is_attached());
        assert_eq!(publisher.subscriber_count(), 0);
    }

    /// Тест проверяет, что каскад останавливается на первом узле,
    /// у которого остался другой ребёнок.
    #[test]
    fn test_cascade_stops_at_surviving_child() {
        let publisher = Publisher::<i64>::new();
        let root = publisher.subscribe(false);
        let keeper = root.consume(|_| Ok(()));
        let doomed = root.consume(|_| Ok(()));

        doomed.unsubscribe();

        assert!(!doomed.is_attached());
        assert!(keeper.is_attached());
        assert!(root.is_attached());
        assert_eq!(root.downstream_count(), 1);
        assert_eq!(publisher.subscriber_count(), 1);
    }

    /// Тест проверяет идемпотентность: двойная отписка и отписка узла,
    /// чей владелец уже исчез, ничего не ломают.
    #[test]
    fn test_unsubscribe_is_idempotent() {
        let publisher = Publisher::<i64>::new();
        let root = publisher.subscribe(false);
        let leaf = root.consume(|_| Ok(()));

        leaf.unsubscribe();
        leaf.unsubscribe();
        root.unsubscribe();
        root.unsubscribe();

        assert_eq!(publisher.subscriber_count(), 0);
    }

    /// Тест проверяет отписку прямо из колбэка: узел, отписавший себя
    /// во время доставки, следующих значений не получает.
    #[test]
    fn test_self_unsubscribe_during_delivery() {
        let publisher = Publisher::new();
        let root = publisher.subscribe(false);
        let count = Rc::new(RefCell::new(0usize));

        let holder: Rc<RefCell<Option<crate::Subscription<i64>>>> =
            Rc::new(RefCell::new(None));
        let sub = {
            let count = count.clone();
            let holder = holder.clone();
            root.consume(move |_| {
                *count.borrow_mut() += 1;
                if let Some(me) = holder.borrow().as_ref() {
                    me.unsubscribe();
                }
                Ok(())
            })
        };
        // второй ребёнок удерживает root от каскада
        let _other = root.consume(|_| Ok(()));
        *holder.borrow_mut() = Some(sub);

        publisher.publish(1);
        publisher.publish(2);

        assert_eq!(*count.borrow(), 1);
    }

    /// Тест проверяет, что сосед, отписанный во время обхода,
    /// текущее значение уже не получает.
    #[test]
    fn test_sibling_unsubscribed_mid_delivery_is_skipped() {
        let publisher = Publisher::new();
        let root = publisher.subscribe(false);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let victim_slot: Rc<RefCell<Option<crate::Subscription<i64>>>> =
            Rc::new(RefCell::new(None));
        {
            let victim_slot = victim_slot.clone();
            root.consume(move |_: &i64| {
                if let Some(victim) = victim_slot.borrow().as_ref() {
                    victim.unsubscribe();
                }
                Ok(())
            });
        }
        let victim = {
            let seen = seen.clone();
            root.consume(move |v: &i64| {
                seen.borrow_mut().push(*v);
                Ok(())
            })
        };
        *victim_slot.borrow_mut() = Some(victim);

        publisher.publish(42);

        assert!(seen.borrow().is_empty());
    }
}
