//! Операторы consume / filter / case / catch.
//!
//! Все операторы следуют одному контракту: построить новый узел ребёнком
//! вызывающего, зарегистрировать его в `downstreams` и вернуть ручку на
//! новый узел.

use crate::error::{StreamError, StreamResult};

use super::subscription::{Behavior, Node, Subscription};

impl<V: Clone + 'static> Subscription<V> {
    /// Побочный эффект над каждым значением.
    ///
    /// Ошибка колбэка превращается в событие обработки ошибок на этом же
    /// узле и гасит пересылку исходного значения вниз.
    pub fn consume(
        &self,
        consumer: impl FnMut(&V) -> StreamResult<()> + 'static,
    ) -> Subscription<V> {
        Subscription {
            node: Node::attach(&self.node, Behavior::Consume(Box::new(consumer))),
        }
    }

    /// Пропускает вниз только значения, прошедшие предикат.
    ///
    /// `Ok(false)` — тихий сброс: ни пересылки, ни ошибки.
    pub fn filter(
        &self,
        predicate: impl FnMut(&V) -> StreamResult<bool> + 'static,
    ) -> Subscription<V> {
        Subscription {
            node: Node::attach(&self.node, Behavior::Filter(Box::new(predicate))),
        }
    }

    /// Запускает обработчик при равенстве значения образцу.
    ///
    /// Case наблюдает, но не фильтрует: исходное значение пересылается
    /// вниз независимо от совпадения.
    pub fn case(
        &self,
        expected: V,
        on_match: impl FnMut() -> StreamResult<()> + 'static,
    ) -> Subscription<V>
    where
        V: PartialEq,
    {
        let matches = move |value: &V| *value == expected;
        Subscription {
            node: Node::attach(
                &self.node,
                Behavior::Case {
                    matches: Box::new(matches),
                    on_match: Box::new(on_match),
                },
            ),
        }
    }

    /// Перехватывает ошибки, текущие вниз по поддереву.
    ///
    /// После обработчика ошибка пересылается дальше, так что цепочка
    /// Catch-узлов видит её целиком. Значения узел пересылает как базовый.
    pub fn catch(
        &self,
        on_error: impl FnMut(&StreamError) + 'static,
    ) -> Subscription<V> {
        Subscription {
            node: Node::attach(&self.node, Behavior::Catch(Box::new(on_error))),
        }
    }
}
