//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Этот модуль реализует внутрипроцессный одно-поточный pub/sub
//! с композицией потоковых операторов:
//!
//! - `publisher`: вещающий корень — кэш последнего значения и корневые
//!   подписки.
//! - `subscription`: узел дерева подписок, доставка и каскадная отписка.
//! - `operator` (приватный): операторы consume / filter / case / catch.
//! - `bridge` (приватный): map / compact_map / flat_map с внутренним
//!   мост-издателем выходного типа.
//!
//! Публичный API переэкспортирует:
//! - `publisher::Publisher`
//! - `subscription::Subscription`

pub mod publisher;
pub mod subscription;

mod bridge;
mod operator;

// Публичный экспорт основных типов, чтобы упростить доступ
// к ним из внешнего кода.
pub use publisher::Publisher;
pub use subscription::Subscription;
