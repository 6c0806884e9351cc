//! parcelbox-core
//!
//! Core building blocks for the front-desk package tracker: local photo
//! storage, a durable queue of deferred remote writes, and the sync engine
//! that drains it.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, package, state, operation, photo, unit, notification）
//! - **ports**: 抽象化レイヤー（LocalStore, DocumentStore, ConnectivitySignal, Clock, IdGenerator）
//! - **impls**: 実装（InMemory / SQLite のローカルストア、InMemory のリモート DB など）
//! - **sync**: SyncEngine（single-flight drain）と RetryPolicy
//! - **app**: AppBuilder, FrontDesk, ConnectivityMonitor
//! - **error**: レイヤーごとのエラー型
//! - **observability**: キューの健全性ビュー

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod sync;

#[cfg(test)]
mod testing;
