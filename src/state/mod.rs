/// Topic bus between sockets and the dispatcher.
pub mod bus;
/// Session aggregate and its data types.
pub mod game;
mod locks;
/// Match and round transitions.
pub mod state_machine;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::{packets::PacketCatalog, session_store::SessionStore},
    services::{dispatcher::Dispatcher, timer::TimerRegistry},
};

pub use self::locks::SessionLocks;
use self::bus::MessageBus;

/// Shared handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state wiring the store, the bus and the dispatcher.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn SessionStore>,
    bus: Arc<dyn MessageBus>,
    packets: PacketCatalog,
    dispatcher: Dispatcher,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        bus: Arc<dyn MessageBus>,
        packets: PacketCatalog,
    ) -> SharedState {
        let dispatcher = Dispatcher::new(
            store.clone(),
            bus.clone(),
            Arc::new(packets.clone()),
            SessionLocks::new(),
            TimerRegistry::default(),
        );
        Arc::new(Self {
            config: Arc::new(config),
            store,
            bus,
            packets,
            dispatcher,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Session store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Message bus.
    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    /// Packets owners can pick from.
    pub fn packets(&self) -> &PacketCatalog {
        &self.packets
    }

    /// Action dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
