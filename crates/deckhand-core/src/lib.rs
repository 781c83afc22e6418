//! deckhand-core - mode/view dispatch engine for DAW control surfaces
//!
//! Sits between decoded hardware events and a mirror of the host's session:
//!
//! - Modes own the knobs, the button rows and the display; views own the
//!   pad grid. Both are layered: a permanent selection plus hold-to-peek
//!   temporaries that restore exactly on release.
//! - Banks page over host collections with a stable slot range.
//! - Lights and display text are rendered into frames each tick and only
//!   the cells that changed reach the hardware.
//!
//! # Usage
//!
//! ```no_run
//! use deckhand_core::{
//!     Bindings, Config, Controller, Engine, MemoryHost, MemorySettings, Model,
//!     RecordingOutput, Session,
//! };
//! use std::time::Instant;
//!
//! let config = Config::load_or_default();
//! let model = Model::new(
//!     config.clone(),
//!     Session::with_tracks(8, 8, 2),
//!     Box::new(MemorySettings::new()),
//!     Instant::now(),
//! );
//! let mut engine = Engine::new(
//!     Controller::with_defaults(model),
//!     Bindings::reference(&config),
//!     RecordingOutput::new(),
//!     MemoryHost::default(),
//! );
//! engine.activate(Instant::now());
//! ```

pub mod bank;
pub mod command;
pub mod config;
pub mod controller;
pub mod display;
pub mod engine;
pub mod error;
pub mod keys;
pub mod knob;
pub mod layer;
pub mod mode;
pub mod model;
pub mod poller;
pub mod scales;
pub mod session;
pub mod settings;
pub mod surface;
pub mod timer;
pub mod value;
pub mod view;

// Re-export main types
pub use bank::{Bank, BankSlot, BankSource};
pub use command::{Bindings, ButtonEvent, ContinuousCommand, TriggerCommand};
pub use config::Config;
pub use controller::Controller;
pub use display::{
    HardwareWrite, LightFrame, LightId, LightInfo, RecordingOutput, SurfaceOutput, SurfaceWriter,
    TextFrame,
};
pub use engine::Engine;
pub use error::{Error, Result};
pub use keys::KeyManager;
pub use layer::{Layer, LayerManager};
pub use mode::{Mode, ModeId, ModeManager};
pub use model::Model;
pub use poller::{InputPoller, PollSource, StateTracker};
pub use scales::{Scale, Scales};
pub use session::{HostAdapter, MemoryHost, Session, SessionChange};
pub use settings::{MemorySettings, SettingsStore, TomlSettings};
pub use surface::{ButtonId, ControlEvent, SurfaceLayout};
pub use value::{Encoding, KnobInput, ValueChanger};
pub use view::{View, ViewId, ViewManager};
