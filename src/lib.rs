mod client;
pub mod codec;
pub mod command;
mod config;
mod device;
mod diff;
mod error;
mod gate;
mod logger;
mod token;
mod transport;

pub use client::{KumoClient, KumoClientBuilder};
pub use codec::{FAN_SPEED, HvacAction, HvacMode, VANE, Vocabulary};
pub use command::Command;
pub use config::{
    ClientConfig, DEFAULT_API_VERSION, DEFAULT_APP_VERSION, DEFAULT_BASE_URL, RetryPolicy,
};
pub use device::{
    DeviceIdentity, DeviceProfile, DeviceView, SetPoints, SupportedFeatures, zone_device_serial,
};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use reqwest::Method;
pub use secrecy::SecretString;
pub use token::TokenPair;
pub use transport::APP_VERSION_HEADER;
